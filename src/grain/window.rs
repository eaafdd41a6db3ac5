use std::sync::LazyLock;

use strum::EnumCount;

// -------------------------------------------------------------------------------------------------

/// Grain envelope window shape.
///
/// All windows are 0 at phase 0.0 and 1.0 and peak at phase 0.5.
#[derive(
    Clone,
    Copy,
    Debug,
    Default,
    PartialEq,
    Eq,
    strum::EnumString,
    strum::Display,
    strum::VariantNames,
    strum::EnumCount,
    strum::EnumIter,
)]
#[repr(u8)]
pub enum GrainWindowMode {
    /// Raised cosine window.
    #[default]
    Hann = 0,
    /// Linear rise to the center, linear fall.
    Triangle = 1,
    /// Blackman window with steeper spectral rolloff than Hann.
    Blackman = 2,
}

// -------------------------------------------------------------------------------------------------

/// Number of LUT segments per window. The LUT stores `WINDOW_SIZE + 1` points, so the last point
/// is the window's end value at phase 1.0.
const WINDOW_SIZE: usize = 2048;

/// Precomputed grain window lookup tables.
pub(crate) struct GrainWindow {
    luts: [[f32; WINDOW_SIZE + 1]; GrainWindowMode::COUNT],
}

impl GrainWindow {
    /// Precompute all window LUTs.
    pub fn new() -> Self {
        let mut luts = [[0.0; WINDOW_SIZE + 1]; GrainWindowMode::COUNT];

        #[allow(clippy::needless_range_loop)]
        for i in 0..=WINDOW_SIZE {
            let phase = i as f64 / WINDOW_SIZE as f64; // [0.0, 1.0]
            let two_pi_phase = 2.0 * std::f64::consts::PI * phase;

            luts[GrainWindowMode::Hann as usize][i] = (0.5 * (1.0 - two_pi_phase.cos())) as f32;

            luts[GrainWindowMode::Triangle as usize][i] = if phase < 0.5 {
                2.0 * phase as f32
            } else {
                2.0 * (1.0 - phase) as f32
            };

            // a0=0.42, a1=0.5, a2=0.08
            luts[GrainWindowMode::Blackman as usize][i] =
                (0.42 - 0.5 * two_pi_phase.cos() + 0.08 * (2.0 * two_pi_phase).cos()).max(0.0)
                    as f32;
        }

        // pin ends to exact zeros: Blackman's formula is only ~1e-17 at its edges
        for lut in luts.iter_mut() {
            lut[0] = 0.0;
            lut[WINDOW_SIZE] = 0.0;
        }

        Self { luts }
    }

    /// Evaluate a window at normalized phase [0.0, 1.0] with linear interpolation between
    /// the LUT points. Phases out of range are clamped.
    #[inline]
    pub fn sample(&self, mode: GrainWindowMode, phase: f64) -> f32 {
        let index_float = phase.clamp(0.0, 1.0) * WINDOW_SIZE as f64;
        let index = index_float as usize;
        let lut = &self.luts[mode as usize];
        if index < WINDOW_SIZE {
            let fraction = (index_float - index as f64) as f32;
            lut[index] * (1.0 - fraction) + lut[index + 1] * fraction
        } else {
            lut[WINDOW_SIZE]
        }
    }
}

/// Static, shared lookup table for all window modes.
pub(crate) static GRAIN_WINDOW_LUT: LazyLock<GrainWindow> = LazyLock::new(GrainWindow::new);

/// Make sure the window LUT is built, so the audio thread never has to.
pub(crate) fn initialize() {
    LazyLock::force(&GRAIN_WINDOW_LUT);
}

// -------------------------------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use strum::IntoEnumIterator;

    use super::*;

    #[test]
    fn window_shapes() {
        let window = &*GRAIN_WINDOW_LUT;
        for mode in GrainWindowMode::iter() {
            assert_eq!(window.sample(mode, 0.0), 0.0, "{mode} start");
            assert_eq!(window.sample(mode, 1.0), 0.0, "{mode} end");
            assert!((window.sample(mode, 0.5) - 1.0).abs() < 1e-3, "{mode} peak");
            let mut previous = 0.0;
            for step in 1..=50 {
                let value = window.sample(mode, step as f64 / 100.0);
                assert!(value > 0.0 && value <= 1.0, "{mode} in range");
                assert!(value >= previous, "{mode} rises towards the center");
                previous = value;
            }
            // symmetric
            for phase in [0.1, 0.25, 0.4] {
                let a = window.sample(mode, phase);
                let b = window.sample(mode, 1.0 - phase);
                assert!((a - b).abs() < 1e-3, "{mode} symmetry");
            }
        }
    }

    #[test]
    fn out_of_range_phases_clamp() {
        let window = &*GRAIN_WINDOW_LUT;
        assert_eq!(window.sample(GrainWindowMode::Hann, -1.0), 0.0);
        assert_eq!(window.sample(GrainWindowMode::Hann, 2.0), 0.0);
    }
}
