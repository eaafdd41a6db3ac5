use std::f32::consts::FRAC_PI_4;

use super::{
    window::{GrainWindowMode, GRAIN_WINDOW_LUT},
    Grain,
};
use crate::{
    source::{SourceBuffer, SourceInterpolation},
    utils::buffer::MixBuffer,
};

// -------------------------------------------------------------------------------------------------

/// Stereo pan law for grains.
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
)]
#[repr(u8)]
pub enum PanLaw {
    /// Sin/cos law: keeps the perceived loudness constant across the stereo field.
    #[default]
    ConstantPower,
    /// Linear crossfade: -6 dB per channel at the center.
    Linear,
}

impl PanLaw {
    /// Left and right channel gains for the given pan position in range `-1.0..=1.0`.
    #[inline]
    pub fn gains(self, pan: f32) -> (f32, f32) {
        let pan = pan.clamp(-1.0, 1.0);
        match self {
            PanLaw::ConstantPower => {
                let angle = (pan + 1.0) * FRAC_PI_4;
                (angle.cos(), angle.sin())
            }
            PanLaw::Linear => ((1.0 - pan) * 0.5, (1.0 + pan) * 0.5),
        }
    }
}

// -------------------------------------------------------------------------------------------------

/// Renders live grains from a [`SourceBuffer`] into a [`MixBuffer`].
///
/// Per sample, a grain reads the source at its current fractional position, advances the
/// position by a pitch dependent step, applies its envelope window, amplitude and pan, and
/// accumulates the result into the output.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct GrainRenderer {
    window: GrainWindowMode,
    pan_law: PanLaw,
    interpolation: SourceInterpolation,
}

impl GrainRenderer {
    /// Minimum envelope amplitude below which source reads are skipped.
    const ENVELOPE_THRESHOLD: f32 = 0.000_001; // ~ -120dB

    pub fn new(
        window: GrainWindowMode,
        pan_law: PanLaw,
        interpolation: SourceInterpolation,
    ) -> Self {
        Self {
            window,
            pan_law,
            interpolation,
        }
    }

    pub fn window(&self) -> GrainWindowMode {
        self.window
    }

    pub fn pan_law(&self) -> PanLaw {
        self.pan_law
    }

    pub fn interpolation(&self) -> SourceInterpolation {
        self.interpolation
    }

    /// Envelope value of the given grain at its current age.
    #[inline]
    pub fn envelope(&self, grain: &Grain) -> f32 {
        GRAIN_WINDOW_LUT.sample(self.window, grain.progress()) * grain.amplitude()
    }

    /// Render the given live grain into the output, starting at the grain's onset offset.
    ///
    /// Returns false when the grain finished playing in this block. Finished grains are
    /// deactivated. Real-time safe.
    pub fn render<O: MixBuffer>(
        &self,
        grain: &mut Grain,
        source: &SourceBuffer,
        output_sample_rate: u32,
        output: &mut O,
    ) -> bool {
        debug_assert!(grain.is_alive(), "Should only render live grains");

        let frame_count = output.frame_count();
        let start_frame = grain.onset_offset.min(frame_count);
        grain.onset_offset = 0;

        let step = source.playback_step(grain.pitch, output_sample_rate);
        let (left_gain, right_gain) = self.pan_law.gains(grain.pan);
        let has_source = !source.is_empty();

        for frame in start_frame..frame_count {
            if grain.age >= grain.duration {
                break;
            }
            if has_source {
                let envelope = self.envelope(grain);
                if envelope > Self::ENVELOPE_THRESHOLD {
                    let sample = source.sample_at(grain.position, self.interpolation);
                    output.add_sample(frame, sample * envelope, left_gain, right_gain);
                }
                grain.position = source.wrap_position(grain.position + step);
            }
            grain.age += 1;
        }

        if grain.age >= grain.duration {
            grain.deactivate();
            false
        } else {
            true
        }
    }
}

// -------------------------------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{utils::buffer::InterleavedMixBuffer, Error};

    fn dc_source(len: usize) -> Result<SourceBuffer, Error> {
        SourceBuffer::new("dc", vec![1.0; len], 44100)
    }

    fn live_grain(pitch: f32, pan: f32, duration: usize) -> Grain {
        let mut grain = Grain::new();
        grain.activate(1, pitch, pan, 1.0, duration, 0.0);
        grain
    }

    #[test]
    fn pan_laws() {
        for law in [PanLaw::ConstantPower, PanLaw::Linear] {
            let (left, right) = law.gains(0.0);
            assert!((left - right).abs() < 1e-6, "{law}: equal gains at center");
            let (left, right) = law.gains(-1.0);
            assert!(right.abs() < 1e-6 && (left - 1.0).abs() < 1e-6, "{law}: hard left");
            let (left, right) = law.gains(1.0);
            assert!(left.abs() < 1e-6 && (right - 1.0).abs() < 1e-6, "{law}: hard right");
        }
        // constant power
        for pan in [-0.7, -0.2, 0.0, 0.4, 0.9] {
            let (left, right) = PanLaw::ConstantPower.gains(pan);
            assert!((left * left + right * right - 1.0).abs() < 1e-5);
        }
        assert_eq!(PanLaw::Linear.gains(0.0), (0.5, 0.5));
    }

    #[test]
    fn envelope_follows_grain_age() {
        for window in [
            GrainWindowMode::Hann,
            GrainWindowMode::Triangle,
            GrainWindowMode::Blackman,
        ] {
            let renderer =
                GrainRenderer::new(window, PanLaw::default(), SourceInterpolation::default());
            let mut grain = Grain::new();
            grain.activate(1, 60.0, 0.0, 0.5, 100, 0.0);
            assert_eq!(renderer.envelope(&grain), 0.0, "{window}: silent at birth");
            let mut previous = 0.0;
            for age in 1..100 {
                grain.age = age;
                let envelope = renderer.envelope(&grain);
                assert!(envelope > 0.0 && envelope <= 0.5 + 1e-6, "{window}: {envelope}");
                if age <= 50 {
                    assert!(envelope >= previous, "{window}: rising until the peak");
                }
                previous = envelope;
            }
            grain.age = 50;
            assert!((renderer.envelope(&grain) - 0.5).abs() < 1e-3, "{window}: peak");
            grain.age = 100;
            assert_eq!(renderer.envelope(&grain), 0.0, "{window}: silent at death");
        }
    }

    #[test]
    fn renders_windowed_grain() -> Result<(), Error> {
        let source = dc_source(1000)?;
        let renderer = GrainRenderer::new(
            GrainWindowMode::Hann,
            PanLaw::Linear,
            SourceInterpolation::Linear,
        );
        let mut grain = live_grain(60.0, 0.0, 64);
        let mut output = vec![0.0; 2 * 100];
        let alive = renderer.render(
            &mut grain,
            &source,
            44100,
            &mut InterleavedMixBuffer::new(&mut output, 2),
        );
        assert!(!alive);
        assert!(!grain.is_alive());
        assert_eq!(grain.age(), 64);

        let left = output.iter().step_by(2).copied().collect::<Vec<_>>();
        let right = output.iter().skip(1).step_by(2).copied().collect::<Vec<_>>();
        assert_eq!(left, right);
        // silent at birth, peak in the middle, silent after death
        assert_eq!(left[0], 0.0);
        assert!((left[32] - 0.5).abs() < 1e-3);
        assert!(left[1..64].iter().all(|&s| s > 0.0 && s <= 0.5 + 1e-6));
        assert!(left[64..].iter().all(|&s| s == 0.0));
        // the read position advanced by one frame per sample
        assert!((grain.position() - 64.0).abs() < 1e-9);
        Ok(())
    }

    #[test]
    fn respects_onset_offset_and_block_boundaries() -> Result<(), Error> {
        let source = dc_source(1000)?;
        let renderer = GrainRenderer::default();
        let mut grain = live_grain(60.0, 0.0, 100);
        grain.onset_offset = 30;

        let mut block = vec![0.0; 50];
        let alive = renderer.render(
            &mut grain,
            &source,
            44100,
            &mut InterleavedMixBuffer::new(&mut block, 1),
        );
        assert!(alive);
        assert_eq!(grain.age(), 20);
        assert!(block[..30].iter().all(|&s| s == 0.0));
        assert!(block[31..].iter().all(|&s| s > 0.0));

        // next block continues at frame 0
        let mut block = vec![0.0; 50];
        let alive = renderer.render(
            &mut grain,
            &source,
            44100,
            &mut InterleavedMixBuffer::new(&mut block, 1),
        );
        assert!(alive);
        assert_eq!(grain.age(), 70);
        assert!(block.iter().all(|&s| s > 0.0));
        Ok(())
    }

    #[test]
    fn read_position_stays_in_source_bounds() -> Result<(), Error> {
        let source = SourceBuffer::new("tiny", vec![0.5, -0.5, 0.25], 48000)?;
        let renderer = GrainRenderer::default();
        // four octaves up, faster than the source length per sample
        let mut grain = live_grain(108.0, 0.3, 500);
        let mut output = vec![0.0; 2 * 64];
        while grain.is_alive() {
            output.fill(0.0);
            renderer.render(
                &mut grain,
                &source,
                44100,
                &mut InterleavedMixBuffer::new(&mut output, 2),
            );
            assert!((0.0..3.0).contains(&grain.position()));
            assert!(output.iter().all(|s| s.is_finite() && s.abs() <= 1.0));
        }
        Ok(())
    }

    #[test]
    fn empty_source_ages_silently() {
        let source = SourceBuffer::empty();
        let renderer = GrainRenderer::default();
        let mut grain = live_grain(60.0, 0.0, 10);
        let mut output = vec![0.0; 16];
        let alive = renderer.render(
            &mut grain,
            &source,
            44100,
            &mut InterleavedMixBuffer::new(&mut output, 1),
        );
        assert!(!alive);
        assert_eq!(grain.age(), 10);
        assert!(output.iter().all(|&s| s == 0.0));
    }

    #[test]
    fn channel_layouts() -> Result<(), Error> {
        let source = dc_source(100)?;
        let renderer = GrainRenderer::new(
            GrainWindowMode::Triangle,
            PanLaw::Linear,
            SourceInterpolation::Cubic,
        );

        // mono gets the un-panned signal
        let mut grain = live_grain(60.0, 1.0, 20);
        let mut mono = vec![0.0; 20];
        renderer.render(
            &mut grain,
            &source,
            44100,
            &mut InterleavedMixBuffer::new(&mut mono, 1),
        );
        assert!((mono[10] - 1.0).abs() < 1e-3);

        // more than two channels: only the first two are written
        let mut grain = live_grain(60.0, 1.0, 20);
        let mut surround = vec![0.0; 4 * 20];
        renderer.render(
            &mut grain,
            &source,
            44100,
            &mut InterleavedMixBuffer::new(&mut surround, 4),
        );
        for frame in surround.chunks_exact(4) {
            assert_eq!(frame[0], 0.0);
            assert_eq!(frame[2], 0.0);
            assert_eq!(frame[3], 0.0);
        }
        assert!((surround[10 * 4 + 1] - 1.0).abs() < 1e-3);
        Ok(())
    }
}
