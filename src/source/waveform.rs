use std::f64::consts::PI;

use rand::{rngs::SmallRng, Rng, SeedableRng};

use super::SourceBuffer;
use crate::utils::{frequency_to_note, note_to_frequency};

// -------------------------------------------------------------------------------------------------

const REFERENCE_PITCH: f32 = SourceBuffer::DEFAULT_ROOT_PITCH;

// -------------------------------------------------------------------------------------------------

/// Waveforms which can be used as grain source without loading any audio files.
///
/// Tonal waveforms are single cycle tables. Their root pitch is (very close to) the default root
/// pitch of 60, so a grain with pitch 60 plays a middle C. Noise is one second of white noise.
#[derive(
    Clone,
    Copy,
    Debug,
    PartialEq,
    Eq,
    strum::EnumString,
    strum::Display,
    strum::VariantNames,
    strum::EnumCount,
    strum::EnumIter,
    strum::FromRepr,
)]
#[repr(usize)]
pub enum BuiltInWaveform {
    Sine = 0,
    Triangle = 1,
    Sawtooth = 2,
    Square = 3,
    Noise = 4,
}

impl BuiltInWaveform {
    /// Length of single cycle tables.
    const TABLE_SIZE: usize = 2048;
    /// Sample rate of the noise table.
    const NOISE_SAMPLE_RATE: u32 = 48000;
    /// Fixed seed: noise sources are identical on every run.
    const NOISE_SEED: u64 = 0x6e6f697365;

    /// Numeric id of the waveform.
    pub fn id(self) -> usize {
        self as usize
    }

    /// Generate the waveform's samples. Returns the samples, their sample rate and root pitch.
    pub(crate) fn generate(self) -> (Vec<f32>, u32, f32) {
        match self {
            Self::Sine => Self::single_cycle(|phase| (2.0 * PI * phase).sin()),
            Self::Triangle => Self::single_cycle(|phase| {
                if phase < 0.25 {
                    4.0 * phase
                } else if phase < 0.75 {
                    2.0 - 4.0 * phase
                } else {
                    4.0 * phase - 4.0
                }
            }),
            Self::Sawtooth => Self::single_cycle(|phase| 1.0 - 2.0 * phase),
            Self::Square => Self::single_cycle(|phase| if phase < 0.5 { 1.0 } else { -1.0 }),
            Self::Noise => {
                let mut rng = SmallRng::seed_from_u64(Self::NOISE_SEED);
                let samples = (0..Self::NOISE_SAMPLE_RATE)
                    .map(|_| rng.random_range(-1.0f32..1.0))
                    .collect();
                (samples, Self::NOISE_SAMPLE_RATE, REFERENCE_PITCH)
            }
        }
    }

    /// One cycle at the reference pitch. The table's sample rate gets rounded, so the exact
    /// root pitch is derived from the rounded rate.
    fn single_cycle<F: Fn(f64) -> f64>(wave: F) -> (Vec<f32>, u32, f32) {
        let table_size = Self::TABLE_SIZE as f64;
        let sample_rate = (table_size * note_to_frequency(REFERENCE_PITCH)).round() as u32;
        let root_pitch = frequency_to_note(sample_rate as f64 / table_size) as f32;
        let samples = (0..Self::TABLE_SIZE)
            .map(|index| wave(index as f64 / table_size) as f32)
            .collect();
        (samples, sample_rate, root_pitch)
    }
}

// -------------------------------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use strum::IntoEnumIterator;

    use super::*;

    #[test]
    fn ids() {
        for waveform in BuiltInWaveform::iter() {
            assert_eq!(BuiltInWaveform::from_repr(waveform.id()), Some(waveform));
        }
        assert_eq!(BuiltInWaveform::from_repr(5), None);
        assert_eq!(BuiltInWaveform::Noise.id(), 4);
    }

    #[test]
    fn generated_tables() {
        for waveform in BuiltInWaveform::iter() {
            let (samples, sample_rate, root_pitch) = waveform.generate();
            assert!(!samples.is_empty());
            assert!(sample_rate > 0);
            assert!((root_pitch - 60.0).abs() < 0.01, "{waveform} root pitch");
            assert!(samples.iter().all(|s| (-1.0..=1.0).contains(s)));
        }
        let (noise, sample_rate, _) = BuiltInWaveform::Noise.generate();
        assert_eq!(noise.len(), sample_rate as usize);
        assert_eq!(noise, BuiltInWaveform::Noise.generate().0);

        let (sine, sample_rate, _) = BuiltInWaveform::Sine.generate();
        assert_eq!(sine.len(), 2048);
        // a single cycle at ~261.63 Hz
        let frequency = sample_rate as f64 / sine.len() as f64;
        assert!((frequency - 261.6256).abs() < 0.01);
    }
}
