//! Stochastic grain parameter and onset timing generation.

use std::sync::Arc;

use rand::{rngs::SmallRng, Rng, SeedableRng};
use rand_distr::{Distribution, Exp1, StandardNormal};

use crate::{grain::Grain, parameter::ParameterStore};

// -------------------------------------------------------------------------------------------------

/// Statistical model for the spacing of successive grain onsets.
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
    strum::FromRepr,
)]
#[repr(u8)]
pub enum TemporalDistribution {
    /// Evenly spaced onsets at exactly `density` grains per second.
    #[default]
    Uniform,
    /// Exponentially distributed onset intervals with a mean rate of `density` grains per
    /// second: a Poisson process.
    Poisson,
}

// -------------------------------------------------------------------------------------------------

/// Turns the user-facing distributions in the [`ParameterStore`] into concrete per-grain values
/// and onset intervals.
///
/// All random draws come from a single, seedable [`SmallRng`]. The model is owned and used by
/// the audio context only: none of its functions block or allocate.
#[derive(Debug)]
pub struct StochasticModel {
    parameters: Arc<ParameterStore>,
    rng: SmallRng,
    /// Fractional sample remainder of uniform onset intervals.
    uniform_remainder: f64,
    /// Grain pool capacity: upper bound for the amplitude normalization overlap.
    polyphony: usize,
}

impl StochasticModel {
    /// Upper bound for varied grain durations, relative to the max mean duration.
    const MAX_DURATION_SCALE: f32 = 4.0;

    /// Create a new model with a deterministic seed.
    pub fn new(parameters: Arc<ParameterStore>, seed: u64) -> Self {
        Self::with_rng(parameters, SmallRng::seed_from_u64(seed))
    }

    /// Create a new model which is seeded from OS entropy.
    pub fn from_entropy(parameters: Arc<ParameterStore>) -> Self {
        Self::with_rng(parameters, SmallRng::from_os_rng())
    }

    fn with_rng(parameters: Arc<ParameterStore>, rng: SmallRng) -> Self {
        Self {
            parameters,
            rng,
            uniform_remainder: 0.0,
            polyphony: 1,
        }
    }

    /// Access to the parameter store the model reads from.
    pub fn parameters(&self) -> &Arc<ParameterStore> {
        &self.parameters
    }

    /// Restart the random sequence with the given seed.
    pub fn reseed(&mut self, seed: u64) {
        self.rng = SmallRng::seed_from_u64(seed);
        self.uniform_remainder = 0.0;
    }

    /// Forget the carried uniform interval remainder, so the next interval starts a new
    /// sequence of onsets. The random sequence continues.
    pub fn restart(&mut self) {
        self.uniform_remainder = 0.0;
    }

    /// Set the max number of concurrently sounding grains, which limits the amplitude
    /// normalization.
    pub fn set_polyphony(&mut self, polyphony: usize) {
        self.polyphony = polyphony.max(1);
    }

    pub fn polyphony(&self) -> usize {
        self.polyphony
    }

    /// Number of samples from the current onset to the next one, or `None` when the density is
    /// zero and no onset should be scheduled at all. Intervals are at least one sample long.
    pub fn samples_until_next_event(&mut self, sample_rate: u32, density: f32) -> Option<usize> {
        if density.is_nan() || density <= 0.0 || sample_rate == 0 {
            self.uniform_remainder = 0.0;
            return None;
        }
        let period = sample_rate as f64 / density as f64;
        let samples = match self.parameters.temporal_distribution() {
            TemporalDistribution::Uniform => {
                let exact = period + self.uniform_remainder;
                let whole = exact.floor();
                self.uniform_remainder = exact - whole;
                whole
            }
            TemporalDistribution::Poisson => {
                self.uniform_remainder = 0.0;
                let interval: f64 = Exp1.sample(&mut self.rng);
                (interval * period).floor()
            }
        };
        // float to int casts saturate
        Some((samples as usize).max(1))
    }

    /// Draw a new set of grain parameters from the current distributions and activate the
    /// given grain with them. The grain starts at a uniformly distributed position in a source
    /// buffer with `source_len` frames.
    pub fn generate_new_grain(
        &mut self,
        grain: &mut Grain,
        sample_rate: u32,
        source_len: usize,
        id: u64,
    ) {
        let parameters = self.parameters.snapshot();

        // always draw all values, so the random sequence does not depend on parameter values
        let pitch_deviation = self.standard_normal();
        let pan_deviation = self.standard_normal();
        let duration_deviation = self.standard_normal();
        let position: f64 = self.rng.random();

        let pitch_range = ParameterStore::PITCH.range();
        let pitch = (parameters.pitch + parameters.dispersion * pitch_deviation)
            .clamp(*pitch_range.start(), *pitch_range.end());

        let pan = (parameters.pan + parameters.spread * pan_deviation).clamp(-1.0, 1.0);

        let max_duration_ms = *ParameterStore::DURATION.range().end() * Self::MAX_DURATION_SCALE;
        let duration_ms = (parameters.duration
            * (1.0 + parameters.variation * duration_deviation))
            .clamp(0.0, max_duration_ms);
        let duration = ((duration_ms as f64 * sample_rate as f64 / 1000.0) as usize).max(1);

        let amplitude = grain_amplitude(parameters.density, parameters.duration, self.polyphony);

        let position = position * source_len as f64;

        grain.activate(id, pitch, pan, amplitude, duration, position);
    }

    #[inline]
    fn standard_normal(&mut self) -> f32 {
        StandardNormal.sample(&mut self.rng)
    }
}

// -------------------------------------------------------------------------------------------------

/// Per-grain amplitude which keeps the aggregate loudness of incoherently summed grains roughly
/// independent of the density: `1 / sqrt(overlap)`, where overlap is the expected number of
/// simultaneously sounding grains, limited to `1..=polyphony`.
pub fn grain_amplitude(density: f32, mean_duration_ms: f32, polyphony: usize) -> f32 {
    let overlap = density * mean_duration_ms / 1000.0;
    let overlap = if overlap.is_nan() {
        1.0
    } else {
        overlap.clamp(1.0, polyphony.max(1) as f32)
    };
    (1.0 / overlap.sqrt()).clamp(0.0, 1.0)
}

// -------------------------------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    fn model_with_seed(seed: u64) -> StochasticModel {
        let mut model = StochasticModel::new(Arc::new(ParameterStore::new()), seed);
        model.set_polyphony(128);
        model
    }

    #[test]
    fn zero_density_schedules_nothing() {
        let mut model = model_with_seed(1);
        assert_eq!(model.samples_until_next_event(44100, 0.0), None);
        assert_eq!(model.samples_until_next_event(44100, -5.0), None);
        assert_eq!(model.samples_until_next_event(44100, f32::NAN), None);
        model
            .parameters()
            .set_temporal_distribution(TemporalDistribution::Poisson);
        assert_eq!(model.samples_until_next_event(44100, 0.0), None);
    }

    #[test]
    fn uniform_intervals() {
        let mut model = model_with_seed(1);
        for _ in 0..100 {
            assert_eq!(model.samples_until_next_event(44100, 10.0), Some(4410));
        }
        // fractional periods: every interval within one sample of the nominal period,
        // while the long-term rate stays exact
        let period = 44100.0 / 13.0;
        let mut sum = 0;
        for _ in 0..13 {
            let interval = model.samples_until_next_event(44100, 13.0).unwrap();
            assert!((interval as f64 - period).abs() <= 1.0);
            sum += interval;
        }
        assert!((sum as i64 - 44100).abs() <= 1);
    }

    #[test]
    fn restart_drops_uniform_remainder() {
        let mut model = model_with_seed(1);
        // 44100 / 11 = 4009.09..
        let fresh = (0..5)
            .map(|_| model.samples_until_next_event(44100, 11.0))
            .collect::<Vec<_>>();
        assert_eq!(fresh[0], Some(4009));
        model.samples_until_next_event(44100, 11.0);
        model.restart();
        let restarted = (0..5)
            .map(|_| model.samples_until_next_event(44100, 11.0))
            .collect::<Vec<_>>();
        assert_eq!(fresh, restarted);
    }

    #[test]
    fn poisson_intervals() {
        let mut model = model_with_seed(0x5eed);
        model
            .parameters()
            .set_temporal_distribution(TemporalDistribution::Poisson);
        let count = 20000;
        let intervals = (0..count)
            .map(|_| model.samples_until_next_event(44100, 100.0).unwrap())
            .collect::<Vec<_>>();
        let mean = intervals.iter().sum::<usize>() as f64 / count as f64;
        assert!((mean - 441.0).abs() < 441.0 * 0.03, "mean interval {mean}");
        // intervals vary
        assert!(intervals.iter().any(|&i| i < 200));
        assert!(intervals.iter().any(|&i| i > 800));

        // intervals are always at least one sample long
        for _ in 0..1000 {
            assert!(model.samples_until_next_event(1000, 1000.0).unwrap() >= 1);
        }
    }

    #[test]
    fn seeded_models_are_repeatable() {
        let parameters = Arc::new(ParameterStore::new());
        parameters.set_duration_and_variation(100.0, 0.5);
        parameters.set_pan_and_spread(0.0, 0.5);
        parameters.set_temporal_distribution(TemporalDistribution::Poisson);
        let mut a = StochasticModel::new(Arc::clone(&parameters), 42);
        let mut b = StochasticModel::new(Arc::clone(&parameters), 42);
        for id in 0..100 {
            let (mut grain_a, mut grain_b) = (Grain::new(), Grain::new());
            a.generate_new_grain(&mut grain_a, 48000, 1000, id);
            b.generate_new_grain(&mut grain_b, 48000, 1000, id);
            assert_eq!(grain_a, grain_b);
            assert_eq!(
                a.samples_until_next_event(48000, 50.0),
                b.samples_until_next_event(48000, 50.0)
            );
        }
        // reseeding restarts the sequence
        let mut first = Grain::new();
        a.reseed(7);
        a.generate_new_grain(&mut first, 48000, 1000, 0);
        let mut second = Grain::new();
        a.reseed(7);
        a.generate_new_grain(&mut second, 48000, 1000, 0);
        assert_eq!(first, second);
    }

    #[test]
    fn generated_grains_stay_in_range() {
        let mut model = model_with_seed(3);
        let parameters = model.parameters().clone();
        parameters.set_pitch_and_dispersion(120.0, 48.0);
        parameters.set_pan_and_spread(0.9, 1.0);
        parameters.set_duration_and_variation(2000.0, 1.0);

        let mut grain = Grain::new();
        for id in 0..1000 {
            model.generate_new_grain(&mut grain, 44100, 500, id);
            assert!(grain.is_alive());
            assert_eq!(grain.id(), id);
            assert!((0.0..=127.0).contains(&grain.pitch()));
            assert!((-1.0..=1.0).contains(&grain.pan()));
            assert!((0.0..=1.0).contains(&grain.amplitude()));
            assert!(grain.duration() >= 1);
            assert!(grain.duration() <= 8 * 44100);
            assert!((0.0..500.0).contains(&grain.position()));
            assert_eq!(grain.age(), 0);
        }
    }

    #[test]
    fn zero_deviation_hits_central_values() {
        let mut model = model_with_seed(5);
        let parameters = model.parameters().clone();
        parameters.set_pitch_and_dispersion(67.0, 0.0);
        parameters.set_pan_and_spread(-0.25, 0.0);
        parameters.set_duration_and_variation(50.0, 0.0);

        let mut grain = Grain::new();
        model.generate_new_grain(&mut grain, 48000, 0, 1);
        assert_eq!(grain.pitch(), 67.0);
        assert_eq!(grain.pan(), -0.25);
        assert_eq!(grain.duration(), 2400);
        // empty sources start at 0
        assert_eq!(grain.position(), 0.0);
    }

    #[test]
    fn amplitude_normalization() {
        assert_eq!(grain_amplitude(1.0, 100.0, 128), 1.0);
        assert_eq!(grain_amplitude(0.0, 100.0, 128), 1.0);
        assert!((grain_amplitude(100.0, 100.0, 128) - 1.0 / 10f32.sqrt()).abs() < 1e-6);
        // overlap limited by polyphony
        assert!((grain_amplitude(1000.0, 2000.0, 128) - 1.0 / 128f32.sqrt()).abs() < 1e-6);
        assert_eq!(grain_amplitude(1000.0, 2000.0, 0), 1.0);
    }
}
