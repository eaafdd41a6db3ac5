//! Engine configuration.

use std::time::Duration;

use crate::{
    grain::{renderer::PanLaw, window::GrainWindowMode},
    source::SourceInterpolation,
    Error,
};

// -------------------------------------------------------------------------------------------------

/// Static configuration of an [`AudioEngine`](crate::AudioEngine).
///
/// Unlike the stochastic parameters, the config can not be changed while the engine is running:
/// it's applied when creating and preparing the engine.
#[derive(Debug, Clone, PartialEq)]
pub struct EngineConfig {
    /// Random seed. `None` seeds the random number generator from OS entropy.
    pub seed: Option<u64>,
    /// Explicit grain pool capacity. When `None`, the capacity gets estimated from the expected
    /// max density and duration.
    pub max_polyphony: Option<usize>,
    /// Expected max grain density in Hz, used to estimate the polyphony.
    pub expected_max_density: f32,
    /// Expected max mean grain duration, used to estimate the polyphony.
    pub expected_max_duration: Duration,
    /// Multiplier applied to the estimated polyphony.
    pub polyphony_headroom: f32,
    /// Grain envelope window.
    pub window: GrainWindowMode,
    /// Grain pan law.
    pub pan_law: PanLaw,
    /// Source read interpolation.
    pub interpolation: SourceInterpolation,
    /// When enabled, grains are only triggered while at least one note is held.
    pub note_gating: bool,
    /// Size of the engine's diagnostics queue.
    pub diagnostics_capacity: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            seed: None,
            max_polyphony: None,
            expected_max_density: 200.0,
            expected_max_duration: Duration::from_millis(500),
            polyphony_headroom: 1.25,
            window: GrainWindowMode::default(),
            pan_law: PanLaw::default(),
            interpolation: SourceInterpolation::default(),
            note_gating: false,
            diagnostics_capacity: 256,
        }
    }
}

impl EngineConfig {
    /// Upper limit for grain pool capacities.
    pub const MAX_POLYPHONY: usize = 4096;

    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    pub fn with_max_polyphony(mut self, polyphony: usize) -> Self {
        self.max_polyphony = Some(polyphony);
        self
    }

    pub fn with_expected_max_density(mut self, density: f32) -> Self {
        self.expected_max_density = density;
        self
    }

    pub fn with_expected_max_duration(mut self, duration: Duration) -> Self {
        self.expected_max_duration = duration;
        self
    }

    pub fn with_polyphony_headroom(mut self, headroom: f32) -> Self {
        self.polyphony_headroom = headroom;
        self
    }

    pub fn with_window(mut self, window: GrainWindowMode) -> Self {
        self.window = window;
        self
    }

    pub fn with_pan_law(mut self, pan_law: PanLaw) -> Self {
        self.pan_law = pan_law;
        self
    }

    pub fn with_interpolation(mut self, interpolation: SourceInterpolation) -> Self {
        self.interpolation = interpolation;
        self
    }

    pub fn with_note_gating(mut self, enabled: bool) -> Self {
        self.note_gating = enabled;
        self
    }

    pub fn with_diagnostics_capacity(mut self, capacity: usize) -> Self {
        self.diagnostics_capacity = capacity;
        self
    }

    /// Validate the config.
    pub fn validate(&self) -> Result<(), Error> {
        if let Some(polyphony) = self.max_polyphony {
            if polyphony == 0 || polyphony > Self::MAX_POLYPHONY {
                return Err(Error::ParameterError(format!(
                    "Max polyphony must be between 1 and {}",
                    Self::MAX_POLYPHONY
                )));
            }
        }
        if !self.expected_max_density.is_finite() || self.expected_max_density <= 0.0 {
            return Err(Error::ParameterError(
                "Expected max density must be > 0 Hz".to_string(),
            ));
        }
        if self.expected_max_duration.is_zero() {
            return Err(Error::ParameterError(
                "Expected max duration must be > 0".to_string(),
            ));
        }
        if !self.polyphony_headroom.is_finite() || self.polyphony_headroom < 1.0 {
            return Err(Error::ParameterError(
                "Polyphony headroom must be >= 1.0".to_string(),
            ));
        }
        if self.diagnostics_capacity == 0 {
            return Err(Error::ParameterError(
                "Diagnostics capacity must be > 0".to_string(),
            ));
        }
        Ok(())
    }

    /// Grain pool capacity: the explicit max polyphony, or
    /// `ceil(expected_max_density * expected_max_duration * headroom)`, in `1..=MAX_POLYPHONY`.
    pub fn polyphony(&self) -> usize {
        let polyphony = match self.max_polyphony {
            Some(polyphony) => polyphony,
            None => {
                let estimate = self.expected_max_density as f64
                    * self.expected_max_duration.as_secs_f64()
                    * self.polyphony_headroom as f64;
                if estimate.is_finite() {
                    estimate.ceil() as usize
                } else {
                    1
                }
            }
        };
        polyphony.clamp(1, Self::MAX_POLYPHONY)
    }
}

// -------------------------------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() -> Result<(), Error> {
        let config = EngineConfig::default();
        config.validate()?;
        // 200 Hz * 0.5 s * 1.25
        assert_eq!(config.polyphony(), 125);
        assert_eq!(config.window, GrainWindowMode::Hann);
        assert_eq!(config.pan_law, PanLaw::ConstantPower);
        assert_eq!(config.interpolation, SourceInterpolation::Cubic);
        Ok(())
    }

    #[test]
    fn polyphony() {
        assert_eq!(EngineConfig::new().with_max_polyphony(8).polyphony(), 8);
        let config = EngineConfig::new()
            .with_expected_max_density(10.0)
            .with_expected_max_duration(Duration::from_millis(150))
            .with_polyphony_headroom(1.0);
        assert_eq!(config.polyphony(), 2);
        let config = EngineConfig::new()
            .with_expected_max_density(1000.0)
            .with_expected_max_duration(Duration::from_secs(60));
        assert_eq!(config.polyphony(), EngineConfig::MAX_POLYPHONY);
    }

    #[test]
    fn validation() {
        assert!(EngineConfig::new().with_max_polyphony(0).validate().is_err());
        assert!(EngineConfig::new()
            .with_max_polyphony(EngineConfig::MAX_POLYPHONY + 1)
            .validate()
            .is_err());
        assert!(EngineConfig::new()
            .with_expected_max_density(f32::NAN)
            .validate()
            .is_err());
        assert!(EngineConfig::new()
            .with_expected_max_duration(Duration::ZERO)
            .validate()
            .is_err());
        assert!(EngineConfig::new()
            .with_polyphony_headroom(0.5)
            .validate()
            .is_err());
        assert!(EngineConfig::new()
            .with_diagnostics_capacity(0)
            .validate()
            .is_err());
        assert!(EngineConfig::new().with_seed(1).validate().is_ok());
    }
}
