use std::sync::atomic::{AtomicU8, Ordering};

use atomic_float::AtomicF32;
use four_cc::FourCC;
use strum::{EnumCount, IntoEnumIterator, VariantNames};

use super::{EnumParameter, FloatParameter, Parameter, ParameterScaling};
use crate::{model::TemporalDistribution, Error};

// -------------------------------------------------------------------------------------------------

/// Identifies a single value in the [`ParameterStore`].
#[derive(
    Clone, Copy, Debug, PartialEq, Eq, Hash, strum::Display, strum::EnumCount, strum::EnumIter,
)]
#[repr(u8)]
pub enum ParameterId {
    Pitch,
    Dispersion,
    Pan,
    Spread,
    Duration,
    Variation,
    Density,
    TemporalDistribution,
}

impl ParameterId {
    /// Number of float valued parameters. Those come first in the enum.
    const FLOAT_COUNT: usize = Self::COUNT - 1;

    /// Static descriptor of the parameter.
    pub fn description(self) -> &'static dyn Parameter {
        match self.float_description() {
            Some(description) => description,
            None => &ParameterStore::TEMPORAL_DISTRIBUTION,
        }
    }

    /// The parameter's unique four character id.
    pub fn fourcc(self) -> FourCC {
        self.description().id()
    }

    /// Look up a parameter id by its four character id.
    pub fn from_fourcc(id: FourCC) -> Option<Self> {
        Self::iter().find(|p| p.fourcc() == id)
    }

    fn float_description(self) -> Option<&'static FloatParameter> {
        match self {
            Self::Pitch => Some(&ParameterStore::PITCH),
            Self::Dispersion => Some(&ParameterStore::DISPERSION),
            Self::Pan => Some(&ParameterStore::PAN),
            Self::Spread => Some(&ParameterStore::SPREAD),
            Self::Duration => Some(&ParameterStore::DURATION),
            Self::Variation => Some(&ParameterStore::VARIATION),
            Self::Density => Some(&ParameterStore::DENSITY),
            Self::TemporalDistribution => None,
        }
    }
}

// -------------------------------------------------------------------------------------------------

/// A plain, consistent-per-value copy of all stochastic parameters, as read by the audio context.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StochasticParameters {
    /// Central pitch as MIDI note number.
    pub pitch: f32,
    /// Standard deviation of the pitch distribution in semitones.
    pub dispersion: f32,
    /// Central stereo position (-1.0 = left, 1.0 = right).
    pub pan: f32,
    /// Standard deviation of the pan distribution.
    pub spread: f32,
    /// Mean grain duration in milliseconds.
    pub duration: f32,
    /// Relative standard deviation of the grain duration.
    pub variation: f32,
    /// Grains per second.
    pub density: f32,
    /// Onset spacing model.
    pub temporal_distribution: TemporalDistribution,
}

impl Default for StochasticParameters {
    fn default() -> Self {
        Self {
            pitch: ParameterStore::PITCH.default_value(),
            dispersion: ParameterStore::DISPERSION.default_value(),
            pan: ParameterStore::PAN.default_value(),
            spread: ParameterStore::SPREAD.default_value(),
            duration: ParameterStore::DURATION.default_value(),
            variation: ParameterStore::VARIATION.default_value(),
            density: ParameterStore::DENSITY.default_value(),
            temporal_distribution: TemporalDistribution::default(),
        }
    }
}

// -------------------------------------------------------------------------------------------------

/// Lock-free storage for all user-facing synthesis parameters.
///
/// Every parameter is an independent atomic value: setters are called from the control context,
/// getters from the real-time audio context. Getters never block or allocate and always return
/// a complete, previously set (or default) value. There's no ordering between two parameters
/// which got set "at the same time".
///
/// Out-of-range values are clamped into the parameter's range. Non-finite values are ignored.
#[derive(Debug)]
pub struct ParameterStore {
    values: [AtomicF32; ParameterId::FLOAT_COUNT],
    temporal_distribution: AtomicU8,
}

impl ParameterStore {
    pub const PITCH: FloatParameter =
        FloatParameter::new(FourCC(*b"GPIT"), "Pitch", 0.0..=127.0, 60.0).with_unit("note");

    pub const DISPERSION: FloatParameter =
        FloatParameter::new(FourCC(*b"GDSP"), "Pitch Dispersion", 0.0..=48.0, 12.0)
            .with_unit("st");

    pub const PAN: FloatParameter = FloatParameter::new(FourCC(*b"GPAN"), "Pan", -1.0..=1.0, 0.0);

    pub const SPREAD: FloatParameter =
        FloatParameter::new(FourCC(*b"GSPR"), "Pan Spread", 0.0..=1.0, 0.0);

    pub const DURATION: FloatParameter =
        FloatParameter::new(FourCC(*b"GDUR"), "Duration", 1.0..=2000.0, 100.0)
            .with_unit("ms")
            .with_scaling(ParameterScaling::Exponential(2.0));

    pub const VARIATION: FloatParameter =
        FloatParameter::new(FourCC(*b"GVAR"), "Duration Variation", 0.0..=1.0, 0.0);

    pub const DENSITY: FloatParameter =
        FloatParameter::new(FourCC(*b"GDNS"), "Density", 0.0..=1000.0, 100.0)
            .with_unit("Hz")
            .with_scaling(ParameterScaling::Exponential(3.0));

    pub const TEMPORAL_DISTRIBUTION: EnumParameter = EnumParameter::new(
        FourCC(*b"GTMP"),
        "Temporal Distribution",
        TemporalDistribution::VARIANTS,
        TemporalDistribution::Uniform as usize,
    );

    /// Create a new store with all parameters set to their defaults.
    pub fn new() -> Self {
        // in ParameterId order
        let values = [
            Self::PITCH,
            Self::DISPERSION,
            Self::PAN,
            Self::SPREAD,
            Self::DURATION,
            Self::VARIATION,
            Self::DENSITY,
        ]
        .map(|description| AtomicF32::new(description.default_value()));
        let temporal_distribution = AtomicU8::new(TemporalDistribution::default() as u8);
        Self {
            values,
            temporal_distribution,
        }
    }

    /// Descriptors of all parameters, in [`ParameterId`] order.
    pub fn parameters() -> Vec<&'static dyn Parameter> {
        ParameterId::iter().map(ParameterId::description).collect()
    }

    /// Get a parameter's current plain value. For the temporal distribution, this is the
    /// distribution's index. Real-time safe.
    #[inline]
    pub fn get(&self, id: ParameterId) -> f32 {
        match id {
            ParameterId::TemporalDistribution => self.temporal_distribution() as u8 as f32,
            _ => self.values[id as usize].load(Ordering::Relaxed),
        }
    }

    /// Set a parameter's plain value, clamping it into the parameter's range.
    /// For the temporal distribution, the value is rounded to the nearest distribution index.
    pub fn set(&self, id: ParameterId, value: f32) {
        if !value.is_finite() {
            log::warn!("Ignoring non-finite value '{value}' for parameter '{id}'");
            return;
        }
        match id.float_description() {
            Some(description) => {
                self.values[id as usize].store(description.clamp_value(value), Ordering::Relaxed);
            }
            None => {
                let index = Self::TEMPORAL_DISTRIBUTION.clamp_index(value.round().max(0.0) as usize);
                self.temporal_distribution
                    .store(index as u8, Ordering::Relaxed);
            }
        }
    }

    /// Get a parameter's current value as normalized value in range `0.0..=1.0`.
    pub fn get_normalized(&self, id: ParameterId) -> f32 {
        match id.float_description() {
            Some(description) => description.normalize_value(self.get(id)),
            None => Self::TEMPORAL_DISTRIBUTION.normalize_index(self.temporal_distribution() as usize),
        }
    }

    /// Set a parameter from a normalized value in range `0.0..=1.0`, e.g. from host automation.
    pub fn set_normalized(&self, id: ParameterId, normalized: f32) {
        if !normalized.is_finite() {
            log::warn!("Ignoring non-finite normalized value for parameter '{id}'");
            return;
        }
        match id.float_description() {
            Some(description) => self.set(id, description.denormalize_value(normalized)),
            None => {
                let index = Self::TEMPORAL_DISTRIBUTION.denormalize_index(normalized);
                self.set(id, index as f32);
            }
        }
    }

    /// Format a parameter's current value for display.
    pub fn value_to_string(&self, id: ParameterId, include_unit: bool) -> String {
        id.description()
            .normalized_value_to_string(self.get_normalized(id), include_unit)
    }

    /// Parse and apply a parameter value from a string.
    pub fn set_from_string(&self, id: ParameterId, string: &str) -> Result<(), Error> {
        let normalized = id
            .description()
            .string_to_normalized_value(string)
            .ok_or_else(|| {
                Error::ParameterError(format!("Invalid value '{string}' for parameter '{id}'"))
            })?;
        self.set_normalized(id, normalized);
        Ok(())
    }

    /// Set central pitch (MIDI note number) and its dispersion in semitones.
    pub fn set_pitch_and_dispersion(&self, pitch: f32, dispersion: f32) {
        self.set(ParameterId::Pitch, pitch);
        self.set(ParameterId::Dispersion, dispersion);
    }

    /// Set mean grain duration in milliseconds and its relative variation.
    pub fn set_duration_and_variation(&self, duration_ms: f32, variation: f32) {
        self.set(ParameterId::Duration, duration_ms);
        self.set(ParameterId::Variation, variation);
    }

    /// Set central pan and its spread.
    pub fn set_pan_and_spread(&self, pan: f32, spread: f32) {
        self.set(ParameterId::Pan, pan);
        self.set(ParameterId::Spread, spread);
    }

    /// Set grain density in grains per second.
    pub fn set_density(&self, grains_per_second: f32) {
        self.set(ParameterId::Density, grains_per_second);
    }

    /// Set the temporal distribution of grain onsets.
    pub fn set_temporal_distribution(&self, distribution: TemporalDistribution) {
        self.temporal_distribution
            .store(distribution as u8, Ordering::Relaxed);
    }

    /// Current grain density in grains per second. Real-time safe.
    #[inline]
    pub fn density(&self) -> f32 {
        self.get(ParameterId::Density)
    }

    /// Current temporal distribution. Real-time safe.
    #[inline]
    pub fn temporal_distribution(&self) -> TemporalDistribution {
        TemporalDistribution::from_repr(self.temporal_distribution.load(Ordering::Relaxed))
            .unwrap_or_default()
    }

    /// Read all parameters at once. Each value is read atomically, but the set as a whole is
    /// not a transaction. Real-time safe.
    pub fn snapshot(&self) -> StochasticParameters {
        StochasticParameters {
            pitch: self.get(ParameterId::Pitch),
            dispersion: self.get(ParameterId::Dispersion),
            pan: self.get(ParameterId::Pan),
            spread: self.get(ParameterId::Spread),
            duration: self.get(ParameterId::Duration),
            variation: self.get(ParameterId::Variation),
            density: self.get(ParameterId::Density),
            temporal_distribution: self.temporal_distribution(),
        }
    }
}

impl Default for ParameterStore {
    fn default() -> Self {
        Self::new()
    }
}

// -------------------------------------------------------------------------------------------------
