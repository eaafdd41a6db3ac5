use std::fmt::Debug;

use four_cc::FourCC;

use super::{Parameter, ParameterType};

// -------------------------------------------------------------------------------------------------

/// An enum parameter descriptor.
///
/// Values usually are the `strum::VariantNames` of some enum, so values can be converted from
/// and to the enum by their index or name.
#[derive(Debug, Clone, PartialEq)]
pub struct EnumParameter {
    id: FourCC,
    name: &'static str,
    values: &'static [&'static str],
    default_index: usize,
}

impl EnumParameter {
    pub const fn new(
        id: FourCC,
        name: &'static str,
        values: &'static [&'static str],
        default_index: usize,
    ) -> Self {
        assert!(!values.is_empty(), "Need at least one enum value");
        assert!(default_index < values.len(), "Invalid default index");
        Self {
            id,
            name,
            values,
            default_index,
        }
    }

    pub fn values(&self) -> &'static [&'static str] {
        self.values
    }

    pub fn default_index(&self) -> usize {
        self.default_index
    }

    /// Clamp the given index into the valid value range.
    pub fn clamp_index(&self, index: usize) -> usize {
        index.min(self.values.len() - 1)
    }

    pub fn normalize_index(&self, index: usize) -> f32 {
        if self.values.len() <= 1 {
            return 0.0;
        }
        self.clamp_index(index) as f32 / (self.values.len() - 1) as f32
    }

    pub fn denormalize_index(&self, normalized: f32) -> usize {
        let normalized = normalized.clamp(0.0, 1.0);
        (normalized * (self.values.len() - 1) as f32).round() as usize
    }

    /// Find a value's index by name, ignoring case.
    pub fn index_of(&self, value: &str) -> Option<usize> {
        let value = value.trim();
        self.values.iter().position(|v| v.eq_ignore_ascii_case(value))
    }
}

impl Parameter for EnumParameter {
    fn id(&self) -> FourCC {
        self.id
    }

    fn name(&self) -> &'static str {
        self.name
    }

    fn parameter_type(&self) -> ParameterType {
        ParameterType::Enum {
            values: self.values,
            default_index: self.default_index,
        }
    }

    fn default_normalized_value(&self) -> f32 {
        self.normalize_index(self.default_index)
    }

    fn normalized_value_to_string(&self, normalized: f32, _include_unit: bool) -> String {
        self.values[self.denormalize_index(normalized)].to_string()
    }

    fn string_to_normalized_value(&self, string: &str) -> Option<f32> {
        self.index_of(string).map(|index| self.normalize_index(index))
    }
}

// -------------------------------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn index_conversion() {
        let parameter = EnumParameter::new(FourCC(*b"TENM"), "Mode", &["A", "B", "C"], 1);
        assert_eq!(parameter.default_normalized_value(), 0.5);
        assert_eq!(parameter.denormalize_index(1.0), 2);
        assert_eq!(parameter.denormalize_index(0.2), 0);
        assert_eq!(parameter.clamp_index(7), 2);
        assert_eq!(parameter.string_to_normalized_value("c"), Some(1.0));
        assert_eq!(parameter.string_to_normalized_value("D"), None);
        assert_eq!(parameter.normalized_value_to_string(0.5, true), "B");
    }
}
