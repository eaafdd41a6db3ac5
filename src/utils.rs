pub mod buffer;
pub(crate) mod decoder;

// -------------------------------------------------------------------------------------------------

/// Pitch of the A above middle C as MIDI note number.
const A4_NOTE: f64 = 69.0;
/// Frequency of the A above middle C in Hz.
const A4_FREQUENCY: f64 = 440.0;

// -------------------------------------------------------------------------------------------------

/// Convert a pitch offset in semitones to a playback speed ratio.
#[inline]
pub fn semitones_to_ratio(semitones: f32) -> f64 {
    if semitones == 0.0 {
        return 1.0; // avoid rounding errors at the root pitch
    }
    (semitones as f64 / 12.0).exp2()
}

/// Convert a MIDI note number to a frequency in Hz (equal temperament, A4 = 440 Hz).
pub fn note_to_frequency(note: f32) -> f64 {
    A4_FREQUENCY * semitones_to_ratio(note - A4_NOTE as f32)
}

/// Convert a frequency in Hz to a (fractional) MIDI note number.
pub fn frequency_to_note(frequency: f64) -> f64 {
    A4_NOTE + 12.0 * (frequency / A4_FREQUENCY).log2()
}

// -------------------------------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pitch_conversion() {
        assert_eq!(semitones_to_ratio(0.0), 1.0);
        assert!((semitones_to_ratio(12.0) - 2.0).abs() < 1e-12);
        assert!((semitones_to_ratio(-24.0) - 0.25).abs() < 1e-12);
        assert!((note_to_frequency(69.0) - 440.0).abs() < 1e-9);
        assert!((note_to_frequency(60.0) - 261.625_565).abs() < 1e-5);
        assert!((frequency_to_note(note_to_frequency(37.5)) - 37.5).abs() < 1e-9);
    }
}
