//! Equal-tempered note-to-frequency lookup.
//!
//! Built once at startup so the audio path never calls `powf`.

use m4_midi::NOTE_COUNT;

/// Reference pitch in Hz.
pub const REFERENCE_HZ: f32 = 440.0;

/// Table index holding [`REFERENCE_HZ`].
pub const REFERENCE_NOTE: i32 = 57;

/// Frequencies for MIDI notes 0-127.
#[derive(Clone, Debug, PartialEq)]
pub struct FrequencyTable {
    hz: [f32; NOTE_COUNT],
}

impl FrequencyTable {
    /// Create and populate a table.
    pub fn new() -> Self {
        let mut table = Self {
            hz: [0.0; NOTE_COUNT],
        };
        table.initialize();
        table
    }

    /// (Re)compute every entry: `440 * 2^((i - 57) / 12)`.
    ///
    /// Idempotent; repeated calls produce bit-identical values.
    pub fn initialize(&mut self) {
        for (i, hz) in self.hz.iter_mut().enumerate() {
            let semitones = (i as i32 - REFERENCE_NOTE) as f32;
            *hz = REFERENCE_HZ * libm::powf(2.0, semitones / 12.0);
        }
    }

    /// Frequency of `note` in Hz, or 0.0 (silence) outside 0..=127.
    ///
    /// Takes a signed index so detuned lookups below the table also land on silence.
    pub fn frequency(&self, note: i32) -> f32 {
        usize::try_from(note)
            .ok()
            .and_then(|i| self.hz.get(i))
            .copied()
            .unwrap_or(0.0)
    }

    /// The whole table, lowest note first.
    pub fn as_slice(&self) -> &[f32] {
        &self.hz
    }
}

impl Default for FrequencyTable {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn reference_note_is_440() {
        let table = FrequencyTable::new();
        assert_relative_eq!(table.frequency(57), 440.0, max_relative = 1e-6);
    }

    #[test]
    fn matches_equal_temperament_formula() {
        let table = FrequencyTable::new();
        for i in 0..128 {
            let expected = 440.0f64 * 2f64.powf((i as f64 - 57.0) / 12.0);
            assert_relative_eq!(table.frequency(i) as f64, expected, max_relative = 1e-5);
        }
    }

    #[test]
    fn c_notes_around_reference() {
        let table = FrequencyTable::new();
        assert_relative_eq!(table.frequency(60), 523.2511, max_relative = 1e-5);
        assert_relative_eq!(table.frequency(48), 261.6256, max_relative = 1e-5);
    }

    #[test]
    fn octave_doubles() {
        let table = FrequencyTable::new();
        for i in 0..116 {
            assert_relative_eq!(
                table.frequency(i + 12),
                table.frequency(i) * 2.0,
                max_relative = 1e-5
            );
        }
    }

    #[test]
    fn out_of_range_is_silent() {
        let table = FrequencyTable::new();
        assert_eq!(table.frequency(128), 0.0);
        assert_eq!(table.frequency(255), 0.0);
        assert_eq!(table.frequency(-1), 0.0);
        assert_eq!(table.frequency(i32::MAX), 0.0);
    }

    #[test]
    fn reinitialize_is_bit_identical() {
        let mut table = FrequencyTable::new();
        let before: [u32; NOTE_COUNT] = core::array::from_fn(|i| table.hz[i].to_bits());
        table.initialize();
        table.initialize();
        let after: [u32; NOTE_COUNT] = core::array::from_fn(|i| table.hz[i].to_bits());
        assert_eq!(before, after);
    }

    #[test]
    fn strictly_increasing() {
        let table = FrequencyTable::new();
        assert!(table.as_slice().windows(2).all(|w| w[0] < w[1]));
    }
}
