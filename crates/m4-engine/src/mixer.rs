//! Three-oscillator mixing engine.

use m4_midi::{NOTE_COUNT, NO_NOTE};

use crate::frequency::FrequencyTable;
use crate::oscillator::{Oscillator, Waveform};
use crate::transport::FillBuffer;

/// Fixed number of oscillators per note.
pub const OSCILLATOR_COUNT: usize = 3;

/// Detune applied to oscillators 2 and 3 at power-on.
pub const DEFAULT_SPREAD_CENTS: i8 = 8;

/// Addresses one of the mixer's fixed oscillator slots.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum OscillatorSlot {
    One,
    Two,
    Three,
}

impl OscillatorSlot {
    pub const ALL: [OscillatorSlot; OSCILLATOR_COUNT] =
        [OscillatorSlot::One, OscillatorSlot::Two, OscillatorSlot::Three];

    pub fn index(self) -> usize {
        match self {
            OscillatorSlot::One => 0,
            OscillatorSlot::Two => 1,
            OscillatorSlot::Three => 2,
        }
    }

    /// Slot for a 1-based oscillator number.
    pub fn from_number(number: u8) -> Option<Self> {
        match number {
            1 => Some(OscillatorSlot::One),
            2 => Some(OscillatorSlot::Two),
            3 => Some(OscillatorSlot::Three),
            _ => None,
        }
    }
}

/// Turns the selected note into sample buffers.
pub struct AudioMixer {
    table: FrequencyTable,
    oscillators: [Oscillator; OSCILLATOR_COUNT],
    /// Sounding note, or `NO_NOTE`.
    note: u8,
    /// Absolute samples produced since construction. Never reset.
    sample_count: u64,
    sample_rate: u32,
}

impl AudioMixer {
    /// Create a mixer with the power-on oscillator bank: three full-level
    /// squares, the second and third detuned by ±8 cents.
    pub fn new(sample_rate: u32) -> Self {
        let oscillators = [
            Oscillator::new(Waveform::Square, 10, 0, 0),
            Oscillator::new(Waveform::Square, 10, DEFAULT_SPREAD_CENTS, 0),
            Oscillator::new(Waveform::Square, 10, -DEFAULT_SPREAD_CENTS, 0),
        ];
        log::debug!("audio mixer at {} Hz, bank {:?}", sample_rate, oscillators);

        Self {
            table: FrequencyTable::new(),
            oscillators,
            note: NO_NOTE,
            sample_count: 0,
            sample_rate,
        }
    }

    /// Select the note to play. Values above 127 are pinned to 127;
    /// `NO_NOTE` silences the output.
    pub fn set_note(&mut self, note: u8) {
        self.note = note.min((NOTE_COUNT - 1) as u8);
    }

    pub fn note(&self) -> u8 {
        self.note
    }

    /// Oscillators whose waveform is not `None`.
    pub fn active_oscillator_count(&self) -> u8 {
        self.oscillators
            .iter()
            .filter(|osc| osc.waveform() != Waveform::None)
            .count() as u8
    }

    /// Render the next `buffer.len()` samples.
    ///
    /// Zeroes the buffer, mixes every oscillator at the current absolute
    /// position, then advances that position. With no note selected the buffer
    /// stays zeroed and the position does not move.
    pub fn fill_buffer(&mut self, buffer: &mut [u16]) {
        buffer.fill(0);

        if self.note == NO_NOTE {
            return;
        }

        let active = self.active_oscillator_count();
        for osc in &self.oscillators {
            osc.mix_into(
                &self.table,
                buffer,
                active,
                self.note,
                self.sample_count,
                self.sample_rate,
            );
        }

        self.sample_count += buffer.len() as u64;
    }

    pub fn sample_count(&self) -> u64 {
        self.sample_count
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    pub fn frequency_table(&self) -> &FrequencyTable {
        &self.table
    }

    pub fn oscillator(&self, slot: OscillatorSlot) -> &Oscillator {
        &self.oscillators[slot.index()]
    }

    pub fn oscillator_mut(&mut self, slot: OscillatorSlot) -> &mut Oscillator {
        &mut self.oscillators[slot.index()]
    }

    pub fn oscillators(&self) -> &[Oscillator; OSCILLATOR_COUNT] {
        &self.oscillators
    }

    /// Replace the whole bank at once.
    pub fn set_oscillators(&mut self, oscillators: [Oscillator; OSCILLATOR_COUNT]) {
        self.oscillators = oscillators;
    }
}

impl FillBuffer for AudioMixer {
    fn fill_buffer(&mut self, buffer: &mut [u16]) {
        AudioMixer::fill_buffer(self, buffer);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE_RATE: u32 = 44100;

    fn single_square() -> AudioMixer {
        let mut mixer = AudioMixer::new(SAMPLE_RATE);
        mixer.oscillator_mut(OscillatorSlot::Two).set_waveform(Waveform::None);
        mixer.oscillator_mut(OscillatorSlot::Three).set_waveform(Waveform::None);
        mixer
    }

    #[test]
    fn power_on_bank() {
        let mixer = AudioMixer::new(SAMPLE_RATE);
        let cents: Vec<i8> = mixer.oscillators().iter().map(|o| o.cent()).collect();
        assert_eq!(cents, vec![0, 8, -8]);
        assert!(mixer
            .oscillators()
            .iter()
            .all(|o| o.waveform() == Waveform::Square && o.level() == 10));
        assert_eq!(mixer.note(), NO_NOTE);
        assert_eq!(mixer.sample_count(), 0);
    }

    #[test]
    fn set_note_pins_to_127() {
        let mut mixer = AudioMixer::new(SAMPLE_RATE);
        mixer.set_note(60);
        assert_eq!(mixer.note(), 60);
        mixer.set_note(128);
        assert_eq!(mixer.note(), 127);
        mixer.set_note(255);
        assert_eq!(mixer.note(), 127);
    }

    #[test]
    fn active_count_ignores_disabled() {
        let mut mixer = AudioMixer::new(SAMPLE_RATE);
        assert_eq!(mixer.active_oscillator_count(), 3);
        mixer.oscillator_mut(OscillatorSlot::Two).set_waveform(Waveform::None);
        assert_eq!(mixer.active_oscillator_count(), 2);
        mixer.oscillator_mut(OscillatorSlot::One).set_waveform(Waveform::None);
        mixer.oscillator_mut(OscillatorSlot::Three).set_waveform(Waveform::None);
        assert_eq!(mixer.active_oscillator_count(), 0);
    }

    #[test]
    fn no_note_fills_zeros_and_holds_position() {
        let mut mixer = AudioMixer::new(SAMPLE_RATE);
        let mut buffer = [777u16; 256];
        mixer.fill_buffer(&mut buffer);
        assert!(buffer.iter().all(|&s| s == 0));
        assert_eq!(mixer.sample_count(), 0);
    }

    #[test]
    fn fill_advances_position() {
        let mut mixer = AudioMixer::new(SAMPLE_RATE);
        mixer.set_note(60);
        let mut buffer = [0u16; 256];
        mixer.fill_buffer(&mut buffer);
        mixer.fill_buffer(&mut buffer);
        assert_eq!(mixer.sample_count(), 512);
    }

    #[test]
    fn fill_overwrites_stale_contents() {
        let mut mixer = single_square();
        mixer.set_note(57);
        let mut buffer = [0xFFFFu16; 40];
        mixer.fill_buffer(&mut buffer);
        // First 40 samples of a 100-sample cycle are the low half.
        assert!(buffer.iter().all(|&s| s == 0));
    }

    #[test]
    fn split_fill_matches_single_fill() {
        let mut whole = AudioMixer::new(SAMPLE_RATE);
        whole.set_note(64);
        let mut expected = vec![0u16; 1024];
        whole.fill_buffer(&mut expected);

        let mut split = AudioMixer::new(SAMPLE_RATE);
        split.set_note(64);
        let mut actual = vec![0u16; 1024];
        let (a, b) = actual.split_at_mut(300);
        split.fill_buffer(a);
        split.fill_buffer(b);

        assert_eq!(expected, actual);
    }

    #[test]
    fn all_disabled_is_silent() {
        let mut mixer = AudioMixer::new(SAMPLE_RATE);
        for slot in OscillatorSlot::ALL {
            mixer.oscillator_mut(slot).set_waveform(Waveform::None);
        }
        mixer.set_note(60);
        let mut buffer = [5u16; 128];
        mixer.fill_buffer(&mut buffer);
        assert!(buffer.iter().all(|&s| s == 0));
    }

    #[test]
    fn normalized_bank_never_clips() {
        let mixer = AudioMixer::new(SAMPLE_RATE);
        for enabled in 1..=OSCILLATOR_COUNT {
            // Sum each oscillator separately in u32 so saturation can't hide clipping.
            let mut total = vec![0u32; 4410];
            for osc in &mixer.oscillators()[..enabled] {
                let mut part = vec![0u16; 4410];
                osc.mix_into(mixer.frequency_table(), &mut part, enabled as u8, 45, 0, SAMPLE_RATE);
                for (t, p) in total.iter_mut().zip(&part) {
                    *t += *p as u32;
                }
            }
            let peak = *total.iter().max().unwrap();
            assert!(peak <= 65535, "{} oscillators clipped at {}", enabled, peak);
            assert!(peak > 60000, "{} oscillators peaked at only {}", enabled, peak);
        }
    }

    #[test]
    fn slot_numbers() {
        assert_eq!(OscillatorSlot::from_number(1), Some(OscillatorSlot::One));
        assert_eq!(OscillatorSlot::from_number(3), Some(OscillatorSlot::Three));
        assert_eq!(OscillatorSlot::from_number(0), None);
        assert_eq!(OscillatorSlot::from_number(4), None);
        assert_eq!(OscillatorSlot::Two.index(), 1);
    }
}
