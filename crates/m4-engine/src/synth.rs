//! Top-level scheduler: joins the MIDI tracker and the mixer.
//!
//! MIDI bytes update the tracker as they arrive. Once per buffer, before the
//! mixer fills it, the tracker's decision is copied into the mixer. That copy
//! is the only coupling between the two sides.

use m4_midi::{MidiSource, NoteTracker, NO_NOTE};

use crate::mixer::{AudioMixer, OscillatorSlot};
use crate::oscillator::Oscillator;
use crate::transport::FillBuffer;
use crate::SILENCE;

/// A complete monophonic synthesizer voice path.
pub struct Synth {
    mixer: AudioMixer,
    tracker: NoteTracker,
    /// Tracker message count when the note was last copied into the mixer.
    synced_messages: u32,
}

impl Synth {
    pub fn new(sample_rate: u32) -> Self {
        log::info!("initializing synth at {} Hz", sample_rate);
        Self {
            mixer: AudioMixer::new(sample_rate),
            tracker: NoteTracker::new(),
            synced_messages: 0,
        }
    }

    /// MIDI byte intake.
    pub fn receive_midi(&mut self, byte: u8) {
        self.tracker.receive(byte);
    }

    /// Drain every pending byte from a MIDI source.
    pub fn pump_midi(&mut self, source: &mut impl MidiSource) -> usize {
        self.tracker.pump(source)
    }

    /// Copy the tracker's note into the mixer if any note message arrived
    /// since the last copy. Returns whether the mixer was updated.
    pub fn sync_note(&mut self) -> bool {
        let messages = self.tracker.message_count();
        if messages == self.synced_messages {
            return false;
        }
        self.synced_messages = messages;
        self.mixer.set_note(self.tracker.current_note());
        true
    }

    /// Produce the next period: sync the note, then let the mixer fill.
    pub fn fill_buffer(&mut self, buffer: &mut [u16]) {
        self.sync_note();
        self.mixer.fill_buffer(buffer);
    }

    /// Produce the next period for a DAC or file.
    ///
    /// Same as [`fill_buffer`](Self::fill_buffer), except that a period in
    /// which nothing sounds rests at [`SILENCE`] instead of the mixer's floor,
    /// so the signed signal sits at zero between notes.
    pub fn fill_output(&mut self, buffer: &mut [u16]) {
        self.fill_buffer(buffer);
        if self.is_silent() {
            buffer.fill(SILENCE);
        }
    }

    /// No note selected, or every oscillator disabled.
    pub fn is_silent(&self) -> bool {
        self.mixer.note() == NO_NOTE || self.mixer.active_oscillator_count() == 0
    }

    /// Note currently selected in the mixer.
    pub fn note(&self) -> u8 {
        self.mixer.note()
    }

    pub fn mixer(&self) -> &AudioMixer {
        &self.mixer
    }

    pub fn mixer_mut(&mut self) -> &mut AudioMixer {
        &mut self.mixer
    }

    pub fn tracker(&self) -> &NoteTracker {
        &self.tracker
    }

    pub fn oscillator(&self, slot: OscillatorSlot) -> &Oscillator {
        self.mixer.oscillator(slot)
    }

    pub fn oscillator_mut(&mut self, slot: OscillatorSlot) -> &mut Oscillator {
        self.mixer.oscillator_mut(slot)
    }

    /// Release all notes; the mixer goes silent at the next fill.
    pub fn all_notes_off(&mut self) {
        self.tracker.reset();
    }
}

impl FillBuffer for Synth {
    fn fill_buffer(&mut self, buffer: &mut [u16]) {
        Synth::fill_buffer(self, buffer);
    }
}
