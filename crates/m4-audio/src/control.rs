//! Lock-free handoff into the audio callback.
//!
//! The callback owns the [`Synth`]. Other threads reach it only through two
//! SPSC queues: raw MIDI bytes and [`ControlMessage`]s. Both are drained at
//! the start of each fill, so parameter changes land between buffers.

use m4_engine::{FillBuffer, Oscillator, OscillatorSlot, Parameter, Step, Synth};
use m4_midi::MidiSource;
use ringbuf::traits::{Consumer, Producer, Split};
use ringbuf::{HeapCons, HeapProd, HeapRb};

/// Change requested by the UI or CLI thread.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ControlMessage {
    SetOscillator(OscillatorSlot, Oscillator),
    Step(OscillatorSlot, Parameter, Step),
    /// Select a note directly, bypassing MIDI.
    SetNote(u8),
    AllNotesOff,
}

/// Producer end of the control queue.
pub struct ControlSender {
    producer: HeapProd<ControlMessage>,
    dropped: u32,
}

impl ControlSender {
    /// Queue a message. Returns false (and counts a drop) when full.
    pub fn send(&mut self, message: ControlMessage) -> bool {
        if self.producer.try_push(message).is_err() {
            self.dropped = self.dropped.wrapping_add(1);
            log::warn!("control queue full, dropped {:?}", message);
            return false;
        }
        true
    }

    pub fn dropped(&self) -> u32 {
        self.dropped
    }
}

/// Create a control queue with room for `capacity` messages.
pub fn control_channel(capacity: usize) -> (ControlSender, HeapCons<ControlMessage>) {
    let (producer, consumer) = HeapRb::<ControlMessage>::new(capacity).split();
    (
        ControlSender {
            producer,
            dropped: 0,
        },
        consumer,
    )
}

/// MIDI byte queue as seen by the tracker.
pub struct MidiQueue(HeapCons<u8>);

impl MidiQueue {
    pub fn new(consumer: HeapCons<u8>) -> Self {
        Self(consumer)
    }
}

impl MidiSource for MidiQueue {
    fn next_byte(&mut self) -> Option<u8> {
        self.0.try_pop()
    }
}

/// The synth as driven from a host audio callback.
pub struct LiveSynth {
    synth: Synth,
    midi: Option<MidiQueue>,
    controls: HeapCons<ControlMessage>,
}

impl LiveSynth {
    pub fn new(synth: Synth, controls: HeapCons<ControlMessage>) -> Self {
        Self {
            synth,
            midi: None,
            controls,
        }
    }

    /// Attach the MIDI byte queue fed by an input connection.
    pub fn with_midi(mut self, midi: HeapCons<u8>) -> Self {
        self.midi = Some(MidiQueue::new(midi));
        self
    }

    pub fn synth(&self) -> &Synth {
        &self.synth
    }

    fn apply(&mut self, message: ControlMessage) {
        match message {
            ControlMessage::SetOscillator(slot, osc) => *self.synth.oscillator_mut(slot) = osc,
            ControlMessage::Step(slot, parameter, step) => {
                self.synth.oscillator_mut(slot).step(parameter, step)
            }
            ControlMessage::SetNote(note) => self.synth.mixer_mut().set_note(note),
            ControlMessage::AllNotesOff => {
                self.synth.all_notes_off();
                self.synth.mixer_mut().set_note(m4_engine::NO_NOTE);
            }
        }
    }
}

impl FillBuffer for LiveSynth {
    fn fill_buffer(&mut self, buffer: &mut [u16]) {
        if let Some(midi) = self.midi.as_mut() {
            self.synth.pump_midi(midi);
        }
        while let Some(message) = self.controls.try_pop() {
            self.apply(message);
        }
        self.synth.fill_output(buffer);
    }
}
