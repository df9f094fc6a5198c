//! Last-note-priority note tracking over a raw MIDI byte stream.

use crate::source::MidiSource;
use crate::{NOTE_COUNT, NO_NOTE};

/// The channel-voice command a pending sequence belongs to.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Command {
    NoteOn,
    NoteOff,
}

/// Where the parser is inside a three-byte note message.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum ParserState {
    /// Waiting for a Note-On or Note-Off status byte.
    #[default]
    Idle,
    /// Status seen, next data byte is the note number.
    AwaitingNote(Command),
    /// Note number captured, next data byte is the velocity.
    AwaitingVelocity(Command, u8),
}

/// Tracks which notes are held and in which order they were struck.
///
/// Each note carries the value of a global activation counter at the moment
/// it was last switched on (0 = off). The sounding note is the one with the
/// highest counter, so a missed Note-Off never blocks newer notes.
#[derive(Clone, Debug)]
pub struct NoteTracker {
    activations: [u32; NOTE_COUNT],
    activation_counter: u32,
    /// Completed Note-On/Note-Off messages, wrapping.
    message_count: u32,
    state: ParserState,
}

impl NoteTracker {
    /// Create a tracker with every note off.
    pub const fn new() -> Self {
        Self {
            activations: [0; NOTE_COUNT],
            activation_counter: 0,
            message_count: 0,
            state: ParserState::Idle,
        }
    }

    /// Feed one byte from the MIDI transport.
    ///
    /// Never fails: unknown bytes are dropped, truncated messages simply wait
    /// for more data, and any status byte restarts the parser.
    pub fn receive(&mut self, byte: u8) {
        // System real-time bytes may appear anywhere, even mid-message.
        if byte >= 0xF8 {
            return;
        }

        if byte & 0x80 != 0 {
            self.state = match byte & 0xF0 {
                0x90 => ParserState::AwaitingNote(Command::NoteOn),
                0x80 => ParserState::AwaitingNote(Command::NoteOff),
                _ => ParserState::Idle,
            };
            return;
        }

        self.state = match self.state {
            ParserState::Idle => ParserState::Idle,
            ParserState::AwaitingNote(command) => ParserState::AwaitingVelocity(command, byte),
            ParserState::AwaitingVelocity(command, note) => {
                self.apply(command, note, byte);
                ParserState::Idle
            }
        };
    }

    /// Drain every byte currently available from `source`. Returns how many were read.
    pub fn pump(&mut self, source: &mut impl MidiSource) -> usize {
        let mut count = 0;
        while let Some(byte) = source.next_byte() {
            self.receive(byte);
            count += 1;
        }
        count
    }

    fn apply(&mut self, command: Command, note: u8, velocity: u8) {
        let Some(slot) = self.activations.get_mut(note as usize) else {
            return;
        };

        match command {
            Command::NoteOn if velocity != 0 => {
                // 0 is reserved for "off", skip it when the counter wraps.
                self.activation_counter = self.activation_counter.wrapping_add(1).max(1);
                *slot = self.activation_counter;
            }
            // Velocity 0 under Note-On is a Note-Off by MIDI convention.
            _ => *slot = 0,
        }

        self.message_count = self.message_count.wrapping_add(1);
    }

    /// The note that should sound right now, or [`NO_NOTE`].
    ///
    /// Picks the most recently activated held note. Equal counters resolve to
    /// the lowest index.
    pub fn current_note(&self) -> u8 {
        let mut best = NO_NOTE;
        let mut newest = 0;
        for (note, &order) in self.activations.iter().enumerate() {
            if order > newest {
                newest = order;
                best = note as u8;
            }
        }
        best
    }

    /// Is `note` currently held?
    pub fn is_active(&self, note: u8) -> bool {
        self.activation(note) != 0
    }

    /// Activation order recorded for `note` (0 = off, or out of range).
    pub fn activation(&self, note: u8) -> u32 {
        self.activations.get(note as usize).copied().unwrap_or(0)
    }

    /// Number of held notes.
    pub fn active_count(&self) -> usize {
        self.activations.iter().filter(|&&order| order != 0).count()
    }

    /// Completed note messages so far (wrapping). Changes whenever the note
    /// state may have changed.
    pub fn message_count(&self) -> u32 {
        self.message_count
    }

    pub fn state(&self) -> ParserState {
        self.state
    }

    /// Release every note and return the parser to idle.
    pub fn reset(&mut self) {
        self.activations = [0; NOTE_COUNT];
        self.state = ParserState::Idle;
        self.message_count = self.message_count.wrapping_add(1);
    }
}

impl Default for NoteTracker {
    fn default() -> Self {
        Self::new()
    }
}
