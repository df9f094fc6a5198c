//! MIDI byte-stream note tracking for the m4 synthesizer.
//!
//! Consumes an unframed stream of raw MIDI bytes and decides which single
//! note should be sounding, using last-note-priority. Independent of the
//! audio side: the only thing it hands over is one note index per buffer.
//!
//! Designed to be `no_std`; nothing here allocates.

#![cfg_attr(not(feature = "std"), no_std)]

mod source;
mod tracker;

pub use source::MidiSource;
pub use tracker::{Command, NoteTracker, ParserState};

/// Number of addressable MIDI notes.
pub const NOTE_COUNT: usize = 128;

/// Note index meaning "no note is sounding".
///
/// This is also MIDI note 0 (the bottom C), which is therefore never audible.
pub const NO_NOTE: u8 = 0;
