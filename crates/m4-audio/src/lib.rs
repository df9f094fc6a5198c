//! Host transports for the m4 synthesizer: a cpal output stream that drives
//! the engine's double buffer, and a midir input that feeds raw MIDI bytes.

mod control;
mod cpal_backend;
mod midi_input;
mod traits;

pub use control::{control_channel, ControlMessage, ControlSender, LiveSynth, MidiQueue};
pub use cpal_backend::CpalOutput;
pub use midi_input::{list_midi_ports, midi_channel, MidiInputHandle, MidiPort};
pub use traits::{AudioError, AudioOutput};

/// Capacity of the MIDI byte queue between the input thread and the audio
/// callback. One second of dense running status at 31250 baud fits.
pub const MIDI_QUEUE_LEN: usize = 4096;

/// Capacity of the parameter-change queue.
pub const CONTROL_QUEUE_LEN: usize = 64;
