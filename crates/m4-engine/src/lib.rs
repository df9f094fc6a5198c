//! Real-time audio core for the m4 synthesizer.
//!
//! Converts the currently selected MIDI note into unsigned 16-bit samples
//! for a DAC, one transport period at a time, with phase continuity across
//! periods. Platform code plugs in through two seams: a MIDI byte source
//! ([`m4_midi::MidiSource`]) and the buffer-fill callback ([`FillBuffer`]).

#![cfg_attr(not(feature = "std"), no_std)]

mod frequency;
mod mixer;
mod oscillator;
mod synth;
mod transport;

pub use frequency::{FrequencyTable, REFERENCE_HZ, REFERENCE_NOTE};
pub use mixer::{AudioMixer, OscillatorSlot, DEFAULT_SPREAD_CENTS, OSCILLATOR_COUNT};
pub use oscillator::{
    Oscillator, Parameter, ParameterLabel, Step, Waveform, CENT_MAX, CENT_MIN, LEVEL_MAX,
    MAX_AMPLITUDE, SEMITONE_MAX, SEMITONE_MIN,
};
pub use synth::Synth;
pub use transport::{DoubleBuffer, FillBuffer, Half};

pub use m4_midi::{NOTE_COUNT, NO_NOTE};

/// Fixed output sample rate in Hz.
pub const SAMPLE_RATE: u32 = 44_100;

/// Samples per transport period (one half of the double buffer).
pub const BUFFER_LEN: usize = 256;

/// Midpoint of the unsigned sample range. Subtract it to get signed PCM.
pub const SAMPLE_OFFSET: i32 = 32768;

/// Output level while nothing sounds; converts to signed 0.
pub const SILENCE: u16 = 32768;

/// Convert an unsigned DAC sample to signed 16-bit PCM.
pub fn to_signed(sample: u16) -> i16 {
    (sample as i32 - SAMPLE_OFFSET) as i16
}

/// Period geometry shared by a transport and its fill callback.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct EngineConfig {
    pub sample_rate: u32,
    /// Samples per `fill_buffer` call.
    pub buffer_len: usize,
}

impl EngineConfig {
    /// Wall-clock length of one period in seconds.
    pub fn period_secs(&self) -> f64 {
        if self.sample_rate == 0 {
            return 0.0;
        }
        self.buffer_len as f64 / self.sample_rate as f64
    }

    /// Sample position for a time offset, rounded down.
    pub fn samples_at(&self, seconds: f64) -> u64 {
        if seconds <= 0.0 {
            return 0;
        }
        (seconds * self.sample_rate as f64) as u64
    }
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            sample_rate: SAMPLE_RATE,
            buffer_len: BUFFER_LEN,
        }
    }
}
