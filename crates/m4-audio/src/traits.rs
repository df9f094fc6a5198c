//! Audio output trait and error types.

use thiserror::Error;

/// Error type for audio and MIDI host operations.
#[derive(Error, Debug)]
pub enum AudioError {
    #[error("no audio output device available")]
    NoDevice,

    #[error("device init error: {0}")]
    DeviceInit(String),

    #[error("unsupported stream config: {0}")]
    UnsupportedConfig(String),

    #[error("stream create error: {0}")]
    StreamCreate(String),

    #[error("playback error: {0}")]
    Playback(String),

    #[error("MIDI init error: {0}")]
    MidiInit(String),

    #[error("MIDI connect error: {0}")]
    MidiConnect(String),
}

/// Trait for audio output backends.
pub trait AudioOutput {
    /// Rate the device actually runs at.
    fn sample_rate(&self) -> u32;

    /// Start streaming. The fill callback runs from here on.
    fn start(&mut self) -> Result<(), AudioError>;

    /// Stop streaming; the device outputs silence.
    fn stop(&mut self) -> Result<(), AudioError>;

    fn is_running(&self) -> bool;
}
