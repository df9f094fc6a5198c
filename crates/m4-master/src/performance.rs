//! Timed MIDI performance scripts for offline rendering.
//!
//! One event per line: a time in seconds followed by raw MIDI bytes in hex.
//!
//! ```text
//! # press A3, then C4, then release C4
//! 0.0   90 39 64
//! 0.5   90 3C 64
//! 1.0   80 3C 00
//! ```
//!
//! Blank lines and `#` comments are ignored. Bytes are passed to the synth
//! untouched, so running status, real-time bytes and malformed sequences
//! behave exactly as they would from a live port.

use std::str::FromStr;

use thiserror::Error;

#[derive(Error, Debug, PartialEq)]
pub enum ScriptError {
    #[error("line {line}: invalid time {text:?}")]
    Time { line: usize, text: String },

    #[error("line {line}: invalid MIDI byte {text:?}")]
    Byte { line: usize, text: String },

    #[error("line {line}: event has no bytes")]
    Empty { line: usize },
}

/// Bytes due at one point in time.
#[derive(Clone, Debug, PartialEq)]
pub struct ScriptEvent {
    pub seconds: f64,
    pub bytes: Vec<u8>,
}

/// Events in ascending time order.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Performance {
    events: Vec<ScriptEvent>,
}

impl Performance {
    pub fn new() -> Self {
        Self::default()
    }

    /// Hold `note` from time zero.
    pub fn held_note(note: u8, velocity: u8) -> Self {
        let mut performance = Self::new();
        performance.push(0.0, vec![0x90, note & 0x7F, velocity & 0x7F]);
        performance
    }

    /// Add an event. Order of insertion is kept among equal times.
    pub fn push(&mut self, seconds: f64, bytes: Vec<u8>) {
        let at = self.events.partition_point(|e| e.seconds <= seconds);
        self.events.insert(at, ScriptEvent { seconds, bytes });
    }

    pub fn events(&self) -> &[ScriptEvent] {
        &self.events
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    /// Time of the last event.
    pub fn duration(&self) -> f64 {
        self.events.last().map_or(0.0, |e| e.seconds)
    }

    pub fn parse(text: &str) -> Result<Self, ScriptError> {
        let mut performance = Self::new();

        for (i, raw) in text.lines().enumerate() {
            let line = i + 1;
            let content = raw.split('#').next().unwrap_or("").trim();
            if content.is_empty() {
                continue;
            }

            let mut fields = content.split_whitespace();
            let time = fields.next().unwrap_or("");
            let seconds = time
                .parse::<f64>()
                .ok()
                .filter(|s| s.is_finite() && *s >= 0.0)
                .ok_or_else(|| ScriptError::Time {
                    line,
                    text: time.to_string(),
                })?;

            let bytes = fields
                .map(|field| {
                    let digits = field
                        .strip_prefix("0x")
                        .or_else(|| field.strip_prefix("0X"))
                        .unwrap_or(field);
                    u8::from_str_radix(digits, 16).map_err(|_| ScriptError::Byte {
                        line,
                        text: field.to_string(),
                    })
                })
                .collect::<Result<Vec<u8>, _>>()?;
            if bytes.is_empty() {
                return Err(ScriptError::Empty { line });
            }

            performance.push(seconds, bytes);
        }

        log::debug!("parsed performance with {} events", performance.events.len());
        Ok(performance)
    }
}

impl FromStr for Performance {
    type Err = ScriptError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}
