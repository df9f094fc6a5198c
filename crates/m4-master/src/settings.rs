//! Oscillator presets given on the command line.
//!
//! A patch reads `<slot>:<waveform>:<level>:<cent>:<semitone>`, for example
//! `2:saw:10:+8:0`. Slots are numbered from 1.

use std::fmt;
use std::str::FromStr;

use m4_engine::{
    Oscillator, OscillatorSlot, Waveform, CENT_MAX, CENT_MIN, LEVEL_MAX, SEMITONE_MAX,
    SEMITONE_MIN,
};
use thiserror::Error;

#[derive(Error, Debug, PartialEq, Eq)]
pub enum PatchError {
    #[error("expected <slot>:<waveform>:<level>:<cent>:<semitone>, got {0:?}")]
    Format(String),

    #[error("oscillator slot must be 1-3, got {0:?}")]
    Slot(String),

    #[error("unknown waveform {0:?} (none, square, saw)")]
    Waveform(String),

    #[error("level must be 0-{max}, got {value:?}")]
    Level { value: String, max: u8 },

    #[error("cent must be {min}..={max}, got {value:?}")]
    Cent { value: String, min: i8, max: i8 },

    #[error("semitone must be {min}..={max}, got {value:?}")]
    Semitone { value: String, min: i8, max: i8 },
}

/// Settings for one oscillator slot.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct OscillatorPatch {
    pub slot: OscillatorSlot,
    pub oscillator: Oscillator,
}

pub fn parse_waveform(text: &str) -> Option<Waveform> {
    match text.to_ascii_lowercase().as_str() {
        "none" | "off" => Some(Waveform::None),
        "square" | "sq" => Some(Waveform::Square),
        "saw" | "sawtooth" => Some(Waveform::Sawtooth),
        _ => None,
    }
}

impl FromStr for OscillatorPatch {
    type Err = PatchError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let fields: Vec<&str> = s.split(':').map(str::trim).collect();
        let [slot, waveform, level, cent, semitone] = fields[..] else {
            return Err(PatchError::Format(s.to_string()));
        };

        let slot = slot
            .parse::<u8>()
            .ok()
            .and_then(OscillatorSlot::from_number)
            .ok_or_else(|| PatchError::Slot(slot.to_string()))?;

        let waveform =
            parse_waveform(waveform).ok_or_else(|| PatchError::Waveform(waveform.to_string()))?;

        let level = level
            .parse::<u8>()
            .ok()
            .filter(|l| *l <= LEVEL_MAX)
            .ok_or_else(|| PatchError::Level {
                value: level.to_string(),
                max: LEVEL_MAX,
            })?;

        let cent = cent
            .parse::<i8>()
            .ok()
            .filter(|c| (CENT_MIN..=CENT_MAX).contains(c))
            .ok_or_else(|| PatchError::Cent {
                value: cent.to_string(),
                min: CENT_MIN,
                max: CENT_MAX,
            })?;

        let semitone = semitone
            .parse::<i8>()
            .ok()
            .filter(|s| (SEMITONE_MIN..=SEMITONE_MAX).contains(s))
            .ok_or_else(|| PatchError::Semitone {
                value: semitone.to_string(),
                min: SEMITONE_MIN,
                max: SEMITONE_MAX,
            })?;

        Ok(Self {
            slot,
            oscillator: Oscillator::new(waveform, level, cent, semitone),
        })
    }
}

impl fmt::Display for OscillatorPatch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let waveform = match self.oscillator.waveform() {
            Waveform::None => "none",
            Waveform::Square => "square",
            Waveform::Sawtooth => "saw",
        };
        write!(
            f,
            "{}:{}:{}:{:+}:{:+}",
            self.slot.index() + 1,
            waveform,
            self.oscillator.level(),
            self.oscillator.cent(),
            self.oscillator.semitone()
        )
    }
}
