//! Headless controller for the m4 synthesizer.
//!
//! Owns the oscillator settings and offers offline rendering, WAV export and
//! live playback through the host audio device, so the CLI stays thin.

mod performance;
mod settings;
mod wav;

use std::fs::File;
use std::io::BufWriter;
use std::path::Path;

use m4_audio::{
    control_channel, midi_channel, AudioError, AudioOutput, ControlMessage, ControlSender,
    CpalOutput, LiveSynth, MidiInputHandle, CONTROL_QUEUE_LEN, MIDI_QUEUE_LEN,
};
use m4_engine::{
    DoubleBuffer, Oscillator, OscillatorSlot, Parameter, Step, Synth, BUFFER_LEN, OSCILLATOR_COUNT,
};
use thiserror::Error;

pub use m4_audio::{list_midi_ports, MidiPort};
pub use m4_engine::EngineConfig;
pub use performance::{Performance, ScriptError, ScriptEvent};
pub use settings::{parse_waveform, OscillatorPatch, PatchError};
pub use wav::{samples_to_wav, write_wav};

#[derive(Error, Debug)]
pub enum ControllerError {
    #[error(transparent)]
    Audio(#[from] AudioError),

    #[error(transparent)]
    Script(#[from] ScriptError),

    #[error(transparent)]
    Patch(#[from] PatchError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("live playback streams {supported}-sample periods, configured for {requested}")]
    PeriodMismatch { requested: usize, supported: usize },
}

/// Which MIDI input, if any, live playback listens to.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub enum MidiSelection {
    #[default]
    None,
    /// First available port.
    First,
    Index(usize),
    /// First port whose name contains this text.
    Name(String),
}

/// Headless synth controller: owns the oscillator bank and manages playback.
pub struct Controller {
    config: EngineConfig,
    bank: [Oscillator; OSCILLATOR_COUNT],
    playback: Option<PlaybackHandle>,
}

struct PlaybackHandle {
    output: CpalOutput,
    controls: ControlSender,
    midi: Option<MidiInputHandle>,
}

impl Controller {
    pub fn new(config: EngineConfig) -> Self {
        let bank = *Synth::new(config.sample_rate).mixer().oscillators();
        Self {
            config,
            bank,
            playback: None,
        }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    // --- Oscillator settings ---

    pub fn oscillator(&self, slot: OscillatorSlot) -> &Oscillator {
        &self.bank[slot.index()]
    }

    pub fn oscillators(&self) -> &[Oscillator; OSCILLATOR_COUNT] {
        &self.bank
    }

    /// Replace one slot. Live playback picks it up before its next buffer.
    pub fn set_oscillator(&mut self, slot: OscillatorSlot, oscillator: Oscillator) {
        self.bank[slot.index()] = oscillator;
        log::debug!("oscillator {:?} set to {:?}", slot, oscillator);
        self.send(ControlMessage::SetOscillator(slot, oscillator));
    }

    pub fn apply_patch(&mut self, patch: &OscillatorPatch) {
        self.set_oscillator(patch.slot, patch.oscillator);
    }

    /// Parse and apply a `<slot>:<waveform>:<level>:<cent>:<semitone>` patch.
    pub fn apply_patch_str(&mut self, text: &str) -> Result<(), ControllerError> {
        let patch: OscillatorPatch = text.parse()?;
        self.apply_patch(&patch);
        Ok(())
    }

    /// Step one parameter, returning its new display label.
    pub fn step(&mut self, slot: OscillatorSlot, parameter: Parameter, step: Step) -> String {
        let osc = &mut self.bank[slot.index()];
        osc.step(parameter, step);
        let label = osc.label(parameter).to_string();
        self.send(ControlMessage::Step(slot, parameter, step));
        label
    }

    fn build_synth(&self) -> Synth {
        let mut synth = Synth::new(self.config.sample_rate);
        synth.mixer_mut().set_oscillators(self.bank);
        synth
    }

    // --- Offline rendering ---

    /// Render `seconds` of audio, feeding the performance's MIDI bytes in
    /// before the first period that starts at or after each event's time.
    pub fn render(&self, performance: &Performance, seconds: f64) -> Vec<u16> {
        let total = self.config.samples_at(seconds) as usize;
        let period = self.config.buffer_len.max(1);
        let mut synth = self.build_synth();
        let mut samples = vec![0u16; total];
        let mut events = performance.events().iter().peekable();
        let mut start: u64 = 0;

        for chunk in samples.chunks_mut(period) {
            while let Some(event) =
                events.next_if(|e| self.config.samples_at(e.seconds) <= start)
            {
                for &byte in &event.bytes {
                    synth.receive_midi(byte);
                }
            }
            synth.fill_output(chunk);
            start += chunk.len() as u64;
        }

        log::info!(
            "rendered {} samples ({:.2}s), final note {}",
            total,
            seconds,
            synth.note()
        );
        samples
    }

    pub fn render_to_wav(&self, performance: &Performance, seconds: f64) -> Vec<u8> {
        let samples = self.render(performance, seconds);
        wav::samples_to_wav(&samples, self.config.sample_rate)
    }

    pub fn export_wav(
        &self,
        path: &Path,
        performance: &Performance,
        seconds: f64,
    ) -> Result<(), ControllerError> {
        let samples = self.render(performance, seconds);
        let mut writer = BufWriter::new(File::create(path)?);
        wav::write_wav(&mut writer, &samples, self.config.sample_rate)?;
        log::info!("wrote {}", path.display());
        Ok(())
    }

    // --- Real-time playback ---

    /// Open the default output device and start the live synth.
    ///
    /// The live transport always streams [`BUFFER_LEN`]-sample periods, so a
    /// controller configured for another period length is refused before any
    /// device is opened.
    pub fn play(&mut self, midi: &MidiSelection) -> Result<(), ControllerError> {
        self.stop();
        if self.config.buffer_len != BUFFER_LEN {
            return Err(ControllerError::PeriodMismatch {
                requested: self.config.buffer_len,
                supported: BUFFER_LEN,
            });
        }

        log::info!("initializing mixer at {} Hz", self.config.sample_rate);
        let synth = self.build_synth();
        for (i, osc) in self.bank.iter().enumerate() {
            log::info!(
                "oscillator {}: {} level {} cent {:+} semitone {:+}",
                i + 1,
                osc.waveform(),
                osc.level(),
                osc.cent(),
                osc.semitone()
            );
        }

        let (controls, control_rx) = control_channel(CONTROL_QUEUE_LEN);
        let mut live = LiveSynth::new(synth, control_rx);

        let midi_handle = match midi {
            MidiSelection::None => None,
            selection => {
                let (midi_tx, midi_rx) = midi_channel(MIDI_QUEUE_LEN);
                let (index, name) = match selection {
                    MidiSelection::Index(i) => (Some(*i), None),
                    MidiSelection::Name(n) => (None, Some(n.as_str())),
                    _ => (None, None),
                };
                let handle = MidiInputHandle::connect(index, name, midi_tx)?;
                live = live.with_midi(midi_rx);
                Some(handle)
            }
        };

        log::info!("initializing audio output");
        let mut output = CpalOutput::new(self.config.sample_rate)?;
        output.build_stream(live)?;
        output.start()?;
        log::info!(
            "transport running: {} samples per period on {} channel(s), {:?} fill budget",
            BUFFER_LEN,
            output.channels(),
            DoubleBuffer::<BUFFER_LEN>::fill_budget(output.sample_rate())
        );

        self.playback = Some(PlaybackHandle {
            output,
            controls,
            midi: midi_handle,
        });
        Ok(())
    }

    pub fn stop(&mut self) {
        if let Some(mut pb) = self.playback.take() {
            if let Err(e) = pb.output.stop() {
                log::warn!("stopping output: {}", e);
            }
            log::info!("transport stopped after {} periods", pb.output.completions());
            if let Some(midi) = pb.midi.as_ref() {
                let dropped = midi.dropped();
                if dropped > 0 {
                    log::warn!("{}: {} MIDI bytes dropped", midi.port_name(), dropped);
                } else {
                    log::info!("{}: no MIDI bytes dropped", midi.port_name());
                }
            }
        }
    }

    pub fn is_playing(&self) -> bool {
        self.playback
            .as_ref()
            .is_some_and(|p| p.output.is_running())
    }

    /// Periods the live transport has refilled.
    pub fn completions(&self) -> Option<u64> {
        self.playback.as_ref().map(|p| p.output.completions())
    }

    /// Sound `note` directly, without a MIDI device.
    pub fn note_on(&mut self, note: u8) {
        self.send(ControlMessage::SetNote(note));
    }

    pub fn all_notes_off(&mut self) {
        self.send(ControlMessage::AllNotesOff);
    }

    fn send(&mut self, message: ControlMessage) {
        if let Some(pb) = self.playback.as_mut() {
            pb.controls.send(message);
        }
    }
}

impl Default for Controller {
    fn default() -> Self {
        Self::new(EngineConfig::default())
    }
}

impl Drop for Controller {
    fn drop(&mut self) {
        self.stop();
    }
}
