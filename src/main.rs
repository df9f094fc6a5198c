//! m4synth CLI: offline rendering, live playback and MIDI port listing.
//!
//! Usage:
//!   m4synth render --note 48 --seconds 2 --out c3.wav
//!   m4synth render --script tune.txt --osc 2:saw:10:+8:0 --out tune.wav
//!   m4synth play --midi 0
//!   m4synth ports

use std::io::BufRead;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{bail, Context, Result};
use clap::{Args, Parser, Subcommand};
use m4_engine::{OscillatorSlot, Parameter, Step};
use m4_master::{Controller, EngineConfig, MidiSelection, OscillatorPatch, Performance};

#[derive(Parser)]
#[command(name = "m4synth")]
#[command(version, about = "Three-oscillator monophonic synthesizer", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Render to a WAV file
    Render {
        #[command(flatten)]
        voice: VoiceArgs,

        /// Samples per transport period
        #[arg(long, default_value_t = m4_engine::BUFFER_LEN)]
        buffer_len: usize,

        /// Timed MIDI script (`<seconds> <hex bytes...>` per line)
        #[arg(short, long, conflicts_with = "note")]
        script: Option<PathBuf>,

        /// Hold a single MIDI note for the whole render
        #[arg(short, long)]
        note: Option<u8>,

        /// Length in seconds (defaults to the script length plus one second)
        #[arg(long)]
        seconds: Option<f64>,

        /// Output WAV file
        #[arg(short, long, default_value = "m4synth.wav")]
        out: PathBuf,
    },

    /// Play live through the default audio device
    Play {
        #[command(flatten)]
        voice: VoiceArgs,

        /// MIDI input port: index or part of its name (first port if empty)
        #[arg(short, long, num_args = 0..=1, default_missing_value = "")]
        midi: Option<String>,

        /// Start with this note sounding
        #[arg(short, long)]
        note: Option<u8>,

        /// Stop after this many seconds instead of waiting for `q`
        #[arg(long)]
        seconds: Option<f64>,
    },

    /// List MIDI input ports
    Ports,
}

#[derive(Args)]
struct VoiceArgs {
    /// Oscillator patch `<slot>:<waveform>:<level>:<cent>:<semitone>`, repeatable
    #[arg(long = "osc", value_name = "PATCH")]
    patches: Vec<OscillatorPatch>,
}

impl VoiceArgs {
    fn controller(&self, buffer_len: usize) -> Result<Controller> {
        if buffer_len == 0 {
            bail!("--buffer-len must be at least 1");
        }
        let mut ctrl = Controller::new(EngineConfig {
            sample_rate: m4_engine::SAMPLE_RATE,
            buffer_len,
        });
        for patch in &self.patches {
            log::info!("applying patch {}", patch);
            ctrl.apply_patch(patch);
        }
        Ok(ctrl)
    }
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();
    match cli.command {
        Commands::Render {
            voice,
            buffer_len,
            script,
            note,
            seconds,
            out,
        } => render(&voice, buffer_len, script, note, seconds, &out),
        Commands::Play {
            voice,
            midi,
            note,
            seconds,
        } => play(&voice, midi, note, seconds),
        Commands::Ports => ports(),
    }
}

fn render(
    voice: &VoiceArgs,
    buffer_len: usize,
    script: Option<PathBuf>,
    note: Option<u8>,
    seconds: Option<f64>,
    out: &Path,
) -> Result<()> {
    let ctrl = voice.controller(buffer_len)?;

    let performance = match (script, note) {
        (Some(path), _) => {
            let text = std::fs::read_to_string(&path)
                .with_context(|| format!("reading script {}", path.display()))?;
            Performance::parse(&text).with_context(|| format!("parsing {}", path.display()))?
        }
        (None, Some(note)) => Performance::held_note(note, 100),
        (None, None) => bail!("render needs --note or --script"),
    };

    let seconds = seconds.unwrap_or(performance.duration() + 1.0);
    if !(seconds.is_finite() && seconds > 0.0) {
        bail!("--seconds must be positive, got {}", seconds);
    }

    println!("Rendering {:.2}s to {}...", seconds, out.display());
    ctrl.export_wav(out, &performance, seconds)
        .with_context(|| format!("writing {}", out.display()))?;
    println!("Done.");
    Ok(())
}

fn play(
    voice: &VoiceArgs,
    midi: Option<String>,
    note: Option<u8>,
    seconds: Option<f64>,
) -> Result<()> {
    let mut ctrl = voice.controller(m4_engine::BUFFER_LEN)?;
    let run_for = seconds.map(play_duration).transpose()?;

    let selection = match midi.as_deref() {
        None => MidiSelection::None,
        Some("") => MidiSelection::First,
        Some(text) => match text.parse::<usize>() {
            Ok(index) => MidiSelection::Index(index),
            Err(_) => MidiSelection::Name(text.to_string()),
        },
    };

    ctrl.play(&selection).context("starting playback")?;
    if let Some(note) = note {
        ctrl.note_on(note);
    }

    match run_for {
        Some(duration) => std::thread::sleep(duration),
        None => {
            println!("Playing. Commands: <note>, off, <patch>, step <slot> <param> up|down, q");
            interactive(&mut ctrl)?;
        }
    }

    ctrl.stop();
    Ok(())
}

/// Wall-clock length for `play --seconds`.
fn play_duration(seconds: f64) -> Result<Duration> {
    if seconds < 0.0 {
        bail!("--seconds must not be negative, got {}", seconds);
    }
    Duration::try_from_secs_f64(seconds)
        .map_err(|_| anyhow::anyhow!("--seconds out of range: {}", seconds))
}

/// Read console commands until `q` or end of input.
fn interactive(ctrl: &mut Controller) -> Result<()> {
    let stdin = std::io::stdin();
    for line in stdin.lock().lines() {
        let line = line.context("reading stdin")?;
        let words: Vec<&str> = line.split_whitespace().collect();
        match words.as_slice() {
            [] => {}
            ["q"] | ["quit"] => break,
            ["off"] => ctrl.all_notes_off(),
            ["step", slot, parameter, direction] => match parse_step(slot, parameter, direction) {
                Some((slot, parameter, step)) => {
                    let label = ctrl.step(slot, parameter, step);
                    println!("{} {}", parameter.name(), label);
                }
                None => println!("usage: step <1-3> waveform|level|cent|semitone up|down"),
            },
            [word] => {
                if let Ok(note) = word.parse::<u8>() {
                    ctrl.note_on(note);
                } else {
                    match ctrl.apply_patch_str(word) {
                        Ok(()) => println!("ok"),
                        Err(e) => println!("{}", e),
                    }
                }
            }
            _ => println!("unrecognized command"),
        }
        if let Some(periods) = ctrl.completions() {
            log::debug!("{} periods streamed", periods);
        }
    }
    Ok(())
}

fn parse_step(
    slot: &str,
    parameter: &str,
    direction: &str,
) -> Option<(OscillatorSlot, Parameter, Step)> {
    let slot = slot.parse::<u8>().ok().and_then(OscillatorSlot::from_number)?;
    let parameter = Parameter::ALL
        .into_iter()
        .find(|p| p.name().eq_ignore_ascii_case(parameter))?;
    let step = match direction {
        "up" | "+" => Step::Up,
        "down" | "-" => Step::Down,
        _ => return None,
    };
    Some((slot, parameter, step))
}

fn ports() -> Result<()> {
    let ports = m4_master::list_midi_ports().context("enumerating MIDI inputs")?;
    if ports.is_empty() {
        println!("No MIDI input ports.");
    }
    for port in ports {
        println!("{:>3}  {}", port.index, port.name);
    }
    Ok(())
}
