//! Hardware MIDI input via midir.
//!
//! The connection callback pushes every received byte, unparsed, into a
//! lock-free queue. Parsing happens in the audio callback's tracker.

use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;

use midir::{Ignore, MidiInput, MidiInputConnection};
use ringbuf::traits::{Producer, Split};
use ringbuf::{HeapCons, HeapProd, HeapRb};

use crate::traits::AudioError;

const CLIENT_NAME: &str = "m4synth";

/// An input port the host reports.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MidiPort {
    pub index: usize,
    pub name: String,
}

/// Enumerate MIDI input ports.
pub fn list_midi_ports() -> Result<Vec<MidiPort>, AudioError> {
    let midi_in =
        MidiInput::new(CLIENT_NAME).map_err(|e| AudioError::MidiInit(e.to_string()))?;
    let ports = midi_in
        .ports()
        .iter()
        .enumerate()
        .map(|(index, port)| MidiPort {
            index,
            name: midi_in
                .port_name(port)
                .unwrap_or_else(|_| format!("Unknown port {}", index)),
        })
        .collect();
    Ok(ports)
}

/// Create the byte queue between the MIDI thread and the audio callback.
pub fn midi_channel(capacity: usize) -> (HeapProd<u8>, HeapCons<u8>) {
    HeapRb::<u8>::new(capacity).split()
}

/// Push one incoming message into the queue byte by byte. Bytes that do not
/// fit are counted in `dropped`.
fn forward_bytes(producer: &mut HeapProd<u8>, message: &[u8], dropped: &AtomicU32) {
    for &byte in message {
        if producer.try_push(byte).is_err() {
            dropped.fetch_add(1, Ordering::Relaxed);
        }
    }
}

/// Open input connection. Dropping it disconnects.
pub struct MidiInputHandle {
    _connection: MidiInputConnection<()>,
    port_name: String,
    dropped: Arc<AtomicU32>,
}

impl MidiInputHandle {
    /// Connect to the port at `index`, or to the first port whose name
    /// contains `name` (case-insensitive) when given.
    pub fn connect(
        index: Option<usize>,
        name: Option<&str>,
        mut producer: HeapProd<u8>,
    ) -> Result<Self, AudioError> {
        let mut midi_in =
            MidiInput::new(CLIENT_NAME).map_err(|e| AudioError::MidiInit(e.to_string()))?;
        // Real-time bytes are dropped by the tracker anyway.
        midi_in.ignore(Ignore::None);

        let ports = midi_in.ports();
        let position = match (index, name) {
            (_, Some(name)) => {
                let wanted = name.to_lowercase();
                ports.iter().position(|p| {
                    midi_in
                        .port_name(p)
                        .map(|n| n.to_lowercase().contains(&wanted))
                        .unwrap_or(false)
                })
            }
            (Some(index), None) => (index < ports.len()).then_some(index),
            (None, None) => (!ports.is_empty()).then_some(0),
        };
        let port = position
            .and_then(|i| ports.get(i))
            .ok_or_else(|| AudioError::MidiConnect("no matching MIDI input port".into()))?;

        let port_name = midi_in
            .port_name(port)
            .unwrap_or_else(|_| "Unknown port".to_string());
        let dropped = Arc::new(AtomicU32::new(0));
        let dropped_cb = Arc::clone(&dropped);

        let connection = midi_in
            .connect(
                port,
                "m4synth-in",
                move |_timestamp, message, _| {
                    forward_bytes(&mut producer, message, &dropped_cb);
                },
                (),
            )
            .map_err(|e| AudioError::MidiConnect(e.to_string()))?;

        log::info!("MIDI input connected: {}", port_name);

        Ok(Self {
            _connection: connection,
            port_name,
            dropped,
        })
    }

    pub fn port_name(&self) -> &str {
        &self.port_name
    }

    /// Bytes lost because the audio side fell behind.
    pub fn dropped(&self) -> u32 {
        self.dropped.load(Ordering::Relaxed)
    }
}
