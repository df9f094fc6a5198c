//! Byte-intake seam between a MIDI transport and the tracker.

/// Anything that yields raw MIDI bytes one at a time.
///
/// Implemented by UART/DMA receivers on target and by lock-free queues on a
/// host. `next_byte` must never block; `None` means "nothing pending right now".
pub trait MidiSource {
    fn next_byte(&mut self) -> Option<u8>;
}

impl MidiSource for core::slice::Iter<'_, u8> {
    fn next_byte(&mut self) -> Option<u8> {
        self.next().copied()
    }
}
