//! Double-buffer contract between the synth and an audio transport.
//!
//! The transport (DMA on target, a host audio callback elsewhere) streams one
//! half while the other waits. When a half drains, the transport reports it
//! exactly once and the fill callback rewrites that half with the next period
//! before returning. Both halves are fixed arrays allocated up front.
//!
//! The fill callback runs in the highest-priority context: it must not block,
//! allocate, or take locks, and must finish within [`DoubleBuffer::fill_budget`].

use core::time::Duration;

/// Sink that produces the next period of unsigned 16-bit samples.
///
/// `buffer.len()` is the period's sample count.
pub trait FillBuffer {
    fn fill_buffer(&mut self, buffer: &mut [u16]);
}

impl<F: FillBuffer + ?Sized> FillBuffer for &mut F {
    fn fill_buffer(&mut self, buffer: &mut [u16]) {
        (**self).fill_buffer(buffer);
    }
}

/// One of the two buffers registered with the transport.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Half {
    Primary,
    Alternate,
}

impl Half {
    pub fn other(self) -> Self {
        match self {
            Half::Primary => Half::Alternate,
            Half::Alternate => Half::Primary,
        }
    }
}

/// Ping-pong pair of `N`-sample buffers plus the streaming cursor.
pub struct DoubleBuffer<const N: usize> {
    primary: [u16; N],
    alternate: [u16; N],
    /// Half currently owned by the transport.
    streaming: Half,
    /// Read position inside the streaming half, for transports that pull.
    cursor: usize,
    completions: u64,
    out_of_order: u32,
}

impl<const N: usize> DoubleBuffer<N> {
    /// Both halves start silent with the primary streaming first.
    pub const fn new() -> Self {
        Self {
            primary: [0; N],
            alternate: [0; N],
            streaming: Half::Primary,
            cursor: 0,
            completions: 0,
            out_of_order: 0,
        }
    }

    /// Fill both halves before the transport starts (primary first).
    pub fn prime(&mut self, source: &mut impl FillBuffer) {
        source.fill_buffer(&mut self.primary);
        source.fill_buffer(&mut self.alternate);
        self.streaming = Half::Primary;
        self.cursor = 0;
    }

    /// The transport finished streaming `drained`: refill it with the next
    /// period and hand streaming over to the other half.
    ///
    /// A report for the half that was not streaming is still serviced but
    /// counted in [`out_of_order`](Self::out_of_order).
    pub fn complete(&mut self, drained: Half, source: &mut impl FillBuffer) {
        if drained != self.streaming {
            self.out_of_order = self.out_of_order.wrapping_add(1);
        }

        let buffer = match drained {
            Half::Primary => &mut self.primary,
            Half::Alternate => &mut self.alternate,
        };

        #[cfg(feature = "alloc_check")]
        assert_no_alloc::assert_no_alloc(|| source.fill_buffer(buffer));
        #[cfg(not(feature = "alloc_check"))]
        source.fill_buffer(buffer);

        self.streaming = drained.other();
        self.cursor = 0;
        self.completions = self.completions.wrapping_add(1);
    }

    /// Read the next sample the way a DMA engine would, servicing the
    /// completion when the streaming half runs out.
    pub fn pull(&mut self, source: &mut impl FillBuffer) -> u16 {
        if self.cursor >= N {
            self.complete(self.streaming, source);
        }
        let sample = self.buffer(self.streaming).get(self.cursor).copied().unwrap_or(0);
        self.cursor += 1;
        sample
    }

    /// Fill `out` with pulled samples.
    pub fn pull_into(&mut self, out: &mut [u16], source: &mut impl FillBuffer) {
        for sample in out.iter_mut() {
            *sample = self.pull(source);
        }
    }

    pub fn buffer(&self, half: Half) -> &[u16; N] {
        match half {
            Half::Primary => &self.primary,
            Half::Alternate => &self.alternate,
        }
    }

    pub fn streaming(&self) -> Half {
        self.streaming
    }

    /// Completions serviced so far (wrapping).
    pub fn completions(&self) -> u64 {
        self.completions
    }

    /// Completions reported for a half that was not streaming.
    pub fn out_of_order(&self) -> u32 {
        self.out_of_order
    }

    /// Samples per half.
    pub const fn len(&self) -> usize {
        N
    }

    pub const fn is_empty(&self) -> bool {
        N == 0
    }

    /// Time the transport takes to stream one half, which bounds how long a
    /// fill may run.
    pub fn fill_budget(sample_rate: u32) -> Duration {
        if sample_rate == 0 {
            return Duration::ZERO;
        }
        Duration::from_nanos(N as u64 * 1_000_000_000 / sample_rate as u64)
    }
}

impl<const N: usize> Default for DoubleBuffer<N> {
    fn default() -> Self {
        Self::new()
    }
}
