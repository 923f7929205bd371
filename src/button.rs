//! On-board pushbutton edge mailbox.
//!
//! The edge source (GPIO interrupt / debounce task) ORs press and release
//! bits into a single atomic byte; the event loop swaps it back to zero.
//! Edges arriving between two polls coalesce into one mask instead of
//! queuing, so the loop must treat PRESS and RELEASE independently.

use core::sync::atomic::{AtomicU8, Ordering};

bitflags::bitflags! {
    /// Button edges seen since the previous poll.
    #[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
    pub struct ButtonMask: u8 {
        const PRESS = 0x01;
        const RELEASE = 0x02;
    }
}

#[cfg(feature = "defmt")]
impl defmt::Format for ButtonMask {
    fn format(&self, f: defmt::Formatter) {
        defmt::write!(f, "ButtonMask({=u8:#04x})", self.bits())
    }
}

/// Single-slot, read-and-clear channel between the edge context and the loop.
pub struct ButtonMailbox {
    bits: AtomicU8,
}

impl ButtonMailbox {
    pub const fn new() -> Self {
        Self {
            bits: AtomicU8::new(0),
        }
    }

    /// Record an edge. Safe to call from interrupt context.
    pub fn post(&self, edge: ButtonMask) {
        self.bits.fetch_or(edge.bits(), Ordering::Release);
    }

    /// Take every edge recorded since the last call.
    pub fn poll_and_clear(&self) -> ButtonMask {
        ButtonMask::from_bits_truncate(self.bits.swap(0, Ordering::AcqRel))
    }
}

impl Default for ButtonMailbox {
    fn default() -> Self {
        Self::new()
    }
}
