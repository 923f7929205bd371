//! Reusable transmit descriptor set and scratch buffer.
//!
//! Segments name either a `'static` string or "the scratch buffer". They
//! are resolved to byte slices only at the moment a transfer is offered,
//! so the descriptor set never holds a borrow of the scratch buffer across
//! loop iterations. The event loop only rebuilds the outbox when no staged
//! message exists and the transmitter is idle.

use heapless::{String, Vec};

use crate::config::{TX_MAX_SEGMENTS, TX_SCRATCH_LEN};
use crate::platform::Platform;
use crate::Error;

/// One entry of the transfer descriptor set.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Segment {
    Static(&'static str),
    Scratch,
}

/// Descriptor set plus the scratch buffer its `Scratch` entries point at.
#[derive(Debug, Default)]
pub struct Outbox {
    segments: Vec<Segment, TX_MAX_SEGMENTS>,
    scratch: String<TX_SCRATCH_LEN>,
}

impl Outbox {
    pub const fn new() -> Self {
        Self {
            segments: Vec::new(),
            scratch: String::new(),
        }
    }

    /// Drop all segments. Scratch contents are left for the caller.
    pub fn clear(&mut self) {
        self.segments.clear();
    }

    pub fn push_static(&mut self, text: &'static str) -> Result<(), Error> {
        self.segments
            .push(Segment::Static(text))
            .map_err(|_| Error::DescriptorsFull)
    }

    pub fn push_scratch(&mut self) -> Result<(), Error> {
        self.segments
            .push(Segment::Scratch)
            .map_err(|_| Error::DescriptorsFull)
    }

    pub fn scratch_mut(&mut self) -> &mut String<TX_SCRATCH_LEN> {
        &mut self.scratch
    }

    /// Total number of bytes the descriptor set covers.
    pub fn byte_len(&self) -> usize {
        self.resolve().iter().map(|s| s.len()).sum()
    }

    /// Byte slices for each segment, in order.
    pub fn resolve(&self) -> Vec<&[u8], TX_MAX_SEGMENTS> {
        self.segments
            .iter()
            .map(|seg| match seg {
                Segment::Static(text) => text.as_bytes(),
                Segment::Scratch => self.scratch.as_bytes(),
            })
            .collect()
    }

    /// Offer the descriptor set to the transmitter. `true` if accepted.
    pub fn offer<P: Platform>(&self, platform: &mut P) -> bool {
        platform.tx_try(&self.resolve())
    }
}

/// Concatenate `segments` into one contiguous frame.
///
/// Used by transmitters that need a single DMA-able buffer.
pub fn flatten<const N: usize>(segments: &[&[u8]]) -> Result<Vec<u8, N>, Error> {
    let mut frame = Vec::new();
    for seg in segments {
        frame
            .extend_from_slice(seg)
            .map_err(|_| Error::FrameTooLarge)?;
    }
    Ok(frame)
}
