//! Unified error type for termblink.
//!
//! We avoid `alloc` - all error variants carry only fixed-size data.
//! None of these ever leave the event loop: the loop logs them and drops
//! the message that caused them, so a fault cannot turn into a livelock.

/// Faults raised while building an outgoing transfer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Error {
    /// The transfer descriptor set already holds `TX_MAX_SEGMENTS` entries.
    DescriptorsFull,

    /// The flattened transfer exceeds the board's transmit frame buffer.
    FrameTooLarge,
}

impl core::fmt::Display for Error {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Error::DescriptorsFull => f.write_str("transfer descriptor set full"),
            Error::FrameTooLarge => f.write_str("transmit frame too large"),
        }
    }
}
