//! Hardware collaborator consumed by the event loop.
//!
//! Everything behind this trait is one-shot bring-up or a non-blocking
//! service call. The board crate implements it over Embassy tasks; tests
//! use the recording mock below.

use crate::blink::BlinkSetting;
use crate::button::ButtonMask;

/// Result of polling the receiver.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum RxCompletion {
    /// Nothing received yet (or the receiver is not armed).
    None,
    /// A frame of this many bytes was copied into the caller's buffer.
    /// The receiver is disarmed until `rx_arm` is called again.
    Data(usize),
}

/// Services the event loop needs from the board.
pub trait Platform {
    /// One-shot bring-up. Called once before the first loop iteration.
    fn init(&mut self);

    /// Per-iteration housekeeping. Called exactly once per iteration.
    fn tick(&mut self);

    /// Start transmitting `segments` back to back without blocking.
    ///
    /// Returns `false` when the transmitter cannot take the transfer now;
    /// the caller retries on a later iteration.
    fn tx_try(&mut self, segments: &[&[u8]]) -> bool;

    /// `true` while an accepted transfer is still being sent.
    fn tx_busy(&self) -> bool;

    /// Arm one asynchronous receive of at most `max_len` bytes.
    fn rx_arm(&mut self, max_len: usize);

    /// Poll the armed receive, copying a completed frame into `buf`.
    fn rx_poll(&mut self, buf: &mut [u8]) -> RxCompletion;

    /// Take the button edges recorded since the previous call.
    fn button_poll_and_clear(&mut self) -> ButtonMask;

    /// Reprogram the LED for `setting`.
    fn blink_set(&mut self, setting: BlinkSetting);
}
