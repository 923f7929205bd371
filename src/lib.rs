//! Host-testable core of termblink.
//!
//! Everything here is hardware independent: the event loop, the decoder,
//! the blink state machine and the button mailbox. The embedded binary
//! (`src/main.rs`, feature `embedded`) supplies a [`platform::Platform`]
//! implementation over Embassy and drives [`program::ProgramState`].
//!
//! Usage: `cargo test --lib` / `cargo test`
//!
//! Note: main.rs is `#![no_std]` + `#![no_main]` and only builds for the
//! nRF52840 target. This crate builds anywhere.

#![cfg_attr(not(test), no_std)]

mod log;

pub mod blink;
pub mod button;
pub mod config;
pub mod decoder;
pub mod error;
pub mod outbox;
pub mod platform;
pub mod program;
pub mod terminal;

pub use blink::BlinkSetting;
pub use button::{ButtonMailbox, ButtonMask};
pub use error::Error;
pub use platform::{Platform, RxCompletion};
pub use program::ProgramState;
