//! Application-wide constants and compile-time configuration.
//!
//! Buffer capacities, timing parameters, and board assignments live here
//! so they can be tuned in one place.

// Transmit pipeline

/// Maximum number of segments in one transfer descriptor set.
pub const TX_MAX_SEGMENTS: usize = 4;

/// Capacity of the transmit scratch buffer (bytes).
pub const TX_SCRATCH_LEN: usize = 64;

/// Largest contiguous frame the board transmit task can hold.
/// The banner is the biggest message (~800 bytes).
pub const TX_FRAME_CAP: usize = 1024;

// Receive pipeline

/// Capacity of the receive buffer (bytes). One keystroke or escape
/// sequence per frame; longer pastes are cut at this length.
pub const RX_BUF_LEN: usize = 16;

// Serial link
//
// nRF52840-DK virtual COM port (routed through the interface MCU):
//
//   UARTE0 TXD → P0.06
//   UARTE0 RXD → P0.08
//   Button 1   → P0.11 (active-low)
//   LED 1      → P0.13 (active-low)

/// Baud rate of the virtual COM port.
pub const UART_BAUD: u32 = 115_200;

// Button

/// Button debounce time (ms).
pub const BUTTON_DEBOUNCE_MS: u64 = 20;

// Blink timing (LED toggle interval per setting)

pub const BLINK_SLOW_MS: u64 = 1000;
pub const BLINK_MEDIUM_MS: u64 = 400;
pub const BLINK_FAST_MS: u64 = 100;

// Diagnostics

/// Interval between loop-rate log lines (seconds).
pub const LOOP_STATS_INTERVAL_SECS: u64 = 10;
