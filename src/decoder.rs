//! Keystroke / escape-sequence decoder.
//!
//! Classifies a completed receive frame. Only the leading bytes matter:
//! a frame is one keystroke or one escape sequence as the terminal sent
//! it. Nothing is carried over between frames, so an escape sequence
//! split across two receive completions decodes as opaque data twice.
//!
//! ```text
//! 0x05 (Ctrl-E)            refresh banner
//! ESC [ H   / ESC O H      Home      -> refresh banner
//! ESC [ D   / ESC O D      Left      -> blink setting down
//! ESC [ C   / ESC O C      Right     -> blink setting up
//! a A <                    alias for Left
//! d D >                    alias for Right
//! anything else            opaque, echoed as a hex dump
//! ```

use core::fmt::Write;

use heapless::String;

/// Control byte that repaints the whole banner (Ctrl-E).
pub const REFRESH_CTRL: u8 = 0x05;

const ESC: u8 = 0x1B;
const CSI: u8 = b'[';
const SS3: u8 = b'O';

/// Marker appended to every hex dump.
pub const HEX_DUMP_MARKER: &str = " Pressed";

/// Rendered for an empty frame.
pub const HEX_DUMP_EMPTY: &str = "<None>";

/// What the loop should do with a received frame.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Command {
    /// Repaint the banner.
    Refresh,
    /// Step the blink setting.
    Advance { increase: bool },
    /// Not a command; echo it back.
    Opaque,
}

/// Classify `frame`.
pub fn decode(frame: &[u8]) -> Command {
    match frame {
        [ESC, CSI | SS3, final_byte, ..] => match final_byte {
            b'H' => Command::Refresh,
            b'D' => Command::Advance { increase: false },
            b'C' => Command::Advance { increase: true },
            _ => Command::Opaque,
        },
        // A lone or truncated escape sequence is data, not a key.
        [ESC, ..] => Command::Opaque,
        [REFRESH_CTRL, ..] => Command::Refresh,
        [b'a' | b'A' | b'<', ..] => Command::Advance { increase: false },
        [b'd' | b'D' | b'>', ..] => Command::Advance { increase: true },
        _ => Command::Opaque,
    }
}

/// Render `frame` as `"1B 5B 41 Pressed"` into `out`.
///
/// Only whole tokens are written. If the frame does not fit, trailing
/// bytes are dropped and the marker still closes the line. `out` is
/// cleared first. Returns the number of bytes rendered.
pub fn write_hex_dump<const N: usize>(frame: &[u8], out: &mut String<N>) -> usize {
    out.clear();
    if frame.is_empty() {
        // Too small a buffer just yields an empty line.
        let _ = out.push_str(HEX_DUMP_EMPTY);
        return 0;
    }

    let budget = N.saturating_sub(HEX_DUMP_MARKER.len());
    let mut rendered = 0;
    for &byte in frame {
        let token_len = if rendered == 0 { 2 } else { 3 };
        if out.len() + token_len > budget {
            break;
        }
        if rendered > 0 {
            let _ = out.push(' ');
        }
        // Cannot fail: room was checked above.
        let _ = write!(out, "{:02X}", byte);
        rendered += 1;
    }
    let _ = out.push_str(HEX_DUMP_MARKER);
    rendered
}
