//! Literal terminal output: escape sequences, banner and status strings.
//!
//! Screen layout after the banner (1-based rows/columns):
//!
//! ```text
//! row  1..9   boxed header
//! row 11      On-board button: [Released]
//!                               ^ col 19
//! row 12      Blink Setting: [   OFF  ]
//!                            ^ col 16
//! row 14      Received: 1B 5B 41 Pressed
//! ```
//!
//! The banner is sent as four segments so the two live fields reflect the
//! current state instead of the power-on defaults.

/// Reset attributes, clear the screen, home the cursor, then the header
/// down to the opening bracket of the button field.
pub const BANNER_HEAD: &str = concat!(
    "\x1b[0m\x1b[2J\x1b[1;1H",
    "+--------------------------------------------------------------------+\r\n",
    "| termblink: serial terminal blink demo                              |\r\n",
    "|                                                                    |\r\n",
    "|   Left  / a / <     slower blink                                   |\r\n",
    "|   Right / d / >     faster blink                                   |\r\n",
    "|   Home  / Ctrl-E    redraw this screen                             |\r\n",
    "|                                                                    |\r\n",
    "| Any other key is echoed back in hex.                               |\r\n",
    "+--------------------------------------------------------------------+\r\n",
    "\r\n",
    "On-board button: [",
);

/// Between the button field and the blink field.
pub const BANNER_MID: &str = "\r\nBlink Setting: ";

/// Cursor to the button field (row 11, col 19).
pub const CUP_BUTTON: &str = "\x1b[11;19H";

/// Cursor to the blink field (row 12, col 16).
pub const CUP_BLINK: &str = "\x1b[12;16H";

/// Cursor to row 14, erase the line, then the line label.
pub const CUP_RECEIVED: &str = "\x1b[14;1H\x1b[0KReceived: ";

/// Button field text. Both are the same width so one overwrites the other.
pub const BUTTON_PRESSED: &str = "Pressed] ";
pub const BUTTON_RELEASED: &str = "Released]";

pub fn button_label(pressed: bool) -> &'static str {
    if pressed {
        BUTTON_PRESSED
    } else {
        BUTTON_RELEASED
    }
}
