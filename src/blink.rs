//! Blink-mode state machine.
//!
//! The setting is a closed ordinal range stepped one position at a time by
//! keystrokes. Stepping past either end is a silent no-op.

use crate::config::{BLINK_FAST_MS, BLINK_MEDIUM_MS, BLINK_SLOW_MS};

/// LED blink setting, ordered from dark to steadily lit.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum BlinkSetting {
    #[default]
    Off,
    Slow,
    Medium,
    Fast,
    On,
}

impl BlinkSetting {
    pub const ALL: [BlinkSetting; 5] = [
        BlinkSetting::Off,
        BlinkSetting::Slow,
        BlinkSetting::Medium,
        BlinkSetting::Fast,
        BlinkSetting::On,
    ];

    /// One step towards `On` (`increase`) or `Off`, saturating at the ends.
    pub fn step(self, increase: bool) -> Self {
        let idx = self as usize;
        let next = if increase {
            (idx + 1).min(Self::ALL.len() - 1)
        } else {
            idx.saturating_sub(1)
        };
        Self::ALL[next]
    }

    /// Bracketed, fixed-width label drawn on the terminal status line.
    pub fn label(self) -> &'static str {
        match self {
            BlinkSetting::Off => "[   OFF  ]",
            BlinkSetting::Slow => "[  SLOW  ]",
            BlinkSetting::Medium => "[ MEDIUM ]",
            BlinkSetting::Fast => "[  FAST  ]",
            BlinkSetting::On => "[   ON   ]",
        }
    }

    /// LED toggle interval, or `None` for the steady settings.
    pub fn toggle_interval_ms(self) -> Option<u64> {
        match self {
            BlinkSetting::Slow => Some(BLINK_SLOW_MS),
            BlinkSetting::Medium => Some(BLINK_MEDIUM_MS),
            BlinkSetting::Fast => Some(BLINK_FAST_MS),
            BlinkSetting::Off | BlinkSetting::On => None,
        }
    }

    /// Whether the LED is lit for a steady setting.
    pub fn steady_level(self) -> Option<bool> {
        match self {
            BlinkSetting::Off => Some(false),
            BlinkSetting::On => Some(true),
            _ => None,
        }
    }
}

/// Owner of the process-wide blink setting. Only the event loop mutates it.
#[derive(Debug, Default)]
pub struct BlinkController {
    setting: BlinkSetting,
}

impl BlinkController {
    pub const fn new() -> Self {
        Self {
            setting: BlinkSetting::Off,
        }
    }

    pub fn setting(&self) -> BlinkSetting {
        self.setting
    }

    /// Step the setting. Returns the new value and whether it changed.
    pub fn advance(&mut self, increase: bool) -> (BlinkSetting, bool) {
        let prev = self.setting;
        self.setting = prev.step(increase);
        (self.setting, self.setting != prev)
    }
}
