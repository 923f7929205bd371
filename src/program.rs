//! Program state and the cooperative event loop.
//!
//! `ProgramState::loop_one` is called forever from the main task. Each
//! call does a bounded amount of work and never waits on hardware:
//!
//! 1. platform tick
//! 2. banner on the very first call
//! 3. button mailbox
//! 4. receive completion -> decoder
//! 5. pending output, highest priority first
//!
//! All output shares one descriptor set and one scratch buffer. A message
//! is generated into them once ("staged"), then offered to the
//! transmitter until accepted. Nothing is regenerated while a message is
//! staged or while the transmitter is busy, so a buffer is never touched
//! while a transfer may still be reading it.

use bitflags::bitflags;

use crate::blink::{BlinkController, BlinkSetting};
use crate::button::ButtonMask;
use crate::config::RX_BUF_LEN;
use crate::decoder::{self, Command};
use crate::outbox::Outbox;
use crate::platform::{Platform, RxCompletion};
use crate::terminal;
use crate::{log_debug, log_error, log_info, Error};

bitflags! {
    /// Output waiting to be generated and/or accepted by the transmitter.
    #[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
    pub struct Pending: u16 {
        const BANNER = 0x0001;
        /// Hex dump of the last opaque frame.
        const UPDATE = 0x0002;
        const BUTTON_PRESSED = 0x0004;
        const BUTTON_RELEASED = 0x0008;
        const BLINK = 0x0010;
    }
}

/// Kinds of output, in service order.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Message {
    Banner,
    ButtonPressed,
    ButtonReleased,
    BlinkStatus,
    HexDump,
}

impl Message {
    pub const PRIORITY: [Message; 5] = [
        Message::Banner,
        Message::ButtonPressed,
        Message::ButtonReleased,
        Message::BlinkStatus,
        Message::HexDump,
    ];

    pub fn flag(self) -> Pending {
        match self {
            Message::Banner => Pending::BANNER,
            Message::ButtonPressed => Pending::BUTTON_PRESSED,
            Message::ButtonReleased => Pending::BUTTON_RELEASED,
            Message::BlinkStatus => Pending::BLINK,
            Message::HexDump => Pending::UPDATE,
        }
    }
}

/// Whether the receive buffer may be handed back to the receiver.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum RxState {
    Armed,
    /// Holding a frame that the pending hex dump still has to read.
    Held,
}

/// Everything the event loop owns. Created once, never torn down.
pub struct ProgramState {
    pending: Pending,
    /// Requested again while staged; regenerate after acceptance.
    requeued: Pending,
    /// The message currently generated into the outbox.
    staged: Option<Message>,
    outbox: Outbox,
    rx_state: RxState,
    rx_buf: [u8; RX_BUF_LEN],
    rx_len: usize,
    blink: BlinkController,
    button_pressed: bool,
    /// Send a pending release ahead of a pending press.
    release_first: bool,
    started: bool,
}

impl ProgramState {
    pub const fn new() -> Self {
        Self {
            pending: Pending::empty(),
            requeued: Pending::empty(),
            staged: None,
            outbox: Outbox::new(),
            rx_state: RxState::Armed,
            rx_buf: [0; RX_BUF_LEN],
            rx_len: 0,
            blink: BlinkController::new(),
            button_pressed: false,
            release_first: false,
            started: false,
        }
    }

    /// Bring up the platform and arm the first receive.
    pub fn setup<P: Platform>(&mut self, platform: &mut P) {
        platform.init();
        platform.blink_set(self.blink.setting());
        self.arm_rx(platform);
        log_info!("program: setup done");
    }

    /// One iteration of the event loop.
    pub fn loop_one<P: Platform>(&mut self, platform: &mut P) {
        platform.tick();

        if !self.started {
            self.started = true;
            self.request(Message::Banner);
        }

        self.poll_buttons(platform);
        self.poll_rx(platform);
        self.service_output(platform);
    }

    pub fn pending(&self) -> Pending {
        self.pending
    }

    /// `true` once the staged message has been generated but not yet accepted.
    pub fn generation_complete(&self) -> bool {
        self.staged.is_some()
    }

    pub fn staged(&self) -> Option<Message> {
        self.staged
    }

    pub fn blink_setting(&self) -> BlinkSetting {
        self.blink.setting()
    }

    pub fn button_pressed(&self) -> bool {
        self.button_pressed
    }

    pub fn rx_state(&self) -> RxState {
        self.rx_state
    }

    /// Step the blink setting, reprogram the LED and queue the status line.
    pub fn advance<P: Platform>(&mut self, platform: &mut P, increase: bool) {
        let (setting, changed) = self.blink.advance(increase);
        if changed {
            log_info!("blink: {}", setting);
            platform.blink_set(setting);
        }
        // Status text is generated later from the current setting.
        self.request(Message::BlinkStatus);
    }

    fn request(&mut self, msg: Message) {
        if self.staged == Some(msg) {
            self.requeued |= msg.flag();
        }
        self.pending |= msg.flag();
    }

    fn poll_buttons<P: Platform>(&mut self, platform: &mut P) {
        let mask = platform.button_poll_and_clear();
        if mask.is_empty() {
            return;
        }
        log_debug!("button: {}", mask);

        // The edge source only posts real transitions, so a coalesced
        // mask means the button went through both edges and is back where
        // it started: held down -> release then press, up -> press then
        // release.
        let was_pressed = self.button_pressed;
        let both = mask.contains(ButtonMask::PRESS | ButtonMask::RELEASE);
        self.release_first = both && was_pressed;

        if mask.contains(ButtonMask::PRESS) {
            // A fresh press makes an unsent release stale.
            if !both && self.staged != Some(Message::ButtonReleased) {
                self.pending.remove(Pending::BUTTON_RELEASED);
            }
            self.request(Message::ButtonPressed);
        }
        if mask.contains(ButtonMask::RELEASE) {
            self.request(Message::ButtonReleased);
        }
        self.button_pressed = if both {
            was_pressed
        } else {
            mask.contains(ButtonMask::PRESS)
        };
    }

    fn poll_rx<P: Platform>(&mut self, platform: &mut P) {
        if self.rx_state != RxState::Armed {
            return;
        }
        let len = match platform.rx_poll(&mut self.rx_buf) {
            RxCompletion::None => return,
            RxCompletion::Data(len) => len.min(RX_BUF_LEN),
        };

        let cmd = decoder::decode(&self.rx_buf[..len]);
        log_debug!("rx: {} bytes -> {}", len, cmd);
        match cmd {
            Command::Refresh => {
                self.request(Message::Banner);
                self.arm_rx(platform);
            }
            Command::Advance { increase } => {
                self.advance(platform, increase);
                self.arm_rx(platform);
            }
            Command::Opaque => {
                // Keep the frame until the hex dump is generated from it.
                self.rx_len = len;
                self.rx_state = RxState::Held;
                self.request(Message::HexDump);
            }
        }
    }

    fn arm_rx<P: Platform>(&mut self, platform: &mut P) {
        self.rx_state = RxState::Armed;
        platform.rx_arm(RX_BUF_LEN);
    }

    fn service_output<P: Platform>(&mut self, platform: &mut P) {
        // Bounded pass; a requeued kind may go out twice if the
        // transmitter is idle again right after accepting it.
        for _ in 0..Message::PRIORITY.len() {
            if platform.tx_busy() {
                return;
            }

            let msg = match self.staged {
                Some(msg) => msg,
                None => {
                    let Some(msg) = self.next_pending() else {
                        return;
                    };
                    if let Err(e) = self.generate(platform, msg) {
                        log_error!("output: dropping {}: {}", msg, e);
                        self.pending.remove(msg.flag());
                        self.requeued.remove(msg.flag());
                        continue;
                    }
                    self.staged = Some(msg);
                    msg
                }
            };

            if !self.outbox.offer(platform) {
                // Backpressure; the staged message is retried next time.
                return;
            }
            log_debug!("output: sent {} ({} bytes)", msg, self.outbox.byte_len());
            self.staged = None;
            self.pending.remove(msg.flag() - self.requeued);
            self.requeued.remove(msg.flag());
        }
    }

    fn next_pending(&self) -> Option<Message> {
        let swap = self.release_first
            && self
                .pending
                .contains(Pending::BUTTON_PRESSED | Pending::BUTTON_RELEASED);
        Message::PRIORITY
            .into_iter()
            .map(|m| match m {
                Message::ButtonPressed if swap => Message::ButtonReleased,
                Message::ButtonReleased if swap => Message::ButtonPressed,
                other => other,
            })
            .find(|m| self.pending.contains(m.flag()))
    }

    /// Build `msg` into the outbox. Only called with nothing staged and the
    /// transmitter idle.
    fn generate<P: Platform>(&mut self, platform: &mut P, msg: Message) -> Result<(), Error> {
        self.outbox.clear();
        match msg {
            Message::Banner => {
                self.outbox.push_static(terminal::BANNER_HEAD)?;
                self.outbox.push_static(terminal::button_label(self.button_pressed))?;
                self.outbox.push_static(terminal::BANNER_MID)?;
                self.outbox.push_static(self.blink.setting().label())?;
            }
            Message::ButtonPressed => {
                self.outbox.push_static(terminal::CUP_BUTTON)?;
                self.outbox.push_static(terminal::BUTTON_PRESSED)?;
            }
            Message::ButtonReleased => {
                self.outbox.push_static(terminal::CUP_BUTTON)?;
                self.outbox.push_static(terminal::BUTTON_RELEASED)?;
            }
            Message::BlinkStatus => {
                self.outbox.push_static(terminal::CUP_BLINK)?;
                self.outbox.push_static(self.blink.setting().label())?;
            }
            Message::HexDump => {
                let frame = &self.rx_buf[..self.rx_len];
                decoder::write_hex_dump(frame, self.outbox.scratch_mut());
                self.rx_len = 0;
                // The frame now lives in scratch; the buffer can be reused.
                if self.rx_state == RxState::Held {
                    self.arm_rx(platform);
                }
                self.outbox.push_static(terminal::CUP_RECEIVED)?;
                self.outbox.push_scratch()?;
            }
        }
        Ok(())
    }
}

impl Default for ProgramState {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::platform::mock::MockPlatform;

    fn started() -> (ProgramState, MockPlatform) {
        let mut ps = ProgramState::new();
        let mut p = MockPlatform::new();
        ps.setup(&mut p);
        (ps, p)
    }

    /// Run until the banner is out and the transmitter is idle again.
    fn settled() -> (ProgramState, MockPlatform) {
        let (mut ps, mut p) = started();
        ps.loop_one(&mut p);
        assert_eq!(p.sent.len(), 1);
        p.sent.clear();
        (ps, p)
    }

    #[test]
    fn setup_inits_once_and_arms_receiver() {
        let (ps, p) = started();
        assert_eq!(p.inits, 1);
        assert_eq!(p.rx_armed, Some(RX_BUF_LEN));
        assert_eq!(p.blink, vec![BlinkSetting::Off]);
        assert_eq!(ps.rx_state(), RxState::Armed);
    }

    #[test]
    fn ticks_once_per_iteration() {
        let (mut ps, mut p) = started();
        for _ in 0..5 {
            ps.loop_one(&mut p);
        }
        assert_eq!(p.ticks, 5);
    }

    #[test]
    fn banner_is_sent_once_on_first_iteration() {
        let (mut ps, mut p) = started();
        ps.loop_one(&mut p);
        assert_eq!(p.sent.len(), 1);
        let text = p.sent_text(0);
        assert!(text.starts_with("\x1b[0m\x1b[2J\x1b[1;1H"));
        assert!(text.contains("On-board button: [Released]"));
        assert!(text.ends_with("Blink Setting: [   OFF  ]"));
        assert!(ps.pending().is_empty());
        assert!(!ps.generation_complete());

        for _ in 0..10 {
            ps.loop_one(&mut p);
        }
        assert_eq!(p.sent.len(), 1);
    }

    #[test]
    fn banner_waits_for_idle_transmitter() {
        let (mut ps, mut p) = started();
        // Busy through the first two ticks.
        p.set_busy(3);

        ps.loop_one(&mut p);
        assert!(ps.pending().contains(Pending::BANNER));
        assert!(p.sent.is_empty());

        ps.loop_one(&mut p);
        assert!(p.sent.is_empty());

        ps.loop_one(&mut p);
        assert_eq!(p.sent.len(), 1);
        assert_eq!(p.tx_while_busy, 0);
        assert!(ps.pending().is_empty());
    }

    #[test]
    fn refused_transfer_stays_staged_without_regenerating() {
        let (mut ps, mut p) = started();
        p.refuse = true;
        ps.loop_one(&mut p);
        assert_eq!(ps.staged(), Some(Message::Banner));
        assert!(ps.generation_complete());
        assert!(ps.pending().contains(Pending::BANNER));

        // A button edge while the banner is staged must not overwrite it.
        p.buttons = ButtonMask::PRESS;
        ps.loop_one(&mut p);
        assert_eq!(ps.staged(), Some(Message::Banner));

        p.refuse = false;
        ps.loop_one(&mut p);
        assert!(p.sent_text(0).starts_with("\x1b[0m"));
        assert_eq!(p.sent_text(1), "\x1b[11;19HPressed] ");
        assert!(ps.pending().is_empty());
    }

    #[test]
    fn never_transmits_while_busy() {
        let (mut ps, mut p) = started();
        p.busy_after_accept = 3;
        let script: [&[u8]; 6] = [b"d", b"x", b"\x05", b"\x1b[D", b"zz", b"D"];
        for (i, keys) in script.iter().enumerate() {
            p.type_bytes(keys);
            if i % 2 == 0 {
                p.buttons = ButtonMask::PRESS | ButtonMask::RELEASE;
            }
            for _ in 0..4 {
                ps.loop_one(&mut p);
            }
        }
        for _ in 0..100 {
            ps.loop_one(&mut p);
        }
        assert_eq!(p.tx_while_busy, 0);
        assert!(ps.pending().is_empty());
        assert!(p.rx_queue.is_empty());
    }

    #[test]
    fn coalesced_button_mask_yields_both_updates() {
        let (mut ps, mut p) = settled();
        p.buttons = ButtonMask::PRESS | ButtonMask::RELEASE;
        ps.loop_one(&mut p);
        assert_eq!(p.sent.len(), 2);
        assert_eq!(p.sent_text(0), "\x1b[11;19HPressed] ");
        assert_eq!(p.sent_text(1), "\x1b[11;19HReleased]");
        assert!(!ps.button_pressed());
    }

    #[test]
    fn coalesced_mask_while_held_ends_pressed() {
        let (mut ps, mut p) = settled();
        p.buttons = ButtonMask::PRESS;
        ps.loop_one(&mut p);
        p.sent.clear();

        // Released and pressed again between two polls.
        p.buttons = ButtonMask::RELEASE | ButtonMask::PRESS;
        ps.loop_one(&mut p);
        assert_eq!(p.sent.len(), 2);
        assert_eq!(p.sent_text(0), "\x1b[11;19HReleased]");
        assert_eq!(p.sent_text(1), "\x1b[11;19HPressed] ");
        assert!(ps.button_pressed());
        assert!(ps.pending().is_empty());

        p.type_bytes(b"\x05");
        ps.loop_one(&mut p);
        assert!(p.sent_text(2).contains("On-board button: [Pressed] "));
    }

    #[test]
    fn coalesced_mask_while_held_waits_for_idle_link() {
        let (mut ps, mut p) = settled();
        p.buttons = ButtonMask::PRESS;
        ps.loop_one(&mut p);
        p.sent.clear();

        p.busy_after_accept = 1;
        p.buttons = ButtonMask::PRESS | ButtonMask::RELEASE;
        for _ in 0..4 {
            ps.loop_one(&mut p);
        }
        assert_eq!(p.tx_while_busy, 0);
        assert_eq!(p.sent_text(0), "\x1b[11;19HReleased]");
        assert_eq!(p.sent_text(1), "\x1b[11;19HPressed] ");
        assert!(ps.button_pressed());
    }

    #[test]
    fn press_supersedes_unsent_release() {
        let (mut ps, mut p) = settled();
        p.refuse = true;
        p.buttons = ButtonMask::RELEASE;
        ps.loop_one(&mut p);
        assert_eq!(ps.staged(), Some(Message::ButtonReleased));

        // Staged release still goes out; the press follows it.
        p.buttons = ButtonMask::PRESS;
        ps.loop_one(&mut p);
        p.refuse = false;
        ps.loop_one(&mut p);
        assert_eq!(p.sent_text(0), "\x1b[11;19HReleased]");
        assert_eq!(p.sent_text(1), "\x1b[11;19HPressed] ");
        assert!(ps.button_pressed());
    }

    #[test]
    fn arrow_keys_and_aliases_step_blink_setting() {
        let (mut ps, mut p) = settled();

        p.type_bytes(b"\x1b[C");
        ps.loop_one(&mut p);
        assert_eq!(ps.blink_setting(), BlinkSetting::Slow);
        assert_eq!(p.sent_text(0), "\x1b[12;16H[  SLOW  ]");

        p.type_bytes(b"D");
        ps.loop_one(&mut p);
        assert_eq!(ps.blink_setting(), BlinkSetting::Medium);

        p.type_bytes(b"a");
        ps.loop_one(&mut p);
        p.type_bytes(b"\x1b[D");
        ps.loop_one(&mut p);
        assert_eq!(ps.blink_setting(), BlinkSetting::Off);
        assert_eq!(
            p.blink,
            vec![
                BlinkSetting::Off,
                BlinkSetting::Slow,
                BlinkSetting::Medium,
                BlinkSetting::Slow,
                BlinkSetting::Off,
            ]
        );
        assert_eq!(p.sent.len(), 4);
    }

    #[test]
    fn boundary_step_still_echoes_status_without_touching_led() {
        let (mut ps, mut p) = settled();
        p.type_bytes(b"a");
        ps.loop_one(&mut p);
        assert_eq!(ps.blink_setting(), BlinkSetting::Off);
        assert_eq!(p.blink, vec![BlinkSetting::Off]);
        assert_eq!(p.sent_text(0), "\x1b[12;16H[   OFF  ]");
    }

    #[test]
    fn blink_status_reflects_latest_setting() {
        let (mut ps, mut p) = settled();
        p.busy_after_accept = 2;
        p.type_bytes(b"d");
        ps.loop_one(&mut p);
        assert_eq!(p.sent_text(0), "\x1b[12;16H[  SLOW  ]");

        // Two more steps while the first status is still on the wire.
        p.type_bytes(b"d");
        ps.loop_one(&mut p);
        p.type_bytes(b"d");
        ps.loop_one(&mut p);
        for _ in 0..5 {
            ps.loop_one(&mut p);
        }
        assert_eq!(p.sent.len(), 2);
        assert_eq!(p.sent_text(1), "\x1b[12;16H[  FAST  ]");
    }

    #[test]
    fn requeue_while_staged_regenerates_after_accept() {
        let (mut ps, mut p) = settled();
        p.refuse = true;
        p.type_bytes(b"d");
        ps.loop_one(&mut p);
        assert_eq!(ps.staged(), Some(Message::BlinkStatus));

        p.type_bytes(b"d");
        ps.loop_one(&mut p);
        p.refuse = false;
        ps.loop_one(&mut p);
        // Idle link: both copies leave in the same iteration.
        assert_eq!(p.sent.len(), 2);
        assert_eq!(p.sent_text(0), "\x1b[12;16H[  SLOW  ]");
        assert_eq!(p.sent_text(1), "\x1b[12;16H[ MEDIUM ]");
        assert!(ps.pending().is_empty());
    }

    #[test]
    fn refresh_sets_banner_never_update() {
        let keys: [&[u8]; 2] = [b"\x05", b"\x1b[H"];
        for keys in keys {
            let (mut ps, mut p) = settled();
            p.refuse = true;
            p.type_bytes(keys);
            ps.loop_one(&mut p);
            assert!(ps.pending().contains(Pending::BANNER));
            assert!(!ps.pending().contains(Pending::UPDATE));
            assert_eq!(ps.rx_state(), RxState::Armed);
        }
    }

    #[test]
    fn refreshed_banner_shows_live_state() {
        let (mut ps, mut p) = settled();
        p.buttons = ButtonMask::PRESS;
        p.type_bytes(b"d");
        ps.loop_one(&mut p);
        p.sent.clear();

        p.type_bytes(b"\x05");
        ps.loop_one(&mut p);
        let banner = p.sent_text(0);
        assert!(banner.contains("On-board button: [Pressed] "));
        assert!(banner.ends_with("Blink Setting: [  SLOW  ]"));
    }

    #[test]
    fn opaque_frame_is_echoed_as_hex() {
        let (mut ps, mut p) = settled();
        p.type_bytes(b"\x1b[A");
        ps.loop_one(&mut p);
        assert_eq!(p.sent_text(0), "\x1b[14;1H\x1b[0KReceived: 1B 5B 41 Pressed");
        assert_eq!(ps.rx_state(), RxState::Armed);
    }

    #[test]
    fn receiver_held_until_hex_dump_generated() {
        let (mut ps, mut p) = settled();
        p.set_busy(3);
        let arms = p.rx_arms;

        p.type_bytes(b"xyz");
        p.type_bytes(b"q");
        ps.loop_one(&mut p);
        assert_eq!(ps.rx_state(), RxState::Held);
        assert_eq!(p.rx_arms, arms);

        ps.loop_one(&mut p);
        assert_eq!(ps.rx_state(), RxState::Held);
        // The second frame has not been read over the first.
        assert_eq!(p.rx_queue.len(), 1);

        ps.loop_one(&mut p);
        assert_eq!(p.sent_text(0), "\x1b[14;1H\x1b[0KReceived: 78 79 7A Pressed");
        assert_eq!(ps.rx_state(), RxState::Armed);
        assert_eq!(p.rx_arms, arms + 1);

        ps.loop_one(&mut p);
        assert_eq!(p.sent_text(1), "\x1b[14;1H\x1b[0KReceived: 71 Pressed");
    }

    #[test]
    fn full_receive_buffer_fits_scratch() {
        let (mut ps, mut p) = settled();
        p.type_bytes(&[0xEE; 20]);
        ps.loop_one(&mut p);
        let text = p.sent_text(0);
        let dump = text.trim_start_matches("\x1b[14;1H\x1b[0KReceived: ");
        assert_eq!(dump.matches("EE").count(), RX_BUF_LEN);
        assert!(dump.ends_with(" Pressed"));
    }

    #[test]
    fn banner_is_served_before_updates() {
        let (mut ps, mut p) = started();
        p.buttons = ButtonMask::PRESS;
        p.busy_after_accept = 1;
        ps.loop_one(&mut p);
        assert_eq!(p.sent.len(), 1);
        assert!(p.sent_text(0).starts_with("\x1b[0m"));
        ps.loop_one(&mut p);
        assert_eq!(p.sent_text(1), "\x1b[11;19HPressed] ");
    }
}
