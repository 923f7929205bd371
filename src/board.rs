//! nRF52840-DK implementation of the event-loop platform.
//!
//! Each hardware service runs as its own Embassy task and talks to the
//! loop through `Signal`s and atomics, so every `Platform` call made by
//! the loop returns immediately:
//!
//! - transmit: the loop hands a flattened frame to `tx_task`, which owns
//!   the UARTE TX half and clears `TX_BUSY` when the DMA finishes.
//! - receive: `rx_task` waits for an arm request, reads until the line
//!   goes idle, and parks the frame for `rx_poll`.
//! - button: `button_task` debounces edges and posts them to the mailbox.
//! - blink: `blink_task` owns the LED and its toggle timer.

use core::sync::atomic::{AtomicBool, Ordering};

use defmt::{debug, error, info, warn};
use embassy_futures::select::{select, Either};
use embassy_nrf::gpio::{Input, Output};
use embassy_nrf::peripherals::{TIMER0, UARTE0};
use embassy_nrf::uarte::{UarteRxWithIdle, UarteTx};
use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use embassy_sync::signal::Signal;
use embassy_time::{Duration, Instant, Timer};
use heapless::Vec;

use termblink::config::{
    BUTTON_DEBOUNCE_MS, LOOP_STATS_INTERVAL_SECS, RX_BUF_LEN, TX_FRAME_CAP, UART_BAUD,
};
use termblink::outbox::flatten;
use termblink::{BlinkSetting, ButtonMailbox, ButtonMask, Platform, RxCompletion};

type TxFrame = Vec<u8, TX_FRAME_CAP>;
type RxFrame = Vec<u8, RX_BUF_LEN>;

static TX_BUSY: AtomicBool = AtomicBool::new(false);
static TX_FRAME: Signal<CriticalSectionRawMutex, TxFrame> = Signal::new();
static RX_ARM: Signal<CriticalSectionRawMutex, usize> = Signal::new();
static RX_DONE: Signal<CriticalSectionRawMutex, RxFrame> = Signal::new();
static BUTTONS: ButtonMailbox = ButtonMailbox::new();
static BLINK: Signal<CriticalSectionRawMutex, BlinkSetting> = Signal::new();

/// Handle the event loop uses to reach the board tasks.
pub struct BoardPlatform {
    iterations: u32,
    stats_since: Instant,
}

impl BoardPlatform {
    /// The tasks must already be spawned.
    pub fn new() -> Self {
        Self {
            iterations: 0,
            stats_since: Instant::now(),
        }
    }
}

impl Platform for BoardPlatform {
    fn init(&mut self) {
        TX_BUSY.store(false, Ordering::Release);
        self.stats_since = Instant::now();
        info!("board: UARTE0 at {} baud", UART_BAUD);
    }

    fn tick(&mut self) {
        self.iterations = self.iterations.wrapping_add(1);
        let elapsed = self.stats_since.elapsed();
        if elapsed >= Duration::from_secs(LOOP_STATS_INTERVAL_SECS) {
            debug!(
                "loop: {} iterations in {} ms",
                self.iterations,
                elapsed.as_millis()
            );
            self.iterations = 0;
            self.stats_since = Instant::now();
        }
    }

    fn tx_try(&mut self, segments: &[&[u8]]) -> bool {
        if TX_BUSY.load(Ordering::Acquire) {
            return false;
        }
        match flatten::<TX_FRAME_CAP>(segments) {
            Ok(frame) => {
                TX_BUSY.store(true, Ordering::Release);
                TX_FRAME.signal(frame);
            }
            // Refusing would make the loop retry it forever.
            Err(e) => error!("tx: dropped transfer: {}", e),
        }
        true
    }

    fn tx_busy(&self) -> bool {
        TX_BUSY.load(Ordering::Acquire)
    }

    fn rx_arm(&mut self, max_len: usize) {
        RX_ARM.signal(max_len.min(RX_BUF_LEN));
    }

    fn rx_poll(&mut self, buf: &mut [u8]) -> RxCompletion {
        match RX_DONE.try_take() {
            Some(frame) => {
                let n = frame.len().min(buf.len());
                buf[..n].copy_from_slice(&frame[..n]);
                RxCompletion::Data(n)
            }
            None => RxCompletion::None,
        }
    }

    fn button_poll_and_clear(&mut self) -> ButtonMask {
        BUTTONS.poll_and_clear()
    }

    fn blink_set(&mut self, setting: BlinkSetting) {
        BLINK.signal(setting);
    }
}

/// Sends one frame at a time; `TX_BUSY` covers the whole DMA transfer.
#[embassy_executor::task]
pub async fn tx_task(mut tx: UarteTx<'static, UARTE0>) -> ! {
    loop {
        let frame = TX_FRAME.wait().await;
        if let Err(e) = tx.write(&frame).await {
            warn!("tx: write failed: {}", e);
        }
        TX_BUSY.store(false, Ordering::Release);
    }
}

/// One receive per arm request. A frame ends when the line goes idle,
/// which keeps an escape sequence together.
#[embassy_executor::task]
pub async fn rx_task(mut rx: UarteRxWithIdle<'static, UARTE0, TIMER0>) -> ! {
    let mut buf = [0u8; RX_BUF_LEN];
    loop {
        let max_len = RX_ARM.wait().await;
        loop {
            match rx.read_until_idle(&mut buf[..max_len]).await {
                Ok(0) => continue,
                Ok(n) => {
                    let mut frame = RxFrame::new();
                    // n <= RX_BUF_LEN
                    let _ = frame.extend_from_slice(&buf[..n]);
                    RX_DONE.signal(frame);
                    break;
                }
                Err(e) => warn!("rx: read failed: {}", e),
            }
        }
    }
}

/// Debounced edge source for the active-low on-board button.
#[embassy_executor::task]
pub async fn button_task(mut btn: Input<'static>) -> ! {
    let mut pressed = btn.is_low();
    loop {
        btn.wait_for_any_edge().await;

        // Debounce: wait and re-check.
        Timer::after(Duration::from_millis(BUTTON_DEBOUNCE_MS)).await;

        let now = btn.is_low();
        if now == pressed {
            continue;
        }
        pressed = now;
        BUTTONS.post(if pressed {
            ButtonMask::PRESS
        } else {
            ButtonMask::RELEASE
        });
    }
}

/// Drives the active-low LED for the current blink setting.
#[embassy_executor::task]
pub async fn blink_task(mut led: Output<'static>) -> ! {
    let mut setting = BLINK.wait().await;
    loop {
        match (setting.steady_level(), setting.toggle_interval_ms()) {
            (Some(lit), _) => {
                if lit {
                    led.set_low();
                } else {
                    led.set_high();
                }
                setting = BLINK.wait().await;
            }
            (None, Some(ms)) => {
                match select(BLINK.wait(), Timer::after(Duration::from_millis(ms))).await {
                    Either::First(next) => setting = next,
                    Either::Second(()) => led.toggle(),
                }
            }
            (None, None) => setting = BLINK.wait().await,
        }
    }
}
