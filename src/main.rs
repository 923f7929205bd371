//! termblink - serial terminal blink demo for nRF52840-DK.
//!
//! The interactive part is a cooperative event loop (`termblink::program`)
//! run from the main task. Hardware services are separate Embassy tasks
//! behind `board::BoardPlatform`.

#![no_std]
#![no_main]

mod board;

use defmt::{info, unwrap};
use embassy_executor::Spawner;
use embassy_futures::yield_now;
use embassy_nrf::gpio::{Input, Level, Output, OutputDrive, Pull};
use embassy_nrf::{bind_interrupts, peripherals, uarte};
use {defmt_rtt as _, panic_probe as _};

use termblink::config::UART_BAUD;
use termblink::ProgramState;

bind_interrupts!(struct Irqs {
    UARTE0_UART0 => uarte::InterruptHandler<peripherals::UARTE0>;
});

fn baudrate(baud: u32) -> uarte::Baudrate {
    match baud {
        9_600 => uarte::Baudrate::BAUD9600,
        57_600 => uarte::Baudrate::BAUD57600,
        230_400 => uarte::Baudrate::BAUD230400,
        460_800 => uarte::Baudrate::BAUD460800,
        1_000_000 => uarte::Baudrate::BAUD1M,
        _ => uarte::Baudrate::BAUD115200,
    }
}

#[embassy_executor::main]
async fn main(spawner: Spawner) {
    info!("termblink v{}", env!("CARGO_PKG_VERSION"));
    let p = embassy_nrf::init(Default::default());

    // Serial link (virtual COM port)
    let mut config = uarte::Config::default();
    config.parity = uarte::Parity::EXCLUDED;
    config.baudrate = baudrate(UART_BAUD);
    let uart = uarte::Uarte::new(p.UARTE0, Irqs, p.P0_08, p.P0_06, config);
    let (tx, rx) = uart.split_with_idle(p.TIMER0, p.PPI_CH0, p.PPI_CH1);

    // Button 1 and LED 1, both active-low
    let button = Input::new(p.P0_11, Pull::Up);
    let led = Output::new(p.P0_13, Level::High, OutputDrive::Standard);

    unwrap!(spawner.spawn(board::tx_task(tx)));
    unwrap!(spawner.spawn(board::rx_task(rx)));
    unwrap!(spawner.spawn(board::button_task(button)));
    unwrap!(spawner.spawn(board::blink_task(led)));

    let mut platform = board::BoardPlatform::new();
    let mut state = ProgramState::new();
    state.setup(&mut platform);

    loop {
        state.loop_one(&mut platform);
        yield_now().await;
    }
}
