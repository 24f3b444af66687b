#![no_std]
#![no_main]

mod board;
mod logging;
mod program;

use board::Pico;
use common::{memory::Region, Origin, TransferConfig};
use core::panic::PanicInfo;
use cortex_m_rt::entry;
use exi::Board;
use hal::{
    clocks::{Clocks, XOSC_HZ},
    dma::Dma,
    gpio::{self, Output},
    pac,
    pio::Pio,
    resets,
    time::Timer,
    uart::Uart,
};
use log::{error, info, warn};

/// 二级引导，配置 XIP。
#[link_section = ".boot2"]
#[used]
pub static BOOT2_FIRMWARE: [u8; 256] = rp2040_boot2::BOOT_LOADER_W25Q080;

include!(concat!(env!("OUT_DIR"), "/ipl.rs"));

const BAUD: u32 = 115_200;
const UART_TX: u8 = 0;

#[entry]
fn main() -> ! {
    let config = TransferConfig::DEFAULT;
    // SAFETY: 入口只执行一次，外设在这里一次性分发
    let p = unsafe { pac::Peripherals::steal() };
    let mut resets = p.RESETS;

    let clocks = match Clocks::init(
        p.XOSC,
        p.CLOCKS,
        p.PLL_SYS,
        &p.WATCHDOG,
        &mut resets,
        config.base_khz,
    ) {
        Ok(clocks) => clocks,
        Err(e) => panic!("{e}"),
    };
    gpio::init(&mut resets);
    let uart = Uart::new(p.UART0, &mut resets, UART_TX, XOSC_HZ, BAUD);
    logging::init(&uart);
    info!(
        "ipl streamer: cs {} clk {} data {}",
        config.pins.cs, config.pins.clk, config.pins.data
    );

    let timer = Timer::new(p.TIMER, &mut resets);
    let pio = Pio::new(p.PIO0, &mut resets);
    resets::unreset(&mut resets, resets::BUSCTRL);
    let mut dma = Dma::new(p.DMA, &mut resets);
    dma.prioritize(&p.BUSCTRL);
    let led = Output::new(config.pins.led);

    // SAFETY: 外部载荷区在固件之后，运行期间不会被擦写
    let external = unsafe { Region::EXTERNAL_IPL.as_words() };
    let mut board = Pico::new(clocks, pio, dma, timer, led);
    match exi::cycle(&mut board, &config, external, &DEFAULT_IPL) {
        Ok(outcome) => {
            if let Origin::Fallback(reason) = outcome.origin {
                warn!("streamed the default payload ({reason})");
            }
            info!("boot read served: {} words", outcome.words);
        }
        Err(e) => panic!("boot cycle aborted: {e}"),
    }
    board.idle()
}

#[panic_handler]
fn panic(info: &PanicInfo) -> ! {
    error!("{info}");
    loop {
        core::hint::spin_loop();
    }
}
