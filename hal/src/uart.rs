//! UART0 发送端，8N1，时钟来自 clk_peri。

use crate::{
    gpio::{self, Function},
    pac, resets,
};
use core::fmt;

const FR_TXFF: u32 = 1 << 5;

/// 波特率除数：整数部分与 6 位小数部分。
pub const fn divisors(clk_hz: u32, baud: u32) -> (u32, u32) {
    let div = 8 * clk_hz / baud;
    let int = div >> 7;
    match int {
        0 => (1, 0),
        65535.. => (65535, 0),
        _ => (int, ((div & 0x7f) + 1) / 2),
    }
}

pub struct Uart {
    _block: pac::UART0,
}

impl Uart {
    /// 初始化 UART0 并把 `tx` 脚切给它。需要先初始化 GPIO 与 clk_peri。
    pub fn new(block: pac::UART0, resets: &mut pac::RESETS, tx: u8, clk_hz: u32, baud: u32) -> Self {
        resets::cycle(resets, resets::UART0);
        let (int, frac) = divisors(clk_hz, baud);
        let uart = uart0();
        uart.uartibrd().write(|w| unsafe { w.bits(int) });
        uart.uartfbrd().write(|w| unsafe { w.bits(frac) });
        // 8 位数据，打开 FIFO；写 LCR_H 同时锁存除数
        uart.uartlcr_h().write(|w| unsafe { w.bits(3 << 5 | 1 << 4) });
        // UARTEN | TXE
        uart.uartcr().write(|w| unsafe { w.bits(1 << 0 | 1 << 8) });
        gpio::set_function(tx, Function::Uart);
        Self { _block: block }
    }
}

/// 已初始化的 UART0 的写端，可以随意复制。
#[derive(Clone, Copy)]
pub struct Writer(());

impl Writer {
    /// 不经初始化直接取得写端，用于全局日志这类只能在编译期构造的对象。
    ///
    /// # Safety
    ///
    /// 写之前 UART0 必须已经由 [`Uart::new`] 初始化。
    #[inline]
    pub const unsafe fn steal() -> Self {
        Self(())
    }

    pub fn write_bytes(&self, bytes: &[u8]) {
        let uart = uart0();
        for &b in bytes {
            // 等待 FIFO 空位
            while uart.uartfr().read().bits() & FR_TXFF != 0 {
                core::hint::spin_loop();
            }
            uart.uartdr().write(|w| unsafe { w.bits(b as u32) });
        }
    }
}

impl fmt::Write for Writer {
    #[inline]
    fn write_str(&mut self, s: &str) -> fmt::Result {
        self.write_bytes(s.as_bytes());
        Ok(())
    }
}

#[inline(always)]
fn uart0() -> &'static pac::uart0::RegisterBlock {
    unsafe { &*pac::UART0::PTR }
}

#[cfg(test)]
mod tests {
    use super::divisors;

    #[test]
    fn baud_from_crystal() {
        // 12 MHz / (16 * 115200) = 6.51
        assert_eq!(divisors(12_000_000, 115_200), (6, 33));
        assert_eq!(divisors(12_000_000, 1_000_000_000), (1, 0));
    }
}
