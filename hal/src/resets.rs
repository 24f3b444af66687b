//! 子系统复位控制。

use crate::pac;

pub const BUSCTRL: u32 = 1 << 1;
pub const DMA: u32 = 1 << 2;
pub const IO_BANK0: u32 = 1 << 5;
pub const PADS_BANK0: u32 = 1 << 8;
pub const PIO0: u32 = 1 << 10;
pub const PLL_SYS: u32 = 1 << 12;
pub const TIMER: u32 = 1 << 21;
pub const UART0: u32 = 1 << 22;

/// 解除复位并等待完成。
pub fn unreset(resets: &mut pac::RESETS, mask: u32) {
    resets
        .reset()
        .modify(|r, w| unsafe { w.bits(r.bits() & !mask) });
    while resets.reset_done().read().bits() & mask != mask {
        core::hint::spin_loop();
    }
}

/// 复位后再解除，外设回到上电状态。
pub fn cycle(resets: &mut pac::RESETS, mask: u32) {
    resets
        .reset()
        .modify(|r, w| unsafe { w.bits(r.bits() | mask) });
    unreset(resets, mask);
}
