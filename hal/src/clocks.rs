//! 晶振、PLL_SYS 与时钟切换。
//!
//! VCO 固定在 1500 MHz，系统时钟只靠两级后分频改变，
//! 所以能设的频率是 1500 MHz 除以 1..=49 中可以拆成两个 1..=7 之积的数。
//! clk_ref 与 clk_peri 始终来自晶振，改系统时钟不影响定时器与串口。

use crate::{pac, resets};
use core::fmt;

pub const XOSC_HZ: u32 = 12_000_000;
pub const VCO_KHZ: u32 = 1_500_000;
const FBDIV: u32 = VCO_KHZ / (XOSC_HZ / 1000);

/// 无法用固定 VCO 得到的系统时钟。
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Unreachable(pub u32);

impl fmt::Display for Unreachable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} kHz is not reachable from a {VCO_KHZ} kHz VCO", self.0)
    }
}

/// 求两级后分频，第一级不小于第二级。
pub const fn post_dividers(khz: u32) -> Option<(u32, u32)> {
    if khz == 0 || VCO_KHZ % khz != 0 {
        return None;
    }
    let div = VCO_KHZ / khz;
    let mut pd1 = 7;
    while pd1 > 0 {
        if div % pd1 == 0 && div / pd1 <= pd1 {
            return Some((pd1, div / pd1));
        }
        pd1 -= 1;
    }
    None
}

pub struct Clocks {
    clocks: pac::CLOCKS,
    pll: pac::PLL_SYS,
    sys_khz: u32,
}

impl Clocks {
    /// 启动晶振，clk_ref/clk_peri 切到晶振，系统时钟设为 `sys_khz`。
    ///
    /// 同时开启看门狗的 1 µs tick，供定时器使用。
    pub fn init(
        xosc: pac::XOSC,
        clocks: pac::CLOCKS,
        pll: pac::PLL_SYS,
        watchdog: &pac::WATCHDOG,
        resets: &mut pac::RESETS,
        sys_khz: u32,
    ) -> Result<Self, Unreachable> {
        let (pd1, pd2) = post_dividers(sys_khz).ok_or(Unreachable(sys_khz))?;
        // 1-15 MHz 档位，启动延时以 256 个周期为单位
        xosc.ctrl().write(|w| unsafe { w.bits(0xaa0) });
        xosc.startup()
            .write(|w| unsafe { w.bits((XOSC_HZ / 1000).div_ceil(256)) });
        xosc.ctrl().write(|w| unsafe { w.bits(0xfab << 12 | 0xaa0) });
        while xosc.status().read().bits() & (1 << 31) == 0 {
            core::hint::spin_loop();
        }

        // clk_ref <- xosc
        clocks.clk_ref_ctrl().write(|w| unsafe { w.bits(2) });
        while clocks.clk_ref_selected().read().bits() != 1 << 2 {
            core::hint::spin_loop();
        }
        watchdog
            .tick()
            .write(|w| unsafe { w.bits(1 << 9 | XOSC_HZ / 1_000_000) });

        let mut this = Self {
            clocks,
            pll,
            sys_khz: 0,
        };
        this.park_sys();
        resets::cycle(resets, resets::PLL_SYS);
        this.pll.cs().write(|w| unsafe { w.bits(1) });
        this.pll.fbdiv_int().write(|w| unsafe { w.bits(FBDIV) });
        // 打开主电源与 VCO
        this.pll
            .pwr()
            .modify(|r, w| unsafe { w.bits(r.bits() & !(1 << 0 | 1 << 5)) });
        while this.pll.cs().read().bits() & (1 << 31) == 0 {
            core::hint::spin_loop();
        }
        this.apply_post_dividers(pd1, pd2);
        this.pll
            .pwr()
            .modify(|r, w| unsafe { w.bits(r.bits() & !(1 << 3)) });
        this.unpark_sys();
        this.sys_khz = sys_khz;

        // clk_peri <- xosc
        this.clocks
            .clk_peri_ctrl()
            .write(|w| unsafe { w.bits(1 << 11 | 4 << 5) });
        Ok(this)
    }

    #[inline]
    pub fn sys_khz(&self) -> u32 {
        self.sys_khz
    }

    /// 运行中改变系统时钟。切换期间系统时钟暂时挂在 clk_ref 上。
    pub fn set_sys_khz(&mut self, khz: u32) -> Result<(), Unreachable> {
        let (pd1, pd2) = post_dividers(khz).ok_or(Unreachable(khz))?;
        if khz == self.sys_khz {
            return Ok(());
        }
        self.park_sys();
        self.apply_post_dividers(pd1, pd2);
        self.unpark_sys();
        self.sys_khz = khz;
        Ok(())
    }

    fn apply_post_dividers(&mut self, pd1: u32, pd2: u32) {
        self.pll
            .prim()
            .write(|w| unsafe { w.bits(pd1 << 16 | pd2 << 12) });
    }

    /// clk_sys <- clk_ref
    fn park_sys(&mut self) {
        self.clocks
            .clk_sys_ctrl()
            .modify(|r, w| unsafe { w.bits(r.bits() & !1) });
        while self.clocks.clk_sys_selected().read().bits() != 1 {
            core::hint::spin_loop();
        }
    }

    /// clk_sys <- pll_sys
    fn unpark_sys(&mut self) {
        self.clocks
            .clk_sys_ctrl()
            .write(|w| unsafe { w.bits(0) });
        self.clocks.clk_sys_ctrl().write(|w| unsafe { w.bits(1) });
        while self.clocks.clk_sys_selected().read().bits() != 1 << 1 {
            core::hint::spin_loop();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::post_dividers;

    #[test]
    fn boost_and_base() {
        assert_eq!(post_dividers(250_000), Some((6, 1)));
        assert_eq!(post_dividers(125_000), Some((6, 2)));
        assert_eq!(post_dividers(50_000), Some((6, 5)));
    }

    #[test]
    fn unreachable() {
        assert_eq!(post_dividers(0), None);
        assert_eq!(post_dividers(133_000), None);
        // 32 与 50 都拆不成两个不大于 7 的因数
        assert_eq!(post_dividers(46_875), None);
        assert_eq!(post_dividers(30_000), None);
    }
}
