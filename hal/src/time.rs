//! 1 MHz 定时器与阻塞延时。

use crate::{pac, resets};
use embedded_hal::delay::DelayNs;

/// 定时器以看门狗的 1 µs tick 计数，需要先初始化时钟。
pub struct Timer {
    _block: pac::TIMER,
}

impl Timer {
    pub fn new(block: pac::TIMER, resets: &mut pac::RESETS) -> Self {
        resets::unreset(resets, resets::TIMER);
        Self { _block: block }
    }

    /// 计数器低 32 位，约 71 分钟回绕一次。
    #[inline]
    pub fn now_us(&self) -> u32 {
        timer().timerawl().read().bits()
    }
}

impl DelayNs for Timer {
    #[inline]
    fn delay_ns(&mut self, ns: u32) {
        self.delay_us(ns.div_ceil(1000))
    }

    fn delay_us(&mut self, us: u32) {
        let start = self.now_us();
        while self.now_us().wrapping_sub(start) < us {
            core::hint::spin_loop();
        }
    }

    fn delay_ms(&mut self, ms: u32) {
        for _ in 0..ms {
            self.delay_us(1000);
        }
    }
}

#[inline(always)]
fn timer() -> &'static pac::timer::RegisterBlock {
    unsafe { &*pac::TIMER::PTR }
}
