//! 一次引导传输的描述。

use crate::blink::Cadence;

/// 总线与状态灯用到的 GPIO。
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PinMap {
    /// U10 片选，低有效
    pub cs: u8,
    /// EXI 时钟
    pub clk: u8,
    /// 数据输出，不传输时悬空
    pub data: u8,
    pub led: u8,
}

impl PinMap {
    pub const PICO: Self = Self {
        cs: 4,
        clk: 5,
        data: 6,
        led: 25,
    };
}

/// 传输描述：整个引导周期内不变。
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct TransferConfig {
    pub pins: PinMap,
    /// 片选有效时需要数过的时钟脉冲数，之后移交给输出状态机。
    pub start_pulses: u32,
    /// 输出状态机要移出的位数。
    pub transfer_bits: u32,
    /// 传输期间的系统时钟，保证两次外部时钟沿之间有足够多的周期采样。
    pub boost_khz: u32,
    /// 传输结束后恢复的系统时钟。
    pub base_khz: u32,
    pub waiting: Cadence,
    pub done: Cadence,
}

impl TransferConfig {
    pub const DEFAULT: Self = Self {
        pins: PinMap::PICO,
        start_pulses: 224,
        transfer_bits: 8192,
        boost_khz: 250_000,
        base_khz: 125_000,
        waiting: Cadence::WAITING,
        done: Cadence::DONE,
    };

    /// 计数状态机的初值。`jmp x--` 在 X 为零时还会再执行一轮，所以少装一。
    #[inline]
    pub const fn start_countdown(&self) -> u32 {
        self.start_pulses.saturating_sub(1)
    }

    #[inline]
    pub const fn bit_countdown(&self) -> u32 {
        self.transfer_bits.saturating_sub(1)
    }

    #[inline]
    pub const fn transfer_words(&self) -> u32 {
        self.transfer_bits.div_ceil(32)
    }
}

impl Default for TransferConfig {
    #[inline]
    fn default() -> Self {
        Self::DEFAULT
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn boot_read_is_one_kib() {
        let cfg = TransferConfig::DEFAULT;
        assert_eq!(cfg.transfer_bits / 8, 1024);
        assert_eq!(cfg.transfer_words(), 256);
        assert_eq!(cfg.start_countdown(), 223);
        assert_eq!(cfg.bit_countdown(), 8191);
        assert_eq!(cfg.base_khz * 2, cfg.boost_khz);
    }
}
