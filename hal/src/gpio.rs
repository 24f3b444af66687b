//! GPIO 功能选择、焊盘设置与 SIO 输出。

use crate::{pac, resets};
use core::convert::Infallible;
use embedded_hal::digital::{ErrorType, OutputPin, StatefulOutputPin};

/// IO_BANK0 的功能选择。
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[repr(u32)]
pub enum Function {
    Uart = 2,
    Sio = 5,
    Pio0 = 6,
    Null = 31,
}

/// 焊盘输出驱动能力。
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[repr(u32)]
pub enum Drive {
    Ma2 = 0,
    Ma4 = 1,
    Ma8 = 2,
    Ma12 = 3,
}

/// 焊盘设置。
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Pad {
    pub fast_slew: bool,
    pub schmitt: bool,
    pub pull_down: bool,
    pub pull_up: bool,
    pub drive: Drive,
    pub input: bool,
}

impl Pad {
    /// 上电默认值。
    pub const DEFAULT: Self = Self {
        fast_slew: false,
        schmitt: true,
        pull_down: true,
        pull_up: false,
        drive: Drive::Ma4,
        input: true,
    };

    /// 不带上下拉的输入。
    pub const FLOATING_INPUT: Self = Self {
        pull_down: false,
        ..Self::DEFAULT
    };

    const fn bits(&self) -> u32 {
        (self.fast_slew as u32)
            | (self.schmitt as u32) << 1
            | (self.pull_down as u32) << 2
            | (self.pull_up as u32) << 3
            | (self.drive as u32) << 4
            | (self.input as u32) << 6
    }
}

/// 让 GPIO 可用，只需调用一次。
pub fn init(resets: &mut pac::RESETS) {
    resets::unreset(resets, resets::IO_BANK0 | resets::PADS_BANK0);
}

pub fn set_function(pin: u8, function: Function) {
    io_bank0()
        .gpio(pin as usize)
        .gpio_ctrl()
        .write(|w| unsafe { w.bits(function as u32) });
}

pub fn set_pad(pin: u8, pad: Pad) {
    pads_bank0()
        .gpio(pin as usize)
        .write(|w| unsafe { w.bits(pad.bits()) });
}

/// 由 SIO 驱动的推挽输出。
pub struct Output {
    mask: u32,
}

impl Output {
    pub fn new(pin: u8) -> Self {
        let mask = 1 << pin;
        sio().gpio_out_clr().write(|w| unsafe { w.bits(mask) });
        sio().gpio_oe_set().write(|w| unsafe { w.bits(mask) });
        set_function(pin, Function::Sio);
        Self { mask }
    }
}

impl ErrorType for Output {
    type Error = Infallible;
}

impl OutputPin for Output {
    #[inline]
    fn set_low(&mut self) -> Result<(), Self::Error> {
        sio().gpio_out_clr().write(|w| unsafe { w.bits(self.mask) });
        Ok(())
    }

    #[inline]
    fn set_high(&mut self) -> Result<(), Self::Error> {
        sio().gpio_out_set().write(|w| unsafe { w.bits(self.mask) });
        Ok(())
    }
}

impl StatefulOutputPin for Output {
    #[inline]
    fn is_set_high(&mut self) -> Result<bool, Self::Error> {
        Ok(sio().gpio_out().read().bits() & self.mask != 0)
    }

    #[inline]
    fn is_set_low(&mut self) -> Result<bool, Self::Error> {
        self.is_set_high().map(|high| !high)
    }
}

#[inline(always)]
fn io_bank0() -> &'static pac::io_bank0::RegisterBlock {
    unsafe { &*pac::IO_BANK0::PTR }
}

#[inline(always)]
fn pads_bank0() -> &'static pac::pads_bank0::RegisterBlock {
    unsafe { &*pac::PADS_BANK0::PTR }
}

#[inline(always)]
fn sio() -> &'static pac::sio::RegisterBlock {
    unsafe { &*pac::SIO::PTR }
}
