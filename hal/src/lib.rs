//! RP2040 寄存器级驱动。
//!
//! 只覆盖引导固件用到的部分：PIO0、DMA、GPIO 与焊盘、时钟、定时器、UART0。
//! 外设所有权通过 PAC 的单例类型表达，之后的寄存器访问走各模块内的指针。

#![no_std]

pub mod clocks;
pub mod dma;
pub mod gpio;
pub mod pio;
pub mod resets;
pub mod time;
pub mod uart;

pub use rp2040_pac as pac;
