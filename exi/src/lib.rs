//! EXI 引导读取引擎。
//!
//! 控制台复位后拉低片选、送出时钟，数满 224 个脉冲后按自己的时钟读取 1 KiB，
//! 中间没有任何握手。这里把这条流水线拆成几个彼此独立推进的部件：
//!
//! - [`Detector`]：片选有效时数时钟沿，数满后触发一次 [`HandOff`]；
//! - [`Emitter`]：收到移交后每个时钟沿移出一位，高位在前，移完即释放数据线；
//! - [`StreamEngine`]：在 [`TxFifo`] 有空位时把载荷逐字搬进去，可逐字翻转字节序；
//! - [`orchestrator`]：通过 [`Board`] 配置并启动以上部件，等待完成后拆除。
//!
//! 硬件上前两者是 PIO 状态机，流式引擎是 DMA 通道；
//! 开启 `sim` 特性后 [`sim`] 模块提供同一套语义的周期级模型。

#![cfg_attr(not(any(test, feature = "sim")), no_std)]

mod detector;
mod emitter;
mod fifo;
mod handoff;
mod stream;

pub mod orchestrator;
#[cfg(feature = "sim")]
pub mod sim;

pub use detector::{Detector, DetectorState};
pub use emitter::{Emitter, EmitterState};
pub use fifo::TxFifo;
pub use handoff::HandOff;
pub use orchestrator::{cycle, Board, Outcome};
pub use stream::StreamEngine;

use core::fmt;

/// 三根总线的电平。
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Pins {
    pub clk: bool,
    /// 片选线电平，低有效
    pub cs: bool,
    pub data: Data,
}

impl Pins {
    /// 总线空闲：时钟低，片选无效，数据线悬空。
    pub const IDLE: Self = Self {
        clk: false,
        cs: true,
        data: Data::Float,
    };

    #[inline]
    pub const fn selected(&self) -> bool {
        !self.cs
    }
}

/// 数据线状态。
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Data {
    Float,
    Drive(bool),
}

/// 引导无法继续：硬件资源耗尽，或部件的准备顺序不对。
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Error {
    NoFreeStateMachine,
    ProgramSpace,
    NoFreeChannel,
    /// 输出状态机还没装好就要配置流式引擎
    EmitterNotLoaded,
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::NoFreeStateMachine => "no free PIO state machine",
            Self::ProgramSpace => "not enough PIO instruction memory",
            Self::NoFreeChannel => "no free DMA channel",
            Self::EmitterNotLoaded => "stream armed before the output state machine was loaded",
        })
    }
}
