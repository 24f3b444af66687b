//! 各组件共享的定义：载荷格式、传输描述、内存布局。

#![cfg_attr(not(test), no_std)]

pub mod blink;
pub mod config;
pub mod ipl;
pub mod memory;
pub mod scramble;

pub use blink::{Blink, Cadence, Step};
pub use config::{PinMap, TransferConfig};
pub use ipl::{select_payload, ByteOrder, Invalid, Origin, Selection};
