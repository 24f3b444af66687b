//! DMA 通道。
//!
//! 只支持一种用法：32 位宽、源地址递增、目标地址固定、由 DREQ 节流，
//! 正好是把内存里的字喂给外设 FIFO。

use crate::{pac, resets};
use core::convert::Infallible;

const CTRL_EN: u32 = 1 << 0;
const CTRL_SIZE_WORD: u32 = 2 << 2;
const CTRL_INCR_READ: u32 = 1 << 4;
const CTRL_BSWAP: u32 = 1 << 22;
const CTRL_BUSY: u32 = 1 << 24;

pub const CHANNELS: u8 = 12;

/// 一次外设方向的搬运。
#[derive(Clone, Copy, Debug)]
pub struct Transfer {
    pub read: *const u32,
    pub write: *mut u32,
    pub count: u32,
    /// 节流用的数据请求编号
    pub dreq: u8,
    /// 逐字翻转字节序
    pub byte_swap: bool,
}

pub struct Dma {
    _block: pac::DMA,
    claimed: u16,
}

impl Dma {
    pub fn new(block: pac::DMA, resets: &mut pac::RESETS) -> Self {
        resets::unreset(resets, resets::DMA);
        Self {
            _block: block,
            claimed: 0,
        }
    }

    /// DMA 的读写在总线仲裁中优先于处理器。
    pub fn prioritize(&mut self, busctrl: &pac::BUSCTRL) {
        busctrl
            .bus_priority()
            .write(|w| unsafe { w.bits(1 << 8 | 1 << 12) });
    }

    pub fn claim(&mut self) -> Option<Channel> {
        let id = (0..CHANNELS).find(|id| self.claimed & 1 << id == 0)?;
        self.claimed |= 1 << id;
        Some(Channel { id })
    }

    /// 停止通道并归还。
    pub fn release(&mut self, channel: Channel) {
        let mask = 1 << channel.id;
        dma().ch(channel.id as usize)
            .ch_al1_ctrl()
            .modify(|r, w| unsafe { w.bits(r.bits() & !CTRL_EN) });
        dma().chan_abort().write(|w| unsafe { w.bits(mask) });
        while dma().chan_abort().read().bits() & mask != 0 {
            core::hint::spin_loop();
        }
        self.claimed &= !(mask as u16);
    }
}

pub struct Channel {
    id: u8,
}

impl Channel {
    #[inline]
    pub fn id(&self) -> u8 {
        self.id
    }

    /// 写入地址、计数与控制字，不启动。
    pub fn configure(&mut self, transfer: &Transfer) {
        let ch = dma().ch(self.id as usize);
        ch.ch_read_addr()
            .write(|w| unsafe { w.bits(transfer.read as u32) });
        ch.ch_write_addr()
            .write(|w| unsafe { w.bits(transfer.write as u32) });
        ch.ch_trans_count()
            .write(|w| unsafe { w.bits(transfer.count) });
        let mut ctrl = CTRL_EN
            | CTRL_SIZE_WORD
            | CTRL_INCR_READ
            // 链接到自己等于不链接
            | (self.id as u32) << 11
            | (transfer.dreq as u32) << 15;
        if transfer.byte_swap {
            ctrl |= CTRL_BSWAP;
        }
        ch.ch_al1_ctrl().write(|w| unsafe { w.bits(ctrl) });
    }

    pub fn start(&mut self) {
        dma()
            .multi_chan_trigger()
            .write(|w| unsafe { w.bits(1 << self.id) });
    }

    #[inline]
    pub fn is_busy(&self) -> bool {
        dma().ch(self.id as usize).ch_ctrl_trig().read().bits() & CTRL_BUSY != 0
    }

    pub fn wait(&self) -> nb::Result<(), Infallible> {
        if self.is_busy() {
            Err(nb::Error::WouldBlock)
        } else {
            Ok(())
        }
    }
}

#[inline(always)]
fn dma() -> &'static pac::dma::RegisterBlock {
    unsafe { &*pac::DMA::PTR }
}
