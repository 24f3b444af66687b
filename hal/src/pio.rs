//! PIO0：程序装载、状态机认领与配置。

use crate::{pac, resets};
use pio::{InstructionOperands, JmpCondition, Program};

pub const INSTR_MEM: usize = 32;
pub const STATE_MACHINES: u8 = 4;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Error {
    NoFreeStateMachine,
    ProgramSpace,
}

/// 已装入指令存储器的程序，地址都是绝对地址。
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Installed {
    offset: u8,
    wrap_target: u8,
    wrap_source: u8,
}

impl Installed {
    #[inline]
    pub const fn offset(&self) -> u8 {
        self.offset
    }
}

pub struct Pio {
    _block: pac::PIO0,
    used_mem: u32,
    used_sm: u8,
}

impl Pio {
    pub fn new(block: pac::PIO0, resets: &mut pac::RESETS) -> Self {
        resets::cycle(resets, resets::PIO0);
        Self {
            _block: block,
            used_mem: 0,
            used_sm: 0,
        }
    }

    /// 找一段空闲的指令存储器装入程序，跳转目标与回绕边界随之平移。
    pub fn install<const N: usize>(&mut self, program: &Program<N>) -> Result<Installed, Error> {
        let len = program.code.len();
        let offset = place(self.used_mem, len, program.origin).ok_or(Error::ProgramSpace)?;
        for (i, instr) in program.code.iter().enumerate() {
            pio0()
                .instr_mem(offset as usize + i)
                .write(|w| unsafe { w.bits(relocate(*instr, offset) as u32) });
        }
        self.used_mem |= span(len) << offset;
        Ok(Installed {
            offset,
            wrap_target: program.wrap.target + offset,
            wrap_source: program.wrap.source + offset,
        })
    }

    pub fn claim(&mut self) -> Result<StateMachine, Error> {
        let id = (0..STATE_MACHINES)
            .find(|id| self.used_sm & 1 << id == 0)
            .ok_or(Error::NoFreeStateMachine)?;
        self.used_sm |= 1 << id;
        Ok(StateMachine { id })
    }

    /// 状态机置位的 IRQ 标志 `n` 是否有效。
    #[inline]
    pub fn irq_flag(&self, n: u8) -> bool {
        pio0().irq().read().bits() & 1 << (n & 7) != 0
    }

    /// 写 1 清除 `mask` 中的 IRQ 标志。
    #[inline]
    pub fn clear_irq(&mut self, mask: u8) {
        pio0().irq().write(|w| unsafe { w.bits(mask as u32) });
    }

    /// 在同一个周期使能或停止 `mask` 中的状态机。
    pub fn set_enabled(&mut self, mask: u8, enabled: bool) {
        let mask = (mask & 0xf) as u32;
        pio0().ctrl().modify(|r, w| unsafe {
            w.bits(if enabled {
                r.bits() | mask
            } else {
                r.bits() & !mask
            })
        });
    }
}

#[inline]
const fn span(len: usize) -> u32 {
    ((1u64 << len) - 1) as u32
}

/// 选择装载地址：有固定起点就只看起点，否则从高地址往低找。
fn place(used: u32, len: usize, origin: Option<u8>) -> Option<u8> {
    if len == 0 || len > INSTR_MEM {
        return None;
    }
    let fits = |offset: usize| offset + len <= INSTR_MEM && used & span(len) << offset == 0;
    match origin {
        Some(origin) => fits(origin as usize).then_some(origin),
        None => (0..=INSTR_MEM - len).rev().find(|&o| fits(o)).map(|o| o as u8),
    }
}

/// JMP 的操作码是 000，目标地址在低 5 位。
#[inline]
const fn relocate(instr: u16, offset: u8) -> u16 {
    if instr & 0xe000 == 0 {
        instr & !0x1f | ((instr & 0x1f) + offset as u16) & 0x1f
    } else {
        instr
    }
}

/// 状态机配置。引脚号都是 GPIO 编号。
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Config {
    /// 整数分频，1 为全速
    pub clkdiv: u16,
    pub jmp_pin: u8,
    pub in_base: u8,
    pub out_base: u8,
    pub out_count: u8,
    pub set_base: u8,
    pub set_count: u8,
    pub autopull: bool,
    pub pull_threshold: u8,
    pub shift_right: bool,
    /// 把 RX FIFO 并入 TX，队列深度变为 8
    pub join_tx: bool,
}

impl Config {
    pub const fn new() -> Self {
        Self {
            clkdiv: 1,
            jmp_pin: 0,
            in_base: 0,
            out_base: 0,
            out_count: 0,
            set_base: 0,
            set_count: 0,
            autopull: false,
            pull_threshold: 32,
            shift_right: true,
            join_tx: false,
        }
    }
}

impl Default for Config {
    #[inline]
    fn default() -> Self {
        Self::new()
    }
}

pub struct StateMachine {
    id: u8,
}

impl StateMachine {
    #[inline]
    pub fn id(&self) -> u8 {
        self.id
    }

    #[inline]
    pub fn mask(&self) -> u8 {
        1 << self.id
    }

    /// TX FIFO 的 DMA 请求编号。
    #[inline]
    pub fn tx_dreq(&self) -> u8 {
        self.id
    }

    #[inline]
    pub fn tx_fifo(&self) -> *mut u32 {
        pio0().txf(self.id as usize).as_ptr()
    }

    /// 写入配置，重启状态机并把程序计数器指向程序入口。不使能。
    pub fn configure(&mut self, program: &Installed, config: &Config) {
        let sm = pio0().sm(self.id as usize);
        sm.sm_clkdiv()
            .write(|w| unsafe { w.bits((config.clkdiv as u32) << 16) });
        sm.sm_execctrl().write(|w| unsafe {
            w.bits(
                (config.jmp_pin as u32) << 24
                    | (program.wrap_source as u32) << 12
                    | (program.wrap_target as u32) << 7,
            )
        });
        let mut shift = ((config.pull_threshold & 0x1f) as u32) << 25;
        if config.join_tx {
            shift |= 1 << 30;
        }
        if config.shift_right {
            shift |= 1 << 19 | 1 << 18;
        }
        if config.autopull {
            shift |= 1 << 17;
        }
        sm.sm_shiftctrl().write(|w| unsafe { w.bits(shift) });
        sm.sm_pinctrl().write(|w| unsafe {
            w.bits(
                (config.set_count as u32) << 26
                    | (config.out_count as u32) << 20
                    | (config.in_base as u32) << 15
                    | (config.set_base as u32) << 5
                    | config.out_base as u32,
            )
        });
        let id = self.id as u32;
        pio0()
            .ctrl()
            .modify(|r, w| unsafe { w.bits(r.bits() | 1 << (4 + id) | 1 << (8 + id)) });
        self.exec(InstructionOperands::JMP {
            condition: JmpCondition::Always,
            address: program.offset,
        });
    }

    /// 阻塞写入 TX FIFO。
    pub fn put(&mut self, word: u32) {
        while pio0().fstat().read().bits() & 1 << (16 + self.id) != 0 {
            core::hint::spin_loop();
        }
        pio0()
            .txf(self.id as usize)
            .write(|w| unsafe { w.bits(word) });
    }

    /// 立即执行一条指令。
    pub fn exec(&mut self, op: InstructionOperands) {
        pio0()
            .sm(self.id as usize)
            .sm_instr()
            .write(|w| unsafe { w.bits(op.encode() as u32) });
    }
}

#[inline(always)]
fn pio0() -> &'static pac::pio0::RegisterBlock {
    unsafe { &*pac::PIO0::PTR }
}
