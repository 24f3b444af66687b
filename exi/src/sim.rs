//! 周期级模拟：一台按脚本驱动总线的控制台，和一块实现了 [`Board`] 的板子。
//!
//! 一个 tick 对应一个系统时钟周期，每个部件每 tick 执行一步。
//! 控制台在时钟上升沿采样数据线，采到的是上一 tick 结束时的电平。

use crate::{
    Board, Data, Detector, Emitter, EmitterState, Error, HandOff, Pins, StreamEngine, TxFifo,
};
use common::{PinMap, Selection, TransferConfig};
use log::debug;

/// 起始计数程序占用的指令数。
pub const DETECTOR_PROGRAM_LEN: usize = 6;
/// 输出程序占用的指令数。
pub const EMITTER_PROGRAM_LEN: usize = 9;

pub const STATE_MACHINES: u32 = 4;
pub const PROGRAM_SPACE: usize = 32;
pub const DMA_CHANNELS: u32 = 12;

/// 控制台复位后、开始引导读取之前的空闲 tick 数。
pub const LEAD_IN: u32 = 1000;

/// 控制台脚本的一段。
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Segment {
    /// 片选无效、时钟低，持续若干 tick。
    Idle(u32),
    /// 连续若干个时钟脉冲，`sample` 时在每个上升沿采样数据线。
    Pulses { select: bool, count: u32, sample: bool },
}

/// 按脚本驱动片选与时钟的控制台。
#[derive(Clone, Debug)]
pub struct Console {
    script: Vec<Segment>,
    half: u32,
    at: usize,
    elapsed: u64,
    clk: bool,
    cs: bool,
    samples: Vec<Data>,
}

impl Console {
    /// 半个时钟周期的 tick 数。
    pub const HALF_PERIOD: u32 = 4;

    pub fn new(script: Vec<Segment>) -> Self {
        Self {
            script,
            half: Self::HALF_PERIOD,
            at: 0,
            elapsed: 0,
            clk: false,
            cs: true,
            samples: Vec::new(),
        }
    }

    /// 改变时钟速度。输出状态机在时钟低时至少要有两个周期，所以下限是 2。
    pub fn with_half_period(mut self, half: u32) -> Self {
        self.half = half.max(2);
        self
    }

    /// 一次标准的引导读取：起始脉冲之后紧接着读 `transfer_bits` 位。
    pub fn boot_read(config: &TransferConfig) -> Self {
        Self::new(vec![
            Segment::Idle(LEAD_IN),
            Segment::Pulses {
                select: true,
                count: config.start_pulses,
                sample: false,
            },
            Segment::Pulses {
                select: true,
                count: config.transfer_bits,
                sample: true,
            },
        ])
    }

    #[inline]
    pub fn finished(&self) -> bool {
        self.at >= self.script.len()
    }

    /// 上升沿采到的数据线状态，按时间顺序。
    #[inline]
    pub fn samples(&self) -> &[Data] {
        &self.samples
    }

    /// 把采样按高位在前拼成字。有任何一位采到悬空就返回 `None`。
    pub fn words(&self) -> Option<Vec<u32>> {
        self.samples
            .chunks_exact(32)
            .map(|bits| {
                bits.iter().try_fold(0u32, |word, bit| match bit {
                    Data::Drive(level) => Some((word << 1) | *level as u32),
                    Data::Float => None,
                })
            })
            .collect()
    }

    /// 推进一个 tick，更新总线上的时钟与片选。
    pub fn tick(&mut self, bus: &mut Pins) {
        if self.advance() {
            self.samples.push(bus.data);
        }
        bus.clk = self.clk;
        bus.cs = self.cs;
    }

    /// 返回这个 tick 是否是需要采样的上升沿。
    fn advance(&mut self) -> bool {
        let period = 2 * self.half as u64;
        while let Some(&segment) = self.script.get(self.at) {
            let len = match segment {
                Segment::Idle(ticks) => ticks as u64,
                Segment::Pulses { count, .. } => count as u64 * period,
            };
            if self.elapsed >= len {
                self.at += 1;
                self.elapsed = 0;
                continue;
            }
            let t = self.elapsed;
            self.elapsed += 1;
            return match segment {
                Segment::Idle(_) => {
                    self.clk = false;
                    self.cs = true;
                    false
                }
                Segment::Pulses { select, sample, .. } => {
                    let phase = t % period;
                    self.cs = !select;
                    self.clk = phase >= self.half as u64;
                    sample && phase == self.half as u64
                }
            };
        }
        self.clk = false;
        self.cs = true;
        false
    }
}

/// 模拟板子。
///
/// 资源数量可以调小来触发耗尽错误，流式引擎可以降速来制造欠载。
pub struct SimBoard<'p> {
    console: Console,
    bus: Pins,
    irq: HandOff,
    detector: Detector,
    emitter: Emitter,
    fifo: TxFifo,
    stream: StreamEngine<'p>,
    emitter_loaded: bool,
    channel: bool,
    free_sm: u32,
    free_program: usize,
    free_channels: u32,
    dma_every: u64,
    ticks_per_ms: u64,
    now: u64,
    quiet: u64,
    clocks: Vec<u32>,
    leds: Vec<(u64, bool)>,
    pins: Option<PinMap>,
}

impl<'p> SimBoard<'p> {
    pub fn new(console: Console) -> Self {
        Self {
            console,
            bus: Pins::IDLE,
            irq: HandOff::new(),
            detector: Detector::new(),
            emitter: Emitter::new(),
            fifo: TxFifo::joined(),
            stream: StreamEngine::new(),
            emitter_loaded: false,
            channel: false,
            free_sm: STATE_MACHINES,
            free_program: PROGRAM_SPACE,
            free_channels: DMA_CHANNELS,
            dma_every: 1,
            ticks_per_ms: 1000,
            now: 0,
            quiet: 0,
            clocks: Vec::new(),
            leds: Vec::new(),
            pins: None,
        }
    }

    pub fn with_resources(mut self, state_machines: u32, program: usize, channels: u32) -> Self {
        self.free_sm = state_machines;
        self.free_program = program;
        self.free_channels = channels;
        self
    }

    /// 流式引擎每 `ticks` 个 tick 才推进一次。
    pub fn with_dma_every(mut self, ticks: u64) -> Self {
        self.dma_every = ticks.max(1);
        self
    }

    pub fn with_ticks_per_ms(mut self, ticks: u64) -> Self {
        self.ticks_per_ms = ticks;
        self
    }

    /// 推进一个系统时钟周期。
    pub fn step(&mut self) {
        self.console.tick(&mut self.bus);
        self.detector.tick(&self.bus, &mut self.irq);
        self.emitter.tick(&self.bus, &mut self.irq, &mut self.fifo);
        self.bus.data = self.emitter.output();
        if self.now % self.dma_every == 0 {
            self.stream.tick(&mut self.fifo);
        }
        if self.console.finished() {
            self.quiet += 1;
        }
        self.now += 1;
    }

    /// 推进 `ticks` 个周期。控制台结束且各部件静止后直接跳过剩余时间。
    pub fn run(&mut self, ticks: u64) {
        for left in (1..=ticks).rev() {
            if self.quiet > 16 * self.dma_every {
                debug!("bus quiet at tick {}, skipping {left} ticks", self.now);
                self.now += left;
                return;
            }
            self.step();
        }
    }

    fn claim_sm(&mut self, program: usize) -> Result<(), Error> {
        if self.free_program < program {
            return Err(Error::ProgramSpace);
        }
        if self.free_sm == 0 {
            return Err(Error::NoFreeStateMachine);
        }
        self.free_program -= program;
        self.free_sm -= 1;
        Ok(())
    }

    #[inline]
    pub fn console(&self) -> &Console {
        &self.console
    }

    #[inline]
    pub fn detector(&self) -> &Detector {
        &self.detector
    }

    #[inline]
    pub fn emitter(&self) -> &Emitter {
        &self.emitter
    }

    #[inline]
    pub fn stream(&self) -> &StreamEngine<'p> {
        &self.stream
    }

    #[inline]
    pub fn bus(&self) -> Pins {
        self.bus
    }

    #[inline]
    pub fn now(&self) -> u64 {
        self.now
    }

    /// 依次设置过的系统时钟。
    #[inline]
    pub fn clocks(&self) -> &[u32] {
        &self.clocks
    }

    /// LED 电平变化：发生的 tick 与电平。
    #[inline]
    pub fn leds(&self) -> &[(u64, bool)] {
        &self.leds
    }

    #[inline]
    pub fn pins(&self) -> Option<PinMap> {
        self.pins
    }

    #[inline]
    pub fn channel_claimed(&self) -> bool {
        self.channel
    }
}

impl<'p> Board<'p> for SimBoard<'p> {
    fn configure_pins(&mut self, pins: &PinMap) {
        self.pins = Some(*pins);
    }

    fn set_sys_clock_khz(&mut self, khz: u32) {
        self.clocks.push(khz);
    }

    fn init_detector(&mut self, _pins: &PinMap, countdown: u32) -> Result<(), Error> {
        self.claim_sm(DETECTOR_PROGRAM_LEN)?;
        self.detector.load(countdown);
        Ok(())
    }

    fn init_emitter(&mut self, _pins: &PinMap, countdown: u32) -> Result<(), Error> {
        self.claim_sm(EMITTER_PROGRAM_LEN)?;
        self.emitter.load(countdown);
        self.emitter_loaded = true;
        Ok(())
    }

    fn arm_stream(&mut self, payload: &Selection<'p>) -> Result<(), Error> {
        if !self.emitter_loaded {
            return Err(Error::EmitterNotLoaded);
        }
        if self.free_channels == 0 {
            return Err(Error::NoFreeChannel);
        }
        self.free_channels -= 1;
        self.channel = true;
        self.stream.configure(payload);
        Ok(())
    }

    fn set_sequencers_enabled(&mut self, enabled: bool) {
        self.detector.set_enabled(enabled);
        self.emitter.set_enabled(enabled);
        if !enabled {
            self.emitter.release_data();
            self.bus.data = self.emitter.output();
        }
        self.quiet = 0;
    }

    fn start_stream(&mut self) {
        self.stream.start();
        self.quiet = 0;
    }

    fn stream_busy(&mut self) -> bool {
        self.stream.is_busy()
    }

    fn emitter_busy(&mut self) -> bool {
        self.emitter_loaded && self.emitter.state() != EmitterState::Done
    }

    fn release_stream(&mut self) {
        self.stream.release();
        if core::mem::take(&mut self.channel) {
            self.free_channels += 1;
        }
    }

    fn set_led(&mut self, lit: bool) {
        self.leds.push((self.now, lit));
    }

    fn delay_ms(&mut self, ms: u32) {
        self.run(ms as u64 * self.ticks_per_ms);
    }
}
