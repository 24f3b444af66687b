use crate::{Data, HandOff, Pins, TxFifo};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum EmitterState {
    Idle,
    Armed,
    Shifting,
    Done,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Phase {
    /// wait 0 pin
    WaitLow,
    /// out pins, 1（自动拉取）
    Out,
    /// wait 1 pin; jmp y--
    WaitHigh,
}

/// 时钟同步输出。
///
/// 收到移交后开始驱动数据线：时钟低时移出下一位，时钟上升沿由控制台采样，
/// 每个字高位在前。移位寄存器空了就从 [`TxFifo`] 拉取下一个字，
/// 队列为空时原地等待。最后一位被采样后立即释放数据线。
#[derive(Clone, Debug)]
pub struct Emitter {
    state: EmitterState,
    enabled: bool,
    y: u32,
    osr: u32,
    osr_left: u8,
    phase: Phase,
    output: Data,
    bits: u32,
    underruns: u32,
    late: bool,
}

impl Emitter {
    #[inline]
    pub const fn new() -> Self {
        Self {
            state: EmitterState::Idle,
            enabled: false,
            y: 0,
            osr: 0,
            osr_left: 0,
            phase: Phase::WaitLow,
            output: Data::Float,
            bits: 0,
            underruns: 0,
            late: false,
        }
    }

    /// 装入位计数初值，即总位数减一，并清空移位寄存器。
    #[inline]
    pub fn load(&mut self, countdown: u32) {
        self.y = countdown;
        self.osr_left = 0;
    }

    pub fn set_enabled(&mut self, enabled: bool) {
        self.enabled = enabled;
        if enabled && self.state == EmitterState::Idle {
            self.state = EmitterState::Armed;
        }
    }

    /// 停机时强制把数据线切回输入。
    #[inline]
    pub fn release_data(&mut self) {
        self.output = Data::Float;
    }

    #[inline]
    pub const fn state(&self) -> EmitterState {
        self.state
    }

    /// 数据线上的当前输出。
    #[inline]
    pub const fn output(&self) -> Data {
        self.output
    }

    /// 已被控制台采样的位数。
    #[inline]
    pub const fn bits(&self) -> u32 {
        self.bits
    }

    /// 队列为空时错过的时钟沿数。
    #[inline]
    pub const fn underruns(&self) -> u32 {
        self.underruns
    }

    /// 推进一个系统时钟周期。
    pub fn tick(&mut self, pins: &Pins, irq: &mut HandOff, fifo: &mut TxFifo) {
        if !self.enabled {
            return;
        }
        match self.state {
            EmitterState::Armed => {
                // wait 1 irq 0; set pindirs, 1
                if irq.take() {
                    self.state = EmitterState::Shifting;
                    self.phase = Phase::WaitLow;
                    self.output = Data::Drive(false);
                }
            }
            EmitterState::Shifting => self.shift(pins, fifo),
            EmitterState::Idle | EmitterState::Done => {}
        }
    }

    fn shift(&mut self, pins: &Pins, fifo: &mut TxFifo) {
        match self.phase {
            Phase::WaitLow => {
                if !pins.clk {
                    self.phase = Phase::Out;
                }
            }
            Phase::Out => {
                if self.osr_left == 0 {
                    match fifo.pop() {
                        Some(word) => {
                            self.osr = word;
                            self.osr_left = 32;
                        }
                        None => {
                            // 控制台在没有新数据时采样了数据线
                            if pins.clk && !self.late {
                                self.late = true;
                                self.underruns += 1;
                            } else if !pins.clk {
                                self.late = false;
                            }
                            return;
                        }
                    }
                }
                self.output = Data::Drive(self.osr & (1 << 31) != 0);
                self.osr <<= 1;
                self.osr_left -= 1;
                self.late = false;
                self.phase = Phase::WaitHigh;
            }
            Phase::WaitHigh => {
                if !pins.clk {
                    return;
                }
                self.bits += 1;
                if self.y == 0 {
                    // set pindirs, 0; irq set 1
                    self.state = EmitterState::Done;
                    self.output = Data::Float;
                } else {
                    self.y -= 1;
                    self.phase = Phase::WaitLow;
                }
            }
        }
    }
}

impl Default for Emitter {
    #[inline]
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const LOW: Pins = Pins {
        clk: false,
        cs: false,
        data: Data::Float,
    };
    const HIGH: Pins = Pins {
        clk: true,
        cs: false,
        data: Data::Float,
    };

    fn armed(bits: u32) -> (Emitter, HandOff) {
        let mut e = Emitter::new();
        e.load(bits - 1);
        e.set_enabled(true);
        (e, HandOff::new())
    }

    /// 低两拍、高两拍，返回上升沿时数据线上的值。
    fn clock(e: &mut Emitter, irq: &mut HandOff, fifo: &mut TxFifo) -> Data {
        e.tick(&LOW, irq, fifo);
        e.tick(&LOW, irq, fifo);
        let sampled = e.output();
        e.tick(&HIGH, irq, fifo);
        e.tick(&HIGH, irq, fifo);
        sampled
    }

    #[test]
    fn waits_for_handoff() {
        let (mut e, mut irq) = armed(32);
        let mut fifo = TxFifo::joined();
        fifo.push(u32::MAX).unwrap();
        for _ in 0..10 {
            assert_eq!(clock(&mut e, &mut irq, &mut fifo), Data::Float);
        }
        assert_eq!(e.state(), EmitterState::Armed);
        assert_eq!(fifo.len(), 1);
    }

    #[test]
    fn shifts_msb_first_then_floats() {
        let (mut e, mut irq) = armed(64);
        let mut fifo = TxFifo::joined();
        fifo.push(0x8000_0001).unwrap();
        fifo.push(0x5555_5555).unwrap();
        irq.raise();
        e.tick(&HIGH, &mut irq, &mut fifo);
        assert_eq!(e.state(), EmitterState::Shifting);

        let bits: Vec<Data> = (0..64)
            .map(|_| clock(&mut e, &mut irq, &mut fifo))
            .collect();
        let expected: Vec<Data> = [0x8000_0001u32, 0x5555_5555]
            .iter()
            .flat_map(|w| (0..32).rev().map(move |i| Data::Drive((w >> i) & 1 == 1)))
            .collect();
        assert_eq!(bits, expected);
        assert_eq!(e.state(), EmitterState::Done);
        assert_eq!(e.output(), Data::Float);
        assert_eq!(e.bits(), 64);
        assert_eq!(e.underruns(), 0);
    }

    #[test]
    fn starved_queue_counts_underrun() {
        let (mut e, mut irq) = armed(64);
        let mut fifo = TxFifo::joined();
        fifo.push(0).unwrap();
        irq.raise();
        e.tick(&HIGH, &mut irq, &mut fifo);
        for _ in 0..32 {
            clock(&mut e, &mut irq, &mut fifo);
        }
        assert_eq!(e.underruns(), 0);
        clock(&mut e, &mut irq, &mut fifo);
        clock(&mut e, &mut irq, &mut fifo);
        assert_eq!(e.underruns(), 2);
        assert_eq!(e.bits(), 32);
        // 补上数据后从停下的位置继续
        fifo.push(u32::MAX).unwrap();
        assert_eq!(clock(&mut e, &mut irq, &mut fifo), Data::Drive(true));
        assert_eq!(e.bits(), 33);
    }
}
