//! [`exi::Board`] 在 Pico 上的实现：PIO0 的两个状态机加一个 DMA 通道。

use crate::program;
use common::{ByteOrder, PinMap, Selection};
use core::marker::PhantomData;
use embedded_hal::{
    delay::DelayNs,
    digital::{OutputPin, PinState},
};
use exi::{Board, Error};
use hal::{
    clocks::Clocks,
    dma::{Channel, Dma, Transfer},
    gpio::{self, Drive, Function, Output, Pad},
    pio::{self, Config, Installed, Pio, StateMachine},
    time::Timer,
};
use log::{debug, warn};

/// 起始计数程序数满后置位的标志。
const IRQ_START: u8 = 0;
/// 输出程序移完最后一位后置位的标志。
const IRQ_SENT: u8 = 1;
use ::pio::{InstructionOperands, MovDestination, MovOperation, MovSource, OutDestination, SetDestination};

pub struct Pico<'p> {
    clocks: Clocks,
    pio: Pio,
    dma: Dma,
    timer: Timer,
    led: Output,
    detector: Option<StateMachine>,
    emitter: Option<StateMachine>,
    channel: Option<Channel>,
    payload: PhantomData<&'p [u32]>,
}

impl Pico<'_> {
    pub fn new(clocks: Clocks, pio: Pio, dma: Dma, timer: Timer, led: Output) -> Self {
        Self {
            clocks,
            pio,
            dma,
            timer,
            led,
            detector: None,
            emitter: None,
            channel: None,
            payload: PhantomData,
        }
    }

    fn load(&mut self, program: &::pio::Program<32>) -> Result<(Installed, StateMachine), Error> {
        let installed = self.pio.install(program).map_err(resource)?;
        let sm = self.pio.claim().map_err(resource)?;
        debug!("program at {}, state machine {}", installed.offset(), sm.id());
        Ok((installed, sm))
    }
}

fn resource(e: pio::Error) -> Error {
    match e {
        pio::Error::NoFreeStateMachine => Error::NoFreeStateMachine,
        pio::Error::ProgramSpace => Error::ProgramSpace,
    }
}

/// 经 TX FIFO 把计数初值装进 X 或 Y，顺带清空 OSR，
/// 让第一条 `out` 触发自动拉取。
fn load_countdown(sm: &mut StateMachine, value: u32, destination: MovDestination) {
    sm.put(value);
    sm.exec(InstructionOperands::PULL {
        if_empty: false,
        block: true,
    });
    sm.exec(InstructionOperands::MOV {
        destination,
        op: MovOperation::None,
        source: MovSource::OSR,
    });
    sm.exec(InstructionOperands::OUT {
        destination: OutDestination::NULL,
        bit_count: 32,
    });
}

impl<'p> Board<'p> for Pico<'p> {
    fn configure_pins(&mut self, pins: &PinMap) {
        gpio::set_pad(pins.cs, Pad::FLOATING_INPUT);
        gpio::set_pad(pins.clk, Pad::FLOATING_INPUT);
        gpio::set_pad(
            pins.data,
            Pad {
                fast_slew: true,
                drive: Drive::Ma8,
                ..Pad::DEFAULT
            },
        );
        for pin in [pins.cs, pins.clk, pins.data] {
            gpio::set_function(pin, Function::Pio0);
        }
    }

    fn set_sys_clock_khz(&mut self, khz: u32) {
        if let Err(e) = self.clocks.set_sys_khz(khz) {
            warn!("{e}, staying at {} kHz", self.clocks.sys_khz());
        }
    }

    fn init_detector(&mut self, pins: &PinMap, countdown: u32) -> Result<(), Error> {
        let (installed, mut sm) = self.load(&program::transfer_start())?;
        let config = Config {
            jmp_pin: pins.cs,
            in_base: pins.clk,
            ..Config::new()
        };
        sm.configure(&installed, &config);
        load_countdown(&mut sm, countdown, MovDestination::X);
        self.pio.clear_irq(1 << IRQ_START);
        self.detector = Some(sm);
        Ok(())
    }

    fn init_emitter(&mut self, pins: &PinMap, countdown: u32) -> Result<(), Error> {
        let (installed, mut sm) = self.load(&program::clocked_output())?;
        let config = Config {
            in_base: pins.clk,
            out_base: pins.data,
            out_count: 1,
            set_base: pins.data,
            set_count: 1,
            autopull: true,
            pull_threshold: 32,
            shift_right: false,
            join_tx: true,
            ..Config::new()
        };
        sm.configure(&installed, &config);
        // 接管前数据线悬空，接管后先输出低
        sm.exec(InstructionOperands::SET {
            destination: SetDestination::PINS,
            data: 0,
        });
        sm.exec(InstructionOperands::SET {
            destination: SetDestination::PINDIRS,
            data: 0,
        });
        load_countdown(&mut sm, countdown, MovDestination::Y);
        self.pio.clear_irq(1 << IRQ_SENT);
        self.emitter = Some(sm);
        Ok(())
    }

    fn arm_stream(&mut self, payload: &Selection<'p>) -> Result<(), Error> {
        let Some(emitter) = &self.emitter else {
            return Err(Error::EmitterNotLoaded);
        };
        let mut channel = self.dma.claim().ok_or(Error::NoFreeChannel)?;
        channel.configure(&Transfer {
            read: payload.as_ptr(),
            write: emitter.tx_fifo(),
            count: payload.word_count() as u32,
            dreq: emitter.tx_dreq(),
            byte_swap: payload.order == ByteOrder::Swap,
        });
        debug!(
            "dma channel {} armed: {} words from {:p}",
            channel.id(),
            payload.word_count(),
            payload.as_ptr()
        );
        self.channel = Some(channel);
        Ok(())
    }

    fn set_sequencers_enabled(&mut self, enabled: bool) {
        let mask = self
            .detector
            .iter()
            .chain(&self.emitter)
            .fold(0, |mask, sm| mask | sm.mask());
        self.pio.set_enabled(mask, enabled);
        if !enabled {
            // 停在半途时数据线不能一直被驱动
            if let Some(emitter) = &mut self.emitter {
                emitter.exec(InstructionOperands::SET {
                    destination: SetDestination::PINDIRS,
                    data: 0,
                });
            }
        }
    }

    fn start_stream(&mut self) {
        if let Some(channel) = &mut self.channel {
            channel.start();
        }
    }

    fn stream_busy(&mut self) -> bool {
        self.channel
            .as_ref()
            .is_some_and(|channel| channel.wait().is_err())
    }

    fn emitter_busy(&mut self) -> bool {
        self.emitter.is_some() && !self.pio.irq_flag(IRQ_SENT)
    }

    fn release_stream(&mut self) {
        if let Some(channel) = self.channel.take() {
            self.dma.release(channel);
        }
    }

    fn set_led(&mut self, lit: bool) {
        self.led.set_state(PinState::from(lit)).ok();
    }

    fn delay_ms(&mut self, ms: u32) {
        self.timer.delay_ms(ms);
    }
}
