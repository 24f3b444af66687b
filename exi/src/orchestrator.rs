//! 一次引导周期的编排。
//!
//! 编排本身不接触寄存器，所有硬件动作都经由 [`Board`]：
//! 固件里是 PIO 与 DMA，测试里是 [`sim`](crate::sim) 的周期级模型。

use crate::Error;
use common::{select_payload, Cadence, Origin, PinMap, Selection, TransferConfig};
use log::{debug, info};

/// 引导周期用到的板级能力。
///
/// `'p` 是载荷存储的生命周期；流式引擎在 [`release_stream`](Board::release_stream)
/// 之前一直借用它。
pub trait Board<'p> {
    /// 数据线快速翻转、加大驱动，片选与时钟作为输入。
    fn configure_pins(&mut self, pins: &PinMap);
    fn set_sys_clock_khz(&mut self, khz: u32);
    /// 装入起始计数程序并写入初值，不使能。
    fn init_detector(&mut self, pins: &PinMap, countdown: u32) -> Result<(), Error>;
    /// 装入输出程序并写入位计数初值，不使能。
    fn init_emitter(&mut self, pins: &PinMap, countdown: u32) -> Result<(), Error>;
    /// 认领并配置流式引擎，不启动。
    fn arm_stream(&mut self, payload: &Selection<'p>) -> Result<(), Error>;
    /// 同时使能或停止两个状态机。
    fn set_sequencers_enabled(&mut self, enabled: bool);
    fn start_stream(&mut self);
    fn stream_busy(&mut self) -> bool;
    /// 输出状态机还没移完最后一位。
    fn emitter_busy(&mut self) -> bool;
    fn release_stream(&mut self);
    fn set_led(&mut self, lit: bool);
    fn delay_ms(&mut self, ms: u32);
    /// 周期结束后停在这里。
    fn idle(&mut self) -> ! {
        loop {
            core::hint::spin_loop();
        }
    }
}

/// 一次引导周期的结果。
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Outcome {
    pub origin: Origin,
    /// 流式引擎搬运的字数
    pub words: usize,
    /// 等待发送完成时的轮询次数
    pub polls: u32,
}

/// 执行一次完整的引导周期。
///
/// 返回时状态机已停止、流式引擎已释放、系统时钟已恢复，LED 保持常亮。
/// 没有超时：控制台一直不读，就一直等下去。
pub fn cycle<'p, B: Board<'p>>(
    board: &mut B,
    config: &TransferConfig,
    external: &'p [u32],
    default: &'p [u32],
) -> Result<Outcome, Error> {
    board.set_led(true);
    board.set_sys_clock_khz(config.boost_khz);
    info!("system clock boosted to {} kHz", config.boost_khz);

    let pins = &config.pins;
    board.configure_pins(pins);
    board.init_detector(pins, config.start_countdown())?;
    board.init_emitter(pins, config.bit_countdown())?;
    debug!(
        "sequencers loaded: start after {} pulses, {} bits",
        config.start_pulses, config.transfer_bits
    );

    let payload = select_payload(external, default);
    board.arm_stream(&payload)?;
    board.set_sequencers_enabled(true);
    board.start_stream();
    info!("waiting for boot read of {} words", payload.word_count());

    // 流式引擎只是把最后一个字送进了队列，控制台还要再读几百位
    let mut polls = 0;
    while board.stream_busy() || board.emitter_busy() {
        polls += 1;
        blink(board, config.waiting);
    }
    info!("payload sent after {polls} polls");

    board.set_sequencers_enabled(false);
    board.set_sys_clock_khz(config.base_khz);
    board.release_stream();
    info!("system clock restored to {} kHz", config.base_khz);

    blink(board, config.done);
    Ok(Outcome {
        origin: payload.origin,
        words: payload.word_count(),
        polls,
    })
}

fn blink<'p, B: Board<'p>>(board: &mut B, cadence: Cadence) {
    for step in cadence.steps() {
        board.set_led(step.lit);
        board.delay_ms(step.hold_ms);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use common::Invalid;

    #[derive(Debug, PartialEq, Eq)]
    enum Event {
        Pins,
        Clock(u32),
        Detector(u32),
        Emitter(u32),
        Arm(usize),
        Enable(bool),
        Start,
        Release,
        Led(bool),
        Delay(u32),
    }

    /// 只记录调用顺序的板子，流式引擎与输出状态机各在若干次轮询后完成。
    struct Script {
        events: Vec<Event>,
        busy_for: u32,
        shifting_for: u32,
        fail_emitter: bool,
    }

    impl Script {
        fn new(busy_for: u32) -> Self {
            Self {
                events: Vec::new(),
                busy_for,
                shifting_for: 0,
                fail_emitter: false,
            }
        }
    }

    fn count_down(n: &mut u32) -> bool {
        if *n == 0 {
            return false;
        }
        *n -= 1;
        true
    }

    impl<'p> Board<'p> for Script {
        fn configure_pins(&mut self, _: &PinMap) {
            self.events.push(Event::Pins);
        }
        fn set_sys_clock_khz(&mut self, khz: u32) {
            self.events.push(Event::Clock(khz));
        }
        fn init_detector(&mut self, _: &PinMap, countdown: u32) -> Result<(), Error> {
            self.events.push(Event::Detector(countdown));
            Ok(())
        }
        fn init_emitter(&mut self, _: &PinMap, countdown: u32) -> Result<(), Error> {
            if self.fail_emitter {
                return Err(Error::ProgramSpace);
            }
            self.events.push(Event::Emitter(countdown));
            Ok(())
        }
        fn arm_stream(&mut self, payload: &Selection<'p>) -> Result<(), Error> {
            self.events.push(Event::Arm(payload.word_count()));
            Ok(())
        }
        fn set_sequencers_enabled(&mut self, enabled: bool) {
            self.events.push(Event::Enable(enabled));
        }
        fn start_stream(&mut self) {
            self.events.push(Event::Start);
        }
        fn stream_busy(&mut self) -> bool {
            count_down(&mut self.busy_for)
        }
        fn emitter_busy(&mut self) -> bool {
            count_down(&mut self.shifting_for)
        }
        fn release_stream(&mut self) {
            self.events.push(Event::Release);
        }
        fn set_led(&mut self, lit: bool) {
            self.events.push(Event::Led(lit));
        }
        fn delay_ms(&mut self, ms: u32) {
            self.events.push(Event::Delay(ms));
        }
    }

    const DEFAULT: [u32; 256] = [0; 256];

    #[test]
    fn phases_run_in_order() {
        use Event::*;
        let mut board = Script::new(2);
        let outcome = cycle(&mut board, &TransferConfig::DEFAULT, &[], &DEFAULT).unwrap();
        assert_eq!(outcome.polls, 2);
        assert_eq!(outcome.words, 256);
        assert!(matches!(
            outcome.origin,
            Origin::Fallback(Invalid::OutOfBounds { .. })
        ));
        let expected = [
            Led(true),
            Clock(250_000),
            Pins,
            Detector(223),
            Emitter(8191),
            Arm(256),
            Enable(true),
            Start,
            Led(false),
            Delay(100),
            Led(true),
            Delay(100),
            Led(false),
            Delay(100),
            Led(true),
            Delay(100),
            Enable(false),
            Clock(125_000),
            Release,
        ];
        assert_eq!(board.events[..expected.len()], expected);
        let done = &board.events[expected.len()..];
        assert_eq!(done.len(), 12);
        assert_eq!(done.last(), Some(&Delay(250)));
        assert_eq!(
            done.iter().rev().find(|e| matches!(e, Led(_))),
            Some(&Led(true))
        );
        assert!(done
            .iter()
            .all(|e| matches!(e, Led(_) | Delay(250))));
    }

    #[test]
    fn already_finished_stream_skips_waiting() {
        let mut board = Script::new(0);
        let outcome = cycle(&mut board, &TransferConfig::DEFAULT, &[], &DEFAULT).unwrap();
        assert_eq!(outcome.polls, 0);
        assert!(!board.events.contains(&Event::Delay(100)));
    }

    #[test]
    fn teardown_waits_for_last_bit() {
        use Event::*;
        let mut board = Script::new(1);
        board.shifting_for = 2;
        let outcome = cycle(&mut board, &TransferConfig::DEFAULT, &[], &DEFAULT).unwrap();
        assert_eq!(outcome.polls, 3);
        let start = board.events.iter().position(|e| *e == Start).unwrap();
        let stop = board.events.iter().position(|e| *e == Enable(false)).unwrap();
        let waited = board.events[start..stop]
            .iter()
            .filter(|e| **e == Delay(100))
            .count();
        assert_eq!(waited, 6);
    }

    #[test]
    fn resource_error_stops_cycle() {
        let mut board = Script::new(0);
        board.fail_emitter = true;
        let err = cycle(&mut board, &TransferConfig::DEFAULT, &[], &DEFAULT).unwrap_err();
        assert_eq!(err, Error::ProgramSpace);
        assert!(!board.events.contains(&Event::Start));
        assert!(!board.events.iter().any(|e| matches!(e, Event::Arm(_))));
    }
}
