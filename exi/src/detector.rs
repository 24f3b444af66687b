use crate::{HandOff, Pins};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DetectorState {
    Idle,
    Counting,
    Fired,
}

/// 传输起点检测。
///
/// 片选有效时每个时钟上升沿把计数减一，计数为零的那个沿触发移交，
/// 此后不再响应总线。片选无效期间的时钟沿不计数，也不清零计数。
#[derive(Clone, Debug)]
pub struct Detector {
    state: DetectorState,
    enabled: bool,
    x: u32,
    seen_low: bool,
    edges: u32,
}

impl Detector {
    #[inline]
    pub const fn new() -> Self {
        Self {
            state: DetectorState::Idle,
            enabled: false,
            x: 0,
            seen_low: false,
            edges: 0,
        }
    }

    /// 装入计数初值，即阈值减一。
    #[inline]
    pub fn load(&mut self, countdown: u32) {
        self.x = countdown;
    }

    pub fn set_enabled(&mut self, enabled: bool) {
        self.enabled = enabled;
        if enabled && self.state == DetectorState::Idle {
            self.state = DetectorState::Counting;
        }
    }

    #[inline]
    pub const fn state(&self) -> DetectorState {
        self.state
    }

    /// 已计入的时钟沿数。
    #[inline]
    pub const fn edges(&self) -> u32 {
        self.edges
    }

    /// 推进一个系统时钟周期。
    pub fn tick(&mut self, pins: &Pins, irq: &mut HandOff) {
        if !self.enabled || self.state != DetectorState::Counting {
            return;
        }
        // wait 0 pin
        if !self.seen_low {
            self.seen_low = !pins.clk;
            return;
        }
        // wait 1 pin
        if !pins.clk {
            return;
        }
        self.seen_low = false;
        // jmp pin：片选无效，不计数
        if !pins.selected() {
            return;
        }
        self.edges += 1;
        if self.x == 0 {
            self.state = DetectorState::Fired;
            irq.raise();
        } else {
            self.x -= 1;
        }
    }
}

impl Default for Detector {
    #[inline]
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Data;

    fn pins(clk: bool, selected: bool) -> Pins {
        Pins {
            clk,
            cs: !selected,
            data: Data::Float,
        }
    }

    /// 一个完整的时钟脉冲：低、高。
    fn pulse(det: &mut Detector, irq: &mut HandOff, selected: bool) {
        det.tick(&pins(false, selected), irq);
        det.tick(&pins(true, selected), irq);
    }

    #[test]
    fn fires_on_threshold_edge() {
        let mut det = Detector::new();
        let mut irq = HandOff::new();
        det.load(223);
        det.set_enabled(true);
        for _ in 0..223 {
            pulse(&mut det, &mut irq, true);
        }
        assert_eq!(det.state(), DetectorState::Counting);
        assert!(!irq.is_pending());
        pulse(&mut det, &mut irq, true);
        assert_eq!(det.state(), DetectorState::Fired);
        assert!(irq.take());
        assert_eq!(det.edges(), 224);
    }

    #[test]
    fn deselected_edges_do_not_count() {
        let mut det = Detector::new();
        let mut irq = HandOff::new();
        det.load(3);
        det.set_enabled(true);
        pulse(&mut det, &mut irq, true);
        pulse(&mut det, &mut irq, true);
        for _ in 0..100 {
            pulse(&mut det, &mut irq, false);
        }
        pulse(&mut det, &mut irq, true);
        assert_eq!(det.state(), DetectorState::Counting);
        pulse(&mut det, &mut irq, true);
        assert_eq!(det.state(), DetectorState::Fired);
        assert_eq!(det.edges(), 4);
    }

    #[test]
    fn level_held_high_is_one_edge() {
        let mut det = Detector::new();
        let mut irq = HandOff::new();
        det.load(1);
        det.set_enabled(true);
        det.tick(&pins(false, true), &mut irq);
        for _ in 0..10 {
            det.tick(&pins(true, true), &mut irq);
        }
        assert_eq!(det.edges(), 1);
        assert_eq!(det.state(), DetectorState::Counting);
    }

    #[test]
    fn retired_after_firing() {
        let mut det = Detector::new();
        let mut irq = HandOff::new();
        det.load(0);
        det.set_enabled(true);
        pulse(&mut det, &mut irq, true);
        assert!(irq.take());
        for _ in 0..10 {
            pulse(&mut det, &mut irq, true);
        }
        assert!(!irq.is_pending());
        assert_eq!(det.edges(), 1);
    }

    #[test]
    fn disabled_ignores_bus() {
        let mut det = Detector::new();
        let mut irq = HandOff::new();
        det.load(0);
        pulse(&mut det, &mut irq, true);
        assert_eq!(det.state(), DetectorState::Idle);
        assert!(!irq.has_fired());
    }
}
