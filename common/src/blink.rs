//! 状态灯节奏。LED 平时常亮，闪一下就是先熄灭再点亮。

/// 一种闪烁节奏。
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Cadence {
    pub dark_ms: u32,
    pub lit_ms: u32,
    pub count: u32,
}

/// 节奏中的一步：LED 电平和保持时间。
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Step {
    pub lit: bool,
    pub hold_ms: u32,
}

impl Cadence {
    /// 等待传输期间每次轮询闪一下。
    pub const WAITING: Self = Self::new(100, 100, 1);
    /// 传输完成后慢闪三下。
    pub const DONE: Self = Self::new(250, 250, 3);

    #[inline]
    pub const fn new(dark_ms: u32, lit_ms: u32, count: u32) -> Self {
        Self {
            dark_ms,
            lit_ms,
            count,
        }
    }

    #[inline]
    pub const fn period_ms(&self) -> u32 {
        self.dark_ms + self.lit_ms
    }

    #[inline]
    pub const fn steps(self) -> Blink {
        Blink {
            cadence: self,
            left: self.count,
            lit: true,
        }
    }
}

/// 按节奏依次产出 [`Step`]，结束时 LED 总是亮着的。
pub struct Blink {
    cadence: Cadence,
    left: u32,
    lit: bool,
}

impl Iterator for Blink {
    type Item = Step;

    fn next(&mut self) -> Option<Step> {
        if self.lit {
            // 新一轮闪烁
            if self.left == 0 {
                return None;
            }
            self.left -= 1;
            self.lit = false;
            Some(Step {
                lit: false,
                hold_ms: self.cadence.dark_ms,
            })
        } else {
            self.lit = true;
            Some(Step {
                lit: true,
                hold_ms: self.cadence.lit_ms,
            })
        }
    }
}
