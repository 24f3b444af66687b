/// 计数状态机交给输出状态机的一次性事件。
///
/// 对应 PIO 的 IRQ 0 标志：一方置位，另一方 `wait 1 irq 0` 时清除。
/// 一个引导周期内只能置位一次。
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct HandOff {
    pending: bool,
    fired: bool,
}

impl HandOff {
    #[inline]
    pub const fn new() -> Self {
        Self {
            pending: false,
            fired: false,
        }
    }

    /// 置位事件。本周期已经触发过则忽略并返回 `false`。
    #[inline]
    pub fn raise(&mut self) -> bool {
        if self.fired {
            return false;
        }
        self.fired = true;
        self.pending = true;
        true
    }

    /// 消费事件。
    #[inline]
    pub fn take(&mut self) -> bool {
        core::mem::take(&mut self.pending)
    }

    #[inline]
    pub const fn is_pending(&self) -> bool {
        self.pending
    }

    #[inline]
    pub const fn has_fired(&self) -> bool {
        self.fired
    }
}

#[cfg(test)]
mod tests {
    use super::HandOff;

    #[test]
    fn fires_once_and_is_consumed_once() {
        let mut irq = HandOff::new();
        assert!(!irq.take());
        assert!(irq.raise());
        assert!(irq.is_pending());
        assert!(!irq.raise());
        assert!(irq.take());
        assert!(!irq.take());
        assert!(irq.has_fired());
        // 已经消费过的事件不能再次置位
        assert!(!irq.raise());
        assert!(!irq.is_pending());
    }
}
