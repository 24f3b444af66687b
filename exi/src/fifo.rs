const DEPTH: usize = 4;
const JOINED_DEPTH: usize = 8;

/// 输出状态机的发送队列，深度 4，合并 RX 后深度 8。
///
/// 满时拒绝写入，这是流式引擎的反压点。
#[derive(Clone, Debug)]
pub struct TxFifo {
    buf: [u32; JOINED_DEPTH],
    head: usize,
    len: usize,
    depth: usize,
}

impl TxFifo {
    #[inline]
    pub const fn new() -> Self {
        Self::with_depth(DEPTH)
    }

    /// 合并 RX FIFO 后的 8 字队列。
    #[inline]
    pub const fn joined() -> Self {
        Self::with_depth(JOINED_DEPTH)
    }

    #[inline]
    const fn with_depth(depth: usize) -> Self {
        Self {
            buf: [0; JOINED_DEPTH],
            head: 0,
            len: 0,
            depth,
        }
    }

    #[inline]
    pub const fn depth(&self) -> usize {
        self.depth
    }

    #[inline]
    pub const fn len(&self) -> usize {
        self.len
    }

    #[inline]
    pub const fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// DREQ：队列还有空位。
    #[inline]
    pub const fn has_space(&self) -> bool {
        self.len < self.depth
    }

    /// 写入一个字，队列满时原样退回。
    pub fn push(&mut self, word: u32) -> Result<(), u32> {
        if !self.has_space() {
            return Err(word);
        }
        self.buf[(self.head + self.len) % self.depth] = word;
        self.len += 1;
        Ok(())
    }

    pub fn pop(&mut self) -> Option<u32> {
        if self.is_empty() {
            return None;
        }
        let word = self.buf[self.head];
        self.head = (self.head + 1) % self.depth;
        self.len -= 1;
        Some(word)
    }

    #[inline]
    pub fn clear(&mut self) {
        self.head = 0;
        self.len = 0;
    }
}

impl Default for TxFifo {
    #[inline]
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::TxFifo;

    #[test]
    fn keeps_order_across_wraparound() {
        let mut fifo = TxFifo::new();
        for round in 0..3u32 {
            for i in 0..4 {
                fifo.push(round * 10 + i).unwrap();
            }
            assert_eq!(fifo.push(99), Err(99));
            assert!(!fifo.has_space());
            for i in 0..3 {
                assert_eq!(fifo.pop(), Some(round * 10 + i));
            }
            fifo.push(round * 10 + 4).unwrap();
            assert_eq!(fifo.pop(), Some(round * 10 + 3));
            assert_eq!(fifo.pop(), Some(round * 10 + 4));
            assert_eq!(fifo.pop(), None);
        }
    }

    #[test]
    fn joined_holds_eight() {
        let mut fifo = TxFifo::joined();
        assert_eq!(fifo.depth(), 8);
        for i in 0..8 {
            fifo.push(i).unwrap();
        }
        assert_eq!(fifo.len(), 8);
        assert!(fifo.push(8).is_err());
        fifo.clear();
        assert!(fifo.is_empty());
    }
}
