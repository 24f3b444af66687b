use crate::TxFifo;
use common::{ByteOrder, Selection};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum State {
    Released,
    Armed,
    Busy,
    Done,
}

/// 载荷流式搬运。
///
/// 启动后每当队列有空位就读出下一个源字，按需翻转字节序后写入队列，
/// 直到搬完配置的字数。队列满时停住，不丢字也不重复。
#[derive(Clone, Debug)]
pub struct StreamEngine<'a> {
    source: &'a [u32],
    order: ByteOrder,
    next: usize,
    state: State,
}

impl<'a> StreamEngine<'a> {
    #[inline]
    pub const fn new() -> Self {
        Self {
            source: &[],
            order: ByteOrder::Native,
            next: 0,
            state: State::Released,
        }
    }

    /// 配置源与字节序，不启动。
    pub fn configure(&mut self, payload: &Selection<'a>) {
        self.source = payload.words;
        self.order = payload.order;
        self.next = 0;
        self.state = State::Armed;
    }

    pub fn start(&mut self) {
        if self.state == State::Armed {
            self.state = if self.source.is_empty() {
                State::Done
            } else {
                State::Busy
            };
        }
    }

    #[inline]
    pub fn is_busy(&self) -> bool {
        self.state == State::Busy
    }

    #[inline]
    pub fn is_done(&self) -> bool {
        self.state == State::Done
    }

    /// 已写入队列的字数。
    #[inline]
    pub fn transferred(&self) -> usize {
        self.next
    }

    /// 推进一个搬运周期：最多搬一个字。
    pub fn tick(&mut self, fifo: &mut TxFifo) {
        if self.state != State::Busy || !fifo.has_space() {
            return;
        }
        let word = self.order.apply(self.source[self.next]);
        if fifo.push(word).is_ok() {
            self.next += 1;
            if self.next == self.source.len() {
                self.state = State::Done;
            }
        }
    }

    pub fn release(&mut self) {
        self.source = &[];
        self.state = State::Released;
    }
}

impl Default for StreamEngine<'_> {
    #[inline]
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use common::Origin;

    fn selection(words: &[u32], order: ByteOrder) -> Selection<'_> {
        Selection {
            words,
            order,
            origin: Origin::External,
        }
    }

    #[test]
    fn armed_engine_waits_for_start() {
        let src = [1, 2, 3];
        let mut dma = StreamEngine::new();
        let mut fifo = TxFifo::new();
        dma.configure(&selection(&src, ByteOrder::Native));
        dma.tick(&mut fifo);
        assert!(fifo.is_empty());
        assert!(!dma.is_busy());
    }

    #[test]
    fn paced_by_queue_space() {
        let src: Vec<u32> = (0..20).collect();
        let mut dma = StreamEngine::new();
        let mut fifo = TxFifo::new();
        dma.configure(&selection(&src, ByteOrder::Native));
        dma.start();
        for _ in 0..100 {
            dma.tick(&mut fifo);
        }
        assert_eq!(dma.transferred(), 4);
        assert!(dma.is_busy());

        let mut out = vec![];
        while dma.is_busy() || !fifo.is_empty() {
            if let Some(w) = fifo.pop() {
                out.push(w);
            }
            dma.tick(&mut fifo);
        }
        assert_eq!(out, src);
        assert!(dma.is_done());
    }

    #[test]
    fn swaps_each_word() {
        let src = [0x1122_3344, 0xa0b0_c0d0];
        let mut dma = StreamEngine::new();
        let mut fifo = TxFifo::new();
        dma.configure(&selection(&src, ByteOrder::Swap));
        dma.start();
        dma.tick(&mut fifo);
        dma.tick(&mut fifo);
        assert!(dma.is_done());
        assert_eq!(fifo.pop(), Some(0x4433_2211));
        assert_eq!(fifo.pop(), Some(0xd0c0_b0a0));
    }

    #[test]
    fn released_engine_is_idle() {
        let src = [7];
        let mut dma = StreamEngine::new();
        dma.configure(&selection(&src, ByteOrder::Native));
        dma.release();
        dma.start();
        assert!(!dma.is_busy());
    }
}
