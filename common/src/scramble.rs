//! GameCube 引导 ROM 的扰码。
//!
//! 引导 ROM 用三个 16 位 LFSR 生成密钥流，与 IPL 数据逐字节异或，
//! 所以加扰和解扰是同一个操作。

/// IPL 数据在密钥流中的起点。
pub const IPL_STREAM_OFFSET: usize = 0x700;

/// 密钥流发生器。
#[derive(Clone)]
pub struct Keystream {
    t: u16,
    u: u16,
    v: u16,
    x: u8,
}

impl Keystream {
    #[inline]
    pub const fn new() -> Self {
        Self {
            t: 0x2953,
            u: 0xd9c2,
            v: 0x3ff1,
            x: 1,
        }
    }

    /// 跳过 `n` 字节。
    pub fn skip_bytes(&mut self, n: usize) {
        for _ in 0..n {
            self.next_byte();
        }
    }

    pub fn next_byte(&mut self) -> u8 {
        let mut acc = 0u8;
        for _ in 0..8 {
            acc = (acc << 1) | self.next_bit();
        }
        acc
    }

    fn next_bit(&mut self) -> u8 {
        let (t0, t1) = ((self.t & 1) as u8, ((self.t >> 1) & 1) as u8);
        let (u0, u1) = ((self.u & 1) as u8, ((self.u >> 1) & 1) as u8);
        let v0 = (self.v & 1) as u8;

        self.x ^= t1 ^ v0;
        self.x ^= u0 | u1;
        self.x ^= (t0 ^ u1 ^ v0) & (t0 ^ u0);

        if t0 == u0 {
            self.v >>= 1;
            if v0 != 0 {
                self.v ^= 0xb3d0;
            }
        }
        if t0 == 0 {
            self.u >>= 1;
            if u0 != 0 {
                self.u ^= 0xfb10;
            }
        }
        self.t >>= 1;
        if t0 != 0 {
            self.t ^= 0xa740;
        }
        self.x
    }
}

impl Default for Keystream {
    #[inline]
    fn default() -> Self {
        Self::new()
    }
}

impl Iterator for Keystream {
    type Item = u8;

    #[inline]
    fn next(&mut self) -> Option<u8> {
        Some(self.next_byte())
    }
}

/// 原地加扰（或解扰）`data`，`data[0]` 对应密钥流第 `offset` 字节。
pub fn scramble(data: &mut [u8], offset: usize) {
    let mut stream = Keystream::new();
    stream.skip_bytes(offset);
    for (b, k) in data.iter_mut().zip(stream) {
        *b ^= k;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn keystream_head() {
        let head: Vec<u8> = Keystream::new().take(8).collect();
        assert_eq!(head, [0x89, 0x7e, 0x47, 0x7f, 0xf4, 0x42, 0x3f, 0xe2]);
    }

    #[test]
    fn keystream_at_ipl_offset() {
        let mut data = [0u8; 16];
        scramble(&mut data, IPL_STREAM_OFFSET);
        assert_eq!(
            data,
            [
                0xc8, 0xa7, 0x5a, 0xf9, 0xc3, 0x48, 0xc3, 0x68, 0x40, 0xea, 0xe2, 0x24, 0x83, 0xa1,
                0x2b, 0xe0
            ]
        );
    }

    #[test]
    fn skipped_stream_continues_in_place() {
        let mut stream = Keystream::new();
        stream.skip_bytes(IPL_STREAM_OFFSET);
        let skipped: Vec<u8> = stream.take(4).collect();
        let walked: Vec<u8> = Keystream::new().skip(IPL_STREAM_OFFSET).take(4).collect();
        assert_eq!(skipped, walked);
        assert_eq!(skipped, [0xc8, 0xa7, 0x5a, 0xf9]);

        let mut data = [0u8; 4];
        scramble(&mut data, 0);
        assert_eq!(data, [0x89, 0x7e, 0x47, 0x7f]);
    }

    #[test]
    fn scramble_is_its_own_inverse() {
        let plain: Vec<u8> = (0..=255).collect();
        let mut data = plain.clone();
        scramble(&mut data, IPL_STREAM_OFFSET);
        assert_ne!(data, plain);
        scramble(&mut data, IPL_STREAM_OFFSET);
        assert_eq!(data, plain);
    }
}
