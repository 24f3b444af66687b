//! 载荷存储的布局与载荷选择。
//!
//! flash 中的外部载荷以大端序存放：
//!
//! ```text
//! 0x00          "IPLB"
//! 0x04          "OOT "
//! 0x08          载荷长度 L（字节，大端）
//! 0x0c          L 字节引导镜像
//! E - 4         "PICO"，E = align1024(12 + L)
//! ```
//!
//! 校验失败时整块缓冲区作废，改用编译进固件的默认载荷。

use core::fmt;
use log::{info, warn};

pub const MAGIC_HEAD: u32 = u32::from_be_bytes(*b"IPLB");
pub const MAGIC_BOOT: u32 = u32::from_be_bytes(*b"OOT ");
pub const MAGIC_TAIL: u32 = u32::from_be_bytes(*b"PICO");

/// 两个魔数加长度字。
pub const HEADER_LEN: usize = 12;
/// 外部载荷的对齐粒度，也是一次引导读取的长度。
pub const ALIGN: usize = 1024;

/// 向上对齐到 [`ALIGN`]，溢出时返回 `None`。
#[inline]
pub const fn align(len: usize) -> Option<usize> {
    match len.checked_add(ALIGN - 1) {
        Some(n) => Some(n & !(ALIGN - 1)),
        None => None,
    }
}

/// 流式引擎搬运每个字时是否翻转字节序。
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ByteOrder {
    /// 已是目标的本机字序。
    Native,
    /// 逐字翻转字节序。
    Swap,
}

impl ByteOrder {
    #[inline]
    pub const fn apply(self, word: u32) -> u32 {
        match self {
            Self::Native => word,
            Self::Swap => word.swap_bytes(),
        }
    }
}

/// 外部载荷被拒绝的原因。
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Invalid {
    BadMagic { head: u32, boot: u32 },
    ZeroLength,
    OutOfBounds { extent: usize, region: usize },
    BadTrailer { found: u32 },
}

impl fmt::Display for Invalid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match *self {
            Self::BadMagic { head, boot } => {
                write!(f, "bad magic {head:#010x} {boot:#010x}")
            }
            Self::ZeroLength => write!(f, "declared length is zero"),
            Self::OutOfBounds { extent, region } => {
                write!(f, "extent of {extent} bytes exceeds region of {region} bytes")
            }
            Self::BadTrailer { found } => write!(f, "bad trailing magic {found:#010x}"),
        }
    }
}

/// 选中的载荷来自哪里。
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Origin {
    External,
    Fallback(Invalid),
}

/// 流式引擎的搬运参数：源、字数、字节序。
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Selection<'a> {
    pub words: &'a [u32],
    pub order: ByteOrder,
    pub origin: Origin,
}

impl Selection<'_> {
    #[inline]
    pub fn as_ptr(&self) -> *const u32 {
        self.words.as_ptr()
    }

    #[inline]
    pub fn word_count(&self) -> usize {
        self.words.len()
    }

    /// 第 `n` 个将送往输出状态机的字，已按需翻转字节序。
    #[inline]
    pub fn word(&self, n: usize) -> Option<u32> {
        self.words.get(n).map(|w| self.order.apply(*w))
    }
}

/// 以外部（大端）字序解释一个从内存读出的字。
#[inline]
fn foreign(word: u32) -> u32 {
    u32::from_be(word)
}

/// 校验外部载荷区域，成功时返回对齐后的字数。
pub fn validate(region: &[u32]) -> Result<usize, Invalid> {
    let bound = region.len() * 4;
    let &[head, boot, len, ..] = region else {
        return Err(Invalid::OutOfBounds {
            extent: HEADER_LEN,
            region: bound,
        });
    };
    let (head, boot) = (foreign(head), foreign(boot));
    if head != MAGIC_HEAD || boot != MAGIC_BOOT {
        return Err(Invalid::BadMagic { head, boot });
    }
    let len = foreign(len) as usize;
    if len == 0 {
        return Err(Invalid::ZeroLength);
    }
    let extent = match HEADER_LEN.checked_add(len).and_then(align) {
        Some(extent) if extent <= bound => extent,
        extent => {
            return Err(Invalid::OutOfBounds {
                extent: extent.unwrap_or(usize::MAX),
                region: bound,
            })
        }
    };
    let words = extent / 4;
    let found = foreign(region[words - 1]);
    if found != MAGIC_TAIL {
        return Err(Invalid::BadTrailer { found });
    }
    Ok(words)
}

/// 决定流式引擎要搬运的缓冲区。
///
/// 外部载荷有效时返回它的整个对齐区间并要求逐字翻转字节序；
/// 否则返回默认载荷，不做转换。没有副作用，对同一存储内容重复调用结果相同。
pub fn select_payload<'a>(external: &'a [u32], default: &'a [u32]) -> Selection<'a> {
    match validate(external) {
        Ok(words) => {
            info!("external payload: {} words at {:p}", words, external.as_ptr());
            Selection {
                words: &external[..words],
                order: ByteOrder::Swap,
                origin: Origin::External,
            }
        }
        Err(reason) => {
            warn!("external payload rejected ({reason}), using default payload");
            Selection {
                words: default,
                order: ByteOrder::Native,
                origin: Origin::Fallback(reason),
            }
        }
    }
}
