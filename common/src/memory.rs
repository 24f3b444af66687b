pub const XIP_BASE: usize = 0x1000_0000;

/// flash 中的一段区域，以相对 XIP 基址的偏移表示。
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Region {
    offset: u32,
    size: u32,
}

impl Region {
    /// 外部载荷所在区域：固件之后的 1.5 MiB。
    pub const EXTERNAL_IPL: Self = Self::new(0x8_0000, 0x18_0000);

    #[inline]
    pub const fn new(offset: u32, size: u32) -> Self {
        Self { offset, size }
    }

    #[inline]
    pub const fn offset(&self) -> usize {
        self.offset as _
    }

    #[inline]
    pub const fn size(&self) -> usize {
        self.size as _
    }

    #[inline]
    pub const fn address(&self) -> usize {
        XIP_BASE + self.offset as usize
    }

    /// 区域以字计的长度，不足一字的尾部被忽略。
    #[inline]
    pub const fn words(&self) -> usize {
        self.size as usize / 4
    }

    /// 把区域视为一个只读字切片。
    ///
    /// # Safety
    ///
    /// 区域必须位于已映射的 XIP flash 内，并且在返回的引用存活期间不被擦写。
    #[inline]
    pub unsafe fn as_words(&self) -> &'static [u32] {
        core::slice::from_raw_parts(self.address() as *const u32, self.words())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn external_region_stays_inside_2m_flash() {
        let r = Region::EXTERNAL_IPL;
        assert_eq!(r.address(), 0x1008_0000);
        assert_eq!(r.offset() + r.size(), 2 << 20);
        assert_eq!(r.words() * 4, r.size());
    }
}
