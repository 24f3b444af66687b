//! DOL 可执行文件：18 个段（7 个代码段、11 个数据段），0x100 字节的大端头部。

use crate::XError;

/// 引导代码要求的入口地址。
pub const ENTRY: u32 = 0x8130_0000;
/// 引导代码要求的加载地址（物理地址）。
pub const LOAD: u32 = 0x0130_0000;

const HEADER_LEN: usize = 0x100;
const SECTIONS: usize = 18;
const ENTRY_WORD: usize = 56;
const PHYSICAL: u32 = 0x017f_ffff;

/// 按加载地址铺开的内存镜像。
pub struct Flat {
    /// 入口地址，已归一化到缓存段
    pub entry: u32,
    /// 最低段地址，已归一化为物理地址
    pub load: u32,
    pub image: Vec<u8>,
}

pub fn flatten(file: &[u8]) -> Result<Flat, XError> {
    let header = file
        .get(..HEADER_LEN)
        .ok_or(XError::BadDol("shorter than its header"))?
        .chunks_exact(4)
        .map(|w| u32::from_be_bytes([w[0], w[1], w[2], w[3]]))
        .collect::<Vec<_>>();
    let offsets = &header[..SECTIONS];
    let addresses = &header[SECTIONS..2 * SECTIONS];
    let sizes = &header[2 * SECTIONS..3 * SECTIONS];

    let min = addresses
        .iter()
        .copied()
        .filter(|&a| a != 0)
        .min()
        .ok_or(XError::BadDol("no loadable section"))?;
    let mut max = min;
    for (&address, &size) in addresses.iter().zip(sizes) {
        let end = address
            .checked_add(size)
            .ok_or(XError::BadDol("section wraps the address space"))?;
        max = max.max(end);
    }

    let mut image = vec![0; (max - min) as usize];
    for ((&offset, &address), &size) in offsets.iter().zip(addresses).zip(sizes) {
        if size == 0 {
            continue;
        }
        if address < min {
            return Err(XError::BadDol("section loads at address zero"));
        }
        let (offset, size) = (offset as usize, size as usize);
        let src = file
            .get(offset..offset + size)
            .ok_or(XError::BadDol("section extends past end of file"))?;
        let at = (address - min) as usize;
        image[at..at + size].copy_from_slice(src);
    }
    Ok(Flat {
        entry: header[ENTRY_WORD] & PHYSICAL | 0x8000_0000,
        load: min & PHYSICAL,
        image,
    })
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    /// 构造一个 DOL：每个段是（加载地址，内容）。
    pub(crate) fn dol(entry: u32, sections: &[(u32, &[u8])]) -> Vec<u8> {
        let mut header = [0u32; 64];
        let mut body = Vec::new();
        for (i, (address, data)) in sections.iter().enumerate() {
            header[i] = (HEADER_LEN + body.len()) as u32;
            header[SECTIONS + i] = *address;
            header[2 * SECTIONS + i] = data.len() as u32;
            body.extend_from_slice(data);
        }
        header[ENTRY_WORD] = entry;
        let mut file: Vec<u8> = header.iter().flat_map(|w| w.to_be_bytes()).collect();
        file.extend(body);
        file
    }

    #[test]
    fn sections_land_at_their_addresses() {
        let file = dol(
            0x8130_0000,
            &[(0x8130_0000, &[1, 2, 3, 4][..]), (0x8130_0010, &[9, 9][..])],
        );
        let flat = flatten(&file).unwrap();
        assert_eq!(flat.entry, ENTRY);
        assert_eq!(flat.load, LOAD);
        assert_eq!(
            flat.image,
            [1, 2, 3, 4, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 9, 9]
        );
    }

    #[test]
    fn uncached_addresses_are_normalised() {
        let file = dol(0xc130_0000, &[(0xc130_0000, &[0xaa; 8][..])]);
        let flat = flatten(&file).unwrap();
        assert_eq!(flat.entry, ENTRY);
        assert_eq!(flat.load, LOAD);
        assert_eq!(flat.image.len(), 8);
    }

    #[test]
    fn malformed_files() {
        assert!(matches!(flatten(&[0; 16]), Err(XError::BadDol(_))));
        assert!(matches!(flatten(&dol(0, &[])), Err(XError::BadDol(_))));
        let mut file = dol(0x8130_0000, &[(0x8130_0000, &[1; 16][..])]);
        file.truncate(HEADER_LEN + 8);
        assert!(matches!(flatten(&file), Err(XError::BadDol(_))));
    }
}
