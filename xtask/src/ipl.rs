//! 默认载荷的生成与载荷存储镜像的检查。

use crate::{
    dol::{self, Flat},
    XError,
};
use common::{
    ipl::{validate, ALIGN, HEADER_LEN},
    scramble::{scramble, IPL_STREAM_OFFSET},
};
use std::{error::Error, fs, path::PathBuf};

/// 引导 ROM 在镜像之前读取的 32 字节。
pub const PADDING: [u8; 32] = [
    0x81, 0x4a, 0xe6, 0xc8, 0x00, 0x04, 0xc5, 0x77, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00,
    0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00,
];

/// 前缀、镜像、补齐到 1 KiB，再从流偏移 0x700 处开始扰码。
pub fn build(flat: &Flat) -> Result<Vec<u8>, XError> {
    if flat.entry != dol::ENTRY || flat.load != dol::LOAD {
        return Err(XError::WrongAddress {
            entry: flat.entry,
            load: flat.load,
        });
    }
    let mut payload = Vec::with_capacity(PADDING.len() + flat.image.len() + ALIGN);
    payload.extend_from_slice(&PADDING);
    payload.extend_from_slice(&flat.image);
    payload.resize(payload.len().div_ceil(ALIGN) * ALIGN, 0);
    scramble(&mut payload, IPL_STREAM_OFFSET);
    Ok(payload)
}

#[derive(Args)]
pub struct IplArgs {
    /// DOL executable linked at 0x81300000.
    input: PathBuf,
    /// Where to write the scrambled payload.
    output: PathBuf,
}

impl IplArgs {
    pub fn convert(&self) -> Result<(), Box<dyn Error>> {
        let flat = dol::flatten(&fs::read(&self.input)?)?;
        info!("entry point:  {:#010x}", flat.entry);
        info!("load address: {:#010x}", flat.load);
        info!("image size:   {} bytes", flat.image.len());
        let payload = build(&flat)?;
        fs::write(&self.output, &payload)?;
        println!(
            "{}: {} bytes ({}K)",
            self.output.display(),
            payload.len(),
            payload.len() / ALIGN
        );
        Ok(())
    }
}

#[derive(Args)]
pub struct CheckArgs {
    /// Payload-store image, as it would be written to flash.
    image: PathBuf,
}

impl CheckArgs {
    pub fn check(&self) -> Result<(), Box<dyn Error>> {
        let words = check_image(&fs::read(&self.image)?)?;
        println!(
            "{}: valid, {} words ({} bytes) will be streamed",
            self.image.display(),
            words,
            words * 4
        );
        Ok(())
    }
}

/// 按处理器读 flash 的方式把镜像解释成字，再交给固件的校验。
fn check_image(bytes: &[u8]) -> Result<usize, XError> {
    let words = bytes
        .chunks_exact(4)
        .map(|w| u32::from_ne_bytes([w[0], w[1], w[2], w[3]]))
        .collect::<Vec<_>>();
    let count = validate(&words).map_err(XError::InvalidImage)?;
    debug!("header {HEADER_LEN} bytes, extent {} bytes", count * 4);
    Ok(count)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dol::tests::dol;
    use common::Invalid;

    fn flat(len: usize) -> Flat {
        dol::flatten(&dol(0x8130_0000, &[(0x8130_0000, &vec![0x5a; len][..])])).unwrap()
    }

    #[test]
    fn payload_is_padded_and_scrambled() {
        let payload = build(&flat(1000)).unwrap();
        assert_eq!(payload.len(), 2048);
        // 前缀与流偏移 0x700 处的密钥流异或
        assert_eq!(
            payload[..8],
            [0x49, 0xed, 0xbc, 0x31, 0xc3, 0x4c, 0x06, 0x1f]
        );
        let mut plain = payload.clone();
        scramble(&mut plain, IPL_STREAM_OFFSET);
        assert_eq!(plain[..32], PADDING);
        assert!(plain[32..1032].iter().all(|&b| b == 0x5a));
        assert!(plain[1032..].iter().all(|&b| b == 0));
    }

    #[test]
    fn exact_fit_is_not_padded() {
        assert_eq!(build(&flat(1024 - 32)).unwrap().len(), 1024);
    }

    #[test]
    fn wrong_load_address() {
        let flat = dol::flatten(&dol(0x8000_3100, &[(0x8000_3100, &[0; 4][..])])).unwrap();
        assert!(matches!(
            build(&flat),
            Err(XError::WrongAddress {
                entry: 0x8000_3100,
                load: 0x0000_3100
            })
        ));
    }

    fn store(len: u32) -> Vec<u8> {
        let extent = (HEADER_LEN + len as usize).div_ceil(ALIGN) * ALIGN;
        let mut bytes = vec![0xff; extent + ALIGN];
        bytes[..4].copy_from_slice(b"IPLB");
        bytes[4..8].copy_from_slice(b"OOT ");
        bytes[8..12].copy_from_slice(&len.to_be_bytes());
        bytes[extent - 4..extent].copy_from_slice(b"PICO");
        bytes
    }

    #[test]
    fn check_reports_extent() {
        assert_eq!(check_image(&store(1000)).unwrap(), 256);
        assert_eq!(check_image(&store(2000)).unwrap(), 512);
    }

    #[test]
    fn check_reports_reason() {
        let mut image = store(1000);
        image[1020] = b'X';
        assert!(matches!(
            check_image(&image),
            Err(XError::InvalidImage(Invalid::BadTrailer { .. }))
        ));
        assert!(matches!(
            check_image(&[0xff; 64]),
            Err(XError::InvalidImage(Invalid::BadMagic { .. }))
        ));
    }
}
