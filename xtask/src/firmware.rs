use crate::{DIRS, TARGET};
use os_xtask_utils::{BinUtil, Cargo, CommandExt};
use std::{
    error::Error,
    fs,
    io::{Error as IoError, ErrorKind as IoErrorKind},
    path::{Path, PathBuf},
};

const PACKAGE: &str = "boot";

#[derive(Args)]
pub struct MakeArgs {
    /// Scrambled payload compiled in as the default, produced by `ipl`.
    #[clap(long)]
    ipl: Option<PathBuf>,
    /// Firmware log level.
    #[clap(long)]
    log: Option<String>,
}

impl MakeArgs {
    /// 编译固件并转换为裸二进制，返回二进制的路径。
    pub fn make(&self) -> Result<PathBuf, Box<dyn Error>> {
        let mut cargo = Cargo::build();
        cargo.package(PACKAGE).release().args(["--target", TARGET]);
        if let Some(ipl) = &self.ipl {
            if !ipl.is_file() {
                return Err(IoError::new(
                    IoErrorKind::NotFound,
                    format!("payload file \"{}\" not exist", ipl.display()),
                )
                .into());
            }
            cargo.as_mut().env("IPL", fs::canonicalize(ipl)?);
        }
        if let Some(level) = &self.log {
            cargo.as_mut().env("LOG", level);
        }
        cargo.invoke();

        let bin = elf().with_extension("bin");
        BinUtil::objcopy()
            .arg(elf())
            .args(["--strip-all", "-O", "binary"])
            .arg(&bin)
            .invoke();
        info!(
            "{} ({} bytes)",
            bin.display(),
            fs::metadata(&bin)?.len()
        );
        Ok(bin)
    }
}

#[inline]
pub fn elf() -> PathBuf {
    DIRS.target.join(PACKAGE)
}

/// 反汇编固件，保存到 `path`。
pub fn objdump(path: impl AsRef<Path>) -> Result<(), Box<dyn Error>> {
    Cargo::build()
        .package(PACKAGE)
        .release()
        .args(["--target", TARGET])
        .invoke();
    let contents = BinUtil::objdump().arg(elf()).arg("-d").output().stdout;
    fs::write(path, contents)?;
    Ok(())
}
