use crate::{firmware, DIRS};
use std::{error::Error, fs, path::PathBuf};

#[derive(Args)]
pub struct AsmArgs {
    /// File or directory to save the disassembly in.
    #[clap(short, long)]
    output: Option<PathBuf>,
}

impl AsmArgs {
    pub fn asm(&self) -> Result<(), Box<dyn Error>> {
        // 如果没有设置输出，就放在 target 目录
        let output = self
            .output
            .clone()
            .unwrap_or_else(|| DIRS.workspace.join("target"));
        // 如果输出是个目录，就放在这个目录下，否则保存为输出指定的文件（可能会覆盖现有文件）
        let path = if output.is_dir() {
            output.join("boot.asm")
        } else {
            if let Some(parent) = output.parent().filter(|p| !p.as_os_str().is_empty()) {
                fs::create_dir_all(parent)?;
            }
            output
        };
        firmware::objdump(&path)?;
        info!("disassembly saved to {}", path.display());
        Ok(())
    }
}
