#[macro_use]
extern crate clap;
#[macro_use]
extern crate log;

mod asm;
mod dol;
mod firmware;
mod ipl;

use clap::Parser;
use clap_verbosity_flag::{InfoLevel, Verbosity};
use common::Invalid;
use once_cell::sync::Lazy;
use std::{
    error::Error,
    fmt,
    path::{Path, PathBuf},
};

#[derive(Parser)]
#[clap(name = "IPL Streamer Util")]
#[clap(version, about, long_about = None)]
struct Cli {
    #[clap(subcommand)]
    command: Commands,
    #[clap(flatten)]
    verbose: Verbosity<InfoLevel>,
}

#[derive(Subcommand)]
enum Commands {
    /// Build the firmware and convert it to a raw binary.
    Make(firmware::MakeArgs),
    /// Disassemble the firmware.
    Asm(asm::AsmArgs),
    /// Convert a DOL executable into a scrambled default payload.
    Ipl(ipl::IplArgs),
    /// Validate a payload-store image the way the firmware does.
    Check(ipl::CheckArgs),
}

fn main() {
    let cli = Cli::parse();
    env_logger::Builder::new()
        .filter_level(cli.verbose.log_level_filter())
        .init();
    use Commands::*;
    let result = match cli.command {
        Make(args) => args.make().map(|_| ()),
        Asm(args) => args.asm(),
        Ipl(args) => args.convert(),
        Check(args) => args.check(),
    };
    if let Err(e) = result {
        error!("{e}");
        std::process::exit(1);
    }
}

static DIRS: Lazy<Dirs> = Lazy::new(Dirs::new);

/// 固件的目标三元组。
const TARGET: &str = "thumbv6m-none-eabi";

struct Dirs {
    workspace: PathBuf,
    target: PathBuf,
}

impl Dirs {
    fn new() -> Self {
        let workspace = Path::new(std::env!("CARGO_MANIFEST_DIR"))
            .parent()
            .unwrap()
            .to_path_buf();
        let target = workspace.join("target").join(TARGET).join("release");
        Self { workspace, target }
    }
}

#[derive(Debug)]
enum XError {
    BadDol(&'static str),
    WrongAddress { entry: u32, load: u32 },
    InvalidImage(Invalid),
}

impl fmt::Display for XError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::BadDol(why) => write!(f, "not a DOL executable: {why}"),
            Self::WrongAddress { entry, load } => write!(
                f,
                "entry point {entry:#010x} and load address {load:#010x} must be {:#010x} and {:#010x}",
                dol::ENTRY,
                dol::LOAD
            ),
            Self::InvalidImage(reason) => write!(f, "payload rejected: {reason}"),
        }
    }
}

impl Error for XError {}
