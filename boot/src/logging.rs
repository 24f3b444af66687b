use core::fmt::Write;
use hal::uart::{Uart, Writer};
use log::{Level, LevelFilter, Log};

/// 日志从 UART0 输出。传入 `Uart` 只为证明它已经初始化。
pub(crate) fn init(_uart: &Uart) {
    log::set_logger(&CONSOLE).ok();
    log::set_max_level(
        option_env!("LOG")
            .and_then(|level| level.parse().ok())
            .unwrap_or(LevelFilter::Info),
    );
}

// SAFETY: 只有 `init` 之后才会经由日志写串口
static CONSOLE: Console = Console(unsafe { Writer::steal() });

struct Console(Writer);

impl Log for Console {
    #[inline]
    fn enabled(&self, _metadata: &log::Metadata) -> bool {
        true
    }

    fn log(&self, record: &log::Record) {
        let color_code = match record.level() {
            Level::Error => "31",
            Level::Warn => "93",
            Level::Info => "34",
            Level::Debug => "32",
            Level::Trace => "90",
        };
        let mut out = self.0;
        writeln!(
            out,
            "\x1b[{}m[{:>5}] {}\x1b[0m\r",
            color_code,
            record.level(),
            record.args()
        )
        .ok();
    }

    fn flush(&self) {}
}
