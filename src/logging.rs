//! Kernel Logging
//!
//! Routes the `log` facade and the `kprint!`/`kprintln!` macros to the
//! platform console.
//!
//! Until [`init`] installs a console, log records are dropped and
//! `kprint!` output goes nowhere.

use core::fmt::{self, Write};

use log::{LevelFilter, Log, Metadata, Record, SetLoggerError};
use spin::Mutex;

use crate::platform::Console;

/// Console receiving all kernel output, installed once at bring-up.
static CONSOLE: Mutex<Option<&'static (dyn Console + Sync)>> = Mutex::new(None);

/// `fmt::Write` adapter over a console.
pub struct ConsoleWriter<'a> {
    console: &'a dyn Console,
}

impl<'a> ConsoleWriter<'a> {
    pub fn new(console: &'a dyn Console) -> Self {
        Self { console }
    }
}

impl Write for ConsoleWriter<'_> {
    fn write_str(&mut self, s: &str) -> fmt::Result {
        self.console.put_buf(s.as_bytes());
        Ok(())
    }
}

#[doc(hidden)]
pub fn _print(args: fmt::Arguments<'_>) {
    let console = CONSOLE.lock();
    if let Some(console) = *console {
        let _ = ConsoleWriter::new(console).write_fmt(args);
    }
}

struct KernelLogger;

impl Log for KernelLogger {
    fn enabled(&self, metadata: &Metadata<'_>) -> bool {
        metadata.level() <= log::max_level()
    }

    fn log(&self, record: &Record<'_>) {
        if !self.enabled(record.metadata()) {
            return;
        }
        _print(format_args!(
            "[{} {}] {}\n",
            record.level(),
            record.target(),
            record.args()
        ));
    }

    fn flush(&self) {}
}

static LOGGER: KernelLogger = KernelLogger;

/// Install `console` as the kernel output device and register the logger.
///
/// The console is replaced even if a logger was already registered; the
/// error only reports that the `log` facade was set up earlier.
pub fn init(
    console: &'static (dyn Console + Sync),
    level: LevelFilter,
) -> Result<(), SetLoggerError> {
    *CONSOLE.lock() = Some(console);
    log::set_logger(&LOGGER)?;
    log::set_max_level(level);
    Ok(())
}

/// Print macro for kernel output
#[macro_export]
macro_rules! kprint {
    ($($arg:tt)*) => {
        $crate::logging::_print(format_args!($($arg)*))
    };
}

/// Println macro for kernel output
#[macro_export]
macro_rules! kprintln {
    () => {
        $crate::kprint!("\n")
    };
    ($($arg:tt)*) => {{
        $crate::kprint!($($arg)*);
        $crate::kprint!("\n");
    }};
}
