//! Console interface
//!
//! The raw console driver (serial port, VGA, keyboard) lives outside this
//! crate. The syscall layer uses it for fd 0 / fd 1 and for the exit
//! message; `ConsoleLogger` routes `log` records to the same device.

use core::fmt::{self, Write};

use log::{Level, LevelFilter, Log, Metadata, Record};

/// Console collaborator.
pub trait Console: Send + Sync {
    /// Write raw bytes to the console output.
    fn put_bytes(&self, bytes: &[u8]);

    /// Read one byte from console input, blocking until one is available.
    fn get_byte(&self) -> u8;
}

/// `fmt::Write` adapter over a console.
pub struct ConsoleWriter<'a>(pub &'a dyn Console);

impl Write for ConsoleWriter<'_> {
    fn write_str(&mut self, s: &str) -> fmt::Result {
        self.0.put_bytes(s.as_bytes());
        Ok(())
    }
}

/// `log` backend printing `[LEVEL target] message` lines on a console.
///
/// Install with `log::set_logger` from a `'static` instance during boot.
pub struct ConsoleLogger<C> {
    console: C,
    level: LevelFilter,
}

impl<C: Console> ConsoleLogger<C> {
    /// Create a logger that passes records up to `level`.
    pub const fn new(console: C, level: LevelFilter) -> Self {
        Self { console, level }
    }
}

impl<C: Console> Log for ConsoleLogger<C> {
    fn enabled(&self, metadata: &Metadata<'_>) -> bool {
        metadata.level() <= self.level
    }

    fn log(&self, record: &Record<'_>) {
        if !self.enabled(record.metadata()) {
            return;
        }
        let tag = match record.level() {
            Level::Error => "ERROR",
            Level::Warn => "WARN",
            Level::Info => "INFO",
            Level::Debug => "DEBUG",
            Level::Trace => "TRACE",
        };
        let mut out = ConsoleWriter(&self.console);
        let _ = writeln!(out, "[{} {}] {}", tag, record.target(), record.args());
    }

    fn flush(&self) {}
}
