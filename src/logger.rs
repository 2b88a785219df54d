// Copyright The Rusted Firmware-A Contributors.
//
// SPDX-License-Identifier: BSD-3-Clause

//! Logger backend for the `log` facade, writing to a platform provided sink.

use core::{
    fmt::{Arguments, Write},
    option_env,
};
use log::{LevelFilter, Log, Metadata, Record, SetLoggerError};
use spin::{Once, mutex::SpinMutex};

/// True if the build is configured with debug assertions on.
pub const DEBUG: bool = cfg!(debug_assertions);

static LOGGER: Once<Logger> = Once::new();

struct Logger {
    sink: &'static (dyn LogSink + Sync),
}

impl Log for Logger {
    fn enabled(&self, _metadata: &Metadata) -> bool {
        true
    }

    fn log(&self, record: &Record) {
        self.sink
            .write_fmt(format_args!("{}: {}\n", record.level(), record.args()));
    }

    fn flush(&self) {
        self.sink.flush();
    }
}

/// Initialises logger.
pub fn init(sink: &'static (dyn LogSink + Sync)) -> Result<(), SetLoggerError> {
    let logger = LOGGER.call_once(|| Logger { sink });
    log::set_logger(logger)?;
    log::set_max_level(build_time_log_level());
    Ok(())
}

/// Returns the logging [`LevelFilter`] set by the build-time environment variable `LOG_LEVEL`.
/// `LOG_LEVEL` can have the lower-case string values "off", "error", "warn", "info", "debug", or
/// "trace", corresponding to the named values of [`LevelFilter`]. If `LOG_LEVEL` is absent or has
/// some other value, this function returns `LevelFilter::Debug` if [`DEBUG`] is true, otherwise
/// `LevelFilter::Info`.
pub const fn build_time_log_level() -> LevelFilter {
    let level = match option_env!("LOG_LEVEL") {
        Some(level) => level,
        None => "",
    };
    parse_log_level(level)
}

const fn parse_log_level(level: &str) -> LevelFilter {
    match level.as_bytes() {
        b"off" => LevelFilter::Off,
        b"error" => LevelFilter::Error,
        b"warn" => LevelFilter::Warn,
        b"info" => LevelFilter::Info,
        b"debug" => LevelFilter::Debug,
        b"trace" => LevelFilter::Trace,
        _ => {
            if DEBUG {
                LevelFilter::Debug
            } else {
                LevelFilter::Info
            }
        }
    }
}

/// Something to which logs can be sent.
///
/// Note that unlike `core::fmt::Write`, the `write_fmt` method on this trait takes `&self` rather
/// than `&mut self`. This means that the implementation is responsible for handling locking if
/// necessary, or can be made lock-free.
pub trait LogSink {
    /// Writes the given format arguments to the log sink.
    fn write_fmt(&self, args: Arguments);

    /// Flushes any buffered output.
    fn flush(&self) {}
}

/// An implementation of `LogSink` that wraps around any implementation of `core::fmt::Write`.
///
/// This wraps the given writer in a spin mutex, to allow a single instance it to be used safely
/// from multiple cores. This also ensures that a complete log line is written at once, rather than
/// being interleaved with characters from another core.
pub struct LockedWriter<W: Write> {
    writer: SpinMutex<W>,
}

impl<W: Write> LockedWriter<W> {
    /// Creates a new `LockedWriter` wrapping the given [`Write`] implementation.
    pub const fn new(writer: W) -> Self {
        Self {
            writer: SpinMutex::new(writer),
        }
    }
}

impl<W: Write> LogSink for LockedWriter<W> {
    fn write_fmt(&self, args: Arguments) {
        // Ignore errors.
        let _ = self.writer.lock().write_fmt(args);
    }
}
