//! This module contains the global logger instance used by the `log` crate.
//!
//! Records are written to stderr so they never mix with command output.

use log::LevelFilter;
use std::io::Write;

/// The static API for the logger.
pub static LOGGER_API: StderrLogger = StderrLogger;

/// A logger writing one line per record to stderr.
pub struct StderrLogger;

impl log::Log for StderrLogger {
    fn enabled(&self, metadata: &log::Metadata) -> bool {
        metadata.level() <= log::max_level()
    }

    fn log(&self, record: &log::Record) {
        if !self.enabled(record.metadata()) {
            return;
        }

        let mut stderr = std::io::stderr().lock();
        // A failing stderr has nowhere left to report to.
        let _ = if cfg!(debug_assertions) {
            writeln!(
                stderr,
                "[{:5}] {}:{}: {}",
                record.level(),
                record.file().unwrap_or("unknown"),
                record.line().unwrap_or(0),
                record.args()
            )
        } else {
            writeln!(stderr, "[{:5}] {}", record.level(), record.args())
        };
    }

    fn flush(&self) {
        let _ = std::io::stderr().flush();
    }
}

/// Installs the logger. Later calls keep the first logger but update the level.
pub fn init(level: LevelFilter) {
    if log::set_logger(&LOGGER_API).is_err() {
        log::debug!("logger already installed");
    }
    log::set_max_level(level);
}
