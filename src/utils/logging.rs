// src/utils/logging.rs
//! Logging configuration and utilities
//!
//! This module handles logging setup for the drops miner, including:
//! - Process-wide logger initialization (once, at the entry point)
//! - Per-component log targets handed out as [`LogSink`] values
//! - Custom log formatting
//!
//! Uses `env_logger` under the hood with custom formatting and filtering.

use env_logger::{Builder, Target};
use log::LevelFilter;
use std::fs::OpenOptions;
use std::path::PathBuf;

use crate::utils::error::MinerError;

/// Log target of the service controller and general output
pub const TARGET_MAIN: &str = "drops_miner";
/// Log target of the staleness watchdog
pub const TARGET_WATCHDOG: &str = "drops_miner::watchdog";
/// Log target of the watching loop (channel switches, presentation output)
pub const TARGET_WATCH: &str = "drops_miner::watch";
/// Log target of the control API
pub const TARGET_API: &str = "drops_miner::api";

/// Named logging handle injected into each component at construction
///
/// Components never configure logging themselves; they only emit records
/// under the target they were given, so the entry point decides levels and
/// destinations for all of them at once.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LogSink {
    target: &'static str,
}

impl LogSink {
    /// Creates a sink emitting under `target`
    pub const fn new(target: &'static str) -> Self {
        Self { target }
    }

    /// Sink for the service controller
    pub const fn main() -> Self {
        Self::new(TARGET_MAIN)
    }

    /// Sink for the watchdog
    pub const fn watchdog() -> Self {
        Self::new(TARGET_WATCHDOG)
    }

    /// Sink for the watch loop and presentation output
    pub const fn watch() -> Self {
        Self::new(TARGET_WATCH)
    }

    /// Sink for the control API
    pub const fn api() -> Self {
        Self::new(TARGET_API)
    }

    /// The log target records are emitted under
    pub fn target(&self) -> &'static str {
        self.target
    }
}

impl Default for LogSink {
    fn default() -> Self {
        Self::main()
    }
}

/// Options resolved from CLI flags and the settings file
#[derive(Debug, Clone, Default)]
pub struct LogOptions {
    /// Number of `-v` flags given
    pub verbosity: u8,
    /// Write to this file instead of stdout
    pub log_file: Option<PathBuf>,
    /// Level override for the watchdog target
    pub watchdog_level: Option<LevelFilter>,
    /// Level override for the watch target
    pub watch_level: Option<LevelFilter>,
}

impl LogOptions {
    /// Base level derived from the verbosity count
    ///
    /// Running without a window means silence would hide everything, so the
    /// floor is `Info`.
    pub fn base_level(&self) -> LevelFilter {
        match self.verbosity {
            0 => LevelFilter::Info,
            1 => LevelFilter::Debug,
            _ => LevelFilter::Trace,
        }
    }
}

/// Initializes the logging subsystem
///
/// # Configuration
/// - Logs to stdout, or appends to `log_file` when given
/// - Base level from verbosity, per-target overrides for the watchdog and
///   watch loop
/// - Respects `RUST_LOG` environment variable on top of that
///
/// # Errors
/// Returns `MinerError` if the log file cannot be opened.
pub fn init_logging(opts: &LogOptions) -> Result<(), MinerError> {
    let mut builder = common_log_config();
    let base = opts.base_level();

    builder.filter_level(LevelFilter::Warn);
    builder.filter_module(TARGET_MAIN, base);
    builder.filter(Some(TARGET_WATCHDOG), opts.watchdog_level.unwrap_or(base));
    builder.filter(Some(TARGET_WATCH), opts.watch_level.unwrap_or(base));
    builder.parse_env("RUST_LOG");

    if let Some(path) = &opts.log_file {
        let file = OpenOptions::new().create(true).append(true).open(path)?;
        builder.target(Target::Pipe(Box::new(file)));
    }

    // A second initialization (tests, embedding) keeps the first logger.
    let _ = builder.try_init();
    Ok(())
}

/// Parses a level name from the settings file (`"debug"`, `"warn"`, ...)
pub fn parse_level(name: Option<&str>) -> Option<LevelFilter> {
    name.and_then(|n| n.parse().ok())
}

/// Creates and configures a base logger builder with common settings
///
/// # Features
/// - Custom log format including:
///   - Timestamp (seconds since epoch)
///   - Log level
///   - Target
///   - Line number
///   - Message
/// - Output to stdout
fn common_log_config() -> Builder {
    let mut builder = Builder::new();

    builder
        .format(|buf, record| {
            use std::io::Write;
            let ts = buf.timestamp_seconds();
            let level = record.level();
            let target = record.target();
            let line = record.line().unwrap_or(0);

            writeln!(
                buf,
                "[{} {} {}:{}] {}",
                ts,
                level,
                target,
                line,
                record.args()
            )
        })
        .target(Target::Stdout);

    builder
}
