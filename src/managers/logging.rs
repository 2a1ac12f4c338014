//! Logging setup
//!
//! Provides dual-output logging:
//! - Console: WARN level, INFO with `--verbose`
//! - File: `global.log_level` with daily rotation, only when
//!   `global.log_directory` is configured

use crate::config::{expand_tilde, GlobalSettings};
use anyhow::{Context, Result};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::Level;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{fmt, EnvFilter, Layer, Registry};

/// Base name of the log files (`dumpy.log.YYYY-MM-DD`)
pub const LOG_FILE_NAME: &str = "dumpy.log";

/// Logging configuration
#[derive(Debug, Clone, PartialEq)]
pub struct LoggingConfig {
    /// Directory for log files; no file output when unset
    pub log_directory: Option<PathBuf>,
    /// Log level for file output
    pub file_level: Level,
    pub console_level: Level,
    /// Maximum number of log files to keep
    pub max_files: u32,
    /// Write JSON lines instead of text to the log file
    pub json: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            log_directory: None,
            file_level: Level::INFO,
            console_level: Level::WARN,
            max_files: 10,
            json: false,
        }
    }
}

impl LoggingConfig {
    /// Create from the `[global]` settings and the CLI verbosity
    pub fn from_settings(settings: &GlobalSettings, verbose: bool) -> Self {
        Self {
            log_directory: settings.log_directory.as_deref().map(expand_tilde),
            file_level: parse_level(&settings.log_level),
            console_level: console_level(verbose),
            max_files: settings.log_max_files,
            json: settings.log_format.eq_ignore_ascii_case("json"),
        }
    }
}

fn parse_level(level: &str) -> Level {
    match level.to_lowercase().as_str() {
        "trace" => Level::TRACE,
        "debug" => Level::DEBUG,
        "info" => Level::INFO,
        "warn" | "warning" => Level::WARN,
        "error" => Level::ERROR,
        _ => Level::INFO,
    }
}

fn console_level(verbose: bool) -> Level {
    if verbose {
        Level::INFO
    } else {
        Level::WARN
    }
}

/// Initialize logging with console and optional file outputs
///
/// Returns a guard that must be kept alive for the duration of the program.
/// When the guard is dropped, any remaining logs are flushed to disk.
pub fn init_logging(config: &LoggingConfig) -> Result<LogGuard> {
    let mut file_guard = None;

    let file_layer = match config.log_directory {
        Some(ref log_dir) => {
            fs::create_dir_all(log_dir)
                .with_context(|| format!("Failed to create log directory: {:?}", log_dir))?;

            let file_appender = RollingFileAppender::new(Rotation::DAILY, log_dir, LOG_FILE_NAME);
            let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);
            file_guard = Some(guard);

            let layer = fmt::layer()
                .with_writer(non_blocking)
                .with_ansi(false)
                .with_target(true)
                .with_level(true);

            let layer: Box<dyn Layer<Registry> + Send + Sync> = if config.json {
                layer.json().with_filter(level_filter(config.file_level)).boxed()
            } else {
                layer.with_filter(level_filter(config.file_level)).boxed()
            };

            cleanup_old_logs(log_dir, config.max_files)?;
            Some(layer)
        }
        None => None,
    };

    let console_layer = fmt::layer()
        .with_writer(std::io::stderr)
        .with_ansi(true)
        .with_target(false)
        .with_level(true)
        .with_filter(level_filter(config.console_level));

    tracing_subscriber::registry()
        .with(file_layer)
        .with(console_layer)
        .try_init()
        .context("Failed to initialize logging")?;

    Ok(LogGuard {
        _file_guard: file_guard,
    })
}

/// Initialize console-only logging (for commands that don't read the config)
pub fn init_console_logging(verbose: bool) {
    let _ = tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(level_filter(console_level(verbose)))
        .with_target(false)
        .with_level(true)
        .try_init();
}

/// Create a level filter for tracing layers; `RUST_LOG` takes precedence
fn level_filter(level: Level) -> EnvFilter {
    EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("warn,dumpy={}", level)))
}

/// Cleanup old log files, keeping only the most recent N files
fn cleanup_old_logs(log_dir: &Path, max_files: u32) -> Result<()> {
    let mut log_files: Vec<_> = fs::read_dir(log_dir)?
        .filter_map(|entry| entry.ok())
        .filter(|entry| entry.file_name().to_string_lossy().starts_with(LOG_FILE_NAME))
        .collect();

    // Newest first
    log_files.sort_by(|a, b| {
        let a_time = a.metadata().and_then(|m| m.modified()).ok();
        let b_time = b.metadata().and_then(|m| m.modified()).ok();
        b_time.cmp(&a_time)
    });

    for file in log_files.into_iter().skip(max_files as usize) {
        if let Err(e) = fs::remove_file(file.path()) {
            tracing::warn!("Failed to remove old log file {:?}: {}", file.path(), e);
        } else {
            tracing::debug!("Removed old log file: {:?}", file.path());
        }
    }

    Ok(())
}

/// Guard that keeps the logging system alive
///
/// When dropped, flushes any remaining logs to disk.
pub struct LogGuard {
    _file_guard: Option<WorkerGuard>,
}
