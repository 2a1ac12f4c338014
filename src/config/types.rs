use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

use super::expand_tilde;

/// Settings from the `[global]` section
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct GlobalSettings {
    /// Directory where raw dumps are written (defaults to the system temp dir)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub work_directory: Option<PathBuf>,

    /// Directory holding per-database lock files (defaults to the system temp dir)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub lock_directory: Option<PathBuf>,

    /// Timeout for every external command, 0 disables it
    #[serde(default = "default_command_timeout")]
    pub command_timeout_seconds: u64,

    /// Fail when a dump or compressor command exits non-zero
    #[serde(default = "default_check_exit_status")]
    pub check_exit_status: bool,

    /// Logging configuration
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub log_directory: Option<PathBuf>,
    #[serde(default = "default_log_level")]
    pub log_level: String,
    #[serde(default = "default_log_max_files")]
    pub log_max_files: u32,
    /// `text` or `json` lines in the log file
    #[serde(default = "default_log_format")]
    pub log_format: String,
}

impl Default for GlobalSettings {
    fn default() -> Self {
        Self {
            work_directory: None,
            lock_directory: None,
            command_timeout_seconds: default_command_timeout(),
            check_exit_status: default_check_exit_status(),
            log_directory: None,
            log_level: default_log_level(),
            log_max_files: default_log_max_files(),
            log_format: default_log_format(),
        }
    }
}

impl GlobalSettings {
    pub fn work_directory(&self) -> PathBuf {
        self.work_directory
            .as_deref()
            .map(expand_tilde)
            .unwrap_or_else(std::env::temp_dir)
    }

    pub fn lock_directory(&self) -> PathBuf {
        self.lock_directory
            .as_deref()
            .map(expand_tilde)
            .unwrap_or_else(std::env::temp_dir)
    }

    pub fn command_timeout(&self) -> Option<Duration> {
        match self.command_timeout_seconds {
            0 => None,
            secs => Some(Duration::from_secs(secs)),
        }
    }
}

// Default value functions

fn default_command_timeout() -> u64 { 3600 }
fn default_check_exit_status() -> bool { true }
fn default_log_level() -> String { "info".to_string() }
fn default_log_max_files() -> u32 { 10 }
fn default_log_format() -> String { "text".to_string() }
