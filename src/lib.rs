//! dumpy library
//!
//! Dumps databases with their engine's dump tool and runs each dump through a
//! configurable chain of post-processing stages.

pub mod config;
pub mod database;
pub mod managers;
pub mod pipeline;
pub mod stages;
pub mod utils;

// Re-export commonly used types
pub use config::{load_config, parse_config, ConfigError, ConfigLookup, TomlConfig};
pub use database::{BackupError, BackupSource, BackupTarget, DatabaseBackup};
pub use managers::dumper::{DumpManager, DumpSummary};
pub use managers::logging::{init_console_logging, init_logging, LogGuard, LoggingConfig};
pub use pipeline::{DumpFile, Pipeline, PipelineError, Stage, StageRegistry};
