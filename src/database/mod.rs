//! Database dump backends
//!
//! [`DatabaseBackup`] reads a database's `type` and hands the dump to the
//! matching backend. Each backend reads its own connection options, builds a
//! command line for the engine's dump tool and redirects its output into a
//! fresh temporary file in the work directory.

mod mysql;
mod postgresql;

pub use mysql::{MysqlBackup, MysqlOptions};
pub use postgresql::{PostgresqlBackup, PostgresqlOptions};

use crate::config::{database_section, ConfigError, ConfigLookup};
use crate::pipeline::{DumpFile, HandleLedger};
use crate::utils::command::shell_word;
use crate::utils::{CommandExecutor, CommandPolicy};
use anyhow::Context;
use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{info, warn};

/// A database configured for backup, identified by its configuration name
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct BackupTarget {
    name: String,
}

impl BackupTarget {
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Configuration section holding this database's settings
    pub fn section(&self) -> String {
        database_section(&self.name)
    }
}

impl fmt::Display for BackupTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name)
    }
}

#[derive(Debug, thiserror::Error)]
pub enum BackupError {
    #[error("Unsupported backup type {backup_type:?} for database '{target}'")]
    UnsupportedBackupType {
        target: String,
        backup_type: Option<String>,
    },

    #[error("Backup of database '{target}' failed: {source:#}")]
    Execution {
        target: String,
        #[source]
        source: anyhow::Error,
    },

    #[error("Invalid configuration for database '{target}': {source}")]
    Config {
        target: String,
        #[source]
        source: ConfigError,
    },
}

impl BackupError {
    fn config(target: &BackupTarget, source: ConfigError) -> Self {
        BackupError::Config {
            target: target.to_string(),
            source,
        }
    }

    fn execution(target: &BackupTarget, source: anyhow::Error) -> Self {
        BackupError::Execution {
            target: target.to_string(),
            source,
        }
    }
}

/// Produces a raw dump file for a database
pub trait BackupSource {
    fn backup(&self, target: &BackupTarget) -> Result<DumpFile, BackupError>;
}

/// Database engines with a dump backend
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DatabaseType {
    Postgresql,
    Mysql,
}

impl DatabaseType {
    pub fn from_name(name: &str) -> Option<Self> {
        match name.trim().to_lowercase().as_str() {
            "postgresql" | "postgres" => Some(DatabaseType::Postgresql),
            "mysql" => Some(DatabaseType::Mysql),
            _ => None,
        }
    }
}

/// Empty connection values mean "not set"
fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.is_empty())
}

/// Runs a dump command and captures its output in a temporary file
#[derive(Clone)]
pub struct DumpRunner {
    executor: Arc<dyn CommandExecutor>,
    policy: CommandPolicy,
    work_dir: PathBuf,
}

impl DumpRunner {
    pub fn new(executor: Arc<dyn CommandExecutor>, policy: CommandPolicy, work_dir: PathBuf) -> Self {
        Self {
            executor,
            policy,
            work_dir,
        }
    }

    /// Run `<binary> <flags> <database> > <tmpfile>` and return the tmpfile
    pub fn dump(
        &self,
        target: &BackupTarget,
        binary: &str,
        flags: &str,
        database: &str,
    ) -> anyhow::Result<DumpFile> {
        which::which(binary).with_context(|| format!("Dump binary '{}' not found", binary))?;

        std::fs::create_dir_all(&self.work_dir)
            .with_context(|| format!("Failed to create work directory {:?}", self.work_dir))?;

        let (handle, path) = tempfile::Builder::new()
            .prefix("dumpy-")
            .tempfile_in(&self.work_dir)
            .context("Failed to allocate dump file")?
            .keep()
            .context("Failed to keep dump file")?;
        let file = DumpFile::from_handle(path, handle, HandleLedger::new());

        let cmd = [
            shell_word(binary),
            flags.trim().to_string(),
            shell_word(database),
            ">".to_string(),
            shell_word(&file.path().to_string_lossy()),
        ]
        .iter()
        .filter(|part| !part.is_empty())
        .cloned()
        .collect::<Vec<_>>()
        .join(" ");

        info!("{} - Command: {}", target, cmd);

        if let Err(e) = self.executor.run_shell_command(&cmd, &self.policy) {
            if let Err(release_err) = file.release() {
                warn!("{} - Failed to remove dump file: {:#}", target, release_err);
            }
            return Err(e.context(format!("Dump command failed for database '{}'", target)));
        }

        if file.is_empty().unwrap_or(false) {
            warn!("{} - Dump file {} is empty", target, file.path().display());
        }

        Ok(file)
    }
}

/// Dispatches to the backend selected by the database's `type`
pub struct DatabaseBackup {
    config: Arc<dyn ConfigLookup>,
    runner: DumpRunner,
}

impl DatabaseBackup {
    pub fn new(config: Arc<dyn ConfigLookup>, executor: Arc<dyn CommandExecutor>) -> Self {
        let policy = CommandPolicy::from_settings(config.global());
        let work_dir = config.global().work_directory();

        Self {
            config,
            runner: DumpRunner::new(executor, policy, work_dir),
        }
    }

    /// Backend type configured for a database
    pub fn database_type(&self, target: &BackupTarget) -> Result<DatabaseType, BackupError> {
        let backup_type = self
            .config
            .get_string(&target.section(), "type")
            .map_err(|e| BackupError::config(target, e))?;

        backup_type
            .as_deref()
            .and_then(DatabaseType::from_name)
            .ok_or_else(|| BackupError::UnsupportedBackupType {
                target: target.to_string(),
                backup_type,
            })
    }
}

impl BackupSource for DatabaseBackup {
    fn backup(&self, target: &BackupTarget) -> Result<DumpFile, BackupError> {
        match self.database_type(target)? {
            DatabaseType::Postgresql => {
                let options = PostgresqlOptions::from_config(self.config.as_ref(), target)
                    .map_err(|e| BackupError::config(target, e))?;
                PostgresqlBackup::new(options, self.runner.clone()).backup(target)
            }
            DatabaseType::Mysql => {
                let options = MysqlOptions::from_config(self.config.as_ref(), target)
                    .map_err(|e| BackupError::config(target, e))?;
                MysqlBackup::new(options, self.runner.clone()).backup(target)
            }
        }
    }
}
