//! PostgreSQL backend using `pg_dump`

use super::{non_empty, BackupError, BackupSource, BackupTarget, DumpRunner};
use crate::config::{ConfigLookup, Result};
use crate::pipeline::DumpFile;
use crate::utils::command::shell_word;

/// Section holding the `pg_dump` path and extra flags
pub const PG_DUMP_SECTION: &str = "pg_dump";

#[derive(Debug, Clone, PartialEq)]
pub struct PostgresqlOptions {
    /// Database name passed to pg_dump (defaults to the target name)
    pub name: String,
    pub user: Option<String>,
    pub host: Option<String>,
    pub port: Option<i64>,
    pub binary: String,
    pub flags: Option<String>,
}

impl PostgresqlOptions {
    pub fn from_config(config: &dyn ConfigLookup, target: &BackupTarget) -> Result<Self> {
        let section = target.section();

        Ok(Self {
            name: config
                .get_string(&section, "name")?
                .filter(|n| !n.is_empty())
                .unwrap_or_else(|| target.name().to_string()),
            user: non_empty(config.get_string(&section, "user")?),
            host: non_empty(config.get_string(&section, "host")?),
            port: config.get_int(&section, "port")?,
            binary: config
                .get_string(PG_DUMP_SECTION, "path")?
                .unwrap_or_else(|| "pg_dump".to_string()),
            flags: config.get_string(PG_DUMP_SECTION, "flags")?,
        })
    }

    /// Configured flags followed by the connection flags
    pub fn flags(&self) -> String {
        let mut flags: Vec<String> = self.flags.iter().map(|f| f.trim().to_string()).collect();

        if let Some(ref user) = self.user {
            flags.push(format!("-U {}", shell_word(user)));
        }
        if let Some(ref host) = self.host {
            flags.push(format!("-h {}", shell_word(host)));
        }
        if let Some(port) = self.port {
            flags.push(format!("-p {}", port));
        }

        flags.retain(|f| !f.is_empty());
        flags.join(" ")
    }
}

pub struct PostgresqlBackup {
    options: PostgresqlOptions,
    runner: DumpRunner,
}

impl PostgresqlBackup {
    pub fn new(options: PostgresqlOptions, runner: DumpRunner) -> Self {
        Self { options, runner }
    }
}

impl BackupSource for PostgresqlBackup {
    fn backup(&self, target: &BackupTarget) -> std::result::Result<DumpFile, BackupError> {
        self.runner
            .dump(target, &self.options.binary, &self.options.flags(), &self.options.name)
            .map_err(|e| BackupError::execution(target, e))
    }
}
