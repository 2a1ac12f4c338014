//! MySQL backend using `mysqldump`

use super::{non_empty, BackupError, BackupSource, BackupTarget, DumpRunner};
use crate::config::{ConfigLookup, Result};
use crate::pipeline::DumpFile;
use crate::utils::command::shell_word;

/// Section holding the `mysqldump` path and extra flags
pub const MYSQLDUMP_SECTION: &str = "mysqldump";

#[derive(Debug, Clone, PartialEq)]
pub struct MysqlOptions {
    /// Database name passed to mysqldump (defaults to the target name)
    pub name: String,
    pub user: Option<String>,
    pub password: Option<String>,
    pub host: Option<String>,
    pub port: Option<i64>,
    pub binary: String,
    pub flags: Option<String>,
}

impl MysqlOptions {
    pub fn from_config(config: &dyn ConfigLookup, target: &BackupTarget) -> Result<Self> {
        let section = target.section();

        Ok(Self {
            name: config
                .get_string(&section, "name")?
                .filter(|n| !n.is_empty())
                .unwrap_or_else(|| target.name().to_string()),
            user: non_empty(config.get_string(&section, "user")?),
            password: non_empty(config.get_string(&section, "password")?),
            host: non_empty(config.get_string(&section, "host")?),
            port: config.get_int(&section, "port")?,
            binary: config
                .get_string(MYSQLDUMP_SECTION, "path")?
                .unwrap_or_else(|| "mysqldump".to_string()),
            flags: config.get_string(MYSQLDUMP_SECTION, "flags")?,
        })
    }

    /// Configured flags followed by the connection flags.
    ///
    /// The password is passed inline (`-p<password>`), so it appears in the
    /// logged command line.
    pub fn flags(&self) -> String {
        let mut flags: Vec<String> = self.flags.iter().map(|f| f.trim().to_string()).collect();

        if let Some(ref user) = self.user {
            flags.push(format!("-u {}", shell_word(user)));
        }
        if let Some(ref password) = self.password {
            flags.push(format!("-p{}", shell_word(password)));
        }
        if let Some(ref host) = self.host {
            flags.push(format!("-h {}", shell_word(host)));
        }
        if let Some(port) = self.port {
            flags.push(format!("-P {}", port));
        }

        flags.retain(|f| !f.is_empty());
        flags.join(" ")
    }
}

pub struct MysqlBackup {
    options: MysqlOptions,
    runner: DumpRunner,
}

impl MysqlBackup {
    pub fn new(options: MysqlOptions, runner: DumpRunner) -> Self {
        Self { options, runner }
    }
}

impl BackupSource for MysqlBackup {
    fn backup(&self, target: &BackupTarget) -> std::result::Result<DumpFile, BackupError> {
        self.runner
            .dump(target, &self.options.binary, &self.options.flags(), &self.options.name)
            .map_err(|e| BackupError::execution(target, e))
    }
}
