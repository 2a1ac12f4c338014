//! Fluent API for building test configurations
//!
//! Provides a builder pattern for creating test configurations with sensible
//! defaults. Work and lock directories live in the builder's temp dir.

use dumpy::config::{parse_config, GlobalSettings, TomlConfig};
use serde::Serialize;
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

/// One `[database.<name>]` table
#[derive(Debug, Clone, Default, Serialize)]
pub struct DatabaseEntry {
    #[serde(rename = "type")]
    pub backup_type: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub password: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub host: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub port: Option<u16>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub postprocessing: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub insert_db_name: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub filesystem_copy_directory: Option<String>,
}

impl DatabaseEntry {
    pub fn new(backup_type: &str) -> Self {
        Self {
            backup_type: backup_type.to_string(),
            ..Default::default()
        }
    }
}

/// Builder for creating test configurations
pub struct ConfigBuilder {
    temp_dir: TempDir,
    global: GlobalSettings,
    databases: BTreeMap<String, DatabaseEntry>,
    sections: toml::Table,
}

impl ConfigBuilder {
    /// Create a new ConfigBuilder with no databases
    pub fn new() -> Self {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");

        let global = GlobalSettings {
            work_directory: Some(temp_dir.path().join("work")),
            lock_directory: Some(temp_dir.path().join("locks")),
            command_timeout_seconds: 60,
            ..GlobalSettings::default()
        };

        Self {
            temp_dir,
            global,
            databases: BTreeMap::new(),
            sections: toml::Table::new(),
        }
    }

    /// Create a config with one postgresql database `db1` dumped by a fake
    /// `pg_dump`
    pub fn minimal() -> Self {
        Self::new()
            .with_fake_dump_tools()
            .add_database("db1", "postgresql")
    }

    /// Add a database of the given type
    pub fn add_database(self, name: &str, backup_type: &str) -> Self {
        self.add_database_entry(name, DatabaseEntry::new(backup_type))
    }

    pub fn add_database_entry(mut self, name: &str, entry: DatabaseEntry) -> Self {
        self.databases.insert(name.to_string(), entry);
        self
    }

    /// Set a database's post-processing stage list
    pub fn with_postprocessing(mut self, database: &str, stages: &str) -> Self {
        self.database_mut(database).postprocessing = Some(stages.to_string());
        self
    }

    pub fn with_insert_db_name(mut self, database: &str) -> Self {
        self.database_mut(database).insert_db_name = Some(true);
        self
    }

    pub fn with_copy_directory_override(mut self, database: &str, dir: &Path) -> Self {
        self.database_mut(database).filesystem_copy_directory = Some(dir.display().to_string());
        self
    }

    /// Set `key` in a top-level options section such as `[Bzip]`
    pub fn set(mut self, section: &str, key: &str, value: impl Into<toml::Value>) -> Self {
        let table = self
            .sections
            .entry(section.to_string())
            .or_insert(toml::Value::Table(toml::Table::new()));
        if let toml::Value::Table(table) = table {
            table.insert(key.to_string(), value.into());
        }
        self
    }

    /// Point `[pg_dump]` and `[mysqldump]` at fake tools in the temp dir
    pub fn with_fake_dump_tools(self) -> Self {
        let bin = self.subdir("bin");
        let pg_dump = crate::fixtures::write_script(&bin, "pg_dump", crate::fixtures::FAKE_PG_DUMP);
        let mysqldump =
            crate::fixtures::write_script(&bin, "mysqldump", crate::fixtures::FAKE_MYSQLDUMP);

        self.set("pg_dump", "path", pg_dump.display().to_string())
            .set("mysqldump", "path", mysqldump.display().to_string())
    }

    /// Use a fake external bzip2 for the `Bzip` stage
    pub fn with_fake_compressor(self) -> Self {
        let bin = self.subdir("bin");
        let bzip2 = crate::fixtures::write_script(&bin, "bzip2", crate::fixtures::FAKE_BZIP2);
        self.set("Bzip", "path", bzip2.display().to_string())
    }

    /// Copy directory for `FileSystemCopy`, created under the temp dir
    pub fn with_copy_directory(self, name: &str) -> Self {
        let dir = self.subdir(name);
        self.set("FileSystemCopy", "directory", dir.display().to_string())
    }

    /// Backlog directory and length for `RotateFiles`
    pub fn with_rotation(self, name: &str, number: i64) -> Self {
        let dir = self.subdir(name);
        self.set("RotateFiles", "directory", dir.display().to_string())
            .set("RotateFiles", "number", number)
    }

    pub fn with_global(mut self, f: impl FnOnce(&mut GlobalSettings)) -> Self {
        f(&mut self.global);
        self
    }

    /// Get the temp directory path
    pub fn temp_dir(&self) -> &Path {
        self.temp_dir.path()
    }

    /// Directory where raw dumps are written
    pub fn work_dir(&self) -> PathBuf {
        self.global.work_directory()
    }

    /// Create (if needed) and return a subdirectory of the temp dir
    pub fn subdir(&self, name: &str) -> PathBuf {
        let path = self.temp_dir.path().join(name);
        fs::create_dir_all(&path).expect("Failed to create subdirectory");
        path
    }

    /// Render the configuration file
    pub fn to_toml(&self) -> String {
        let mut table = self.sections.clone();
        table.insert(
            "global".to_string(),
            toml::Value::try_from(&self.global).expect("Failed to serialize global settings"),
        );
        if !self.databases.is_empty() {
            table.insert(
                "database".to_string(),
                toml::Value::try_from(&self.databases).expect("Failed to serialize databases"),
            );
        }
        toml::to_string_pretty(&table).expect("Failed to render config")
    }

    /// Build the parsed configuration
    pub fn build(&self) -> TomlConfig {
        parse_config(&self.to_toml()).expect("Builder produced an invalid config")
    }

    /// Build and return the configuration with its temp directory
    pub fn persist(self) -> (TomlConfig, TempDir) {
        (self.build(), self.temp_dir)
    }

    /// Write `config.toml` into the temp dir and return its path
    pub fn write(self) -> (PathBuf, TempDir) {
        let path = self.temp_dir.path().join("config.toml");
        fs::write(&path, self.to_toml()).expect("Failed to write config file");
        (path, self.temp_dir)
    }

    fn database_mut(&mut self, name: &str) -> &mut DatabaseEntry {
        self.databases
            .get_mut(name)
            .unwrap_or_else(|| panic!("Database '{}' was not added", name))
    }
}

impl Default for ConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}
