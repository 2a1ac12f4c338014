use super::lookup::TomlConfig;
use super::types::GlobalSettings;
use super::DATABASE_SECTION;
use std::fs;
use std::path::Path;

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    ReadError(#[from] std::io::Error),

    #[error("Failed to parse config file: {0}")]
    ParseError(#[from] toml::de::Error),

    #[error("Invalid value for '{key}' in [{section}]: expected {expected}")]
    InvalidValue {
        section: String,
        key: String,
        expected: &'static str,
    },

    #[error("Validation error: {0}")]
    ValidationError(String),
}

pub type Result<T> = std::result::Result<T, ConfigError>;

/// Load and validate configuration from a TOML file
pub fn load_config<P: AsRef<Path>>(path: P) -> Result<TomlConfig> {
    let contents = fs::read_to_string(path)?;
    parse_config(&contents)
}

/// Parse and validate configuration from TOML text
pub fn parse_config(contents: &str) -> Result<TomlConfig> {
    let table: toml::Table = contents.parse()?;
    validate_config(&table)?;

    let global: GlobalSettings = match table.get("global") {
        Some(value) => value.clone().try_into()?,
        None => GlobalSettings::default(),
    };

    Ok(TomlConfig::new(table, global))
}

/// Validate the document structure
fn validate_config(table: &toml::Table) -> Result<()> {
    if let Some(global) = table.get("global") {
        if !global.is_table() {
            return Err(ConfigError::ValidationError(
                "[global] must be a table".to_string(),
            ));
        }
    }

    let Some(databases) = table.get(DATABASE_SECTION) else {
        return Ok(());
    };

    let databases = databases.as_table().ok_or_else(|| {
        ConfigError::ValidationError(format!("[{}] must be a table", DATABASE_SECTION))
    })?;

    for (name, database) in databases {
        if name.contains('"') {
            return Err(ConfigError::ValidationError(format!(
                "Database '{}': names must not contain '\"'",
                name
            )));
        }

        let Some(database) = database.as_table() else {
            return Err(ConfigError::ValidationError(format!(
                "Database '{}': expected a [{}.{}] table",
                name, DATABASE_SECTION, name
            )));
        };

        if let Some(stages) = database.get("postprocessing") {
            if !stages.is_str() {
                return Err(ConfigError::ValidationError(format!(
                    "Database '{}': postprocessing must be a comma-separated string",
                    name
                )));
            }
        }
    }

    Ok(())
}
