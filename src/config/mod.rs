//! Configuration module for dumpy
//!
//! The configuration file is TOML. Sections are addressed by name, and dotted
//! names walk nested tables, so `database.db1` is the `[database.db1]` table:
//!
//! ```toml
//! [database.db1]
//! type = "postgresql"
//! postprocessing = "Bzip, TimestampRename, FileSystemCopy"
//!
//! [FileSystemCopy]
//! directory = "/srv/backups"
//! ```
//!
//! Components read their options through [`ConfigLookup`] once, at
//! construction, into their own typed option structs.
//!
//! ## Example Usage
//!
//! ```no_run
//! use dumpy::config::{self, ConfigLookup};
//!
//! let config = config::load_config("dumpy.toml")?;
//! for name in config::database_names(&config) {
//!     let stages = config.get_string(&config::database_section(&name), "postprocessing")?;
//!     println!("{}: {:?}", name, stages);
//! }
//! # Ok::<(), config::ConfigError>(())
//! ```

mod loader;
mod lookup;
mod types;

pub use loader::{load_config, parse_config, ConfigError, Result};
pub use lookup::{ConfigLookup, ConfigValue, TomlConfig, ValueType};
pub use types::*;

use std::path::{Path, PathBuf};

/// Parent section of all per-database tables
pub const DATABASE_SECTION: &str = "database";

/// Section holding the settings of one database.
///
/// Names containing a dot are quoted, as in `[database."prod.eu"]`.
pub fn database_section(name: &str) -> String {
    if name.contains('.') {
        format!("{}.\"{}\"", DATABASE_SECTION, name)
    } else {
        format!("{}.{}", DATABASE_SECTION, name)
    }
}

/// Names of all configured databases, sorted
pub fn database_names(config: &dyn ConfigLookup) -> Vec<String> {
    config.subsections(DATABASE_SECTION)
}

/// Default configuration file location (`~/.dumpy.toml`)
pub fn default_config_path() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".dumpy.toml")
}

/// Expand tilde (~) in path
pub fn expand_tilde(path: &Path) -> PathBuf {
    if let Ok(stripped) = path.strip_prefix("~") {
        if let Some(home) = dirs::home_dir() {
            return home.join(stripped);
        }
    }
    path.to_path_buf()
}
