//! Rename the dump after the current local time

use super::copy_file;
use crate::config::ConfigLookup;
use crate::database::BackupTarget;
use crate::pipeline::{extension_of, DumpFile, Stage, StageContext};
use anyhow::{Context, Result};
use chrono::format::{Item, StrftimeItems};
use chrono::{DateTime, Local};
use std::fmt::Write;

pub const NAMESPACE: &str = "dumpy.stages.timestamp";
pub const NAME: &str = "TimestampRename";

pub const SECTION: &str = "TimestampRename";
pub const DEFAULT_FORMAT: &str = "%Y%m%d%H%M%S";

#[derive(Debug, Clone, PartialEq)]
pub struct TimestampOptions {
    /// strftime format for the new file name
    pub format: String,
    /// Prefix the name with the database name (`<db>-<timestamp>`)
    pub insert_db_name: bool,
}

impl TimestampOptions {
    pub fn from_config(config: &dyn ConfigLookup, target: &BackupTarget) -> Result<Self> {
        let format = config
            .get_string(SECTION, "format")?
            .filter(|f| !f.is_empty())
            .unwrap_or_else(|| DEFAULT_FORMAT.to_string());

        if StrftimeItems::new(&format).any(|item| matches!(item, Item::Error)) {
            anyhow::bail!("Invalid timestamp format '{}'", format);
        }

        Ok(Self {
            format,
            insert_db_name: config
                .get_bool(&target.section(), "insert_db_name")?
                .unwrap_or(false),
        })
    }
}

pub struct TimestampRename {
    target: BackupTarget,
    options: TimestampOptions,
}

impl TimestampRename {
    pub fn new(target: BackupTarget, options: TimestampOptions) -> Self {
        Self { target, options }
    }

    pub fn from_context(ctx: &StageContext<'_>) -> Result<Self> {
        let options = TimestampOptions::from_config(ctx.config, ctx.target)?;
        Ok(Self::new(ctx.target.clone(), options))
    }

    /// File name for a dump taken at `now`, keeping the extension of `current`
    pub fn file_name_at(&self, current: &str, now: DateTime<Local>) -> Result<String> {
        let mut stamp = String::new();
        write!(stamp, "{}", now.format(&self.options.format))
            .with_context(|| format!("Invalid timestamp format '{}'", self.options.format))?;

        let ext = extension_of(current);
        Ok(if self.options.insert_db_name {
            format!("{}-{}{}", self.target, stamp, ext)
        } else {
            format!("{}{}", stamp, ext)
        })
    }
}

impl Stage for TimestampRename {
    fn name(&self) -> &str {
        NAME
    }

    fn process(&self, file: DumpFile) -> Result<DumpFile> {
        let new_name = self.file_name_at(&file.file_name(), Local::now())?;
        let new_path = file.dir().join(new_name);

        if new_path == file.path() {
            return Ok(file);
        }

        copy_file(&self.target, NAME, file.path(), &new_path)?;
        file.supersede(&new_path)
            .with_context(|| format!("Failed to open {}", new_path.display()))
    }
}
