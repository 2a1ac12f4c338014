//! Keep a numbered backlog of recent dumps
//!
//! For a dump named `dump.sql.bz2` the backlog lives at
//! `<directory>/dump.sql.bz2.1` (newest) through `.N` (oldest).

use crate::config::{expand_tilde, ConfigLookup};
use crate::database::BackupTarget;
use crate::pipeline::{DumpFile, Stage, StageContext};
use anyhow::{Context, Result};
use std::path::{Path, PathBuf};
use tracing::info;

pub const NAMESPACE: &str = "dumpy.stages.rotate";
pub const NAME: &str = "RotateFiles";

pub const SECTION: &str = "RotateFiles";
pub const DEFAULT_NUMBER: u32 = 10;

#[derive(Debug, Clone, PartialEq)]
pub struct RotateOptions {
    pub directory: PathBuf,
    /// Backlog length
    pub number: u32,
}

impl RotateOptions {
    pub fn from_config(config: &dyn ConfigLookup) -> Result<Self> {
        let Some(directory) = config
            .get_string(SECTION, "directory")?
            .filter(|d| !d.is_empty())
        else {
            anyhow::bail!("[{}] directory is not configured", SECTION);
        };

        let number = match config.get_int(SECTION, "number")? {
            Some(n) if n > 0 => u32::try_from(n)
                .with_context(|| format!("[{}] number {} is too large", SECTION, n))?,
            _ => DEFAULT_NUMBER,
        };

        Ok(Self {
            directory: expand_tilde(&PathBuf::from(directory)),
            number,
        })
    }
}

pub struct RotateFiles {
    target: BackupTarget,
    options: RotateOptions,
}

impl RotateFiles {
    pub fn new(target: BackupTarget, options: RotateOptions) -> Self {
        Self { target, options }
    }

    pub fn from_context(ctx: &StageContext<'_>) -> Result<Self> {
        Ok(Self::new(ctx.target.clone(), RotateOptions::from_config(ctx.config)?))
    }

    fn numbered(base: &Path, i: u32) -> PathBuf {
        let mut name = base.as_os_str().to_os_string();
        name.push(format!(".{}", i));
        PathBuf::from(name)
    }

    /// Shift the backlog by one and copy `current` in as `.1`
    fn rotate(&self, current: &Path, base: &Path) -> Result<()> {
        let n = self.options.number;

        for i in (1..=n).rev() {
            let slot = Self::numbered(base, i);

            if i == n && slot.exists() {
                std::fs::remove_file(&slot)
                    .with_context(|| format!("Failed to remove {}", slot.display()))?;
                info!("{} - {} - Remove last file {}", self.target, NAME, slot.display());
            }

            if i > 1 {
                let previous = Self::numbered(base, i - 1);
                if previous.exists() {
                    std::fs::rename(&previous, &slot).with_context(|| {
                        format!("Failed to move {} to {}", previous.display(), slot.display())
                    })?;
                    info!(
                        "{} - {} - Move file {} to {}",
                        self.target,
                        NAME,
                        previous.display(),
                        slot.display()
                    );
                }
            } else {
                std::fs::copy(current, &slot).with_context(|| {
                    format!("Failed to copy {} to {}", current.display(), slot.display())
                })?;
                info!(
                    "{} - {} - Copy file {} to {}",
                    self.target,
                    NAME,
                    current.display(),
                    slot.display()
                );
            }
        }

        Ok(())
    }
}

impl Stage for RotateFiles {
    fn name(&self) -> &str {
        NAME
    }

    fn process(&self, file: DumpFile) -> Result<DumpFile> {
        let base = self.options.directory.join(file.file_name());
        self.rotate(file.path(), &base)?;
        Ok(file)
    }
}
