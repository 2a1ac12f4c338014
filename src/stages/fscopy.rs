//! Copy the dump into a directory, leaving the dump itself in place

use super::copy_file;
use crate::config::{expand_tilde, ConfigLookup};
use crate::database::BackupTarget;
use crate::pipeline::{DumpFile, Stage, StageContext};
use anyhow::Result;
use std::path::{Path, PathBuf};
use tracing::info;

pub const NAMESPACE: &str = "dumpy.stages.fscopy";
pub const NAME: &str = "FileSystemCopy";

pub const SECTION: &str = "FileSystemCopy";
/// Per-database key overriding `[FileSystemCopy] directory`
pub const OVERRIDE_KEY: &str = "filesystem_copy_directory";

#[derive(Debug, Clone, PartialEq)]
pub struct FileSystemCopyOptions {
    pub directory: PathBuf,
}

impl FileSystemCopyOptions {
    pub fn from_config(config: &dyn ConfigLookup, target: &BackupTarget) -> Result<Self> {
        let directory = config
            .get_string(&target.section(), OVERRIDE_KEY)?
            .filter(|d| !d.is_empty())
            .or(config.get_string(SECTION, "directory")?.filter(|d| !d.is_empty()));

        let Some(directory) = directory else {
            anyhow::bail!(
                "No copy directory configured ([{}] directory or {} for the database)",
                SECTION,
                OVERRIDE_KEY
            );
        };

        Ok(Self {
            directory: expand_tilde(&PathBuf::from(directory)),
        })
    }
}

pub struct FileSystemCopy {
    target: BackupTarget,
    options: FileSystemCopyOptions,
}

impl FileSystemCopy {
    pub fn new(target: BackupTarget, options: FileSystemCopyOptions) -> Self {
        Self { target, options }
    }

    pub fn from_context(ctx: &StageContext<'_>) -> Result<Self> {
        let options = FileSystemCopyOptions::from_config(ctx.config, ctx.target)?;
        Ok(Self::new(ctx.target.clone(), options))
    }
}

impl Stage for FileSystemCopy {
    fn name(&self) -> &str {
        NAME
    }

    fn process(&self, file: DumpFile) -> Result<DumpFile> {
        if !self.options.directory.is_dir() {
            anyhow::bail!(
                "Target directory {} does not exist",
                self.options.directory.display()
            );
        }

        let dest = self.options.directory.join(file.file_name());
        if same_file(&dest, file.path()) {
            info!("{} - {} - {} is already in place", self.target, NAME, dest.display());
            return Ok(file);
        }

        copy_file(&self.target, NAME, file.path(), &dest)?;
        Ok(file)
    }
}

/// Whether both paths name the same existing file, however they are spelled
fn same_file(a: &Path, b: &Path) -> bool {
    match (std::fs::canonicalize(a), std::fs::canonicalize(b)) {
        (Ok(a), Ok(b)) => a == b,
        _ => false,
    }
}
