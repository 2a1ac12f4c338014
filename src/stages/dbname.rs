//! Prefix the dump's file name with the database name

use super::{copy_file, sibling_path};
use crate::database::BackupTarget;
use crate::pipeline::{DumpFile, Stage, StageContext};
use anyhow::{Context, Result};

pub const NAMESPACE: &str = "dumpy.stages.dbname";
pub const NAME: &str = "PrependDatabaseName";

pub struct PrependDatabaseName {
    target: BackupTarget,
}

impl PrependDatabaseName {
    pub fn new(target: BackupTarget) -> Self {
        Self { target }
    }

    pub fn from_context(ctx: &StageContext<'_>) -> Self {
        Self::new(ctx.target.clone())
    }
}

impl Stage for PrependDatabaseName {
    fn name(&self) -> &str {
        NAME
    }

    fn process(&self, file: DumpFile) -> Result<DumpFile> {
        let new_path = sibling_path(file.path(), |name| format!("{}-{}", self.target, name));

        copy_file(&self.target, NAME, file.path(), &new_path)?;
        file.supersede(&new_path)
            .with_context(|| format!("Failed to open {}", new_path.display()))
    }
}
