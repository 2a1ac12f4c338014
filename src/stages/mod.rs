//! Built-in post-processing stages
//!
//! | stage | returns | side effect |
//! |---|---|---|
//! | [`Compress`] (`Bzip`) | new file `<file>.<ext>` | input consumed by the compressor |
//! | [`TimestampRename`] | new file named from the current time | copy |
//! | [`PrependDatabaseName`] | new file `<db>-<name>` | copy |
//! | [`FileSystemCopy`] | same file | copy into a directory |
//! | [`RotateFiles`] | same file | numbered backlog `.1` … `.N` |
//! | [`ObjectStoreCopy`] (`S3Copy`) | same file | upload |

pub mod compress;
pub mod dbname;
pub mod fscopy;
pub mod rotate;
pub mod s3copy;
pub mod timestamp;

pub use compress::Compress;
pub use dbname::PrependDatabaseName;
pub use fscopy::FileSystemCopy;
pub use rotate::RotateFiles;
pub use s3copy::ObjectStoreCopy;
pub use timestamp::TimestampRename;

use crate::database::BackupTarget;
use crate::pipeline::{Stage, StageRegistry};
use anyhow::Context;
use std::path::{Path, PathBuf};
use tracing::info;

/// Register every built-in stage and its aliases
pub fn register_builtin(registry: &mut StageRegistry) {
    registry.register_in(compress::NAMESPACE, compress::NAME, |ctx| {
        Ok(Box::new(Compress::from_context(ctx)?) as Box<dyn Stage>)
    });
    registry.register_in(timestamp::NAMESPACE, timestamp::NAME, |ctx| {
        Ok(Box::new(TimestampRename::from_context(ctx)?) as Box<dyn Stage>)
    });
    registry.register_in(dbname::NAMESPACE, dbname::NAME, |ctx| {
        Ok(Box::new(PrependDatabaseName::from_context(ctx)) as Box<dyn Stage>)
    });
    registry.register_in(fscopy::NAMESPACE, fscopy::NAME, |ctx| {
        Ok(Box::new(FileSystemCopy::from_context(ctx)?) as Box<dyn Stage>)
    });
    registry.register_in(rotate::NAMESPACE, rotate::NAME, |ctx| {
        Ok(Box::new(RotateFiles::from_context(ctx)?) as Box<dyn Stage>)
    });
    registry.register_in(s3copy::NAMESPACE, s3copy::NAME, |ctx| {
        Ok(Box::new(ObjectStoreCopy::from_context(ctx)?) as Box<dyn Stage>)
    });

    let aliases = [
        ("Bzip", compress::NAMESPACE, compress::NAME),
        ("Compress", compress::NAMESPACE, compress::NAME),
        ("TimestampRename", timestamp::NAMESPACE, timestamp::NAME),
        ("PrependDatabaseName", dbname::NAMESPACE, dbname::NAME),
        ("FileSystemCopy", fscopy::NAMESPACE, fscopy::NAME),
        ("RotateFiles", rotate::NAMESPACE, rotate::NAME),
        ("S3Copy", s3copy::NAMESPACE, s3copy::NAME),
        ("ObjectStoreCopy", s3copy::NAMESPACE, s3copy::NAME),
    ];
    for (alias, namespace, name) in aliases {
        registry.alias(alias, &format!("{}.{}", namespace, name));
    }
}

/// Copy a file and write the audit line for it
pub(crate) fn copy_file(target: &BackupTarget, stage: &str, from: &Path, to: &Path) -> anyhow::Result<()> {
    std::fs::copy(from, to)
        .with_context(|| format!("Failed to copy {} to {}", from.display(), to.display()))?;
    info!(
        "{} - {} - Copying {} to {}",
        target,
        stage,
        from.display(),
        to.display()
    );
    Ok(())
}

/// Path in the same directory as `path`, with the file name mapped by `name`
pub(crate) fn sibling_path(path: &Path, name: impl FnOnce(&str) -> String) -> PathBuf {
    let file_name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    path.with_file_name(name(&file_name))
}
