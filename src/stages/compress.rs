//! Compress the dump in place
//!
//! With `path` configured in `[Bzip]` the external compressor is run as
//! `<path> -f '<file>'` and is expected to replace `<file>` with
//! `<file>.<extension>`. Without it the file is compressed in-process with
//! bzip2.

use super::sibling_path;
use crate::config::ConfigLookup;
use crate::database::BackupTarget;
use crate::pipeline::{DumpFile, Stage, StageContext};
use crate::utils::command::{shell_quote, shell_word};
use crate::utils::{CommandExecutor, CommandPolicy};
use anyhow::{Context, Result};
use bzip2::write::BzEncoder;
use bzip2::Compression;
use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::info;

pub const NAMESPACE: &str = "dumpy.stages.compress";
pub const NAME: &str = "Compress";

/// Options section, named after the default compressor
pub const SECTION: &str = "Bzip";

#[derive(Debug, Clone, PartialEq)]
pub struct CompressOptions {
    /// External compressor binary; in-process bzip2 when unset
    pub path: Option<String>,
    /// Extension the compressor appends, without the dot
    pub extension: String,
}

impl CompressOptions {
    pub fn from_config(config: &dyn ConfigLookup) -> Result<Self> {
        let extension = config
            .get_string(SECTION, "extension")?
            .map(|e| e.trim().trim_start_matches('.').to_string())
            .filter(|e| !e.is_empty())
            .unwrap_or_else(|| "bz2".to_string());

        Ok(Self {
            path: config
                .get_string(SECTION, "path")?
                .filter(|p| !p.trim().is_empty()),
            extension,
        })
    }
}

pub struct Compress {
    target: BackupTarget,
    options: CompressOptions,
    executor: Arc<dyn CommandExecutor>,
    policy: CommandPolicy,
}

impl Compress {
    pub fn new(
        target: BackupTarget,
        options: CompressOptions,
        executor: Arc<dyn CommandExecutor>,
        policy: CommandPolicy,
    ) -> Self {
        Self {
            target,
            options,
            executor,
            policy,
        }
    }

    pub fn from_context(ctx: &StageContext<'_>) -> Result<Self> {
        Ok(Self::new(
            ctx.target.clone(),
            CompressOptions::from_config(ctx.config)?,
            Arc::clone(&ctx.services.executor),
            ctx.services.policy,
        ))
    }

    fn compressed_path(&self, path: &Path) -> PathBuf {
        sibling_path(path, |name| format!("{}.{}", name, self.options.extension))
    }
}

impl Stage for Compress {
    fn name(&self) -> &str {
        NAME
    }

    fn process(&self, file: DumpFile) -> Result<DumpFile> {
        let compressed = self.compressed_path(file.path());

        match self.options.path {
            Some(ref path) => {
                let cmd = format!(
                    "{} -f {}",
                    shell_word(path),
                    shell_quote(&file.path().to_string_lossy())
                );
                info!("{} - {} - Command: {}", self.target, NAME, cmd);
                self.executor
                    .run_shell_command(&cmd, &self.policy)
                    .context("Compressor failed")?;
            }
            None => {
                info!(
                    "{} - {} - Compressing {} to {} (built-in bzip2)",
                    self.target,
                    NAME,
                    file.path().display(),
                    compressed.display()
                );
                bzip2_file(file.path(), &compressed)?;
            }
        }

        if !compressed.exists() {
            anyhow::bail!("Compressor did not produce {}", compressed.display());
        }

        file.supersede(&compressed)
            .with_context(|| format!("Failed to open {}", compressed.display()))
    }
}

fn bzip2_file(source: &Path, dest: &Path) -> Result<()> {
    let mut input =
        File::open(source).with_context(|| format!("Failed to open {}", source.display()))?;
    let output =
        File::create(dest).with_context(|| format!("Failed to create {}", dest.display()))?;

    let mut encoder = BzEncoder::new(BufWriter::new(output), Compression::best());
    io::copy(&mut input, &mut encoder)
        .with_context(|| format!("Failed to compress {}", source.display()))?;
    encoder.finish()?.flush()?;

    Ok(())
}
