//! Upload the dump to an S3-compatible object store

use crate::config::ConfigLookup;
use crate::database::BackupTarget;
use crate::pipeline::{DumpFile, Stage, StageContext};
use crate::utils::{ObjectStore, S3Connection, S3ObjectStore};
use anyhow::{Context, Result};
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};

pub const NAMESPACE: &str = "dumpy.stages.s3copy";
pub const NAME: &str = "ObjectStoreCopy";

/// Options section, named after the S3 alias
pub const SECTION: &str = "S3Copy";
pub const DEFAULT_REGION: &str = "us-east-1";

#[derive(Debug, Clone, PartialEq)]
pub struct S3CopyOptions {
    pub access_key: String,
    pub secret_key: String,
    pub bucket: String,
    /// Key prefix, empty or ending with `/`
    pub prefix: String,
    pub region: String,
    pub endpoint_url: Option<String>,
    pub max_attempts: u32,
    pub retry_backoff: Duration,
}

impl S3CopyOptions {
    pub fn from_config(config: &dyn ConfigLookup) -> Result<Self> {
        let required = |key: &str| -> Result<String> {
            config
                .get_string(SECTION, key)?
                .filter(|v| !v.is_empty())
                .with_context(|| format!("[{}] {} is not configured", SECTION, key))
        };

        let access_key = required("access_key")?;
        let secret_key = required("secret_key")?;
        let bucket = required("bucket")?;

        let max_attempts = match config.get_int(SECTION, "max_attempts")? {
            Some(n) if n > 1 => u32::try_from(n).unwrap_or(u32::MAX),
            _ => 1,
        };
        let backoff_ms = config
            .get_int(SECTION, "retry_backoff_ms")?
            .map(|ms| ms.max(0) as u64)
            .unwrap_or(500);

        Ok(Self {
            access_key,
            secret_key,
            bucket,
            prefix: normalize_prefix(config.get_string(SECTION, "prefix")?.as_deref()),
            region: config
                .get_string(SECTION, "region")?
                .filter(|r| !r.is_empty())
                .unwrap_or_else(|| DEFAULT_REGION.to_string()),
            endpoint_url: config
                .get_string(SECTION, "endpoint_url")?
                .filter(|e| !e.is_empty()),
            max_attempts,
            retry_backoff: Duration::from_millis(backoff_ms),
        })
    }

    pub fn connection(&self) -> S3Connection {
        S3Connection {
            access_key: self.access_key.clone(),
            secret_key: self.secret_key.clone(),
            region: self.region.clone(),
            endpoint_url: self.endpoint_url.clone(),
        }
    }

    /// Object key for a file name
    pub fn key_for(&self, file_name: &str) -> String {
        format!("{}{}", self.prefix, file_name)
    }
}

/// Append `/` to a non-empty prefix that lacks one
pub fn normalize_prefix(prefix: Option<&str>) -> String {
    match prefix {
        None | Some("") => String::new(),
        Some(p) if p.ends_with('/') => p.to_string(),
        Some(p) => format!("{}/", p),
    }
}

pub struct ObjectStoreCopy {
    target: BackupTarget,
    options: S3CopyOptions,
    store: Arc<dyn ObjectStore>,
}

impl ObjectStoreCopy {
    pub fn new(target: BackupTarget, options: S3CopyOptions, store: Arc<dyn ObjectStore>) -> Self {
        Self {
            target,
            options,
            store,
        }
    }

    pub fn from_context(ctx: &StageContext<'_>) -> Result<Self> {
        let options = S3CopyOptions::from_config(ctx.config)?;

        let store = match ctx.services.object_store {
            Some(ref store) => Arc::clone(store),
            None => Arc::new(S3ObjectStore::connect(&options.connection())?) as Arc<dyn ObjectStore>,
        };

        Ok(Self::new(ctx.target.clone(), options, store))
    }
}

impl Stage for ObjectStoreCopy {
    fn name(&self) -> &str {
        NAME
    }

    fn process(&self, file: DumpFile) -> Result<DumpFile> {
        let key = self.options.key_for(&file.file_name());
        let mut backoff = self.options.retry_backoff;
        let mut attempt = 1;

        loop {
            match self.store.put_file(&self.options.bucket, &key, file.path()) {
                Ok(()) => break,
                Err(e) if attempt < self.options.max_attempts => {
                    warn!(
                        "{} - {} - Upload attempt {}/{} failed: {:#}",
                        self.target, NAME, attempt, self.options.max_attempts, e
                    );
                    std::thread::sleep(backoff);
                    backoff *= 2;
                    attempt += 1;
                }
                Err(e) => return Err(e),
            }
        }

        info!(
            "{} - {} - Copying to S3 bucket {} with key name: {}",
            self.target, NAME, self.options.bucket, key
        );
        Ok(file)
    }
}
