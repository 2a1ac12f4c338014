//! Object storage abstraction for uploads
//!
//! The real implementation talks to S3 (or an S3-compatible endpoint) through
//! `aws-sdk-s3`, driving the async client from a private current-thread
//! runtime so callers stay blocking.

use anyhow::{Context, Result};
use aws_sdk_s3::config::{Credentials, Region};
use aws_sdk_s3::primitives::ByteStream;
use std::path::Path;
use tracing::debug;

/// Abstraction over an object store, enabling mocking in tests
pub trait ObjectStore: Send + Sync {
    /// Upload the file at `path` to `bucket` under `key`
    fn put_file(&self, bucket: &str, key: &str, path: &Path) -> Result<()>;
}

/// Connection settings for an S3-compatible store
#[derive(Debug, Clone)]
pub struct S3Connection {
    pub access_key: String,
    pub secret_key: String,
    pub region: String,
    /// Custom endpoint (MinIO, Spaces, ...); enables path-style addressing
    pub endpoint_url: Option<String>,
}

pub struct S3ObjectStore {
    runtime: tokio::runtime::Runtime,
    client: aws_sdk_s3::Client,
}

impl S3ObjectStore {
    pub fn connect(connection: &S3Connection) -> Result<Self> {
        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .context("Failed to start upload runtime")?;

        let mut loader = aws_config::defaults(aws_config::BehaviorVersion::latest())
            .region(Region::new(connection.region.clone()))
            .credentials_provider(Credentials::new(
                connection.access_key.clone(),
                connection.secret_key.clone(),
                None,
                None,
                "dumpy",
            ));
        if let Some(ref endpoint) = connection.endpoint_url {
            loader = loader.endpoint_url(endpoint.clone());
        }

        let sdk_config = runtime.block_on(loader.load());
        let s3_config = aws_sdk_s3::config::Builder::from(&sdk_config)
            .force_path_style(connection.endpoint_url.is_some())
            .build();

        debug!(
            "Connected S3 client (region {}, endpoint {:?})",
            connection.region, connection.endpoint_url
        );

        Ok(Self {
            runtime,
            client: aws_sdk_s3::Client::from_conf(s3_config),
        })
    }
}

impl ObjectStore for S3ObjectStore {
    fn put_file(&self, bucket: &str, key: &str, path: &Path) -> Result<()> {
        self.runtime.block_on(async {
            let body = ByteStream::from_path(path)
                .await
                .with_context(|| format!("Failed to read {} for upload", path.display()))?;

            self.client
                .put_object()
                .bucket(bucket)
                .key(key)
                .body(body)
                .send()
                .await
                .with_context(|| {
                    format!(
                        "Failed to upload {} to bucket {} with key {}",
                        path.display(),
                        bucket,
                        key
                    )
                })?;

            Ok(())
        })
    }
}

/// In-memory object store that records uploads
/// Available for use in external test crates
pub mod mock {
    use super::*;
    use std::sync::{Arc, Mutex};

    /// Recorded upload
    #[derive(Clone, Debug)]
    pub struct Upload {
        pub bucket: String,
        pub key: String,
        pub contents: Vec<u8>,
    }

    #[derive(Clone, Default)]
    pub struct MockObjectStore {
        uploads: Arc<Mutex<Vec<Upload>>>,
        attempts: Arc<Mutex<u32>>,
        failures_remaining: Arc<Mutex<u32>>,
    }

    impl MockObjectStore {
        pub fn new() -> Self {
            Self::default()
        }

        /// Reject the next `count` uploads
        pub fn fail_times(self, count: u32) -> Self {
            *self.failures_remaining.lock().unwrap() = count;
            self
        }

        pub fn uploads(&self) -> Vec<Upload> {
            self.uploads.lock().unwrap().clone()
        }

        /// Number of upload attempts, including rejected ones
        pub fn attempts(&self) -> u32 {
            *self.attempts.lock().unwrap()
        }
    }

    impl ObjectStore for MockObjectStore {
        fn put_file(&self, bucket: &str, key: &str, path: &Path) -> Result<()> {
            *self.attempts.lock().unwrap() += 1;

            {
                let mut remaining = self.failures_remaining.lock().unwrap();
                if *remaining > 0 {
                    *remaining -= 1;
                    anyhow::bail!("Access denied for bucket {}", bucket);
                }
            }

            let contents = std::fs::read(path)
                .with_context(|| format!("Failed to read {}", path.display()))?;
            self.uploads.lock().unwrap().push(Upload {
                bucket: bucket.to_string(),
                key: key.to_string(),
                contents,
            });
            Ok(())
        }
    }
}
