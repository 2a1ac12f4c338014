//! File-based locking to prevent concurrent dumps of the same database

use anyhow::{Context, Result};
use fd_lock::RwLock;
use std::fs::OpenOptions;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Run `f` while holding the exclusive lock for `database`.
///
/// Fails immediately if another process (or another call in this process)
/// already holds the lock. The lock file itself is left in place.
pub fn with_database_lock<T>(
    lock_dir: &Path,
    database: &str,
    f: impl FnOnce() -> Result<T>,
) -> Result<T> {
    let lock_path = lock_path(lock_dir, database);

    debug!("Attempting to acquire lock: {:?}", lock_path);

    std::fs::create_dir_all(lock_dir).context("Failed to create lock directory")?;

    let file = OpenOptions::new()
        .read(true)
        .write(true)
        .create(true)
        .truncate(false)
        .open(&lock_path)
        .with_context(|| format!("Failed to open lock file: {:?}", lock_path))?;

    let mut lock = RwLock::new(file);
    let guard = lock.try_write().with_context(|| {
        format!(
            "Database '{}' is already being dumped (lock held)",
            database
        )
    })?;

    info!("Acquired dump lock for database: {}", database);

    let result = f();

    drop(guard);
    info!("Released dump lock: {:?}", lock_path);

    result
}

/// Get the lock file path for a database
pub fn lock_path(lock_dir: &Path, database: &str) -> PathBuf {
    lock_dir.join(format!("dumpy-{}.lock", database))
}
