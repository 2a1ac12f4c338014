//! Ownership handle for the file moving through the pipeline

use std::fs::File;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::Arc;

static NEXT_HANDLE_ID: AtomicU64 = AtomicU64::new(1);

/// Counts handle opens and closes across one chain of derived files.
///
/// Every [`DumpFile`] derived from another shares its ledger, so after each
/// stage `live()` must be exactly one.
#[derive(Debug, Clone, Default)]
pub struct HandleLedger {
    inner: Arc<LedgerCounts>,
}

#[derive(Debug, Default)]
struct LedgerCounts {
    opened: AtomicUsize,
    closed: AtomicUsize,
}

impl HandleLedger {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn opened(&self) -> usize {
        self.inner.opened.load(Ordering::SeqCst)
    }

    pub fn closed(&self) -> usize {
        self.inner.closed.load(Ordering::SeqCst)
    }

    /// Handles currently open
    pub fn live(&self) -> usize {
        self.opened() - self.closed()
    }
}

/// An open file on disk, owned by exactly one holder at a time.
///
/// Dropping the handle closes it and leaves the file on disk. [`release`]
/// closes it and removes the file, which is what a stage does to the input it
/// supersedes.
///
/// [`release`]: DumpFile::release
#[derive(Debug)]
pub struct DumpFile {
    id: u64,
    path: PathBuf,
    handle: File,
    ledger: HandleLedger,
}

impl DumpFile {
    /// Wrap an already open file
    pub fn from_handle(path: PathBuf, handle: File, ledger: HandleLedger) -> Self {
        ledger.inner.opened.fetch_add(1, Ordering::SeqCst);
        Self {
            id: NEXT_HANDLE_ID.fetch_add(1, Ordering::SeqCst),
            path,
            handle,
            ledger,
        }
    }

    /// Open an existing file with a fresh ledger
    pub fn open(path: impl Into<PathBuf>) -> io::Result<Self> {
        Self::open_with_ledger(path, HandleLedger::new())
    }

    pub fn open_with_ledger(path: impl Into<PathBuf>, ledger: HandleLedger) -> io::Result<Self> {
        let path = path.into();
        let handle = File::open(&path)?;
        Ok(Self::from_handle(path, handle, ledger))
    }

    /// Unique id of this handle; pass-through stages return the same id
    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Final path component, lossily converted
    pub fn file_name(&self) -> String {
        self.path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default()
    }

    /// Directory containing the file
    pub fn dir(&self) -> &Path {
        self.path.parent().unwrap_or_else(|| Path::new("."))
    }

    pub fn ledger(&self) -> &HandleLedger {
        &self.ledger
    }

    pub fn handle(&mut self) -> &mut File {
        &mut self.handle
    }

    /// Size of the file on disk
    pub fn len(&self) -> io::Result<u64> {
        Ok(self.handle.metadata()?.len())
    }

    pub fn is_empty(&self) -> io::Result<bool> {
        Ok(self.len()? == 0)
    }

    /// Close the handle and remove the file if it still exists
    pub fn release(self) -> io::Result<()> {
        let path = self.path.clone();
        drop(self);

        match std::fs::remove_file(&path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e),
        }
    }

    /// Release this file and open `path` as its successor on the same ledger
    pub fn supersede(self, path: impl Into<PathBuf>) -> io::Result<DumpFile> {
        let path = path.into();
        if path == self.path {
            return Ok(self);
        }

        let ledger = self.ledger.clone();
        self.release()?;
        DumpFile::open_with_ledger(path, ledger)
    }

    /// Close the handle and keep the file on disk
    pub fn into_path(self) -> PathBuf {
        self.path.clone()
    }
}

impl Drop for DumpFile {
    fn drop(&mut self) {
        self.ledger.inner.closed.fetch_add(1, Ordering::SeqCst);
    }
}

/// Extension of a file name including the leading dot, or an empty string.
///
/// Only the last extension counts (`dump.sql.bz2` -> `.bz2`), and a leading
/// dot does not start an extension (`.hidden` -> ``).
pub fn extension_of(file_name: &str) -> &str {
    match file_name.rfind('.') {
        Some(idx) if file_name[..idx].chars().any(|c| c != '.') => &file_name[idx..],
        _ => "",
    }
}
