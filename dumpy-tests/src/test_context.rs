//! Test context and harness for command tests
//!
//! Provides a unified context for setting up a configuration, the stage
//! collaborators and a dump manager wired to them.

use crate::config_builder::ConfigBuilder;
use dumpy::config::TomlConfig;
use dumpy::managers::DumpManager;
use dumpy::pipeline::{StageRegistry, StageServices};
use dumpy::utils::object_store::mock::MockObjectStore;
use dumpy::ConfigLookup;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tempfile::TempDir;

/// Test context that manages test resources and provides common utilities
pub struct TestContext {
    /// Temporary directory for test files
    temp_dir: TempDir,
    config: Arc<TomlConfig>,
    object_store: MockObjectStore,
}

impl TestContext {
    /// Create a test context with a minimal configuration
    pub fn with_minimal_config() -> Self {
        Self::from_builder(ConfigBuilder::minimal())
    }

    /// Create a test context from a ConfigBuilder
    pub fn from_builder(builder: ConfigBuilder) -> Self {
        let (config, temp_dir) = builder.persist();

        Self {
            temp_dir,
            config: Arc::new(config),
            object_store: MockObjectStore::new(),
        }
    }

    /// Replace the in-memory object store
    pub fn with_object_store(mut self, store: MockObjectStore) -> Self {
        self.object_store = store;
        self
    }

    /// Get the temporary directory path
    pub fn temp_dir(&self) -> &Path {
        self.temp_dir.path()
    }

    pub fn config(&self) -> &TomlConfig {
        &self.config
    }

    /// Uploads recorded by the in-memory object store
    pub fn object_store(&self) -> &MockObjectStore {
        &self.object_store
    }

    /// Dump manager using the real stages, the configured (fake) tools and
    /// the in-memory object store
    pub fn manager(&self) -> DumpManager {
        let config: Arc<dyn ConfigLookup> = self.config.clone();
        let services = StageServices::from_settings(config.global())
            .with_object_store(Arc::new(self.object_store.clone()));

        DumpManager::with_services(config, StageRegistry::builtin(), services)
    }

    /// Path of a file or directory inside the temp dir
    pub fn path(&self, name: &str) -> PathBuf {
        self.temp_dir.path().join(name)
    }

    /// Names of the files in a subdirectory, sorted
    pub fn list_dir(&self, name: &str) -> Vec<String> {
        let mut names: Vec<String> = std::fs::read_dir(self.path(name))
            .map(|entries| {
                entries
                    .filter_map(|e| e.ok())
                    .map(|e| e.file_name().to_string_lossy().into_owned())
                    .collect()
            })
            .unwrap_or_default();
        names.sort();
        names
    }

    /// Create a file in the temp dir
    pub fn create_file(&self, name: &str, content: &str) -> PathBuf {
        let path = self.temp_dir.path().join(name);
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).expect("Failed to create parent directory");
        }
        std::fs::write(&path, content).expect("Failed to write file");
        path
    }
}

/// Extension trait for assertion helpers
pub trait ResultAssertions<T> {
    /// Assert that the result is Ok and return the value
    fn assert_ok(self) -> T;

    /// Assert that the result is Err and the error message contains the given string
    fn assert_err_contains(self, needle: &str);
}

impl<T: std::fmt::Debug> ResultAssertions<T> for anyhow::Result<T> {
    fn assert_ok(self) -> T {
        match self {
            Ok(v) => v,
            Err(e) => panic!("Expected Ok, got Err: {:#}", e),
        }
    }

    fn assert_err_contains(self, needle: &str) {
        match self {
            Ok(v) => panic!("Expected Err containing '{}', got Ok: {:?}", needle, v),
            Err(e) => {
                let msg = format!("{:#}", e);
                assert!(
                    msg.contains(needle),
                    "Expected error containing '{}', got: {}",
                    needle,
                    msg
                );
            }
        }
    }
}
