//! Test utilities for dumpy
//!
//! This crate provides shared test utilities, fake dump tools and helper
//! functions for testing dumpy.
//!
//! # Quick Start
//!
//! ```rust,ignore
//! use test_utils::{ConfigBuilder, TestContext};
//!
//! #[test]
//! fn my_test() {
//!     let ctx = TestContext::from_builder(
//!         ConfigBuilder::minimal().with_postprocessing("db1", "Bzip"),
//!     );
//!     let path = ctx.manager().dump_database("db1").unwrap();
//!     // ... test code
//! }
//! ```

pub mod config_builder;
pub mod fixtures;
pub mod test_context;

// Re-export commonly used items
pub use config_builder::{ConfigBuilder, DatabaseEntry};
pub use fixtures::*;
pub use test_context::{ResultAssertions, TestContext};

// Re-export types from the main crate for convenience
pub use dumpy::config::{ConfigLookup, GlobalSettings, TomlConfig};
pub use dumpy::pipeline::{DumpFile, HandleLedger, PipelineError, ResolutionError, Stage};

// Re-export mock implementations from the main crate
pub use dumpy::utils::executor::mock::{MockExecutor, MockResponse};
pub use dumpy::utils::executor::CommandExecutor;
pub use dumpy::utils::object_store::mock::MockObjectStore;
pub use dumpy::utils::object_store::ObjectStore;
