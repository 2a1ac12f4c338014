pub mod command;
pub mod locker;

// Trait-based abstractions for testability
pub mod executor;
pub mod object_store;

// Re-export commonly used types and traits (used by test crate)
pub use command::CommandPolicy;
pub use executor::{CommandExecutor, RealExecutor};
pub use object_store::{ObjectStore, S3Connection, S3ObjectStore};
