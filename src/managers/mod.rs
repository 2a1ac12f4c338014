pub mod dumper;
pub mod logging;

pub use dumper::{DatabaseInfo, DumpManager, DumpOutcome, DumpSummary, ValidationIssue};
