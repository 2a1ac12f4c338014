//! Unit tests for dumpy
//!
//! Library-level tests of configuration lookup, stage resolution and the
//! post-processing chain, using real stages on temp directories.

mod pipeline;
mod stages;
