//! Integration tests for dumpy
//!
//! These tests require Docker and dump real database servers.
//! Run with: `cargo test -p dumpy-tests --test integration -- --ignored`

mod common;
