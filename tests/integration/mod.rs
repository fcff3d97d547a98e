//! Integration test suite for patchsync
//!
//! End-to-end checks of sync runs over HTTP, extraction safety against a real
//! directory tree, and the command-line interface.
//!
//! # Running Integration Tests
//!
//! ```bash
//! cargo test --test integration
//! ```
//!
//! # Test Organization
//!
//! - **sync_flow**: `Updater` against a mock patch server
//! - **extract**: incremental extraction and zip-slip containment on disk
//! - **cli**: the `patchsync` binary

// Shared test utilities (from parent tests/ directory)
#[path = "../common/mod.rs"]
mod common;

mod cli;
mod extract;
mod sync_flow;
