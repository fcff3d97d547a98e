//! Test utilities for patchsync
//!
//! Fixtures and in-memory fakes shared by the unit tests and the
//! `integration` test target (enabled there through the `test-utils` feature).
//!
//! - [`ZipFixture`] builds zip archives with chosen entry timestamps
//! - [`FixedRelease`], [`MemoryFetcher`] and [`FakeProcesses`] stand in for the
//!   patch page, the download and the process table
//!
//! # Example
//!
//! ```rust,no_run
//! use patchsync::test_utils::{FakeProcesses, FixedRelease, MemoryFetcher, ZipFixture};
//!
//! let archive = ZipFixture::new().file("App.exe", b"v2", "2024-05-30 08:00").build();
//! let fetcher = MemoryFetcher::new(archive);
//! let release = FixedRelease::at("2024-06-01 10:00");
//! let processes = FakeProcesses::stopped();
//! ```

pub mod fakes;
pub mod fixtures;

pub use fakes::{FakeProcesses, FixedRelease, MemoryFetcher};
pub use fixtures::{ZipFixture, listing_page};

use std::sync::Once;
use tracing::Level;
use tracing_subscriber::EnvFilter;

/// Global flag to ensure logging is only initialized once in tests
static INIT_LOGGING: Once = Once::new();

/// Initialize logging for tests.
///
/// Uses `level` when given, otherwise `RUST_LOG`; does nothing when neither
/// is set.
///
/// ```bash
/// RUST_LOG=debug cargo test
/// ```
pub fn init_test_logging(level: Option<Level>) {
    INIT_LOGGING.call_once(|| {
        let filter = if let Some(level) = level {
            EnvFilter::new(level.to_string())
        } else if std::env::var("RUST_LOG").is_ok() {
            EnvFilter::from_default_env()
        } else {
            return;
        };

        let _ = tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_test_writer()
            .with_target(true)
            .with_thread_ids(false)
            .try_init();
    });
}
