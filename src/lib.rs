//! patchsync - keep an installed application in sync with a published patch archive
//!
//! A vendor publishes a single zip archive on a plain directory-listing page
//! and replaces it whenever a new build is out. patchsync notices when the
//! listed archive is newer than the last one it applied, stops the running
//! application, writes only the files whose archive copy is newer than the
//! installed one, and starts the application again.
//!
//! # Architecture Overview
//!
//! ```text
//! updater ──> watermark      last applied release time (JSON side-file)
//!        ├──> release        patch page scrape + strict "newer than" check
//!        ├──> archive        download into memory or a temp file, then
//!        │                   incremental extraction with zip-slip checks
//!        └──> process        stop / restart the application
//! ```
//!
//! # Modules
//!
//! - [`archive`] - Archive download and incremental extraction
//! - [`cli`] - Command-line interface
//! - [`config`] - `patchsync.toml` loading
//! - [`constants`] - Defaults shared across modules
//! - [`core`] - [`Timestamp`](core::Timestamp) and the error types
//! - [`process`] - Stopping and relaunching the application
//! - [`release`] - Finding the published release time
//! - [`updater`] - One complete sync run
//! - [`utils`] - HTTP client and path containment helpers
//! - [`watermark`] - Persisted time of the last applied release
//!
//! # Example
//!
//! ```rust,no_run
//! use patchsync::config::PatchConfig;
//! use patchsync::updater::{RunOutcome, Updater};
//!
//! # async fn example() -> anyhow::Result<()> {
//! let config = PatchConfig::load(None).await?;
//! match Updater::from_config(config, true)?.run().await? {
//!     RunOutcome::UpToDate { .. } => println!("nothing to do"),
//!     RunOutcome::Synced { report, .. } => println!("{} file(s) updated", report.written),
//! }
//! # Ok(())
//! # }
//! ```

pub mod archive;
pub mod cli;
pub mod config;
pub mod constants;
pub mod core;
pub mod process;
pub mod release;
pub mod updater;
pub mod utils;
pub mod watermark;

// Test utilities (available in tests and with the test-utils feature)
#[cfg(any(test, feature = "test-utils"))]
pub mod test_utils;
