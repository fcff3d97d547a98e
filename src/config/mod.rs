//! Configuration for patchsync
//!
//! All settings live in one TOML file and are loaded into a single
//! [`PatchConfig`] value that is passed explicitly to the [`Updater`](crate::updater::Updater).
//! Nothing downstream reads paths or URLs from globals or the environment.
//!
//! # Location
//!
//! Resolved in this order:
//! 1. `--config <path>` on the command line
//! 2. the `PATCHSYNC_CONFIG` environment variable
//! 3. `./patchsync.toml` if it exists
//! 4. `<config dir>/patchsync/patchsync.toml` (`~/.config` on Linux, `%APPDATA%` on Windows)
//!
//! # Example
//!
//! ```toml
//! patch_url = "https://example.org/patches/"
//! archive_name = "App_Patch.zip"
//! install_dir = "C:/Program Files (x86)/App"
//! executable = "App.exe"
//!
//! # Optional
//! process_name = "App.exe"
//! state_file = "patchsync-state.json"
//! restart = true
//! poll_interval_ms = 1000
//! stop_timeout_secs = 120
//! spool_threshold = 67108864
//! ```

mod settings;

pub use settings::{CONFIG_ENV_VAR, PatchConfig};
