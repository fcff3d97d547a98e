//! Constants shared across patchsync modules.
//!
//! Defaults that can be overridden live in the configuration file; these are
//! the values used when a setting is absent.

/// Name of the configuration file.
pub const CONFIG_FILE_NAME: &str = "patchsync.toml";

/// Name of the watermark side-file when `state_file` is not configured.
pub const DEFAULT_STATE_FILE_NAME: &str = "patchsync-state.json";

/// Interval between "is the application still running" checks (1 second).
pub const DEFAULT_POLL_INTERVAL_MS: u64 = 1000;

/// Archives above this size are spooled to disk rather than held in memory (64 MiB).
pub const DEFAULT_SPOOL_THRESHOLD: u64 = 64 * 1024 * 1024;

/// Timeout for establishing HTTP connections (30 seconds).
///
/// Only the connect phase is bounded; large archives may take much longer to
/// transfer.
pub const HTTP_CONNECT_TIMEOUT: std::time::Duration = std::time::Duration::from_secs(30);

/// User agent sent with every request.
pub const USER_AGENT: &str = concat!("patchsync/", env!("CARGO_PKG_VERSION"));
