//! Command-line interface for patchsync.
//!
//! Each command lives in its own module with its own argument struct and an
//! `execute` method. `sync` is the default when no command is given, so a
//! scheduled task can simply run `patchsync`.
//!
//! # Available Commands
//!
//! - `sync` - Download and apply the published archive if it is newer
//! - `check` - Report whether a newer archive is published, without applying it
//! - `apply` - Merge a local archive into an installation directory
//! - `status` - Show the stored watermark
//!
//! # Global Options
//!
//! - `--config` - Path to `patchsync.toml`
//! - `--verbose` - Enable debug output
//! - `--quiet` - Only log errors
//! - `--no-progress` - Hide the download progress bar
//!
//! ```bash
//! patchsync                          # same as `patchsync sync`
//! patchsync --verbose sync --force
//! patchsync check
//! patchsync apply ./App_Patch.zip --install-dir "C:/Program Files (x86)/App"
//! ```

mod apply;
mod check;
mod status;
mod sync;

use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

/// Settings derived from the global flags, applied once before a command runs.
#[derive(Debug, Clone, Default)]
pub struct CliConfig {
    /// Default log filter; `RUST_LOG` takes precedence when set.
    ///
    /// - `"error"` with `--quiet`
    /// - `"debug"` with `--verbose`
    /// - `"info"` otherwise
    pub log_level: String,

    /// Hide the download progress bar.
    pub no_progress: bool,

    /// Explicit configuration file.
    pub config_path: Option<PathBuf>,
}

impl CliConfig {
    #[must_use]
    pub fn new() -> Self {
        Self {
            log_level: "info".to_string(),
            ..Self::default()
        }
    }

    /// Install the global `tracing` subscriber, writing to stderr.
    ///
    /// Does nothing if a subscriber is already set.
    pub fn init_logging(&self) {
        let filter = EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| EnvFilter::new(&self.log_level));

        let _ = tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_writer(std::io::stderr)
            .with_target(false)
            .try_init();
    }
}

/// Keep an installed application current with a published zip archive.
#[derive(Parser)]
#[command(
    name = "patchsync",
    about = "Keep an installation in sync with a published patch archive",
    version,
    long_about = "patchsync checks a patch listing page for a newer archive, stops the \
                  application, writes only the files that changed and starts it again."
)]
pub struct Cli {
    /// Command to run; defaults to `sync`.
    #[command(subcommand)]
    command: Option<Commands>,

    /// Enable verbose output.
    #[arg(short, long, global = true, conflicts_with = "quiet")]
    verbose: bool,

    /// Only log errors.
    #[arg(short, long, global = true)]
    quiet: bool,

    /// Path to the configuration file.
    ///
    /// Defaults to `$PATCHSYNC_CONFIG`, then `./patchsync.toml`, then the
    /// user configuration directory.
    #[arg(short, long, global = true, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Disable the download progress bar.
    #[arg(long, global = true)]
    no_progress: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Download and apply the published archive if it is newer (default)
    Sync(sync::SyncCommand),

    /// Report whether a newer archive is published
    Check(check::CheckCommand),

    /// Merge a local archive into the installation directory
    Apply(apply::ApplyCommand),

    /// Show the stored watermark
    Status(status::StatusCommand),
}

impl Cli {
    #[must_use]
    pub fn build_config(&self) -> CliConfig {
        let log_level = if self.verbose {
            "debug"
        } else if self.quiet {
            "error"
        } else {
            "info"
        };

        CliConfig {
            log_level: log_level.to_string(),
            no_progress: self.no_progress,
            config_path: self.config.clone(),
        }
    }

    pub async fn execute(self) -> Result<()> {
        let config = self.build_config();
        config.init_logging();
        self.execute_with_config(config).await
    }

    pub async fn execute_with_config(self, config: CliConfig) -> Result<()> {
        match self.command.unwrap_or_default() {
            Commands::Sync(cmd) => cmd.execute(&config).await,
            Commands::Check(cmd) => cmd.execute(&config).await,
            Commands::Apply(cmd) => cmd.execute(&config).await,
            Commands::Status(cmd) => cmd.execute(&config).await,
        }
    }
}

impl Default for Commands {
    fn default() -> Self {
        Self::Sync(sync::SyncCommand::default())
    }
}
