use anyhow::{Context, Result};
use clap::Args;
use colored::Colorize;
use std::path::PathBuf;

use crate::archive::{ArchiveSource, IncrementalExtractor};
use crate::cli::CliConfig;
use crate::config::PatchConfig;

/// Merge a local zip archive into an installation directory.
///
/// Uses the same newer-only rule as `sync` but does not touch the watermark
/// or the running application.
#[derive(Args, Debug)]
pub struct ApplyCommand {
    /// Zip archive to apply.
    #[arg(value_name = "ARCHIVE")]
    pub archive: PathBuf,

    /// Installation directory; defaults to `install_dir` from the configuration.
    #[arg(long, value_name = "DIR")]
    pub install_dir: Option<PathBuf>,
}

impl ApplyCommand {
    pub async fn execute(self, cli: &CliConfig) -> Result<()> {
        let install_dir = match self.install_dir {
            Some(dir) => dir,
            None => {
                PatchConfig::load(cli.config_path.clone())
                    .await
                    .context("No --install-dir given and no configuration to take it from")?
                    .install_dir
            }
        };

        let source = ArchiveSource::open(&self.archive)?;
        let report = IncrementalExtractor::new(&install_dir).apply_blocking(source).await?;

        for change in &report.transitions {
            println!("  {} -> {}: {}", change.previous, change.current, change.name);
        }
        if report.written == 0 {
            println!("{}", "All files are up to date.".green());
        } else {
            println!(
                "{}",
                format!("Updated or added {} file(s) in {}", report.written, install_dir.display()).green()
            );
        }
        Ok(())
    }
}
