use anyhow::Result;
use clap::Args;
use colored::Colorize;

use crate::cli::CliConfig;
use crate::config::PatchConfig;
use crate::updater::{RunOutcome, Updater};

/// Download and apply the published archive when it is newer than the last
/// one applied.
///
/// The application is stopped before any file is written and started again
/// afterwards if it was running. The watermark only moves forward after the
/// whole archive has been applied.
#[derive(Args, Debug, Default)]
pub struct SyncCommand {
    /// Apply the archive even if it is not newer than the watermark.
    ///
    /// Files are still only written when the archive copy is newer than the
    /// installed one.
    #[arg(short, long)]
    pub force: bool,

    /// Leave the application stopped after syncing.
    #[arg(long)]
    pub no_restart: bool,
}

impl SyncCommand {
    pub async fn execute(self, cli: &CliConfig) -> Result<()> {
        let config = PatchConfig::load(cli.config_path.clone()).await?;
        let restart = config.restart && !self.no_restart;

        let updater = Updater::from_config(config, !cli.no_progress)?
            .force(self.force)
            .restart(restart);

        match updater.run().await? {
            RunOutcome::UpToDate {
                remote,
                ..
            } => {
                println!("{}", format!("Already up to date (published {})", remote.published_at).green());
            }
            RunOutcome::Synced {
                report,
                remote,
                restarted,
            } => {
                for change in &report.transitions {
                    println!("  {} -> {}: {}", change.previous, change.current, change.name);
                }
                if report.written == 0 {
                    println!("{}", "All files are up to date.".green());
                } else {
                    println!(
                        "{}",
                        format!("Updated or added {} file(s) from release {}", report.written, remote.published_at)
                            .green()
                    );
                }
                if restarted {
                    println!("Restarted {}", updater.config().executable);
                }
            }
        }
        Ok(())
    }
}
