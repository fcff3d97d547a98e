use anyhow::Result;
use clap::Args;
use colored::Colorize;

use crate::cli::CliConfig;
use crate::config::PatchConfig;
use crate::updater::Updater;

/// Compare the published archive with the watermark without downloading it.
#[derive(Args, Debug, Default)]
pub struct CheckCommand {}

impl CheckCommand {
    pub async fn execute(self, cli: &CliConfig) -> Result<()> {
        let config = PatchConfig::load(cli.config_path.clone()).await?;
        let updater = Updater::from_config(config, false)?;
        let check = updater.check().await?;

        println!("Last applied: {}", check.stored);
        println!("Published:    {}", check.remote.published_at);
        if check.needs_update {
            println!("{}", format!("Update available: {}", check.remote.archive_url).yellow());
        } else {
            println!("{}", "Up to date".green());
        }
        Ok(())
    }
}
