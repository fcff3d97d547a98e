use anyhow::Result;
use clap::Args;

use crate::cli::CliConfig;
use crate::config::PatchConfig;
use crate::core::Timestamp;
use crate::watermark::WatermarkStore;

/// Print the stored watermark and where it lives.
#[derive(Args, Debug, Default)]
pub struct StatusCommand {}

impl StatusCommand {
    pub async fn execute(self, cli: &CliConfig) -> Result<()> {
        let config = PatchConfig::load(cli.config_path.clone()).await?;
        let store = WatermarkStore::new(config.state_path());
        let updated_at = store.load().await;

        println!("Install directory: {}", config.install_dir.display());
        println!("State file:        {}", store.path().display());
        if updated_at == Timestamp::EPOCH {
            println!("Last applied:      never");
        } else {
            println!("Last applied:      {updated_at}");
        }
        Ok(())
    }
}
