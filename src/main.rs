//! patchsync CLI entry point
//!
//! Parses arguments, installs logging, runs the command and turns any error
//! into a readable message with a non-zero exit status.

use anyhow::Result;
use clap::Parser;
use patchsync::cli;
use patchsync::core::user_friendly_error;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = cli::Cli::parse();

    // Set up colored output for Windows
    #[cfg(windows)]
    colored::control::set_virtual_terminal(true).ok();

    match cli.execute().await {
        Ok(()) => Ok(()),
        Err(e) => {
            user_friendly_error(e).display();
            std::process::exit(1);
        }
    }
}
