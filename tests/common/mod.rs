//! Shared helpers for the integration tests.

#![allow(dead_code)]

use anyhow::{Context, Result};
use assert_cmd::Command;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

/// A scratch area with an install directory and a `patchsync.toml`.
///
/// Layout:
///
/// ```text
/// <temp>/
///   patchsync.toml
///   patchsync-state.json   (after a sync)
///   install/
/// ```
pub struct TestProject {
    _temp_dir: TempDir, // Keep alive for RAII cleanup
    root: PathBuf,
    install_dir: PathBuf,
}

impl TestProject {
    pub fn new() -> Result<Self> {
        let temp_dir = TempDir::new().context("Failed to create temp dir")?;
        let root = temp_dir.path().to_path_buf();
        let install_dir = root.join("install");
        std::fs::create_dir_all(&install_dir).context("Failed to create install dir")?;
        Ok(Self {
            _temp_dir: temp_dir,
            root,
            install_dir,
        })
    }

    pub fn path(&self) -> &Path {
        &self.root
    }

    pub fn install_dir(&self) -> &Path {
        &self.install_dir
    }

    pub fn config_path(&self) -> PathBuf {
        self.root.join("patchsync.toml")
    }

    pub fn state_path(&self) -> PathBuf {
        self.root.join("patchsync-state.json")
    }

    /// Write a config pointing at `patch_url`, with a process name nothing uses.
    pub fn write_config(&self, patch_url: &str) -> Result<PathBuf> {
        let content = format!(
            r#"patch_url = "{patch_url}"
archive_name = "App_Patch.zip"
install_dir = "install"
executable = "App.exe"
process_name = "patchsync-test-app"
restart = false
poll_interval_ms = 10
stop_timeout_secs = 5
"#
        );
        let path = self.config_path();
        std::fs::write(&path, content).context("Failed to write config")?;
        Ok(path)
    }

    /// The `patchsync` binary, run from the project root with colors off.
    pub fn command(&self) -> Command {
        let mut cmd = Command::cargo_bin("patchsync").expect("patchsync binary is built");
        cmd.current_dir(&self.root)
            .env("NO_COLOR", "1")
            .env("PATCHSYNC_CONFIG", self.config_path())
            .env_remove("RUST_LOG");
        cmd
    }

    pub fn read_installed(&self, name: &str) -> Result<Vec<u8>> {
        std::fs::read(self.install_dir.join(name)).with_context(|| format!("Failed to read {name}"))
    }
}
