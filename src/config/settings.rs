use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio::fs;
use tracing::debug;

use crate::constants::{
    DEFAULT_POLL_INTERVAL_MS, DEFAULT_SPOOL_THRESHOLD, DEFAULT_STATE_FILE_NAME, CONFIG_FILE_NAME,
};
use crate::core::PatchError;

/// Environment variable that overrides the configuration file location.
pub const CONFIG_ENV_VAR: &str = "PATCHSYNC_CONFIG";

/// Everything a patch run needs to know.
///
/// Relative `install_dir` and `state_file` values are resolved against the
/// directory that contains the configuration file; `~` and `$VAR` are expanded.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PatchConfig {
    /// Directory listing page that publishes the archive, e.g. `https://example.org/patches/`.
    pub patch_url: String,

    /// File name of the archive as linked from the patch page.
    pub archive_name: String,

    /// Root of the existing installation that receives the files.
    pub install_dir: PathBuf,

    /// Executable relaunched after a sync, relative to `install_dir`.
    pub executable: String,

    /// Name used to find and stop the running application. Defaults to the
    /// file name of `executable`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub process_name: Option<String>,

    /// Where the watermark is persisted.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub state_file: Option<PathBuf>,

    /// Relaunch the application after syncing if it was running before.
    #[serde(default = "default_restart")]
    pub restart: bool,

    /// How often to check whether the application has exited.
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,

    /// Give up waiting for the application to exit after this many seconds.
    /// Absent means wait forever.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stop_timeout_secs: Option<u64>,

    /// Archives larger than this many bytes are spooled to a temporary file
    /// instead of being held in memory.
    #[serde(default = "default_spool_threshold")]
    pub spool_threshold: u64,
}

const fn default_restart() -> bool {
    true
}

const fn default_poll_interval_ms() -> u64 {
    DEFAULT_POLL_INTERVAL_MS
}

const fn default_spool_threshold() -> u64 {
    DEFAULT_SPOOL_THRESHOLD
}

impl PatchConfig {
    /// Minimal configuration with every optional setting at its default.
    pub fn new(
        patch_url: impl Into<String>,
        archive_name: impl Into<String>,
        install_dir: impl Into<PathBuf>,
        executable: impl Into<String>,
    ) -> Self {
        Self {
            patch_url: patch_url.into(),
            archive_name: archive_name.into(),
            install_dir: install_dir.into(),
            executable: executable.into(),
            process_name: None,
            state_file: None,
            restart: default_restart(),
            poll_interval_ms: default_poll_interval_ms(),
            stop_timeout_secs: None,
            spool_threshold: default_spool_threshold(),
        }
    }

    /// Load from an explicit path, or from the default location when `None`.
    pub async fn load(path: Option<PathBuf>) -> Result<Self> {
        let path = match path {
            Some(p) => p,
            None => Self::default_path()?,
        };
        Self::load_from(&path).await
    }

    pub async fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Err(PatchError::ConfigNotFound {
                path: path.display().to_string(),
            }
            .into());
        }

        let content = fs::read_to_string(path)
            .await
            .with_context(|| format!("Failed to read config from {}", path.display()))?;

        let config = Self::parse(&content, path)?;
        let base = path.parent().filter(|p| !p.as_os_str().is_empty()).unwrap_or(Path::new("."));
        let config = config.resolve_paths(base)?;
        debug!("Loaded config from {}", path.display());
        Ok(config)
    }

    fn parse(content: &str, path: &Path) -> Result<Self, PatchError> {
        let config: Self = toml::from_str(content).map_err(|e| PatchError::ConfigParse {
            path: path.display().to_string(),
            reason: e.to_string(),
        })?;
        config.validate().map_err(|reason| PatchError::ConfigParse {
            path: path.display().to_string(),
            reason,
        })?;
        Ok(config)
    }

    fn validate(&self) -> Result<(), String> {
        if self.patch_url.trim().is_empty() {
            return Err("patch_url must not be empty".to_string());
        }
        if self.archive_name.trim().is_empty() {
            return Err("archive_name must not be empty".to_string());
        }
        if self.archive_name.contains(['/', '\\']) {
            return Err("archive_name must be a bare file name".to_string());
        }
        if self.executable.trim().is_empty() {
            return Err("executable must not be empty".to_string());
        }
        if self.poll_interval_ms == 0 {
            return Err("poll_interval_ms must be greater than zero".to_string());
        }
        Ok(())
    }

    fn resolve_paths(mut self, base: &Path) -> Result<Self> {
        self.install_dir = expand(&self.install_dir, base)?;
        let state = self.state_file.take().unwrap_or_else(|| PathBuf::from(DEFAULT_STATE_FILE_NAME));
        self.state_file = Some(expand(&state, base)?);
        Ok(self)
    }

    /// Default configuration file location (see the module docs for the search order).
    pub fn default_path() -> Result<PathBuf> {
        if let Ok(path) = std::env::var(CONFIG_ENV_VAR) {
            return Ok(PathBuf::from(path));
        }

        let local = PathBuf::from(CONFIG_FILE_NAME);
        if local.exists() {
            return Ok(local);
        }

        Ok(dirs::config_dir()
            .ok_or_else(|| anyhow::anyhow!("Unable to determine configuration directory"))?
            .join("patchsync")
            .join(CONFIG_FILE_NAME))
    }

    /// URL of the archive: the patch page URL followed by the archive name.
    pub fn archive_url(&self) -> String {
        if self.patch_url.ends_with('/') {
            format!("{}{}", self.patch_url, self.archive_name)
        } else {
            format!("{}/{}", self.patch_url, self.archive_name)
        }
    }

    pub fn process_name(&self) -> &str {
        match &self.process_name {
            Some(name) => name,
            None => Path::new(&self.executable)
                .file_name()
                .and_then(|n| n.to_str())
                .unwrap_or(&self.executable),
        }
    }

    pub fn executable_path(&self) -> PathBuf {
        self.install_dir.join(&self.executable)
    }

    pub fn state_path(&self) -> PathBuf {
        self.state_file.clone().unwrap_or_else(|| PathBuf::from(DEFAULT_STATE_FILE_NAME))
    }

    pub const fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    pub fn stop_timeout(&self) -> Option<Duration> {
        self.stop_timeout_secs.map(Duration::from_secs)
    }
}

/// Expand `~` and environment variables, then anchor relative paths at `base`.
fn expand(path: &Path, base: &Path) -> Result<PathBuf> {
    let raw = path.to_string_lossy();
    let expanded = shellexpand::full(&raw)
        .with_context(|| format!("Failed to expand path: {raw}"))?
        .into_owned();
    let expanded = PathBuf::from(expanded);
    if expanded.is_absolute() {
        Ok(expanded)
    } else {
        Ok(base.join(expanded))
    }
}
