//! Persistence of the update watermark.
//!
//! The watermark is the publication time of the last release that was applied
//! successfully. It lives in a small JSON side-file:
//!
//! ```json
//! {
//!   "updated_at": "2024-06-01T10:00:00Z"
//! }
//! ```
//!
//! A missing or unreadable file is not an error: the store reports
//! [`Timestamp::EPOCH`], which makes the next run treat every release as new.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::{debug, info, warn};

use crate::core::Timestamp;

/// On-disk shape of the watermark file.
#[derive(Debug, Serialize, Deserialize)]
pub struct WatermarkRecord {
    /// Publication time of the last applied release.
    pub updated_at: Timestamp,
}

/// Reads and writes the watermark file.
#[derive(Debug, Clone)]
pub struct WatermarkStore {
    path: PathBuf,
}

impl WatermarkStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Load the stored watermark, falling back to [`Timestamp::EPOCH`].
    pub async fn load(&self) -> Timestamp {
        if !self.path.exists() {
            debug!("No watermark at {}, assuming nothing applied", self.path.display());
            return Timestamp::EPOCH;
        }

        match self.read().await {
            Ok(record) => record.updated_at,
            Err(e) => {
                warn!("Ignoring unreadable watermark {}: {:#}", self.path.display(), e);
                Timestamp::EPOCH
            }
        }
    }

    async fn read(&self) -> Result<WatermarkRecord> {
        let content = fs::read_to_string(&self.path).await.context("Failed to read watermark")?;
        serde_json::from_str(&content).context("Failed to parse watermark")
    }

    /// Overwrite the watermark file with `updated_at`.
    pub async fn save(&self, updated_at: Timestamp) -> Result<()> {
        let record = WatermarkRecord {
            updated_at,
        };
        let content =
            serde_json::to_string_pretty(&record).context("Failed to serialize watermark")?;

        if let Some(parent) = self.path.parent()
            && !parent.as_os_str().is_empty()
        {
            fs::create_dir_all(parent)
                .await
                .with_context(|| format!("Failed to create {}", parent.display()))?;
        }

        fs::write(&self.path, content)
            .await
            .with_context(|| format!("Failed to write watermark to {}", self.path.display()))?;

        debug!("Saved watermark {} to {}", updated_at, self.path.display());
        Ok(())
    }

    /// Persist `observed` only if it is not older than `prior`.
    ///
    /// Returns whether the file was written.
    pub async fn advance(&self, prior: Timestamp, observed: Timestamp) -> Result<bool> {
        if observed < prior {
            warn!("Not moving watermark backwards from {} to {}", prior, observed);
            return Ok(false);
        }
        self.save(observed).await?;
        info!("Watermark advanced to {}", observed);
        Ok(true)
    }
}
