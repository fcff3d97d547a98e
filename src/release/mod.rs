//! Update detection.
//!
//! The [`UpdateOracle`] asks a [`ReleaseSource`] when the archive was last
//! published and compares that with the stored watermark. Only a strictly newer
//! remote timestamp warrants a sync; equal timestamps mean "already applied".
//!
//! ```rust,no_run
//! use patchsync::core::Timestamp;
//! use patchsync::release::{PatchPage, UpdateOracle};
//!
//! # async fn example() -> anyhow::Result<()> {
//! let oracle = UpdateOracle::new(
//!     PatchPage::new()?,
//!     "https://example.org/patches/",
//!     "App_Patch.zip",
//!     "https://example.org/patches/App_Patch.zip",
//! );
//! let check = oracle.check(Timestamp::EPOCH).await?;
//! println!("update needed: {}", check.needs_update);
//! # Ok(())
//! # }
//! ```

mod page;

pub use page::PatchPage;

use anyhow::{Context, Result};
use tracing::{debug, info};

use crate::core::Timestamp;

/// Where release timestamps come from.
///
/// Production code scrapes the patch page ([`PatchPage`]); tests substitute a
/// fixed value.
#[allow(async_fn_in_trait)]
pub trait ReleaseSource {
    /// Publication time of `archive_name` as listed on `page_url`.
    async fn published_at(&self, page_url: &str, archive_name: &str) -> Result<Timestamp>;
}

/// The currently published release.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteRelease {
    pub published_at: Timestamp,
    pub archive_url: String,
}

/// Outcome of an update check.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UpdateCheck {
    pub needs_update: bool,
    pub stored: Timestamp,
    pub remote: RemoteRelease,
}

/// Decides whether a sync is warranted.
pub struct UpdateOracle<S> {
    source: S,
    page_url: String,
    archive_name: String,
    archive_url: String,
}

impl<S: ReleaseSource> UpdateOracle<S> {
    pub fn new(
        source: S,
        page_url: impl Into<String>,
        archive_name: impl Into<String>,
        archive_url: impl Into<String>,
    ) -> Self {
        Self {
            source,
            page_url: page_url.into(),
            archive_name: archive_name.into(),
            archive_url: archive_url.into(),
        }
    }

    /// Compare the published release against `stored`.
    ///
    /// Any failure to obtain the remote timestamp is returned as-is; there is
    /// no fallback because nothing can be fetched without a known target.
    pub async fn check(&self, stored: Timestamp) -> Result<UpdateCheck> {
        let published_at = self
            .source
            .published_at(&self.page_url, &self.archive_name)
            .await
            .with_context(|| format!("Failed to determine release time of {}", self.archive_name))?;

        let needs_update = published_at > stored;
        if needs_update {
            info!("New release published {} (last applied {})", published_at, stored);
        } else {
            debug!("Release {} already applied (watermark {})", published_at, stored);
        }

        Ok(UpdateCheck {
            needs_update,
            stored,
            remote: RemoteRelease {
                published_at,
                archive_url: self.archive_url.clone(),
            },
        })
    }
}
