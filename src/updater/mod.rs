//! One complete sync run.
//!
//! ```text
//! load watermark
//!   └── UpdateOracle::check ──(not newer)──> UpToDate
//!         └── ArchiveFetcher::fetch
//!               └── ProcessCoordinator::quiesce
//!                     └── IncrementalExtractor::apply
//!                           └── WatermarkStore::advance
//!                                 └── ProcessCoordinator::resume
//! ```
//!
//! Any failing step ends the run with its error. In particular the watermark
//! is only written after extraction succeeds, so a later run sees the same
//! release as new again and retries the whole sync. A failed run also leaves
//! the application stopped.

use anyhow::Result;
use tracing::{debug, info};

use crate::archive::{ApplyReport, ArchiveFetcher, HttpFetcher, IncrementalExtractor};
use crate::config::PatchConfig;
use crate::core::Timestamp;
use crate::process::{ProcessControl, ProcessCoordinator, SystemProcesses};
use crate::release::{PatchPage, ReleaseSource, RemoteRelease, UpdateCheck, UpdateOracle};
use crate::utils::http::build_client;
use crate::watermark::WatermarkStore;

/// How a run ended.
#[derive(Debug, Clone)]
pub enum RunOutcome {
    /// The published release is not newer than the watermark.
    UpToDate {
        stored: Timestamp,
        remote: RemoteRelease,
    },
    /// The archive was applied.
    Synced {
        report: ApplyReport,
        remote: RemoteRelease,
        /// Whether the application was relaunched afterwards.
        restarted: bool,
    },
}

impl RunOutcome {
    /// Number of files written; zero when nothing was downloaded.
    pub const fn written(&self) -> usize {
        match self {
            Self::UpToDate {
                ..
            } => 0,
            Self::Synced {
                report,
                ..
            } => report.written,
        }
    }
}

/// Sequences the oracle, fetcher, coordinator and extractor for one run.
pub struct Updater<S, F, P> {
    config: PatchConfig,
    oracle: UpdateOracle<S>,
    fetcher: F,
    coordinator: ProcessCoordinator<P>,
    watermark: WatermarkStore,
    force: bool,
}

impl Updater<PatchPage, HttpFetcher, SystemProcesses> {
    /// Build an updater that talks to the real network and process table.
    pub fn from_config(config: PatchConfig, show_progress: bool) -> Result<Self> {
        let client = build_client()?;
        let fetcher = HttpFetcher::with_client(client.clone())
            .spool_threshold(config.spool_threshold)
            .show_progress(show_progress);
        Ok(Self::with_parts(config, PatchPage::with_client(client), fetcher, SystemProcesses))
    }
}

impl<S, F, P> Updater<S, F, P>
where
    S: ReleaseSource,
    F: ArchiveFetcher,
    P: ProcessControl,
{
    pub fn with_parts(config: PatchConfig, source: S, fetcher: F, control: P) -> Self {
        let oracle = UpdateOracle::new(
            source,
            config.patch_url.clone(),
            config.archive_name.clone(),
            config.archive_url(),
        );
        let coordinator = ProcessCoordinator::new(control)
            .poll_interval(config.poll_interval())
            .stop_timeout(config.stop_timeout());
        let watermark = WatermarkStore::new(config.state_path());

        Self {
            config,
            oracle,
            fetcher,
            coordinator,
            watermark,
            force: false,
        }
    }

    /// Apply the archive even when the published release is not newer.
    pub const fn force(mut self, force: bool) -> Self {
        self.force = force;
        self
    }

    /// Override the config's `restart` setting.
    pub const fn restart(mut self, restart: bool) -> Self {
        self.config.restart = restart;
        self
    }

    pub const fn config(&self) -> &PatchConfig {
        &self.config
    }

    pub const fn watermark(&self) -> &WatermarkStore {
        &self.watermark
    }

    /// Ask the oracle without downloading anything.
    pub async fn check(&self) -> Result<UpdateCheck> {
        let stored = self.watermark.load().await;
        self.oracle.check(stored).await
    }

    pub async fn run(&self) -> Result<RunOutcome> {
        let check = self.check().await?;
        if !check.needs_update && !self.force {
            debug!("Already up to date (release {})", check.remote.published_at);
            return Ok(RunOutcome::UpToDate {
                stored: check.stored,
                remote: check.remote,
            });
        }
        if !check.needs_update {
            info!("Forcing sync of release {}", check.remote.published_at);
        }

        let source = self.fetcher.fetch(&check.remote.archive_url).await?;

        let process_name = self.config.process_name();
        let quiesced = self.coordinator.quiesce(process_name).await?;

        let extractor = IncrementalExtractor::new(&self.config.install_dir);
        let report = extractor.apply_blocking(source).await?;

        debug!("Wrote {} file(s), skipped {}", report.written, report.skipped);

        self.watermark.advance(check.stored, check.remote.published_at).await?;

        let restarted = if self.config.restart {
            self.coordinator.resume(quiesced, &self.config.executable_path()).await?
        } else {
            debug!("Restart disabled; leaving {} stopped", process_name);
            false
        };

        Ok(RunOutcome::Synced {
            report,
            remote: check.remote,
            restarted,
        })
    }
}
