//! Stopping and restarting the managed application around a sync.
//!
//! Files that belong to a running application may be locked or mapped, so the
//! application is stopped before the install directory is touched. It is
//! relaunched afterwards only if it was running to begin with.
//!
//! The platform mechanics sit behind [`ProcessControl`]; [`SystemProcesses`]
//! is the real implementation.

mod system;

pub use system::SystemProcesses;

use anyhow::{Context, Result};
use std::path::Path;
use std::time::Duration;
use tokio::time::Instant;
use tracing::{debug, info};

use crate::constants::DEFAULT_POLL_INTERVAL_MS;
use crate::core::PatchError;

/// List, kill and start named executables.
#[allow(async_fn_in_trait)]
pub trait ProcessControl {
    /// Whether any process with one of `names` is running.
    async fn is_running(&self, names: &[&str]) -> Result<bool>;

    /// Ask every process called `name` to exit. Does not wait.
    async fn terminate(&self, name: &str) -> Result<()>;

    /// Start `executable` detached. Does not wait for it to initialize.
    async fn launch(&self, executable: &Path) -> Result<()>;
}

/// What [`ProcessCoordinator::quiesce`] found.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Quiesced {
    /// The application was running and has been stopped.
    pub was_running: bool,
}

impl Quiesced {
    pub const fn was_already_stopped(&self) -> bool {
        !self.was_running
    }
}

/// Pauses and resumes the managed application.
pub struct ProcessCoordinator<P> {
    control: P,
    poll_interval: Duration,
    stop_timeout: Option<Duration>,
}

impl<P: ProcessControl> ProcessCoordinator<P> {
    /// Poll once a second and wait indefinitely for the application to exit.
    pub const fn new(control: P) -> Self {
        Self {
            control,
            poll_interval: Duration::from_millis(DEFAULT_POLL_INTERVAL_MS),
            stop_timeout: None,
        }
    }

    pub const fn poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    /// Fail with [`PatchError::StopTimedOut`] instead of waiting forever.
    pub const fn stop_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.stop_timeout = timeout;
        self
    }

    /// Make sure `name` is not running, stopping it if necessary.
    pub async fn quiesce(&self, name: &str) -> Result<Quiesced> {
        if !self.control.is_running(&[name]).await? {
            debug!("{} is not running", name);
            return Ok(Quiesced {
                was_running: false,
            });
        }

        info!("Stopping {}", name);
        self.control.terminate(name).await?;

        let started = Instant::now();
        loop {
            tokio::time::sleep(self.poll_interval).await;

            if !self.control.is_running(&[name]).await? {
                info!("{} stopped after {:?}", name, started.elapsed());
                return Ok(Quiesced {
                    was_running: true,
                });
            }

            if let Some(limit) = self.stop_timeout
                && started.elapsed() >= limit
            {
                return Err(PatchError::StopTimedOut {
                    name: name.to_string(),
                    waited: started.elapsed(),
                }
                .into());
            }
            debug!("Still waiting for {} to exit", name);
        }
    }

    /// Relaunch `executable` if the application was running before the sync.
    ///
    /// Returns whether a launch happened.
    pub async fn resume(&self, quiesced: Quiesced, executable: &Path) -> Result<bool> {
        if quiesced.was_already_stopped() {
            debug!("Not starting {}: it was not running before", executable.display());
            return Ok(false);
        }

        info!("Starting {}", executable.display());
        self.control
            .launch(executable)
            .await
            .with_context(|| format!("Failed to restart {}", executable.display()))?;
        Ok(true)
    }
}
