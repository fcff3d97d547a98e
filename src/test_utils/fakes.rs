//! In-memory stand-ins for the network and the process table.

use anyhow::Result;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use crate::archive::{ArchiveFetcher, ArchiveSource};
use crate::core::{PatchError, Timestamp};
use crate::process::ProcessControl;
use crate::release::ReleaseSource;

/// A release source that always reports the same publication time.
#[derive(Debug, Clone, Copy)]
pub struct FixedRelease(pub Timestamp);

impl FixedRelease {
    pub fn at(listing: &str) -> Self {
        Self(Timestamp::parse_listing(listing).expect("fixture time must be YYYY-MM-DD HH:MM"))
    }
}

impl ReleaseSource for FixedRelease {
    async fn published_at(&self, _page_url: &str, _archive_name: &str) -> Result<Timestamp> {
        Ok(self.0)
    }
}

/// Serves the same archive bytes for every URL and records the requests.
#[derive(Debug, Clone)]
pub struct MemoryFetcher {
    archive: Vec<u8>,
    requests: Arc<Mutex<Vec<String>>>,
}

impl MemoryFetcher {
    pub fn new(archive: Vec<u8>) -> Self {
        Self {
            archive,
            requests: Arc::default(),
        }
    }

    pub fn requests(&self) -> Vec<String> {
        self.requests.lock().expect("fetcher state poisoned").clone()
    }
}

impl ArchiveFetcher for MemoryFetcher {
    async fn fetch(&self, url: &str) -> Result<ArchiveSource> {
        self.requests.lock().expect("fetcher state poisoned").push(url.to_string());
        Ok(ArchiveSource::from_bytes(self.archive.clone()))
    }
}

#[derive(Debug, Default)]
struct ProcessState {
    alive: bool,
    terminated: bool,
    /// Polls after termination before the process disappears; `None` never does.
    exit_after: Option<usize>,
    fail_query: bool,
    query_calls: usize,
    terminate_calls: usize,
    launched: Vec<PathBuf>,
}

/// A scripted single-process table. Clones share state.
#[derive(Debug, Clone, Default)]
pub struct FakeProcesses {
    state: Arc<Mutex<ProcessState>>,
}

impl FakeProcesses {
    fn with_state(state: ProcessState) -> Self {
        Self {
            state: Arc::new(Mutex::new(state)),
        }
    }

    /// Nothing is running.
    pub fn stopped() -> Self {
        Self::default()
    }

    /// Running; still reported alive for `polls` queries after termination.
    pub fn running_for_polls(polls: usize) -> Self {
        Self::with_state(ProcessState {
            alive: true,
            exit_after: Some(polls),
            ..ProcessState::default()
        })
    }

    /// Running and ignores termination requests.
    pub fn never_exits() -> Self {
        Self::with_state(ProcessState {
            alive: true,
            exit_after: None,
            ..ProcessState::default()
        })
    }

    /// Every query fails.
    pub fn failing_query() -> Self {
        Self::with_state(ProcessState {
            fail_query: true,
            ..ProcessState::default()
        })
    }

    fn state(&self) -> std::sync::MutexGuard<'_, ProcessState> {
        self.state.lock().expect("process state poisoned")
    }

    pub fn is_alive(&self) -> bool {
        self.state().alive
    }

    pub fn query_calls(&self) -> usize {
        self.state().query_calls
    }

    pub fn terminate_calls(&self) -> usize {
        self.state().terminate_calls
    }

    pub fn launched(&self) -> Vec<PathBuf> {
        self.state().launched.clone()
    }
}

impl ProcessControl for FakeProcesses {
    async fn is_running(&self, names: &[&str]) -> Result<bool> {
        let mut guard = self.state();
        let state = &mut *guard;
        state.query_calls += 1;
        if state.fail_query {
            return Err(PatchError::Process {
                operation: "query".to_string(),
                name: names.join(","),
                reason: "process table unavailable".to_string(),
            }
            .into());
        }

        if state.alive && state.terminated {
            match &mut state.exit_after {
                Some(0) => state.alive = false,
                Some(remaining) => *remaining -= 1,
                None => {}
            }
        }
        Ok(state.alive)
    }

    async fn terminate(&self, _name: &str) -> Result<()> {
        let mut state = self.state();
        state.terminate_calls += 1;
        state.terminated = true;
        Ok(())
    }

    async fn launch(&self, executable: &Path) -> Result<()> {
        let mut state = self.state();
        state.launched.push(executable.to_path_buf());
        state.alive = true;
        state.terminated = false;
        Ok(())
    }
}
