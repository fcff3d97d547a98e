use anyhow::{Context, Result};
use indicatif::{ProgressBar, ProgressStyle};
use std::fs::File;
use std::io::{Cursor, Seek, SeekFrom, Write};
use tracing::{debug, info};

use crate::archive::ArchiveSource;
use crate::constants::DEFAULT_SPOOL_THRESHOLD;
use crate::core::PatchError;
use crate::utils::http::build_client;

/// Retrieves a release archive.
#[allow(async_fn_in_trait)]
pub trait ArchiveFetcher {
    /// Download `url` completely and return it as a random-access source.
    async fn fetch(&self, url: &str) -> Result<ArchiveSource>;
}

/// Downloads archives over HTTP.
///
/// The body is buffered in full: in memory while it stays below
/// `spool_threshold` bytes, otherwise in an anonymous temporary file that is
/// removed when the [`ArchiveSource`] is dropped. Partial downloads are never
/// resumed; a failed transfer fails the run.
#[derive(Debug, Clone)]
pub struct HttpFetcher {
    client: reqwest::Client,
    spool_threshold: u64,
    show_progress: bool,
}

impl HttpFetcher {
    pub fn new() -> Result<Self> {
        Ok(Self::with_client(build_client()?))
    }

    pub const fn with_client(client: reqwest::Client) -> Self {
        Self {
            client,
            spool_threshold: DEFAULT_SPOOL_THRESHOLD,
            show_progress: false,
        }
    }

    pub const fn spool_threshold(mut self, bytes: u64) -> Self {
        self.spool_threshold = bytes;
        self
    }

    /// Draw a progress bar on stderr while downloading.
    pub const fn show_progress(mut self, show: bool) -> Self {
        self.show_progress = show;
        self
    }

    fn progress_bar(&self, total: Option<u64>) -> ProgressBar {
        if !self.show_progress {
            return ProgressBar::hidden();
        }
        let bar = match total {
            Some(len) => ProgressBar::new(len),
            None => ProgressBar::new_spinner(),
        };
        if let Ok(style) = ProgressStyle::with_template(
            "{spinner} {bytes}/{total_bytes} [{wide_bar}] {bytes_per_sec}",
        ) {
            bar.set_style(style);
        }
        bar
    }
}

impl ArchiveFetcher for HttpFetcher {
    async fn fetch(&self, url: &str) -> Result<ArchiveSource> {
        info!("Downloading {}", url);

        let mut response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| PatchError::network("archive download", e))?
            .error_for_status()
            .map_err(|e| PatchError::network("archive download", e))?;

        let total = response.content_length();
        let progress = self.progress_bar(total);
        let mut spool = Spool::new(self.spool_threshold, total)?;

        while let Some(chunk) =
            response.chunk().await.map_err(|e| PatchError::network("archive download", e))?
        {
            spool.write(&chunk)?;
            progress.inc(chunk.len() as u64);
        }
        progress.finish_and_clear();

        debug!("Downloaded {} bytes", spool.len);
        spool.finish()
    }
}

/// Accumulates a download, moving to disk once it grows past the threshold.
struct Spool {
    threshold: u64,
    len: u64,
    memory: Vec<u8>,
    file: Option<File>,
}

impl Spool {
    fn new(threshold: u64, expected: Option<u64>) -> Result<Self> {
        let mut spool = Self {
            threshold,
            len: 0,
            memory: Vec::new(),
            file: None,
        };
        match expected {
            Some(len) if len > threshold => spool.spill()?,
            Some(len) => spool.memory.reserve(usize::try_from(len).unwrap_or(0)),
            None => {}
        }
        Ok(spool)
    }

    fn spill(&mut self) -> Result<()> {
        let mut file = tempfile::tempfile().context("Failed to create temporary archive file")?;
        file.write_all(&self.memory).context("Failed to spool archive to disk")?;
        self.memory = Vec::new();
        self.file = Some(file);
        debug!("Spooling archive to a temporary file");
        Ok(())
    }

    fn write(&mut self, bytes: &[u8]) -> Result<()> {
        self.len += bytes.len() as u64;
        if self.file.is_none() && self.len > self.threshold {
            self.spill()?;
        }
        match &mut self.file {
            Some(file) => file.write_all(bytes).context("Failed to spool archive to disk"),
            None => {
                self.memory.extend_from_slice(bytes);
                Ok(())
            }
        }
    }

    fn finish(self) -> Result<ArchiveSource> {
        match self.file {
            Some(mut file) => {
                file.flush().context("Failed to flush spooled archive")?;
                file.seek(SeekFrom::Start(0)).context("Failed to rewind spooled archive")?;
                Ok(ArchiveSource::File(file))
            }
            None => Ok(ArchiveSource::Memory(Cursor::new(self.memory))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Read;

    fn drain(mut source: ArchiveSource) -> Vec<u8> {
        let mut out = Vec::new();
        source.read_to_end(&mut out).unwrap();
        out
    }

    #[test]
    fn test_spool_stays_in_memory_below_threshold() {
        let mut spool = Spool::new(16, Some(8)).unwrap();
        spool.write(b"abcd").unwrap();
        spool.write(b"efgh").unwrap();
        let source = spool.finish().unwrap();
        assert!(!source.is_spooled());
        assert_eq!(drain(source), b"abcdefgh");
    }

    #[test]
    fn test_spool_moves_to_disk_when_growing() {
        let mut spool = Spool::new(6, None).unwrap();
        spool.write(b"abcd").unwrap();
        spool.write(b"efgh").unwrap();
        let source = spool.finish().unwrap();
        assert!(source.is_spooled());
        assert_eq!(drain(source), b"abcdefgh");
    }

    #[test]
    fn test_spool_uses_disk_for_large_content_length() {
        let mut spool = Spool::new(4, Some(100)).unwrap();
        spool.write(b"xy").unwrap();
        let source = spool.finish().unwrap();
        assert!(source.is_spooled());
        assert_eq!(drain(source), b"xy");
    }

    #[tokio::test]
    async fn test_fetch_non_success_is_network_error() {
        let mut server = mockito::Server::new_async().await;
        let mock = server.mock("GET", "/patch.zip").with_status(404).create_async().await;

        let fetcher = HttpFetcher::new().unwrap();
        let err = fetcher.fetch(&format!("{}/patch.zip", server.url())).await.unwrap_err();
        assert!(matches!(err.downcast_ref::<PatchError>(), Some(PatchError::Network { .. })));
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_fetch_buffers_body() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("GET", "/patch.zip")
            .with_status(200)
            .with_body(b"PK-not-really-a-zip".as_slice())
            .create_async()
            .await;

        let fetcher = HttpFetcher::new().unwrap().spool_threshold(4);
        let source = fetcher.fetch(&format!("{}/patch.zip", server.url())).await.unwrap();
        assert!(source.is_spooled());
        assert_eq!(drain(source), b"PK-not-really-a-zip");
    }
}
