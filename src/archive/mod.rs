//! Release archives: fetching them and merging them into an installation.
//!
//! # Components
//!
//! - [`ArchiveSource`] - random-access bytes of a zip archive. The zip central
//!   directory sits at the end of the file, so the whole payload must be
//!   addressable before extraction can start.
//! - [`ArchiveFetcher`] / [`HttpFetcher`] - downloads an archive into an
//!   [`ArchiveSource`], spooling to a temporary file above a size threshold.
//! - [`IncrementalExtractor`] - writes only the entries that are newer than the
//!   files already installed.

mod extract;
mod fetch;

pub use extract::{ApplyReport, ExtractFailure, FileTransition, IncrementalExtractor};
pub use fetch::{ArchiveFetcher, HttpFetcher};

use anyhow::{Context, Result};
use std::fs::File;
use std::io::{self, Cursor, Read, Seek, SeekFrom};
use std::path::Path;

/// A complete archive payload that can be read in any order.
#[derive(Debug)]
pub enum ArchiveSource {
    /// Held in memory.
    Memory(Cursor<Vec<u8>>),
    /// Backed by a file: either a spooled download or a local archive.
    File(File),
}

impl ArchiveSource {
    pub fn from_bytes(bytes: Vec<u8>) -> Self {
        Self::Memory(Cursor::new(bytes))
    }

    /// Use an archive that already exists on disk.
    pub fn open(path: &Path) -> Result<Self> {
        let file = File::open(path)
            .with_context(|| format!("Failed to open archive {}", path.display()))?;
        Ok(Self::File(file))
    }

    /// Whether the payload lives on disk rather than in memory.
    pub const fn is_spooled(&self) -> bool {
        matches!(self, Self::File(_))
    }
}

impl Read for ArchiveSource {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        match self {
            Self::Memory(cursor) => cursor.read(buf),
            Self::File(file) => file.read(buf),
        }
    }
}

impl Seek for ArchiveSource {
    fn seek(&mut self, pos: SeekFrom) -> io::Result<u64> {
        match self {
            Self::Memory(cursor) => cursor.seek(pos),
            Self::File(file) => file.seek(pos),
        }
    }
}
