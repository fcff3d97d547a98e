use anyhow::Context;
use filetime::FileTime;
use std::fs::{self, OpenOptions};
use std::io::{self, Read, Seek};
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, warn};
use zip::ExtraField;
use zip::ZipArchive;
use zip::read::ZipFile;

use crate::archive::ArchiveSource;
use crate::core::{PatchError, Timestamp};
use crate::utils::path_validation::{canonical_root, contained_path, create_dir_within};

/// One file that was replaced or added.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileTransition {
    /// Entry name inside the archive.
    pub name: String,
    /// Modification time before the write, [`Timestamp::EPOCH`] for new files.
    pub previous: Timestamp,
    /// Modification time after the write, equal to the entry's timestamp.
    pub current: Timestamp,
}

/// Result of a successful [`IncrementalExtractor::apply`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ApplyReport {
    /// Files written. Zero means the installation was already current.
    pub written: usize,
    /// Entries left alone because the installed copy was at least as new.
    pub skipped: usize,
    pub transitions: Vec<FileTransition>,
}

/// Extraction stopped at the first error.
///
/// Files written before the error stay in place; the next run compares them
/// again and carries on from there.
#[derive(Debug, Error)]
#[error("Extraction aborted after writing {written} file(s): {error}")]
pub struct ExtractFailure {
    /// Files written before the failure.
    pub written: usize,
    #[source]
    pub error: PatchError,
}

/// Merges a release archive into an installation directory.
///
/// An entry overwrites the installed file only when the entry's modification
/// time is strictly later than the file's. Written files get the entry's
/// timestamp as both access and modification time, so applying the same
/// archive again writes nothing.
///
/// The entry time is taken from the extended-timestamp extra field (`UT`)
/// when the archiver wrote one, and from the MS-DOS date/time otherwise.
///
/// ```rust,no_run
/// use patchsync::archive::{ArchiveSource, IncrementalExtractor};
/// use std::path::Path;
///
/// # fn example() -> anyhow::Result<()> {
/// let source = ArchiveSource::open(Path::new("App_Patch.zip"))?;
/// let report = IncrementalExtractor::new("/opt/app").apply(source)?;
/// println!("{} file(s) updated", report.written);
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone)]
pub struct IncrementalExtractor {
    install_root: PathBuf,
}

impl IncrementalExtractor {
    pub fn new(install_root: impl Into<PathBuf>) -> Self {
        Self {
            install_root: install_root.into(),
        }
    }

    /// Walk every entry of `source` and write the ones that are newer.
    pub fn apply<R: Read + Seek>(&self, source: R) -> Result<ApplyReport, ExtractFailure> {
        let mut report = ApplyReport::default();
        match self.apply_entries(source, &mut report) {
            Ok(()) => Ok(report),
            Err(error) => Err(ExtractFailure {
                written: report.written,
                error,
            }),
        }
    }

    /// Run [`apply`](Self::apply) on the blocking thread pool.
    ///
    /// The underlying [`PatchError`] stays downcastable; the partial count is
    /// attached as context.
    pub async fn apply_blocking(self, source: ArchiveSource) -> anyhow::Result<ApplyReport> {
        tokio::task::spawn_blocking(move || self.apply(source))
            .await
            .context("Extraction task panicked")?
            .map_err(|failure| {
                let written = failure.written;
                anyhow::Error::from(failure.error)
                    .context(format!("Extraction aborted after writing {written} file(s)"))
            })
    }

    fn apply_entries<R: Read + Seek>(
        &self,
        source: R,
        report: &mut ApplyReport,
    ) -> Result<(), PatchError> {
        let root = canonical_root(&self.install_root).map_err(|e| PatchError::FileSystem {
            operation: "prepare install directory".to_string(),
            path: self.install_root.display().to_string(),
            reason: format!("{e:#}"),
        })?;

        let mut archive = ZipArchive::new(source).map_err(archive_error)?;
        debug!("Archive has {} entries", archive.len());

        for index in 0..archive.len() {
            let mut entry = archive.by_index(index).map_err(archive_error)?;
            let name = entry.name().to_string();
            let dest = contained_path(&root, &name)?;

            if entry.is_dir() {
                prepare_directory(&dest, &root, &name)?;
                continue;
            }

            let modified = match entry_modified(&entry) {
                Some(ts) => ts,
                None => {
                    warn!("{} has no valid modification time, treating it as {}", name, Timestamp::EPOCH);
                    Timestamp::EPOCH
                }
            };

            // `dest` is strictly below `root`, so it always has a parent.
            if let Some(parent) = dest.parent() {
                prepare_directory(parent, &root, &name)?;
            }

            let previous = installed_timestamp(&dest)?;
            if modified <= previous {
                debug!("Up to date: {} ({} >= {})", name, previous, modified);
                report.skipped += 1;
                continue;
            }

            let mode = entry_mode(entry.unix_mode());
            write_entry(&mut entry, &dest, mode, modified)?;

            debug!("{} -> {}: {}", previous, modified, name);
            report.written += 1;
            report.transitions.push(FileTransition {
                name,
                previous,
                current: modified,
            });
        }

        Ok(())
    }
}

/// Modification time of an entry, preferring the extended-timestamp field.
fn entry_modified<R: Read>(entry: &ZipFile<'_, R>) -> Option<Timestamp> {
    let extended = entry.extra_data_fields().find_map(|field| match field {
        ExtraField::ExtendedTimestamp(ts) => ts.mod_time(),
        _ => None,
    });
    match extended {
        Some(secs) => Timestamp::from_unix(i64::from(secs)),
        None => entry.last_modified().and_then(Timestamp::from_zip),
    }
}

/// Create `dir` under `root`, refusing anything that resolves outside it.
fn prepare_directory(dir: &Path, root: &Path, entry: &str) -> Result<(), PatchError> {
    let inside = create_dir_within(dir, root).map_err(|e| PatchError::FileSystem {
        operation: "create directory".to_string(),
        path: dir.display().to_string(),
        reason: format!("{e:#}"),
    })?;
    if inside {
        Ok(())
    } else {
        Err(PatchError::PathEscape {
            entry: entry.to_string(),
            root: root.display().to_string(),
        })
    }
}

/// Current modification time of `dest`, or [`Timestamp::EPOCH`] if it does not
/// exist yet.
fn installed_timestamp(dest: &Path) -> Result<Timestamp, PatchError> {
    match fs::metadata(dest) {
        Ok(meta) => {
            let modified = meta.modified().map_err(|e| PatchError::fs("stat", dest, &e))?;
            Ok(Timestamp::from_system_time(modified))
        }
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(Timestamp::EPOCH),
        Err(e) => Err(PatchError::fs("stat", dest, &e)),
    }
}

/// Permission bits from the entry, without the file type bits.
fn entry_mode(unix_mode: Option<u32>) -> Option<u32> {
    unix_mode.map(|mode| mode & 0o7777).filter(|mode| *mode != 0)
}

/// Truncate-and-write `dest`, then stamp it with `modified`.
///
/// The mode only applies when the file is created, like `open(2)`.
fn write_entry<R: Read>(
    entry: &mut R,
    dest: &Path,
    mode: Option<u32>,
    modified: Timestamp,
) -> Result<(), PatchError> {
    let mut options = OpenOptions::new();
    options.write(true).create(true).truncate(true);
    #[cfg(unix)]
    {
        use std::os::unix::fs::OpenOptionsExt;
        if let Some(mode) = mode {
            options.mode(mode);
        }
    }
    #[cfg(not(unix))]
    let _ = mode;

    let mut file = options.open(dest).map_err(|e| PatchError::fs("open", dest, &e))?;
    io::copy(entry, &mut file).map_err(|e| PatchError::fs("write", dest, &e))?;
    file.sync_all().map_err(|e| PatchError::fs("flush", dest, &e))?;
    drop(file);

    let stamp = FileTime::from_system_time(modified.to_system_time());
    filetime::set_file_times(dest, stamp, stamp)
        .map_err(|e| PatchError::fs("set modification time", dest, &e))
}

fn archive_error(err: zip::result::ZipError) -> PatchError {
    PatchError::Archive {
        reason: err.to_string(),
    }
}
