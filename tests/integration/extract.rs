//! Extraction against real directory trees.

use anyhow::Result;
use patchsync::archive::{ArchiveSource, IncrementalExtractor};
use patchsync::core::{PatchError, Timestamp};
use patchsync::test_utils::ZipFixture;
use std::path::Path;
use tempfile::TempDir;
use walkdir::WalkDir;

fn files_under(root: &Path) -> Vec<String> {
    let mut files: Vec<String> = WalkDir::new(root)
        .into_iter()
        .filter_map(Result::ok)
        .filter(|e| e.file_type().is_file())
        .map(|e| e.path().strip_prefix(root).unwrap().to_string_lossy().replace('\\', "/"))
        .collect();
    files.sort();
    files
}

#[test]
fn test_zip_slip_never_writes_outside_root() -> Result<()> {
    let temp = TempDir::new()?;
    let install = temp.path().join("install");
    std::fs::create_dir_all(temp.path().join("outside"))?;

    let archive = ZipFixture::new()
        .file("good.txt", b"ok", "2024-06-01 10:00")
        .file("../outside/evil.dll", b"evil", "2024-06-01 10:00")
        .file("later.txt", b"never", "2024-06-01 10:00")
        .build();

    let failure = IncrementalExtractor::new(&install)
        .apply(ArchiveSource::from_bytes(archive))
        .unwrap_err();
    assert_eq!(failure.written, 1);
    assert!(matches!(failure.error, PatchError::PathEscape { .. }));

    assert_eq!(files_under(temp.path()), vec!["install/good.txt".to_string()]);
    Ok(())
}

#[test]
fn test_absolute_entry_is_rejected() -> Result<()> {
    let temp = TempDir::new()?;
    let archive = ZipFixture::new().file("/etc/evil.conf", b"evil", "2024-06-01 10:00").build();

    let failure = IncrementalExtractor::new(temp.path())
        .apply(ArchiveSource::from_bytes(archive))
        .unwrap_err();
    assert_eq!(failure.written, 0);
    assert!(matches!(failure.error, PatchError::PathEscape { .. }));
    assert!(files_under(temp.path()).is_empty());
    Ok(())
}

#[test]
fn test_archive_on_disk_is_applied_incrementally() -> Result<()> {
    let temp = TempDir::new()?;
    let install = temp.path().join("install");
    let archive_path = temp.path().join("App_Patch.zip");

    ZipFixture::new()
        .dir("data/")
        .file("App.exe", b"v1", "2024-03-01 12:00")
        .file("data/table.bin", b"t1", "2024-03-01 12:00")
        .write_to(&archive_path);

    let extractor = IncrementalExtractor::new(&install);
    let first = extractor.apply(ArchiveSource::open(&archive_path)?)?;
    assert_eq!(first.written, 2);

    // Local edit that is newer than the archive copy survives.
    std::fs::write(install.join("data/table.bin"), b"local")?;

    ZipFixture::new()
        .dir("data/")
        .file("App.exe", b"v2", "2024-04-01 12:00")
        .file("data/table.bin", b"t1", "2024-03-01 12:00")
        .write_to(&archive_path);

    let second = extractor.apply(ArchiveSource::open(&archive_path)?)?;
    assert_eq!(second.written, 1);
    assert_eq!(second.transitions[0].previous, Timestamp::parse_listing("2024-03-01 12:00")?);
    assert_eq!(std::fs::read(install.join("App.exe"))?, b"v2");
    assert_eq!(std::fs::read(install.join("data/table.bin"))?, b"local");

    assert_eq!(
        files_under(&install),
        vec!["App.exe".to_string(), "data/table.bin".to_string()]
    );
    Ok(())
}

#[test]
fn test_extended_timestamps_drive_incremental_updates() -> Result<()> {
    let temp = TempDir::new()?;
    let install = temp.path().join("install");
    let extractor = IncrementalExtractor::new(&install);

    // Zipped on a machine nine hours ahead of UTC.
    let first = ZipFixture::new()
        .file_with_utc("App.exe", b"v1", "2024-06-01 19:00", "2024-06-01 10:00")
        .build();
    extractor.apply(ArchiveSource::from_bytes(first))?;
    let installed = std::fs::metadata(install.join("App.exe"))?.modified()?;
    assert_eq!(Timestamp::from_system_time(installed), Timestamp::parse_listing("2024-06-01 10:00")?);

    // Later DOS time, earlier real instant: left alone.
    let stale = ZipFixture::new()
        .file_with_utc("App.exe", b"stale", "2024-06-01 21:00", "2024-06-01 09:00")
        .build();
    assert_eq!(extractor.apply(ArchiveSource::from_bytes(stale))?.written, 0);
    assert_eq!(std::fs::read(install.join("App.exe"))?, b"v1");

    let newer = ZipFixture::new()
        .file_with_utc("App.exe", b"v2", "2024-06-01 20:00", "2024-06-01 11:00")
        .build();
    assert_eq!(extractor.apply(ArchiveSource::from_bytes(newer))?.written, 1);
    assert_eq!(std::fs::read(install.join("App.exe"))?, b"v2");
    Ok(())
}
