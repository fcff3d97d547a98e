//! The `patchsync` binary.

use anyhow::Result;
use predicates::prelude::*;
use patchsync::test_utils::{ZipFixture, listing_page};

use crate::common::TestProject;

#[test]
fn test_status_before_first_sync() -> Result<()> {
    let project = TestProject::new()?;
    project.write_config("https://patches.example.org/")?;

    project
        .command()
        .arg("status")
        .assert()
        .success()
        .stdout(predicate::str::contains("Last applied:      never"));
    Ok(())
}

#[test]
fn test_missing_config_is_reported() -> Result<()> {
    let project = TestProject::new()?;

    project
        .command()
        .arg("status")
        .assert()
        .failure()
        .stderr(predicate::str::contains("Configuration file not found"));
    Ok(())
}

#[test]
fn test_apply_local_archive_twice() -> Result<()> {
    let project = TestProject::new()?;
    let archive = project.path().join("App_Patch.zip");
    ZipFixture::new()
        .file("App.exe", b"v2", "2024-06-01 10:00")
        .file("lib/core.dll", b"core", "2024-06-01 10:00")
        .write_to(&archive);

    project
        .command()
        .arg("apply")
        .arg(&archive)
        .arg("--install-dir")
        .arg(project.install_dir())
        .assert()
        .success()
        .stdout(predicate::str::contains("Updated or added 2 file(s)"));

    project
        .command()
        .arg("apply")
        .arg(&archive)
        .arg("--install-dir")
        .arg(project.install_dir())
        .assert()
        .success()
        .stdout(predicate::str::contains("All files are up to date."));

    assert_eq!(project.read_installed("lib/core.dll")?, b"core");
    Ok(())
}

#[test]
fn test_apply_reports_each_file_once() -> Result<()> {
    let project = TestProject::new()?;
    let archive = project.path().join("App_Patch.zip");
    ZipFixture::new().file("App.exe", b"v2", "2024-06-01 10:00").write_to(&archive);

    project
        .command()
        .arg("apply")
        .arg(&archive)
        .arg("--install-dir")
        .arg(project.install_dir())
        .assert()
        .success()
        .stdout(predicate::str::contains(
            "1970-01-01 00:00:00 UTC -> 2024-06-01 10:00:00 UTC: App.exe",
        ))
        .stderr(predicate::str::contains("App.exe").not());
    Ok(())
}

#[test]
fn test_apply_rejects_escaping_entry() -> Result<()> {
    let project = TestProject::new()?;
    let archive = project.path().join("evil.zip");
    ZipFixture::new().file("../evil.txt", b"evil", "2024-06-01 10:00").write_to(&archive);

    project
        .command()
        .arg("apply")
        .arg(&archive)
        .arg("--install-dir")
        .arg(project.install_dir())
        .assert()
        .failure()
        .stderr(predicate::str::contains("escapes the install directory"));

    assert!(!project.path().join("evil.txt").exists());
    Ok(())
}

#[test]
fn test_check_reports_available_update() -> Result<()> {
    let project = TestProject::new()?;
    let mut server = mockito::Server::new();
    let _page = server
        .mock("GET", "/patches/")
        .with_body(listing_page("App_Patch.zip", "2024-06-01 10:00"))
        .create();
    project.write_config(&format!("{}/patches/", server.url()))?;

    project
        .command()
        .arg("check")
        .assert()
        .success()
        .stdout(predicate::str::contains("Update available"))
        .stdout(predicate::str::contains("App_Patch.zip"));
    Ok(())
}
