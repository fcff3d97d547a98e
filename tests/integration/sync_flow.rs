//! Full sync runs against a mock patch server.

use anyhow::Result;
use patchsync::archive::HttpFetcher;
use patchsync::config::PatchConfig;
use patchsync::core::{PatchError, Timestamp};
use patchsync::release::PatchPage;
use patchsync::test_utils::{FakeProcesses, ZipFixture, init_test_logging, listing_page};
use patchsync::updater::{RunOutcome, Updater};

use crate::common::TestProject;

fn config_for(project: &TestProject, server: &mockito::ServerGuard) -> PatchConfig {
    let mut config = PatchConfig::new(
        format!("{}/patches/", server.url()),
        "App_Patch.zip",
        project.install_dir(),
        "App.exe",
    );
    config.state_file = Some(project.state_path());
    config.poll_interval_ms = 1;
    config
}

fn updater(
    config: PatchConfig,
    processes: &FakeProcesses,
) -> Result<Updater<PatchPage, HttpFetcher, FakeProcesses>> {
    Ok(Updater::with_parts(config, PatchPage::new()?, HttpFetcher::new()?, processes.clone()))
}

#[tokio::test]
async fn test_sync_downloads_once_then_stays_current() -> Result<()> {
    init_test_logging(None);
    let project = TestProject::new()?;
    let mut server = mockito::Server::new_async().await;

    let page = server
        .mock("GET", "/patches/")
        .with_body(listing_page("App_Patch.zip", "2024-06-01 10:00"))
        .expect(2)
        .create_async()
        .await;
    let archive = server
        .mock("GET", "/patches/App_Patch.zip")
        .with_body(
            ZipFixture::new()
                .dir("Plugins/")
                .file("App.exe", b"build 2", "2024-05-31 22:00")
                .file("Plugins/skin.dll", b"skin", "2024-05-31 22:00")
                .build(),
        )
        .expect(1)
        .create_async()
        .await;

    let processes = FakeProcesses::stopped();
    let first = updater(config_for(&project, &server), &processes)?.run().await?;
    assert_eq!(first.written(), 2);
    assert_eq!(project.read_installed("App.exe")?, b"build 2");

    let second = updater(config_for(&project, &server), &processes)?.run().await?;
    assert!(matches!(second, RunOutcome::UpToDate { .. }));

    page.assert_async().await;
    archive.assert_async().await;
    Ok(())
}

#[tokio::test]
async fn test_new_release_rewrites_only_newer_files() -> Result<()> {
    let project = TestProject::new()?;
    let mut server = mockito::Server::new_async().await;
    let processes = FakeProcesses::running_for_polls(1);

    let _page = server
        .mock("GET", "/patches/")
        .with_body(listing_page("App_Patch.zip", "2024-06-01 10:00"))
        .create_async()
        .await;
    let _archive = server
        .mock("GET", "/patches/App_Patch.zip")
        .with_body(
            ZipFixture::new()
                .file("App.exe", b"build 2", "2024-05-31 22:00")
                .file("readme.txt", b"notes", "2024-01-01 00:00")
                .build(),
        )
        .create_async()
        .await;
    updater(config_for(&project, &server), &processes)?.run().await?;

    server.reset_async().await;
    let _page = server
        .mock("GET", "/patches/")
        .with_body(listing_page("App_Patch.zip", "2024-07-01 09:30"))
        .create_async()
        .await;
    let _archive = server
        .mock("GET", "/patches/App_Patch.zip")
        .with_body(
            ZipFixture::new()
                .file("App.exe", b"build 3", "2024-06-30 18:00")
                .file("readme.txt", b"notes", "2024-01-01 00:00")
                .build(),
        )
        .create_async()
        .await;

    let outcome = updater(config_for(&project, &server), &processes)?.run().await?;
    match outcome {
        RunOutcome::Synced {
            report,
            ..
        } => {
            assert_eq!(report.written, 1);
            assert_eq!(report.skipped, 1);
            assert_eq!(report.transitions[0].name, "App.exe");
        }
        other => panic!("expected a sync, got {other:?}"),
    }
    assert_eq!(project.read_installed("App.exe")?, b"build 3");
    assert_eq!(processes.terminate_calls(), 2);
    assert_eq!(processes.launched().len(), 2);

    let stored = patchsync::watermark::WatermarkStore::new(project.state_path()).load().await;
    assert_eq!(stored, Timestamp::parse_listing("2024-07-01 09:30")?);
    Ok(())
}

#[tokio::test]
async fn test_unlisted_archive_fails_without_download() -> Result<()> {
    let project = TestProject::new()?;
    let mut server = mockito::Server::new_async().await;
    let _page = server
        .mock("GET", "/patches/")
        .with_body(listing_page("Other_Patch.zip", "2024-06-01 10:00"))
        .create_async()
        .await;
    let archive = server.mock("GET", "/patches/App_Patch.zip").expect(0).create_async().await;

    let err = updater(config_for(&project, &server), &FakeProcesses::stopped())?
        .run()
        .await
        .unwrap_err();
    assert!(matches!(err.downcast_ref::<PatchError>(), Some(PatchError::ReleaseNotListed { .. })));
    archive.assert_async().await;
    assert!(!project.state_path().exists());
    Ok(())
}

#[tokio::test]
async fn test_failed_download_leaves_application_alone() -> Result<()> {
    let project = TestProject::new()?;
    let mut server = mockito::Server::new_async().await;
    let _page = server
        .mock("GET", "/patches/")
        .with_body(listing_page("App_Patch.zip", "2024-06-01 10:00"))
        .create_async()
        .await;
    let _archive = server.mock("GET", "/patches/App_Patch.zip").with_status(503).create_async().await;

    let processes = FakeProcesses::running_for_polls(1);
    let err = updater(config_for(&project, &server), &processes)?.run().await.unwrap_err();
    assert!(matches!(err.downcast_ref::<PatchError>(), Some(PatchError::Network { .. })));
    assert_eq!(processes.terminate_calls(), 0);
    assert!(processes.is_alive());
    Ok(())
}

#[tokio::test]
async fn test_malformed_listing_time_is_fatal() -> Result<()> {
    let project = TestProject::new()?;
    let mut server = mockito::Server::new_async().await;
    let _page = server
        .mock("GET", "/patches/")
        .with_body(listing_page("App_Patch.zip", "01-Jun-2024 10:00"))
        .create_async()
        .await;

    let err = updater(config_for(&project, &server), &FakeProcesses::stopped())?
        .run()
        .await
        .unwrap_err();
    assert!(matches!(err.downcast_ref::<PatchError>(), Some(PatchError::TimestampParse { .. })));
    Ok(())
}
