//! End-to-end update of a fresh installation against a stub upstream.
//!
//! The desktop build is published behind a redirect to `releases/128.0.1/`,
//! the portable wrapper as release `v3.2.0` with a single `.7z` asset. After
//! one update both markers are written, the payload holds the `core` subtree
//! of the desktop archive, and the downloaded archives are gone.

#![cfg(unix)]

use portable_sync::core::{EventSink, FanOut, LogFile, RecordingSink, UpdateState};
use portable_sync::test_utils::{PORTABLE_ASSET_NAME, TestInstallation, Upstream, init_test_logging};
use portable_sync::update::{PayloadSwap, UpdateOrchestrator};
use std::fs;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

fn orchestrator(install: &TestInstallation) -> (UpdateOrchestrator, RecordingSink) {
    let recorder = RecordingSink::new();
    let sinks: Vec<Arc<dyn EventSink>> = vec![
        Arc::new(recorder.clone()),
        Arc::new(LogFile::new(install.config.log_path())),
    ];
    let orchestrator = UpdateOrchestrator::new(install.config.clone(), Arc::new(FanOut::new(sinks))).unwrap();
    (orchestrator, recorder)
}

#[tokio::test]
async fn test_fresh_installation_end_to_end() {
    init_test_logging(None);
    let install = TestInstallation::start(Upstream::default()).await;
    assert!(!install.payload_dir().exists());
    let (orchestrator, events) = orchestrator(&install);

    let report = orchestrator.check_staleness().await.unwrap();
    assert!(report.any_stale());

    orchestrator.run_update(&CancellationToken::new()).await.unwrap();

    assert_eq!(install.desktop_marker().as_deref(), Some("128.0.1"));
    assert_eq!(install.portable_marker().as_deref(), Some("v3.2.0"));

    let payload = install.payload_dir();
    assert_eq!(fs::read_to_string(payload.join("stormhen.exe")).unwrap(), "desktop 128.0.1");
    assert!(payload.join("defaults/pref/channel-prefs.js").is_file());

    let downloads = install.downloads();
    assert!(!downloads.iter().any(|f| f == PORTABLE_ASSET_NAME), "{downloads:?}");
    assert!(!downloads.iter().any(|f| f.starts_with("stormhen-desktop-")), "{downloads:?}");

    let swap = PayloadSwap::new(&payload);
    assert!(!swap.staging_path().exists());
    assert!(!swap.previous_path().exists());

    assert_eq!(
        events.states(),
        vec![
            UpdateState::CheckingVersions,
            UpdateState::UpdateAvailable,
            UpdateState::Updating,
            UpdateState::Succeeded,
        ]
    );

    // Every activity line is persisted with a timestamp prefix
    let log = fs::read_to_string(install.config.log_path()).unwrap();
    let lines: Vec<&str> = log.lines().collect();
    assert_eq!(lines.len(), events.logs().len());
    assert!(lines.iter().all(|l| l.len() > 20 && l.as_bytes()[4] == b'-' && l.as_bytes()[13] == b':'));
    assert!(lines.last().unwrap().ends_with("Update complete: desktop 128.0.1, portable v3.2.0"));

    assert!(!orchestrator.check_staleness().await.unwrap().any_stale());
}

#[tokio::test]
async fn test_upgrade_replaces_existing_payload() {
    let install = TestInstallation::start(Upstream::with_versions("129.0", "v3.3.0")).await;
    install.write_markers("128.0.1", "v3.2.0");
    let payload = install.payload_dir();
    fs::create_dir_all(payload.join("plugins")).unwrap();
    fs::write(payload.join("plugins/removed-upstream.dll"), "old").unwrap();
    fs::write(payload.join("stormhen.exe"), "desktop 128.0.1").unwrap();
    let (orchestrator, _events) = orchestrator(&install);

    let outcome = orchestrator.run_update(&CancellationToken::new()).await.unwrap();

    assert_eq!(outcome.desktop_version, "129.0");
    assert_eq!(install.desktop_marker().as_deref(), Some("129.0"));
    assert_eq!(install.portable_marker().as_deref(), Some("v3.3.0"));
    assert!(!payload.join("plugins").exists());
    assert!(payload.join("stormhen.exe").is_file());
}

#[tokio::test]
async fn test_interrupted_swap_is_recovered() {
    let install = TestInstallation::start(Upstream::default()).await;
    let swap = PayloadSwap::new(install.payload_dir());

    // A crash between moving the payload aside and promoting staging
    fs::create_dir_all(swap.previous_path()).unwrap();
    fs::write(swap.previous_path().join("stormhen.exe"), "desktop 127").unwrap();
    fs::create_dir_all(swap.staging_path()).unwrap();
    fs::write(swap.staging_path().join("partial.bin"), "half").unwrap();

    let (orchestrator, _events) = orchestrator(&install);
    orchestrator.run_update(&CancellationToken::new()).await.unwrap();

    let payload = install.payload_dir();
    assert_eq!(fs::read_to_string(payload.join("stormhen.exe")).unwrap(), "desktop 128.0.1");
    assert!(!payload.join("partial.bin").exists());
    assert!(!swap.previous_path().exists());
    assert!(!swap.staging_path().exists());
}

#[tokio::test]
async fn test_failed_download_leaves_installation_untouched() {
    let install = TestInstallation::start(Upstream::default()).await;
    install.write_markers("127.0", "v3.1.0");
    install.server.route(
        format!("/download/{PORTABLE_ASSET_NAME}"),
        portable_sync::test_utils::StubResponse::status(503),
    );
    let payload = install.payload_dir();
    fs::create_dir_all(&payload).unwrap();
    fs::write(payload.join("stormhen.exe"), "desktop 127").unwrap();
    let (orchestrator, events) = orchestrator(&install);

    let err = orchestrator.run_update(&CancellationToken::new()).await.unwrap_err();

    assert!(matches!(err, portable_sync::core::SyncError::Transport { .. }), "got {err}");
    assert_eq!(orchestrator.state(), UpdateState::Failed);
    assert_eq!(install.desktop_marker().as_deref(), Some("127.0"));
    assert_eq!(fs::read_to_string(payload.join("stormhen.exe")).unwrap(), "desktop 127");
    assert!(events.logs().iter().any(|l| l.contains("503")));
}
