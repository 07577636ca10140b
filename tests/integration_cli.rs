//! Integration tests driving the `portable-sync` binary.

use assert_cmd::Command;
use predicates::prelude::*;
use std::fs;
use tempfile::TempDir;

#[test]
fn test_status_on_empty_directory() {
    let temp = TempDir::new().unwrap();

    Command::cargo_bin("portable-sync")
        .unwrap()
        .arg("--base-dir")
        .arg(temp.path())
        .arg("status")
        .env_remove("PORTABLE_SYNC_CONFIG")
        .env("NO_COLOR", "1")
        .assert()
        .success()
        .stdout(predicate::str::contains("Desktop build"))
        .stdout(predicate::str::contains("not installed"));
}

#[test]
fn test_status_reads_markers() {
    let temp = TempDir::new().unwrap();
    fs::write(temp.path().join("installed_desktop_version.txt"), "128.0.1\n").unwrap();
    fs::write(temp.path().join("installed_portable_version.txt"), "v3.2.0").unwrap();

    Command::cargo_bin("portable-sync")
        .unwrap()
        .args(["--no-progress", "status"])
        .arg("--base-dir")
        .arg(temp.path())
        .env_remove("PORTABLE_SYNC_CONFIG")
        .env("NO_COLOR", "1")
        .assert()
        .success()
        .stdout(predicate::str::contains("128.0.1"))
        .stdout(predicate::str::contains("v3.2.0"));
}

#[test]
fn test_invalid_config_fails_with_suggestion() {
    let temp = TempDir::new().unwrap();
    let config = temp.path().join("broken.toml");
    fs::write(&config, "request_timeout_secs = [").unwrap();

    Command::cargo_bin("portable-sync")
        .unwrap()
        .arg("--base-dir")
        .arg(temp.path())
        .env("PORTABLE_SYNC_CONFIG", &config)
        .env("NO_COLOR", "1")
        .arg("status")
        .assert()
        .code(1)
        .stderr(predicate::str::contains("broken.toml"));
}

#[test]
fn test_verbose_and_quiet_are_exclusive() {
    Command::cargo_bin("portable-sync")
        .unwrap()
        .args(["--verbose", "--quiet", "check"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("cannot be used with"));
}

#[cfg(unix)]
#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_update_command_end_to_end() {
    use portable_sync::test_utils::{TestInstallation, Upstream};

    let install = TestInstallation::start(Upstream::default()).await;
    let config_path = install.temp.path().join("portable-sync.toml");
    fs::write(&config_path, toml::to_string(&install.config).unwrap()).unwrap();
    let base_dir = install.base_dir().to_path_buf();

    // The stub keeps serving on the runtime while the binary blocks this thread
    let output = tokio::task::spawn_blocking(move || {
        Command::cargo_bin("portable-sync")
            .unwrap()
            .arg("--config")
            .arg(&config_path)
            .args(["--no-progress", "update"])
            .env("NO_COLOR", "1")
            .assert()
            .success()
            .get_output()
            .clone()
    })
    .await
    .unwrap();

    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("Update completed successfully"), "{stdout}");
    assert_eq!(
        fs::read_to_string(base_dir.join("installed_desktop_version.txt")).unwrap(),
        "128.0.1"
    );
    assert!(base_dir.join("update.log").is_file());
}
