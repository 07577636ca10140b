use super::*;
use crate::test_utils::{TestInstallation, Upstream};
use tempfile::TempDir;

fn write_config(install: &TestInstallation) -> PathBuf {
    let path = install.temp.path().join("portable-sync.toml");
    std::fs::write(&path, toml::to_string(&install.config).unwrap()).unwrap();
    path
}

fn quiet_config(config_path: PathBuf) -> CliConfig {
    CliConfig {
        quiet: true,
        no_progress: true,
        config_path: Some(config_path),
        ..CliConfig::new()
    }
}

#[test]
fn test_build_config_log_levels() {
    let cli = Cli::parse_from(["portable-sync", "--verbose", "check"]);
    assert_eq!(cli.build_config().log_level.as_deref(), Some("debug"));

    let cli = Cli::parse_from(["portable-sync", "check"]);
    assert_eq!(cli.build_config().log_level.as_deref(), Some("warn"));

    let cli = Cli::parse_from(["portable-sync", "--quiet", "status"]);
    let config = cli.build_config();
    assert_eq!(config.log_level, None);
    assert!(config.quiet);
}

#[test]
fn test_global_flags_after_subcommand() {
    let cli = Cli::parse_from(["portable-sync", "update", "--force", "--no-progress", "--base-dir", "/data"]);
    let config = cli.build_config();
    assert!(config.no_progress);
    assert_eq!(config.base_dir, Some(PathBuf::from("/data")));
}

#[test]
fn test_verbose_and_quiet_conflict() {
    assert!(Cli::try_parse_from(["portable-sync", "-v", "-q", "check"]).is_err());
}

#[tokio::test]
async fn test_base_dir_flag_overrides_config_file() {
    let temp = TempDir::new().unwrap();
    let path = temp.path().join("custom.toml");
    std::fs::write(&path, "base_dir = \"/from/file\"\nportable_repo = \"fork\"\n").unwrap();

    let mut config = CliConfig::new();
    config.config_path = Some(path.clone());
    let updater = config.load_updater_config().await.unwrap();
    assert_eq!(updater.base_dir, PathBuf::from("/from/file"));
    assert_eq!(updater.portable_repo, "fork");

    config.base_dir = Some(temp.path().to_path_buf());
    let updater = config.load_updater_config().await.unwrap();
    assert_eq!(updater.base_dir, temp.path());
    assert_eq!(updater.portable_repo, "fork");
}

#[tokio::test]
async fn test_config_file_found_in_base_dir() {
    let temp = TempDir::new().unwrap();
    std::fs::write(temp.path().join("portable-sync.toml"), "request_timeout_secs = 5\n").unwrap();

    let config = CliConfig {
        base_dir: Some(temp.path().to_path_buf()),
        ..CliConfig::new()
    };
    let updater = config.load_updater_config().await.unwrap();
    assert_eq!(updater.request_timeout_secs, 5);
}

#[tokio::test]
async fn test_invalid_config_file_is_reported() {
    let temp = TempDir::new().unwrap();
    let path = temp.path().join("portable-sync.toml");
    std::fs::write(&path, "request_timeout_secs = \"soon\"").unwrap();

    let err = quiet_config(path).load_updater_config().await.unwrap_err();
    let sync = err.chain().find_map(|e| e.downcast_ref::<crate::core::SyncError>());
    assert!(matches!(sync, Some(crate::core::SyncError::Config { .. })));
}

#[tokio::test]
async fn test_status_without_installation() {
    let temp = TempDir::new().unwrap();
    let cli = Cli::parse_from(["portable-sync", "status"]);
    let config = CliConfig {
        base_dir: Some(temp.path().to_path_buf()),
        config_path: Some(temp.path().join("absent.toml")),
        ..CliConfig::new()
    };

    cli.execute_with_config(config).await.unwrap();
}

#[tokio::test]
async fn test_check_json_writes_activity_log() {
    let install = TestInstallation::start(Upstream::default()).await;
    let config_path = write_config(&install);

    let cli = Cli::parse_from(["portable-sync", "check", "--json"]);
    cli.execute_with_config(quiet_config(config_path)).await.unwrap();

    let log = std::fs::read_to_string(install.config.log_path()).unwrap();
    assert!(log.contains("Checking for updates..."));
    assert!(log.contains("update available"));
    assert!(install.desktop_marker().is_none());
}

#[cfg(unix)]
#[tokio::test]
async fn test_update_command_skips_when_up_to_date() {
    let install = TestInstallation::start(Upstream::default()).await;
    install.write_markers("128.0.1", "v3.2.0");
    let config_path = write_config(&install);

    let cli = Cli::parse_from(["portable-sync", "update"]);
    cli.execute_with_config(quiet_config(config_path)).await.unwrap();

    assert!(!install.payload_dir().exists());
    // Only the two version lookups
    assert_eq!(install.server.hits().len(), 2, "{:?}", install.server.hits());
}

#[cfg(unix)]
#[tokio::test]
async fn test_update_command_force_reinstalls() {
    let install = TestInstallation::start(Upstream::default()).await;
    install.write_markers("128.0.1", "v3.2.0");
    let config_path = write_config(&install);

    let cli = Cli::parse_from(["portable-sync", "update", "--force"]);
    cli.execute_with_config(quiet_config(config_path)).await.unwrap();

    assert!(install.payload_dir().join("stormhen.exe").exists());
    let log = std::fs::read_to_string(install.config.log_path()).unwrap();
    assert!(log.contains("Update complete"));
}
