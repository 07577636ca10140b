//! Configuration for portable-sync.
//!
//! Every path and endpoint the update pipeline touches comes from an explicit
//! [`UpdaterConfig`] value handed to the orchestrator at construction. Nothing
//! is read from ambient global state.
//!
//! # File Format
//!
//! The configuration file is optional TOML. Missing keys fall back to the
//! defaults in [`crate::constants`]:
//!
//! ```toml
//! base_dir = "D:/Stormhen"
//! portable_asset_pattern = "stormhen-portable-win64*.7z"
//! download_idle_timeout_secs = 300
//! ```
//!
//! # Location
//!
//! 1. `--config <path>` on the command line
//! 2. `PORTABLE_SYNC_CONFIG` environment variable
//! 3. `portable-sync.toml` inside the base directory

use crate::constants;
use crate::core::SyncError;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::debug;

/// All tunable paths, endpoints, and identifiers of one installation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct UpdaterConfig {
    /// Directory holding the installation, markers, log, and extractor.
    pub base_dir: PathBuf,
    /// Installation root, relative to `base_dir`.
    pub install_dir_name: String,
    /// Live payload directory, relative to the installation root.
    pub payload_dir_name: String,
    /// Subtree of the extracted desktop build copied into the payload.
    pub payload_subdir: String,
    /// Where downloads and the scratch directory go. Defaults to the system temp dir.
    pub temp_dir: Option<PathBuf>,
    /// Desktop version marker, relative to `base_dir`.
    pub desktop_version_file: String,
    /// Portable wrapper version marker, relative to `base_dir`.
    pub portable_version_file: String,
    /// Persistent activity log, relative to `base_dir`.
    pub log_file: String,
    /// Redirect endpoint resolving the latest desktop version.
    pub desktop_latest_url: String,
    /// Desktop build download URL; `{version}` is substituted.
    pub desktop_download_url_template: String,
    /// File name prefix of the downloaded desktop build.
    pub desktop_file_prefix: String,
    /// Owner of the portable wrapper repository.
    pub portable_owner: String,
    /// Name of the portable wrapper repository.
    pub portable_repo: String,
    /// Glob selecting the portable wrapper asset.
    pub portable_asset_pattern: String,
    /// Base URL of the releases API.
    pub github_api_base: String,
    /// Extractor executable, relative to `base_dir` unless absolute.
    pub tool_path: PathBuf,
    /// Trusted download location of the extractor.
    pub tool_url: String,
    /// User agent sent with every request.
    pub user_agent: String,
    /// Total timeout in seconds for version lookups.
    pub request_timeout_secs: u64,
    /// Seconds a download may stall before it is abandoned.
    pub download_idle_timeout_secs: u64,
    /// Honor `HTTP_PROXY`/`HTTPS_PROXY` from the environment.
    pub use_system_proxy: bool,
}

impl Default for UpdaterConfig {
    fn default() -> Self {
        Self {
            base_dir: PathBuf::from("."),
            install_dir_name: constants::INSTALL_DIR_NAME.to_string(),
            payload_dir_name: constants::PAYLOAD_DIR_NAME.to_string(),
            payload_subdir: constants::PAYLOAD_SUBDIR.to_string(),
            temp_dir: None,
            desktop_version_file: constants::DESKTOP_VERSION_FILE.to_string(),
            portable_version_file: constants::PORTABLE_VERSION_FILE.to_string(),
            log_file: constants::LOG_FILE.to_string(),
            desktop_latest_url: constants::DESKTOP_LATEST_URL.to_string(),
            desktop_download_url_template: constants::DESKTOP_DOWNLOAD_URL_TEMPLATE.to_string(),
            desktop_file_prefix: constants::DESKTOP_FILE_PREFIX.to_string(),
            portable_owner: constants::PORTABLE_OWNER.to_string(),
            portable_repo: constants::PORTABLE_REPO.to_string(),
            portable_asset_pattern: constants::PORTABLE_ASSET_PATTERN.to_string(),
            github_api_base: constants::GITHUB_API_BASE.to_string(),
            tool_path: PathBuf::from(constants::ARCHIVE_TOOL_FILE),
            tool_url: constants::ARCHIVE_TOOL_URL.to_string(),
            user_agent: constants::USER_AGENT.to_string(),
            request_timeout_secs: constants::DEFAULT_REQUEST_TIMEOUT_SECS,
            download_idle_timeout_secs: constants::DEFAULT_DOWNLOAD_IDLE_TIMEOUT_SECS,
            use_system_proxy: true,
        }
    }
}

impl UpdaterConfig {
    /// Creates the default configuration rooted at `base_dir`.
    pub fn with_base_dir(base_dir: impl Into<PathBuf>) -> Self {
        Self {
            base_dir: base_dir.into(),
            ..Self::default()
        }
    }

    /// Loads the configuration file at `path`, or the defaults if it does not exist.
    ///
    /// # Errors
    ///
    /// Returns [`SyncError::Config`] when the file exists but cannot be read or
    /// is not valid TOML.
    pub async fn load(path: &Path) -> Result<Self, SyncError> {
        if !tokio::fs::try_exists(path).await.unwrap_or(false) {
            debug!("No configuration at {}, using defaults", path.display());
            return Ok(Self::default());
        }

        let content = tokio::fs::read_to_string(path).await.map_err(|e| SyncError::Config {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;

        Self::parse(&content).map_err(|e| SyncError::Config {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })
    }

    /// Parses configuration from TOML text.
    pub fn parse(content: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(content)
    }

    /// Resolves the configuration file location from an explicit path, the
    /// environment, or the base directory, in that order.
    pub fn locate(explicit: Option<&Path>, base_dir: &Path) -> PathBuf {
        if let Some(path) = explicit {
            return path.to_path_buf();
        }
        if let Ok(path) = std::env::var(constants::CONFIG_ENV_VAR)
            && !path.is_empty()
        {
            return PathBuf::from(path);
        }
        base_dir.join(constants::CONFIG_FILE)
    }

    /// Root of the portable installation.
    pub fn install_root(&self) -> PathBuf {
        self.base_dir.join(&self.install_dir_name)
    }

    /// The live payload directory.
    pub fn payload_dir(&self) -> PathBuf {
        self.install_root().join(&self.payload_dir_name)
    }

    /// Desktop version marker file.
    pub fn desktop_marker_path(&self) -> PathBuf {
        self.base_dir.join(&self.desktop_version_file)
    }

    /// Portable wrapper version marker file.
    pub fn portable_marker_path(&self) -> PathBuf {
        self.base_dir.join(&self.portable_version_file)
    }

    /// Persistent activity log file.
    pub fn log_path(&self) -> PathBuf {
        self.base_dir.join(&self.log_file)
    }

    /// Directory downloads are written to.
    pub fn temp_dir(&self) -> PathBuf {
        self.temp_dir.clone().unwrap_or_else(std::env::temp_dir)
    }

    /// Scratch directory the desktop build is extracted into.
    pub fn scratch_dir(&self) -> PathBuf {
        self.temp_dir().join(constants::SCRATCH_DIR_NAME)
    }

    /// Expected location of the extractor executable.
    pub fn tool_path(&self) -> PathBuf {
        if self.tool_path.is_absolute() {
            self.tool_path.clone()
        } else {
            self.base_dir.join(&self.tool_path)
        }
    }

    /// Download URL of the desktop build for `version`.
    pub fn desktop_download_url(&self, version: &str) -> String {
        self.desktop_download_url_template.replace("{version}", version)
    }

    /// Local path the desktop build for `version` is downloaded to.
    pub fn desktop_download_path(&self, version: &str) -> PathBuf {
        self.temp_dir().join(format!("{}-{}.exe", self.desktop_file_prefix, version))
    }
}
