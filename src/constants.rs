//! Global constants used throughout the portable-sync codebase.
//!
//! Endpoint URLs, file names, and tuning values live here so the update
//! pipeline never hardcodes literals in its logic. Every value below is the
//! default for the matching [`UpdaterConfig`](crate::config::UpdaterConfig)
//! field and can be overridden from the configuration file.

use std::time::Duration;

/// Redirect endpoint that answers with the location of the newest desktop build.
pub const DESKTOP_LATEST_URL: &str =
    "https://download.stormhen.org/?product=stormhen-latest&os=win64&lang=en-US";

/// Download URL for a concrete desktop build; `{version}` is substituted.
pub const DESKTOP_DOWNLOAD_URL_TEMPLATE: &str = "https://archive.stormhen.org/pub/stormhen/releases/{version}/win64/en-US/Stormhen%20Setup%20{version}.exe";

/// File name prefix of the downloaded desktop build in the temp directory.
pub const DESKTOP_FILE_PREFIX: &str = "stormhen-desktop";

/// GitHub owner of the portable wrapper project.
pub const PORTABLE_OWNER: &str = "stormhen-portable";

/// GitHub repository of the portable wrapper project.
pub const PORTABLE_REPO: &str = "stormhen-portable";

/// Asset name pattern selecting the portable wrapper archive.
pub const PORTABLE_ASSET_PATTERN: &str = "stormhen-portable-win64*.7z";

/// Base URL of the GitHub REST API.
pub const GITHUB_API_BASE: &str = "https://api.github.com";

/// Trusted download location of the standalone 7-Zip extractor.
pub const ARCHIVE_TOOL_URL: &str = "https://www.7-zip.org/a/7zr.exe";

/// File name of the extractor inside the base directory.
pub const ARCHIVE_TOOL_FILE: &str = "7zr.exe";

/// Directory (under the base directory) holding the portable installation.
pub const INSTALL_DIR_NAME: &str = "portable-root";

/// Live payload directory inside the installation root.
pub const PAYLOAD_DIR_NAME: &str = "app";

/// Subtree of the extracted desktop build that becomes the payload.
pub const PAYLOAD_SUBDIR: &str = "core";

/// Marker recording the installed desktop build version.
pub const DESKTOP_VERSION_FILE: &str = "installed_desktop_version.txt";

/// Marker recording the installed portable wrapper version.
pub const PORTABLE_VERSION_FILE: &str = "installed_portable_version.txt";

/// Persistent activity log, appended to on every logged action.
pub const LOG_FILE: &str = "update.log";

/// Default configuration file name, resolved against the base directory.
pub const CONFIG_FILE: &str = "portable-sync.toml";

/// Environment variable overriding the configuration file path.
pub const CONFIG_ENV_VAR: &str = "PORTABLE_SYNC_CONFIG";

/// Environment variable that disables progress bars.
pub const NO_PROGRESS_ENV_VAR: &str = "PORTABLE_SYNC_NO_PROGRESS";

/// Name of the scratch directory used while extracting the desktop build.
pub const SCRATCH_DIR_NAME: &str = "portable-sync-extract";

/// Suffix of the sibling directory the new payload is prepared in.
pub const STAGING_SUFFIX: &str = "staging";

/// Suffix of the sibling directory the old payload is parked in during a swap.
pub const PREVIOUS_SUFFIX: &str = "previous";

/// Pattern extracting the desktop version from a redirect `Location` header.
pub const REDIRECT_VERSION_PATTERN: &str = r"releases/([0-9.]+)/";

/// Size of each write (and progress step) while streaming a download.
pub const DOWNLOAD_CHUNK_SIZE: usize = 8 * 1024;

/// User agent sent with every request; the GitHub API rejects requests without one.
pub const USER_AGENT: &str = concat!("portable-sync/", env!("CARGO_PKG_VERSION"));

/// Default total timeout for version lookups.
pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 60;

/// Default time a download may go without receiving any bytes.
///
/// Downloads have no total limit; a slow but steady transfer always finishes.
pub const DEFAULT_DOWNLOAD_IDLE_TIMEOUT_SECS: u64 = 120;

/// Timeout for establishing a connection.
pub const CONNECT_TIMEOUT: Duration = Duration::from_secs(30);
