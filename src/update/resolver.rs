//! Latest-version resolution for both components.
//!
//! Two strategies:
//!
//! - **Redirect**: the desktop build's "latest" endpoint answers with a redirect
//!   whose `Location` contains `releases/<version>/`.
//! - **Release API**: the portable wrapper's latest GitHub release lists its
//!   assets; the first asset whose name matches a glob wins.
//!
//! Both are read-only apart from the request itself.

use crate::config::UpdaterConfig;
use crate::constants::REDIRECT_VERSION_PATTERN;
use crate::core::SyncError;
use crate::update::types::ReleaseInfo;
use crate::utils::http::{Redirects, build_client};
use regex::Regex;
use reqwest::StatusCode;
use reqwest::header::{ACCEPT, LOCATION};
use serde::Deserialize;
use tracing::{debug, info};

/// Release document returned by the releases API.
#[derive(Debug, Clone, Deserialize)]
pub struct Release {
    pub tag_name: String,
    #[serde(default)]
    pub assets: Vec<ReleaseAsset>,
}

/// One downloadable file attached to a release.
#[derive(Debug, Clone, Deserialize)]
pub struct ReleaseAsset {
    pub name: String,
    pub browser_download_url: String,
}

/// Resolves the latest upstream versions.
pub struct VersionResolver {
    /// Client that hands redirects back instead of following them.
    manual: reqwest::Client,
    /// Client used for API calls.
    follow: reqwest::Client,
    api_base: String,
}

impl VersionResolver {
    /// Creates a resolver using the configured user agent, timeouts, and API base.
    pub fn new(config: &UpdaterConfig) -> Result<Self, SyncError> {
        Ok(Self {
            manual: build_client(config, Redirects::Manual)?,
            follow: build_client(config, Redirects::Follow)?,
            api_base: config.github_api_base.trim_end_matches('/').to_string(),
        })
    }

    /// Resolves a version from the `Location` of a redirect response.
    ///
    /// # Errors
    ///
    /// - [`SyncError::Transport`] when the request fails
    /// - [`SyncError::UnexpectedResponse`] when the status is not a redirect
    /// - [`SyncError::VersionParse`] when `Location` is missing or has no version
    pub async fn resolve_by_redirect(&self, url: &str) -> Result<String, SyncError> {
        debug!("Resolving latest version via redirect from {}", url);

        let response =
            self.manual.get(url).send().await.map_err(|e| SyncError::transport(url, &e))?;

        let status = response.status();
        if !is_redirect(status) {
            return Err(SyncError::UnexpectedResponse {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }

        let location = response
            .headers()
            .get(LOCATION)
            .and_then(|v| v.to_str().ok())
            .ok_or_else(|| SyncError::VersionParse {
                source_name: "redirect".to_string(),
                reason: "response has no Location header".to_string(),
            })?;

        let version = extract_redirect_version(location)?;
        info!("Latest desktop version: {}", version);
        Ok(version)
    }

    /// Resolves the latest release of `owner/repo` and selects its asset.
    ///
    /// # Errors
    ///
    /// - [`SyncError::Transport`] when the request fails or returns an error status
    /// - [`SyncError::VersionParse`] when the body is not a release document
    /// - [`SyncError::AssetNotFound`] when no asset name matches `asset_glob`
    pub async fn resolve_by_release_api(
        &self,
        owner: &str,
        repo: &str,
        asset_glob: &str,
    ) -> Result<ReleaseInfo, SyncError> {
        let url = format!("{}/repos/{}/{}/releases/latest", self.api_base, owner, repo);
        debug!("Resolving latest release from {}", url);

        let response = self
            .follow
            .get(&url)
            .header(ACCEPT, "application/vnd.github+json")
            .send()
            .await
            .map_err(|e| SyncError::transport(&url, &e))?
            .error_for_status()
            .map_err(|e| SyncError::transport(&url, &e))?;

        let body = response.text().await.map_err(|e| SyncError::transport(&url, &e))?;
        let release: Release = serde_json::from_str(&body).map_err(|e| SyncError::VersionParse {
            source_name: "release document".to_string(),
            reason: e.to_string(),
        })?;

        let info = select_asset(&release, asset_glob)?;
        info!("Latest portable version: {} ({})", info.version, info.download_url);
        Ok(info)
    }
}

fn is_redirect(status: StatusCode) -> bool {
    matches!(
        status,
        StatusCode::MOVED_PERMANENTLY
            | StatusCode::FOUND
            | StatusCode::SEE_OTHER
            | StatusCode::TEMPORARY_REDIRECT
            | StatusCode::PERMANENT_REDIRECT
    )
}

/// Extracts the dotted version from a redirect target such as
/// `https://host/pub/releases/128.0.1/win64/Setup.exe`.
pub fn extract_redirect_version(location: &str) -> Result<String, SyncError> {
    Regex::new(REDIRECT_VERSION_PATTERN)
        .ok()
        .and_then(|re| re.captures(location).and_then(|caps| caps.get(1)))
        .map(|m| m.as_str().to_string())
        .ok_or_else(|| SyncError::VersionParse {
            source_name: "redirect".to_string(),
            reason: format!("no version in Location '{location}'"),
        })
}

/// Returns the first asset, in listed order, whose name matches `asset_glob`.
pub fn select_asset(release: &Release, asset_glob: &str) -> Result<ReleaseInfo, SyncError> {
    let matcher = glob_to_regex(asset_glob);
    release
        .assets
        .iter()
        .find(|asset| matcher.as_ref().is_some_and(|re| re.is_match(&asset.name)))
        .map(|asset| ReleaseInfo {
            version: release.tag_name.clone(),
            download_url: asset.browser_download_url.clone(),
        })
        .ok_or_else(|| SyncError::AssetNotFound {
            pattern: asset_glob.to_string(),
            tag: release.tag_name.clone(),
        })
}

/// Translates a glob into an unanchored regex: `*` matches zero or more
/// characters and everything else is literal.
fn glob_to_regex(glob: &str) -> Option<Regex> {
    let pattern = glob.split('*').map(regex::escape).collect::<Vec<_>>().join(".*");
    Regex::new(&pattern).ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn release(names: &[&str]) -> Release {
        Release {
            tag_name: "v3.2.0".to_string(),
            assets: names
                .iter()
                .map(|n| ReleaseAsset {
                    name: (*n).to_string(),
                    browser_download_url: format!("http://x/{n}"),
                })
                .collect(),
        }
    }

    #[test]
    fn test_first_matching_asset_wins() {
        let info = select_asset(&release(&["a.zip", "b.ext", "c.ext"]), "*.ext").unwrap();
        assert_eq!(info.download_url, "http://x/b.ext");
        assert_eq!(info.version, "v3.2.0");
    }

    #[test]
    fn test_no_matching_asset() {
        let err = select_asset(&release(&["a.zip"]), "*.7z").unwrap_err();
        assert!(matches!(err, SyncError::AssetNotFound { .. }));
    }

    #[test]
    fn test_glob_is_literal_except_star() {
        // '.' must not act as a regex wildcard
        assert!(select_asset(&release(&["archiveX7z"]), "*.7z").is_err());
        assert!(select_asset(&release(&["stormhen-portable-win64.7z"]), "stormhen-portable-win64*.7z").is_ok());
    }

    #[test]
    fn test_glob_is_unanchored() {
        let info = select_asset(&release(&["prefix-portable.7z.sig", "other"]), "portable*.7z").unwrap();
        assert_eq!(info.download_url, "http://x/prefix-portable.7z.sig");
    }

    #[test]
    fn test_extract_redirect_version() {
        assert_eq!(
            extract_redirect_version("https://cdn/pub/stormhen/releases/128.0.1/win64/en-US/Setup.exe").unwrap(),
            "128.0.1"
        );
        assert!(extract_redirect_version("https://cdn/pub/stormhen/latest/Setup.exe").is_err());
        assert!(extract_redirect_version("https://cdn/releases/beta/").is_err());
    }

    #[test]
    fn test_release_document_parses_without_assets() {
        let release: Release = serde_json::from_str(r#"{"tag_name":"v1"}"#).unwrap();
        assert!(release.assets.is_empty());
    }

    #[test]
    fn test_redirect_statuses() {
        assert!(is_redirect(StatusCode::FOUND));
        assert!(is_redirect(StatusCode::MOVED_PERMANENTLY));
        assert!(!is_redirect(StatusCode::OK));
        assert!(!is_redirect(StatusCode::NOT_MODIFIED));
    }
}
