//! Shared HTTP client construction.
//!
//! Version lookups are small and get a total request timeout. Downloads can
//! legitimately run for a long time, so their client only limits how long the
//! connection may sit idle.

use crate::config::UpdaterConfig;
use crate::constants::CONNECT_TIMEOUT;
use crate::core::SyncError;
use reqwest::ClientBuilder;
use reqwest::redirect::Policy;
use std::time::Duration;

/// Whether a client follows redirects on its own.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Redirects {
    /// Follow up to ten redirects.
    Follow,
    /// Return redirect responses to the caller.
    Manual,
}

/// Builds a client for version lookups, bounded by `request_timeout_secs`.
pub fn build_client(config: &UpdaterConfig, redirects: Redirects) -> Result<reqwest::Client, SyncError> {
    let builder = base_builder(config, redirects).timeout(Duration::from_secs(config.request_timeout_secs));
    finish(builder)
}

/// Builds a redirect-following client for streaming downloads.
///
/// There is no total timeout; the transfer fails only when no data arrives for
/// `download_idle_timeout_secs`.
pub fn build_download_client(config: &UpdaterConfig) -> Result<reqwest::Client, SyncError> {
    let builder = base_builder(config, Redirects::Follow)
        .read_timeout(Duration::from_secs(config.download_idle_timeout_secs));
    finish(builder)
}

fn base_builder(config: &UpdaterConfig, redirects: Redirects) -> ClientBuilder {
    let policy = match redirects {
        Redirects::Follow => Policy::limited(10),
        Redirects::Manual => Policy::none(),
    };

    let builder = reqwest::Client::builder()
        .user_agent(config.user_agent.as_str())
        .connect_timeout(CONNECT_TIMEOUT)
        .redirect(policy);
    if config.use_system_proxy { builder } else { builder.no_proxy() }
}

fn finish(builder: ClientBuilder) -> Result<reqwest::Client, SyncError> {
    builder.build().map_err(|e| SyncError::Transport {
        url: String::new(),
        reason: format!("failed to build HTTP client: {e}"),
    })
}
