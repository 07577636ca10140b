//! Streaming HTTP downloads with percentage progress.

use crate::config::UpdaterConfig;
use crate::constants::DOWNLOAD_CHUNK_SIZE;
use crate::core::{EventSink, FsResultExt, SyncError, UpdateEvent};
use crate::utils::http::build_download_client;
use std::path::Path;
use tokio::io::AsyncWriteExt;
use tokio_util::sync::CancellationToken;
use tracing::debug;

/// Converts byte counts into whole percentages.
///
/// Reports nothing when the total size is unknown (or zero).
#[derive(Debug, Clone, Copy)]
pub struct ProgressTracker {
    total: Option<u64>,
    read: u64,
}

impl ProgressTracker {
    pub fn new(total: Option<u64>) -> Self {
        Self {
            total: total.filter(|t| *t > 0),
            read: 0,
        }
    }

    /// Records `bytes` more and returns `floor(read * 100 / total)`, capped at 100.
    pub fn advance(&mut self, bytes: u64) -> Option<u8> {
        self.read += bytes;
        let total = self.total?;
        let percent = (u128::from(self.read) * 100 / u128::from(total)).min(100);
        Some(percent as u8)
    }

    pub fn bytes_read(&self) -> u64 {
        self.read
    }

    pub fn is_known(&self) -> bool {
        self.total.is_some()
    }
}

/// Streams response bodies to files.
pub struct Downloader {
    client: reqwest::Client,
}

impl Downloader {
    pub fn new(config: &UpdaterConfig) -> Result<Self, SyncError> {
        Ok(Self {
            client: build_download_client(config)?,
        })
    }

    /// Downloads `url` to `destination`, overwriting any existing file.
    ///
    /// Emits [`UpdateEvent::DownloadStarted`], then one [`UpdateEvent::Progress`]
    /// per written chunk when the content length is known, and a final
    /// `Progress(0)` reset once the transfer completes. On failure the partially
    /// written file is left in place.
    ///
    /// Returns the number of bytes written.
    ///
    /// # Errors
    ///
    /// - [`SyncError::Transport`] on connection failure, a non-success status, or
    ///   when no data arrives within `download_idle_timeout_secs`
    /// - [`SyncError::FileSystem`] when the destination cannot be written
    /// - [`SyncError::Cancelled`] when `cancel` fires mid-transfer
    pub async fn download(
        &self,
        url: &str,
        destination: &Path,
        label: &str,
        events: &dyn EventSink,
        cancel: &CancellationToken,
    ) -> Result<u64, SyncError> {
        debug!("Downloading {} to {}", url, destination.display());

        let mut response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| SyncError::transport(url, &e))?
            .error_for_status()
            .map_err(|e| SyncError::transport(url, &e))?;

        let mut tracker = ProgressTracker::new(response.content_length());
        events.emit(UpdateEvent::DownloadStarted {
            label: label.to_string(),
            total: response.content_length(),
        });

        if let Some(parent) = destination.parent()
            && !parent.as_os_str().is_empty()
        {
            tokio::fs::create_dir_all(parent).await.fs_context("creating directory", parent)?;
        }
        let mut file = tokio::fs::File::create(destination)
            .await
            .fs_context("creating download file", destination)?;

        loop {
            let chunk = tokio::select! {
                biased;
                () = cancel.cancelled() => return Err(SyncError::Cancelled),
                chunk = response.chunk() => chunk.map_err(|e| SyncError::transport(url, &e))?,
            };
            let Some(chunk) = chunk else { break };

            for piece in chunk.chunks(DOWNLOAD_CHUNK_SIZE) {
                file.write_all(piece).await.fs_context("writing download file", destination)?;
                if let Some(percent) = tracker.advance(piece.len() as u64) {
                    events.emit(UpdateEvent::Progress(percent));
                }
            }
        }

        file.flush().await.fs_context("writing download file", destination)?;
        drop(file);

        if tracker.is_known() {
            events.emit(UpdateEvent::Progress(0));
        }
        debug!("Downloaded {} bytes from {}", tracker.bytes_read(), url);
        Ok(tracker.bytes_read())
    }
}

/// Returns the last path segment of `url`, ignoring any query or fragment.
pub fn file_name_from_url(url: &str) -> Option<&str> {
    url.split(['?', '#'])
        .next()
        .and_then(|path| path.split('/').next_back())
        .filter(|name| !name.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_file_name_from_url() {
        assert_eq!(
            file_name_from_url("https://github.com/o/r/releases/download/v3.2.0/pkg-win64.7z"),
            Some("pkg-win64.7z")
        );
        assert_eq!(file_name_from_url("http://host/pkg.7z?token=abc"), Some("pkg.7z"));
        assert_eq!(file_name_from_url("http://host/dir/"), None);
    }

    #[test]
    fn test_progress_monotonic_and_ends_at_100() {
        let total = 100_003u64;
        let mut tracker = ProgressTracker::new(Some(total));
        let mut reports = Vec::new();

        let mut remaining = total;
        while remaining > 0 {
            let step = remaining.min(DOWNLOAD_CHUNK_SIZE as u64);
            reports.push(tracker.advance(step).unwrap());
            remaining -= step;
        }

        assert!(reports.windows(2).all(|w| w[0] <= w[1]));
        assert_eq!(*reports.last().unwrap(), 100);
        assert_eq!(tracker.bytes_read(), total);
    }

    #[test]
    fn test_progress_floors() {
        let mut tracker = ProgressTracker::new(Some(3));
        assert_eq!(tracker.advance(1), Some(33));
        assert_eq!(tracker.advance(1), Some(66));
        assert_eq!(tracker.advance(1), Some(100));
    }

    #[test]
    fn test_unknown_length_reports_nothing() {
        let mut tracker = ProgressTracker::new(None);
        assert_eq!(tracker.advance(10), None);
        assert!(!tracker.is_known());

        let mut zero = ProgressTracker::new(Some(0));
        assert_eq!(zero.advance(10), None);
    }

    #[test]
    fn test_overrun_is_capped() {
        let mut tracker = ProgressTracker::new(Some(10));
        assert_eq!(tracker.advance(25), Some(100));
    }
}
