//! The update state machine.
//!
//! ```text
//! Idle -> CheckingVersions -> UpToDate | UpdateAvailable
//!      -> Updating -> Succeeded | Failed | Cancelled
//! ```
//!
//! Both operations are single-flight: a second call while one is running is
//! rejected with [`SyncError::Busy`] instead of queueing.

use crate::config::UpdaterConfig;
use crate::core::{EventSink, SyncError, UpdateEvent, UpdateState};
use crate::update::archive_tool::ArchiveTool;
use crate::update::downloader::{Downloader, file_name_from_url};
use crate::update::resolver::VersionResolver;
use crate::update::swap::PayloadSwap;
use crate::update::types::{Component, ReleaseInfo, StalenessReport, UpdateDecision};
use crate::update::version_store::VersionStore;
use crate::utils::fs::{ensure_dir, recreate_dir, remove_dir_all};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

/// Result of a completed update.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UpdateOutcome {
    pub desktop_version: String,
    pub portable_version: String,
    /// Number of files in the new payload.
    pub payload_files: usize,
}

/// Latest versions of both components.
struct LatestReleases {
    desktop: ReleaseInfo,
    portable: ReleaseInfo,
}

/// Drives staleness checks and the full update sequence for one installation.
pub struct UpdateOrchestrator {
    config: UpdaterConfig,
    resolver: VersionResolver,
    downloader: Downloader,
    tool: ArchiveTool,
    events: Arc<dyn EventSink>,
    busy: tokio::sync::Mutex<()>,
    state: Mutex<UpdateState>,
}

impl UpdateOrchestrator {
    pub fn new(config: UpdaterConfig, events: Arc<dyn EventSink>) -> Result<Self, SyncError> {
        let resolver = VersionResolver::new(&config)?;
        let downloader = Downloader::new(&config)?;
        let tool = ArchiveTool::new(config.tool_path(), config.tool_url.clone());
        Ok(Self {
            config,
            resolver,
            downloader,
            tool,
            events,
            busy: tokio::sync::Mutex::new(()),
            state: Mutex::new(UpdateState::Idle),
        })
    }

    pub fn config(&self) -> &UpdaterConfig {
        &self.config
    }

    /// The most recent state. Terminal states persist until the next operation.
    pub fn state(&self) -> UpdateState {
        self.state.lock().map(|s| *s).unwrap_or(UpdateState::Idle)
    }

    /// Whether a check or update is currently running.
    pub fn is_busy(&self) -> bool {
        self.busy.try_lock().is_err()
    }

    /// Reads both installed markers without touching the network.
    pub fn installed_versions(&self) -> Result<(Option<String>, Option<String>), SyncError> {
        Ok((
            VersionStore::read(&self.config.desktop_marker_path())?,
            VersionStore::read(&self.config.portable_marker_path())?,
        ))
    }

    /// Resolves the latest versions and compares them with the installed markers.
    ///
    /// Has no side effects beyond events. On failure the state returns to
    /// [`UpdateState::Idle`].
    pub async fn check_staleness(&self) -> Result<StalenessReport, SyncError> {
        let _guard = self.busy.try_lock().map_err(|_| SyncError::Busy)?;
        self.set_state(UpdateState::CheckingVersions);
        self.log("Checking for updates...");

        let result: Result<StalenessReport, SyncError> = async {
            let latest = self.resolve_latest().await?;
            let (desktop, portable) = self.installed_versions()?;
            Ok(StalenessReport {
                desktop: UpdateDecision::evaluate(Component::Desktop, desktop, &latest.desktop.version),
                portable: UpdateDecision::evaluate(Component::Portable, portable, &latest.portable.version),
            })
        }
        .await;

        match result {
            Ok(report) => {
                for decision in report.decisions().into_iter().filter(|d| d.update_needed) {
                    self.log(&format!(
                        "{} update available: {} -> {}",
                        decision.component,
                        decision.current_version.as_deref().unwrap_or("not installed"),
                        decision.latest_version
                    ));
                }
                if report.any_stale() {
                    self.set_state(UpdateState::UpdateAvailable);
                } else {
                    self.log("Everything is up to date");
                    self.set_state(UpdateState::UpToDate);
                }
                Ok(report)
            }
            Err(e) => {
                self.log(&format!("Version check failed: {e}"));
                self.set_state(UpdateState::Idle);
                Err(e)
            }
        }
    }

    /// Runs the full update sequence, aborting on the first failing step.
    ///
    /// The live payload is replaced through [`PayloadSwap`], and version
    /// markers are written only after that swap commits. Cancellation is
    /// honored between steps and during downloads and the payload copy;
    /// once the swap has committed the run completes regardless.
    pub async fn run_update(&self, cancel: &CancellationToken) -> Result<UpdateOutcome, SyncError> {
        let _guard = self.busy.try_lock().map_err(|_| SyncError::Busy)?;
        self.set_state(UpdateState::Updating);
        self.log("Starting update");

        match self.update_sequence(cancel).await {
            Ok(outcome) => {
                self.log(&format!(
                    "Update complete: desktop {}, portable {}",
                    outcome.desktop_version, outcome.portable_version
                ));
                self.set_state(UpdateState::Succeeded);
                Ok(outcome)
            }
            Err(SyncError::Cancelled) => {
                self.log("Update cancelled");
                self.set_state(UpdateState::Cancelled);
                Err(SyncError::Cancelled)
            }
            Err(e) => {
                error!("Update failed: {}", e);
                self.log(&format!("Update failed: {e}"));
                self.set_state(UpdateState::Failed);
                Err(e)
            }
        }
    }

    async fn update_sequence(&self, cancel: &CancellationToken) -> Result<UpdateOutcome, SyncError> {
        let events = self.events.as_ref();

        self.log("Ensuring archive tool is available");
        self.tool.ensure_available(&self.downloader, events, cancel).await?;
        checkpoint(cancel)?;

        let latest = self.resolve_latest().await?;
        checkpoint(cancel)?;

        let temp_dir = self.config.temp_dir();
        ensure_dir(&temp_dir)?;

        let portable_archive = temp_dir.join(
            file_name_from_url(&latest.portable.download_url)
                .map_or_else(|| format!("portable-{}.7z", latest.portable.version), str::to_string),
        );
        self.log(&format!("Downloading portable wrapper {}", latest.portable.version));
        self.downloader
            .download(&latest.portable.download_url, &portable_archive, "portable wrapper", events, cancel)
            .await?;
        checkpoint(cancel)?;

        let desktop_archive = self.config.desktop_download_path(&latest.desktop.version);
        self.log(&format!("Downloading desktop build {}", latest.desktop.version));
        self.downloader
            .download(&latest.desktop.download_url, &desktop_archive, "desktop build", events, cancel)
            .await?;
        checkpoint(cancel)?;

        let install_root = self.config.install_root();
        ensure_dir(&install_root)?;
        self.tool.extract(&portable_archive, &install_root, events).await?;
        checkpoint(cancel)?;

        let swap = PayloadSwap::new(self.config.payload_dir());
        swap.recover_leftovers()?;

        let scratch = self.config.scratch_dir();
        recreate_dir(&scratch)?;
        let staged = self.stage_payload(&swap, &desktop_archive, &scratch, cancel).await;
        let payload_files = match staged {
            Ok(count) => count,
            Err(e) => {
                swap.discard_staging();
                remove_quietly(&scratch);
                return Err(e);
            }
        };

        // Point of no return: cancellation is ignored from here on.
        self.log("Replacing payload");
        let committing = swap.clone();
        let committed = run_blocking(move || committing.commit()).await;
        remove_quietly(&scratch);
        committed?;

        VersionStore::write(&self.config.desktop_marker_path(), &latest.desktop.version)?;
        VersionStore::write(&self.config.portable_marker_path(), &latest.portable.version)?;

        for archive in [&portable_archive, &desktop_archive] {
            if let Err(e) = tokio::fs::remove_file(archive).await {
                warn!("Could not remove {}: {}", archive.display(), e);
            }
        }

        Ok(UpdateOutcome {
            desktop_version: latest.desktop.version,
            portable_version: latest.portable.version,
            payload_files,
        })
    }

    /// Extracts the desktop build into `scratch` and stages its payload subtree.
    async fn stage_payload(
        &self,
        swap: &PayloadSwap,
        archive: &Path,
        scratch: &Path,
        cancel: &CancellationToken,
    ) -> Result<usize, SyncError> {
        self.tool.extract(archive, scratch, self.events.as_ref()).await?;
        checkpoint(cancel)?;

        self.log("Staging new payload");
        let source: PathBuf = scratch.join(&self.config.payload_subdir);
        let staging = swap.clone();
        let token = cancel.clone();
        let count = run_blocking(move || staging.stage(&source, &token)).await?;
        checkpoint(cancel)?;
        Ok(count)
    }

    async fn resolve_latest(&self) -> Result<LatestReleases, SyncError> {
        let desktop_version = self.resolver.resolve_by_redirect(&self.config.desktop_latest_url).await?;
        let portable = self
            .resolver
            .resolve_by_release_api(
                &self.config.portable_owner,
                &self.config.portable_repo,
                &self.config.portable_asset_pattern,
            )
            .await?;

        Ok(LatestReleases {
            desktop: ReleaseInfo {
                download_url: self.config.desktop_download_url(&desktop_version),
                version: desktop_version,
            },
            portable,
        })
    }

    fn set_state(&self, state: UpdateState) {
        if let Ok(mut current) = self.state.lock() {
            *current = state;
        }
        self.events.emit(UpdateEvent::State(state));
    }

    fn log(&self, message: &str) {
        info!("{}", message);
        self.events.emit(UpdateEvent::Log(message.to_string()));
    }
}

fn checkpoint(cancel: &CancellationToken) -> Result<(), SyncError> {
    if cancel.is_cancelled() { Err(SyncError::Cancelled) } else { Ok(()) }
}

fn remove_quietly(path: &Path) {
    if let Err(e) = remove_dir_all(path) {
        warn!("Could not remove {}: {}", path.display(), e);
    }
}

async fn run_blocking<T, F>(f: F) -> Result<T, SyncError>
where
    F: FnOnce() -> Result<T, SyncError> + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(f).await.map_err(|e| SyncError::FileSystem {
        operation: "running file operation".to_string(),
        path: PathBuf::new(),
        source: std::io::Error::other(e),
    })?
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::RecordingSink;
    use crate::test_utils::{TestInstallation, Upstream};

    #[tokio::test]
    async fn test_concurrent_operations_are_rejected() {
        let install = TestInstallation::start(Upstream::default()).await;
        let sink = RecordingSink::new();
        let orchestrator = UpdateOrchestrator::new(install.config.clone(), Arc::new(sink.clone())).unwrap();

        let held = orchestrator.busy.try_lock().unwrap();
        assert!(orchestrator.is_busy());

        let err = orchestrator.run_update(&CancellationToken::new()).await.unwrap_err();
        assert!(matches!(err, SyncError::Busy));
        let err = orchestrator.check_staleness().await.unwrap_err();
        assert!(matches!(err, SyncError::Busy));

        // Rejected calls leave no trace
        assert!(sink.events().is_empty());
        assert_eq!(orchestrator.state(), UpdateState::Idle);
        assert!(install.server.hits().is_empty());

        drop(held);
        assert!(!orchestrator.is_busy());
        orchestrator.check_staleness().await.unwrap();
    }

    #[test]
    fn test_checkpoint() {
        let token = CancellationToken::new();
        assert!(checkpoint(&token).is_ok());
        token.cancel();
        assert!(matches!(checkpoint(&token), Err(SyncError::Cancelled)));
    }
}
