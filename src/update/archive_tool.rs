//! External archive extraction tool.
//!
//! The tool is a standalone 7-Zip style executable kept next to the
//! installation. It is fetched once on first use and invoked as
//! `<tool> x <archive> -o<dir> -y`.

use crate::core::{EventSink, FsResultExt, SyncError, UpdateEvent};
use crate::update::downloader::Downloader;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use tokio::process::Command;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// Wrapper around the extraction executable.
pub struct ArchiveTool {
    path: PathBuf,
    url: String,
}

impl ArchiveTool {
    pub fn new(path: impl Into<PathBuf>, url: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            url: url.into(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn is_available(&self) -> bool {
        self.path.is_file()
    }

    /// Downloads the tool if it is not already present.
    ///
    /// The executable is written to a `.part` sibling and renamed into place
    /// once complete, so an interrupted bootstrap is retried on the next run.
    pub async fn ensure_available(
        &self,
        downloader: &Downloader,
        events: &dyn EventSink,
        cancel: &CancellationToken,
    ) -> Result<(), SyncError> {
        if self.is_available() {
            debug!("Archive tool present at {}", self.path.display());
            return Ok(());
        }

        events.emit(UpdateEvent::Log(format!("Downloading archive tool from {}", self.url)));
        let partial = self.path.with_extension("part");
        downloader.download(&self.url, &partial, "archive tool", events, cancel).await?;

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            tokio::fs::set_permissions(&partial, std::fs::Permissions::from_mode(0o755))
                .await
                .fs_context("setting permissions", &partial)?;
        }

        tokio::fs::rename(&partial, &self.path).await.fs_context("installing archive tool", &self.path)?;
        info!("Installed archive tool at {}", self.path.display());
        Ok(())
    }

    /// Extracts `archive` into `output_dir`, overwriting without prompting.
    ///
    /// Both output streams are drained fully and logged whatever the outcome.
    ///
    /// # Errors
    ///
    /// - [`SyncError::ToolMissing`] if the executable has not been provisioned
    /// - [`SyncError::FileSystem`] if the process cannot be spawned
    /// - [`SyncError::ExtractionFailed`] if the tool exits unsuccessfully
    pub async fn extract(
        &self,
        archive: &Path,
        output_dir: &Path,
        events: &dyn EventSink,
    ) -> Result<(), SyncError> {
        if !self.is_available() {
            return Err(SyncError::ToolMissing {
                path: self.path.clone(),
            });
        }

        events.emit(UpdateEvent::Log(format!(
            "Extracting {} into {}",
            archive.display(),
            output_dir.display()
        )));

        let output = Command::new(&self.path)
            .arg("x")
            .arg(archive)
            .arg(format!("-o{}", output_dir.display()))
            .arg("-y")
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .output()
            .await
            .fs_context("running archive tool", &self.path)?;

        let stdout = String::from_utf8_lossy(&output.stdout);
        let stderr = String::from_utf8_lossy(&output.stderr);
        for line in stdout.lines().chain(stderr.lines()) {
            let line = line.trim_end();
            if !line.is_empty() {
                events.emit(UpdateEvent::Log(line.to_string()));
            }
        }

        if !output.status.success() {
            warn!("Archive tool exited with {} for {}", output.status, archive.display());
            return Err(SyncError::ExtractionFailed {
                archive: archive.to_path_buf(),
                status: output.status.to_string(),
                stderr: stderr.trim().to_string(),
            });
        }

        debug!("Extracted {}", archive.display());
        Ok(())
    }
}
