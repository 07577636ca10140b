//! Replacement of the live payload directory.
//!
//! The new payload is built in a sibling `<payload>.staging` directory. Commit
//! moves the live directory aside to `<payload>.previous`, renames staging into
//! place, and only then deletes the previous tree. If promotion fails the
//! previous tree is renamed back, so at rest the payload directory is always
//! either the old tree or the new one.

use crate::constants::{PREVIOUS_SUFFIX, STAGING_SUFFIX};
use crate::core::SyncError;
use crate::utils::fs::dirs::{recreate_dir, remove_dir_all, rename_dir};
use crate::utils::fs::copy_tree;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

const RENAME_ATTEMPTS: u32 = 3;
const RENAME_RETRY_DELAY: Duration = Duration::from_millis(500);

/// Staged replacement of one payload directory.
#[derive(Debug, Clone)]
pub struct PayloadSwap {
    live: PathBuf,
    staging: PathBuf,
    previous: PathBuf,
}

impl PayloadSwap {
    pub fn new(live: impl Into<PathBuf>) -> Self {
        let live = live.into();
        let name = live.file_name().map(|n| n.to_string_lossy().into_owned()).unwrap_or_default();
        Self {
            staging: live.with_file_name(format!("{name}.{STAGING_SUFFIX}")),
            previous: live.with_file_name(format!("{name}.{PREVIOUS_SUFFIX}")),
            live,
        }
    }

    pub fn live_path(&self) -> &Path {
        &self.live
    }

    pub fn staging_path(&self) -> &Path {
        &self.staging
    }

    pub fn previous_path(&self) -> &Path {
        &self.previous
    }

    /// Cleans up after an interrupted swap.
    ///
    /// A leftover previous tree is restored when the live directory is gone,
    /// and discarded otherwise. Leftover staging is always discarded.
    pub fn recover_leftovers(&self) -> Result<(), SyncError> {
        if self.previous.exists() {
            if self.live.exists() {
                debug!("Discarding leftover {}", self.previous.display());
                remove_dir_all(&self.previous)?;
            } else {
                info!("Restoring interrupted payload from {}", self.previous.display());
                rename_dir(&self.previous, &self.live)?;
            }
        }
        if self.staging.exists() {
            debug!("Discarding leftover {}", self.staging.display());
            remove_dir_all(&self.staging)?;
        }
        Ok(())
    }

    /// Copies `source` into a fresh staging directory. The live payload is not touched.
    ///
    /// Returns the number of files staged.
    pub fn stage(&self, source: &Path, cancel: &CancellationToken) -> Result<usize, SyncError> {
        if !source.is_dir() {
            return Err(SyncError::fs(
                "locating payload",
                source,
                std::io::Error::new(std::io::ErrorKind::NotFound, "extracted archive has no payload directory"),
            ));
        }
        recreate_dir(&self.staging)?;
        let copied = copy_tree(source, &self.staging, cancel)?;
        debug!("Staged {} files in {}", copied, self.staging.display());
        Ok(copied)
    }

    /// Promotes staging to live.
    ///
    /// Failing to delete the previous tree afterwards is only logged; the swap
    /// has already taken effect.
    pub fn commit(&self) -> Result<(), SyncError> {
        let had_live = self.live.exists();
        if had_live {
            rename_with_retry(&self.live, &self.previous)?;
        }

        if let Err(e) = rename_with_retry(&self.staging, &self.live) {
            warn!("Promoting {} failed: {}", self.staging.display(), e);
            if had_live && let Err(restore) = rename_with_retry(&self.previous, &self.live) {
                warn!("Restoring {} failed: {}", self.live.display(), restore);
            }
            return Err(e);
        }

        if had_live && let Err(e) = remove_dir_all(&self.previous) {
            warn!("Could not remove {}: {}", self.previous.display(), e);
        }
        info!("Payload replaced at {}", self.live.display());
        Ok(())
    }

    /// Removes the staging directory, logging instead of failing.
    pub fn discard_staging(&self) {
        if let Err(e) = remove_dir_all(&self.staging) {
            warn!("Could not remove {}: {}", self.staging.display(), e);
        }
    }
}

// Renames can fail transiently on Windows while a scanner holds a handle.
fn rename_with_retry(from: &Path, to: &Path) -> Result<(), SyncError> {
    let mut attempt = 1;
    loop {
        match rename_dir(from, to) {
            Ok(()) => return Ok(()),
            Err(e) if attempt < RENAME_ATTEMPTS && from.exists() && !to.exists() => {
                debug!("Rename attempt {} of {} failed: {}", attempt, RENAME_ATTEMPTS, e);
                std::thread::sleep(RENAME_RETRY_DELAY);
                attempt += 1;
            }
            Err(e) => return Err(e),
        }
    }
}
