//! Version marker files.
//!
//! A marker is a single trimmed line holding the last successfully installed
//! version of a component. A missing file means "never installed".

use crate::core::{FsResultExt, SyncError};
use crate::utils::fs::safe_write;
use std::path::Path;
use tracing::debug;

/// Reads and writes version marker files.
pub struct VersionStore;

impl VersionStore {
    /// Returns the trimmed marker content, or `None` if the file does not exist.
    pub fn read(path: &Path) -> Result<Option<String>, SyncError> {
        match std::fs::read_to_string(path) {
            Ok(content) => Ok(Some(content.trim().to_string())),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!("No version marker at {}", path.display());
                Ok(None)
            }
            Err(e) => Err(e).fs_context("reading version marker", path),
        }
    }

    /// Overwrites the marker with exactly `version`.
    pub fn write(path: &Path, version: &str) -> Result<(), SyncError> {
        debug!("Writing version marker {} = {}", path.display(), version);
        safe_write(path, version)
    }
}
