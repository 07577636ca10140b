//! Atomic file write operations using temp-and-rename strategy.
//!
//! A reader never observes a partially written file: it sees either the old
//! content or the new content.

use crate::core::{FsResultExt, SyncError};
use crate::utils::fs::dirs::ensure_dir;
use std::fs;
use std::io::Write;
use std::path::Path;

/// Atomically writes bytes to a file.
///
/// 1. Writes content to a sibling temporary file (`.tmp` extension)
/// 2. Syncs the temporary file to disk
/// 3. Renames the temporary file over the target path
///
/// Parent directories are created if missing.
pub fn atomic_write(path: &Path, content: &[u8]) -> Result<(), SyncError> {
    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
    {
        ensure_dir(parent)?;
    }

    let temp_path = path.with_extension("tmp");

    {
        let mut file = fs::File::create(&temp_path).fs_context("creating temp file", &temp_path)?;
        file.write_all(content).fs_context("writing temp file", &temp_path)?;
        file.sync_all().fs_context("syncing temp file", &temp_path)?;
    }

    fs::rename(&temp_path, path).fs_context("replacing file", path)
}

/// Convenience wrapper around [`atomic_write`] for strings.
pub fn safe_write(path: &Path, content: &str) -> Result<(), SyncError> {
    atomic_write(path, content.as_bytes())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_atomic_write_creates_parents_and_replaces() {
        let temp = tempdir().unwrap();
        let path = temp.path().join("nested/dir/marker.txt");

        safe_write(&path, "first").unwrap();
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "first");

        safe_write(&path, "second").unwrap();
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "second");
        assert!(!path.with_extension("tmp").exists());
    }
}
