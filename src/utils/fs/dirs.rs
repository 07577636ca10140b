//! Directory operations for creating, copying, moving, and removing directories.
//!
//! All functions are synchronous; async callers run them on the blocking pool.

use crate::core::{FsResultExt, SyncError};
use std::fs;
use std::path::{Path, PathBuf};
use tokio_util::sync::CancellationToken;
use walkdir::WalkDir;

/// Ensures a directory exists, creating it and all parent directories if necessary.
///
/// # Errors
///
/// Fails when the path exists but is not a directory, or creation fails.
pub fn ensure_dir(path: &Path) -> Result<(), SyncError> {
    if !path.exists() {
        fs::create_dir_all(path).fs_context("creating directory", path)?;
    } else if !path.is_dir() {
        return Err(SyncError::fs(
            "creating directory",
            path,
            std::io::Error::new(std::io::ErrorKind::AlreadyExists, "path exists but is not a directory"),
        ));
    }
    Ok(())
}

/// Recursively removes a directory. A missing directory is not an error.
pub fn remove_dir_all(path: &Path) -> Result<(), SyncError> {
    if path.exists() {
        fs::remove_dir_all(path).fs_context("removing directory", path)?;
    }
    Ok(())
}

/// Removes `path` if it exists, then creates it empty.
pub fn recreate_dir(path: &Path) -> Result<(), SyncError> {
    remove_dir_all(path)?;
    fs::create_dir_all(path).fs_context("creating directory", path)
}

/// Renames a directory, failing if the destination already exists.
pub fn rename_dir(from: &Path, to: &Path) -> Result<(), SyncError> {
    if to.exists() {
        return Err(SyncError::fs(
            "renaming directory",
            to,
            std::io::Error::new(std::io::ErrorKind::AlreadyExists, "destination already exists"),
        ));
    }
    fs::rename(from, to).fs_context("renaming directory", from)
}

/// Copies the tree under `src` into `dst`, overwriting existing files.
///
/// All subdirectories (nested included) are created under `dst` first, then
/// every file is copied. Each destination path is `src`'s path with the `src`
/// prefix replaced by `dst`. Symlinks and special files are skipped.
///
/// The token is checked before each file; a cancelled copy returns
/// [`SyncError::Cancelled`] and leaves whatever was already copied.
///
/// Returns the number of files copied.
pub fn copy_tree(src: &Path, dst: &Path, cancel: &CancellationToken) -> Result<usize, SyncError> {
    if !src.is_dir() {
        return Err(SyncError::fs(
            "reading directory",
            src,
            std::io::Error::new(std::io::ErrorKind::NotFound, "source directory does not exist"),
        ));
    }
    ensure_dir(dst)?;

    let mut files = Vec::new();
    for entry in WalkDir::new(src).min_depth(1).follow_links(false) {
        let entry = entry.map_err(|e| walk_error(src, e))?;
        let target = translate(src, dst, entry.path())?;
        let file_type = entry.file_type();
        if file_type.is_dir() {
            fs::create_dir_all(&target).fs_context("creating directory", &target)?;
        } else if file_type.is_file() {
            files.push((entry.into_path(), target));
        }
    }

    for (from, to) in &files {
        if cancel.is_cancelled() {
            return Err(SyncError::Cancelled);
        }
        fs::copy(from, to).fs_context("copying file", from)?;
    }

    Ok(files.len())
}

fn translate(src: &Path, dst: &Path, path: &Path) -> Result<PathBuf, SyncError> {
    let relative = path.strip_prefix(src).map_err(|_| {
        SyncError::fs(
            "copying directory",
            path,
            std::io::Error::new(std::io::ErrorKind::InvalidInput, "path escapes the source tree"),
        )
    })?;
    Ok(dst.join(relative))
}

fn walk_error(root: &Path, error: walkdir::Error) -> SyncError {
    let path = error.path().map(Path::to_path_buf).unwrap_or_else(|| root.to_path_buf());
    let io = error
        .into_io_error()
        .unwrap_or_else(|| std::io::Error::other("filesystem loop detected"));
    SyncError::fs("reading directory", path, io)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn snapshot(root: &Path) -> Vec<(PathBuf, Vec<u8>)> {
        let mut entries: Vec<_> = WalkDir::new(root)
            .min_depth(1)
            .into_iter()
            .map(|e| e.unwrap())
            .map(|e| {
                let rel = e.path().strip_prefix(root).unwrap().to_path_buf();
                let content = if e.file_type().is_file() {
                    std::fs::read(e.path()).unwrap()
                } else {
                    Vec::new()
                };
                (rel, content)
            })
            .collect();
        entries.sort();
        entries
    }

    #[test]
    fn test_ensure_dir() {
        let temp = tempdir().unwrap();
        let test_dir = temp.path().join("a/b/c");

        ensure_dir(&test_dir).unwrap();
        assert!(test_dir.is_dir());
        ensure_dir(&test_dir).unwrap();
    }

    #[test]
    fn test_ensure_dir_on_file() {
        let temp = tempdir().unwrap();
        let file_path = temp.path().join("file.txt");
        std::fs::write(&file_path, "content").unwrap();

        assert!(ensure_dir(&file_path).is_err());
    }

    #[test]
    fn test_copy_tree_nested() {
        let temp = tempdir().unwrap();
        let src = temp.path().join("src");
        let dst = temp.path().join("dst");
        std::fs::create_dir_all(src.join("sub/deeper")).unwrap();
        std::fs::create_dir_all(src.join("empty")).unwrap();
        std::fs::write(src.join("root.txt"), "root").unwrap();
        std::fs::write(src.join("sub/deeper/leaf.txt"), "leaf").unwrap();

        let copied = copy_tree(&src, &dst, &CancellationToken::new()).unwrap();

        assert_eq!(copied, 2);
        assert_eq!(std::fs::read_to_string(dst.join("root.txt")).unwrap(), "root");
        assert_eq!(std::fs::read_to_string(dst.join("sub/deeper/leaf.txt")).unwrap(), "leaf");
        assert!(dst.join("empty").is_dir());
    }

    #[test]
    fn test_copy_tree_overwrites_existing_files() {
        let temp = tempdir().unwrap();
        let src = temp.path().join("src");
        let dst = temp.path().join("dst");
        std::fs::create_dir_all(&src).unwrap();
        std::fs::create_dir_all(&dst).unwrap();
        std::fs::write(src.join("a.txt"), "new").unwrap();
        std::fs::write(dst.join("a.txt"), "old content that is longer").unwrap();
        std::fs::write(dst.join("keep.txt"), "untouched").unwrap();

        copy_tree(&src, &dst, &CancellationToken::new()).unwrap();

        assert_eq!(std::fs::read_to_string(dst.join("a.txt")).unwrap(), "new");
        assert_eq!(std::fs::read_to_string(dst.join("keep.txt")).unwrap(), "untouched");
    }

    #[test]
    fn test_copy_tree_is_idempotent() {
        let temp = tempdir().unwrap();
        let src = temp.path().join("src");
        std::fs::create_dir_all(src.join("x/y")).unwrap();
        std::fs::write(src.join("x/one.bin"), [0u8, 1, 2, 3]).unwrap();
        std::fs::write(src.join("x/y/two.bin"), [9u8; 100]).unwrap();

        let once = temp.path().join("once");
        let twice = temp.path().join("twice");
        let token = CancellationToken::new();
        copy_tree(&src, &once, &token).unwrap();
        copy_tree(&src, &twice, &token).unwrap();
        copy_tree(&src, &twice, &token).unwrap();

        assert_eq!(snapshot(&once), snapshot(&twice));
    }

    #[test]
    fn test_copy_tree_missing_source() {
        let temp = tempdir().unwrap();
        let err = copy_tree(&temp.path().join("nope"), &temp.path().join("dst"), &CancellationToken::new())
            .unwrap_err();
        assert!(matches!(err, SyncError::FileSystem { .. }));
    }

    #[test]
    fn test_copy_tree_cancelled() {
        let temp = tempdir().unwrap();
        let src = temp.path().join("src");
        std::fs::create_dir_all(&src).unwrap();
        std::fs::write(src.join("a.txt"), "a").unwrap();

        let token = CancellationToken::new();
        token.cancel();
        let err = copy_tree(&src, &temp.path().join("dst"), &token).unwrap_err();
        assert!(err.is_cancelled());
        assert!(!temp.path().join("dst/a.txt").exists());
    }

    #[test]
    fn test_recreate_dir_empties() {
        let temp = tempdir().unwrap();
        let dir = temp.path().join("d");
        std::fs::create_dir_all(&dir).unwrap();
        std::fs::write(dir.join("f"), "x").unwrap();

        recreate_dir(&dir).unwrap();
        assert!(dir.is_dir());
        assert_eq!(std::fs::read_dir(&dir).unwrap().count(), 0);
    }

    #[test]
    fn test_rename_dir_refuses_existing_destination() {
        let temp = tempdir().unwrap();
        let a = temp.path().join("a");
        let b = temp.path().join("b");
        std::fs::create_dir_all(&a).unwrap();
        std::fs::create_dir_all(&b).unwrap();

        assert!(rename_dir(&a, &b).is_err());
        assert!(a.exists());
    }

    #[test]
    fn test_remove_dir_all_nonexistent() {
        let temp = tempdir().unwrap();
        remove_dir_all(&temp.path().join("nonexistent")).unwrap();
    }
}
