//! File system helpers used by the update pipeline.

pub mod atomic;
pub mod dirs;

pub use atomic::{atomic_write, safe_write};
pub use dirs::{copy_tree, ensure_dir, recreate_dir, remove_dir_all, rename_dir};
