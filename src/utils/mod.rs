//! Utility modules: file system helpers, HTTP client setup, and terminal progress.

pub mod fs;
pub mod http;
pub mod progress;

pub use fs::{atomic_write, copy_tree, ensure_dir, remove_dir_all, safe_write};
pub use progress::{ProgressBar, TerminalRenderer};
