//! portable-sync - keeps a portable Stormhen installation up to date
//!
//! A portable installation is made of two independently versioned components:
//! the desktop build itself and the portable-packaging wrapper around it.
//! portable-sync checks both against their latest upstream releases, downloads
//! whatever is stale, extracts it with an external archive tool, and swaps the
//! new payload into place so the installation is always either fully upgraded
//! or untouched.
//!
//! # Architecture Overview
//!
//! - [`update`] - the update pipeline: version markers, resolvers, downloads,
//!   extraction, payload swap, and the [`update::UpdateOrchestrator`] state machine
//! - [`core`] - error types and the event contract towards front-ends
//! - [`config`] - the [`config::UpdaterConfig`] value describing one installation
//! - [`utils`] - file system helpers, HTTP client setup, terminal rendering
//! - [`cli`] - the `portable-sync` command-line front-end
//!
//! # Installation Layout
//!
//! ```text
//! <base_dir>/
//! ├── portable-root/                    # installation root
//! │   └── app/                          # live payload, replaced on update
//! ├── installed_desktop_version.txt     # version markers
//! ├── installed_portable_version.txt
//! ├── update.log                        # timestamped activity log
//! ├── 7zr.exe                           # archive tool, fetched on first update
//! └── portable-sync.toml                # optional configuration
//! ```
//!
//! # Command-Line Usage
//!
//! ```bash
//! portable-sync check
//! portable-sync update
//! portable-sync status
//! ```

pub mod cli;
pub mod config;
pub mod constants;
pub mod core;
pub mod update;
pub mod utils;

// test_utils module is available for both unit tests and integration tests
#[cfg(any(test, feature = "test-utils"))]
pub mod test_utils;
