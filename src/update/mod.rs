//! Update pipeline for a portable installation.
//!
//! Keeps two independently versioned components in sync with upstream: the
//! desktop build (latest version found through a redirect) and the portable
//! wrapper (latest GitHub release). A full update runs these steps in order,
//! aborting on the first failure:
//!
//! 1. Provision the archive tool if missing
//! 2. Resolve the latest version of both components
//! 3. Download the portable wrapper archive
//! 4. Download the desktop build
//! 5. Ensure the installation root exists
//! 6. Extract the portable wrapper into the installation root
//! 7. Extract the desktop build into a scratch directory
//! 8. Stage its payload subtree and swap it in for the live payload
//! 9. Remove the scratch directory
//! 10. Write both version markers
//! 11. Remove the downloaded archives
//!
//! # Module Structure
//!
//! - [`version_store`]: version marker files
//! - [`resolver`]: latest-version lookup
//! - [`downloader`]: streaming downloads with progress
//! - [`archive_tool`]: the external extraction executable
//! - [`swap`]: staged replacement of the payload directory
//! - [`orchestrator`]: the state machine tying it together
//!
//! # Example
//!
//! ```rust,no_run
//! use portable_sync::config::UpdaterConfig;
//! use portable_sync::core::NullSink;
//! use portable_sync::update::UpdateOrchestrator;
//! use std::sync::Arc;
//! use tokio_util::sync::CancellationToken;
//!
//! # async fn example() -> Result<(), portable_sync::core::SyncError> {
//! let config = UpdaterConfig::with_base_dir("D:/Stormhen");
//! let orchestrator = UpdateOrchestrator::new(config, Arc::new(NullSink))?;
//!
//! if orchestrator.check_staleness().await?.any_stale() {
//!     orchestrator.run_update(&CancellationToken::new()).await?;
//! }
//! # Ok(())
//! # }
//! ```

pub mod archive_tool;
pub mod downloader;
pub mod orchestrator;
pub mod resolver;
pub mod swap;
pub mod types;
pub mod version_store;

pub use archive_tool::ArchiveTool;
pub use downloader::{Downloader, ProgressTracker};
pub use orchestrator::{UpdateOrchestrator, UpdateOutcome};
pub use resolver::VersionResolver;
pub use swap::PayloadSwap;
pub use types::{Component, ReleaseInfo, StalenessReport, UpdateDecision};
pub use version_store::VersionStore;
