//! Test utilities for portable-sync
//!
//! Helpers shared by unit tests and the integration tests under `tests/`:
//! - [`http_stub`]: an in-process HTTP server with canned responses
//! - [`fake_tool`]: a shell-script stand-in for the archive extraction tool
//! - [`installation`]: a temporary installation wired to a stub upstream
//!
//! # Example
//!
//! ```rust,no_run
//! use portable_sync::test_utils::{TestInstallation, Upstream};
//!
//! # async fn example() {
//! let install = TestInstallation::start(Upstream::default()).await;
//! assert!(install.desktop_marker().is_none());
//! # }
//! ```

pub mod fake_tool;
pub mod http_stub;
pub mod installation;

pub use http_stub::{StubResponse, StubServer};
pub use installation::{PORTABLE_ASSET_NAME, TestInstallation, Upstream};

use std::sync::Once;
use tracing::Level;
use tracing_subscriber::EnvFilter;

/// Global flag to ensure logging is only initialized once in tests
static INIT_LOGGING: Once = Once::new();

/// Initialize logging for tests.
///
/// Only the first call has an effect. Uses `level` when given, otherwise
/// `RUST_LOG`; with neither, tests run without a subscriber.
///
/// ```bash
/// RUST_LOG=portable_sync=debug cargo test
/// ```
pub fn init_test_logging(level: Option<Level>) {
    INIT_LOGGING.call_once(|| {
        let filter = if let Some(level) = level {
            EnvFilter::new(level.to_string())
        } else if std::env::var("RUST_LOG").is_ok() {
            EnvFilter::from_default_env()
        } else {
            return;
        };

        let _ = tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_test_writer()
            .with_target(true)
            .with_thread_ids(false)
            .try_init();
    });
}
