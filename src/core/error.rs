//! Error handling for portable-sync
//!
//! The error system follows two principles:
//! 1. **Strongly-typed errors** ([`SyncError`]) returned by every update component
//! 2. **User-friendly messages** ([`ErrorContext`]) with actionable suggestions for the CLI
//!
//! Library code returns `Result<T, SyncError>`. The command layer works with
//! [`anyhow::Error`] and converts failures through [`user_friendly_error`] right
//! before printing them.
//!
//! # Examples
//!
//! ```rust,no_run
//! use portable_sync::core::{SyncError, user_friendly_error};
//!
//! let error = SyncError::AssetNotFound {
//!     pattern: "*.7z".to_string(),
//!     tag: "v3.2.0".to_string(),
//! };
//! let ctx = user_friendly_error(anyhow::Error::from(error));
//! ctx.display();
//! ```

use colored::Colorize;
use std::fmt;
use std::path::PathBuf;
use thiserror::Error;

/// Every failure the update pipeline can surface.
///
/// None of these are fatal to the process: the operation that produced one is
/// aborted and can be retried. Transient and permanent failures are reported
/// identically.
#[derive(Error, Debug)]
pub enum SyncError {
    /// A request failed in transit or returned a non-success status.
    #[error("Request to {url} failed: {reason}")]
    Transport {
        /// The URL that was requested.
        url: String,
        /// Status line or transport error text.
        reason: String,
    },

    /// The redirect endpoint answered with something other than a redirect.
    #[error("Expected a redirect from {url} but got HTTP {status}")]
    UnexpectedResponse {
        /// The URL that was requested.
        url: String,
        /// The status code that was received.
        status: u16,
    },

    /// No version token could be extracted from the response.
    #[error("Could not determine version from {source_name}: {reason}")]
    VersionParse {
        /// Where the version was expected (header, JSON document, ...).
        source_name: String,
        /// What was wrong with it.
        reason: String,
    },

    /// No release asset matched the configured name pattern.
    #[error("No asset matching '{pattern}' in release {tag}")]
    AssetNotFound {
        /// The glob the asset names were matched against.
        pattern: String,
        /// The release tag whose assets were searched.
        tag: String,
    },

    /// Extraction was requested before the archive tool was provisioned.
    #[error("Archive tool not found at {}", path.display())]
    ToolMissing {
        /// Where the tool was expected.
        path: PathBuf,
    },

    /// The archive tool ran but reported failure.
    #[error("Extracting {} failed with {status}", archive.display())]
    ExtractionFailed {
        /// The archive being extracted.
        archive: PathBuf,
        /// Exit status description of the tool.
        status: String,
        /// Captured standard error of the tool.
        stderr: String,
    },

    /// A directory or file operation failed.
    #[error("File system error while {operation}: {}", path.display())]
    FileSystem {
        /// What was being done.
        operation: String,
        /// The path it was being done to.
        path: PathBuf,
        /// The underlying IO error.
        #[source]
        source: std::io::Error,
    },

    /// Another check or update is already running on this orchestrator.
    #[error("An update operation is already in progress")]
    Busy,

    /// The operation was cancelled before it completed.
    #[error("Operation cancelled")]
    Cancelled,

    /// The configuration file could not be read or parsed.
    #[error("Invalid configuration in {}: {reason}", path.display())]
    Config {
        /// The configuration file.
        path: PathBuf,
        /// Parse or IO error text.
        reason: String,
    },
}

impl SyncError {
    /// Builds a [`SyncError::FileSystem`] from an IO error.
    pub fn fs(operation: impl Into<String>, path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::FileSystem {
            operation: operation.into(),
            path: path.into(),
            source,
        }
    }

    /// Builds a [`SyncError::Transport`] from a `reqwest` error.
    pub fn transport(url: &str, error: &reqwest::Error) -> Self {
        Self::Transport {
            url: url.to_string(),
            reason: error.to_string(),
        }
    }

    /// Whether this error is a cancellation rather than a failure.
    #[must_use]
    pub const fn is_cancelled(&self) -> bool {
        matches!(self, Self::Cancelled)
    }
}

/// Extension for attaching [`SyncError::FileSystem`] context to IO results.
pub trait FsResultExt<T> {
    /// Maps an IO error to [`SyncError::FileSystem`] naming the operation and path.
    fn fs_context(self, operation: &str, path: &std::path::Path) -> Result<T, SyncError>;
}

impl<T> FsResultExt<T> for std::io::Result<T> {
    fn fs_context(self, operation: &str, path: &std::path::Path) -> Result<T, SyncError> {
        self.map_err(|e| SyncError::fs(operation, path, e))
    }
}

/// Error wrapper adding a suggestion and details for terminal display.
#[derive(Debug)]
pub struct ErrorContext {
    /// The underlying error message.
    pub message: String,
    /// Optional suggestion for resolving the error.
    pub suggestion: Option<String>,
    /// Optional additional details.
    pub details: Option<String>,
}

impl ErrorContext {
    /// Creates a context with only the error message.
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            suggestion: None,
            details: None,
        }
    }

    /// Adds a suggestion for resolving the error.
    #[must_use]
    pub fn with_suggestion(mut self, suggestion: impl Into<String>) -> Self {
        self.suggestion = Some(suggestion.into());
        self
    }

    /// Adds details explaining the error.
    #[must_use]
    pub fn with_details(mut self, details: impl Into<String>) -> Self {
        self.details = Some(details.into());
        self
    }

    /// Prints the error to stderr with colours.
    pub fn display(&self) {
        eprintln!("{} {}", "error:".red().bold(), self.message);
        if let Some(details) = &self.details {
            eprintln!("{} {}", "details:".yellow(), details);
        }
        if let Some(suggestion) = &self.suggestion {
            eprintln!("{} {}", "suggestion:".green(), suggestion);
        }
    }
}

impl fmt::Display for ErrorContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)?;
        if let Some(details) = &self.details {
            write!(f, "\nDetails: {details}")?;
        }
        if let Some(suggestion) = &self.suggestion {
            write!(f, "\nSuggestion: {suggestion}")?;
        }
        Ok(())
    }
}

impl std::error::Error for ErrorContext {}

/// Converts any error into an [`ErrorContext`] with a suggestion where one is known.
///
/// The full `anyhow` chain is flattened into the message so context added by the
/// command layer is preserved.
#[must_use]
pub fn user_friendly_error(error: anyhow::Error) -> ErrorContext {
    let message = format!("{error:#}");

    let Some(sync_error) = error.chain().find_map(|e| e.downcast_ref::<SyncError>()) else {
        return ErrorContext::new(message);
    };

    match sync_error {
        SyncError::Transport { .. } => ErrorContext::new(message)
            .with_suggestion("Check your internet connection and try again"),
        SyncError::UnexpectedResponse { .. } | SyncError::VersionParse { .. } => {
            ErrorContext::new(message)
                .with_suggestion("The upstream endpoint may have changed; check the URLs in your configuration")
        }
        SyncError::AssetNotFound { pattern, .. } => ErrorContext::new(message)
            .with_suggestion(format!("Adjust portable_asset_pattern (currently '{pattern}')")),
        SyncError::ToolMissing { .. } => ErrorContext::new(message)
            .with_suggestion("Run `portable-sync update` so the extractor is downloaded first"),
        SyncError::ExtractionFailed { stderr, .. } => {
            let ctx = ErrorContext::new(message)
                .with_suggestion("The download may be corrupt; run the update again");
            if stderr.trim().is_empty() {
                ctx
            } else {
                ctx.with_details(stderr.trim().to_string())
            }
        }
        SyncError::FileSystem { source, .. } => {
            let ctx = ErrorContext::new(message);
            if source.kind() == std::io::ErrorKind::PermissionDenied {
                ctx.with_suggestion("Check that the installation is not running and that you can write to it")
            } else {
                ctx.with_suggestion("Check that the installation directory is accessible")
            }
        }
        SyncError::Busy => ErrorContext::new(message)
            .with_suggestion("Wait for the running update to finish"),
        SyncError::Cancelled => ErrorContext::new(message)
            .with_details("No version markers were changed"),
        SyncError::Config { .. } => ErrorContext::new(message)
            .with_suggestion("Fix or remove the configuration file to use the defaults"),
    }
}
