//! Command-line interface for portable-sync.
//!
//! # Available Commands
//!
//! - `check` - Compare installed versions with the latest upstream releases
//! - `update` - Download and install whatever is stale
//! - `status` - Show installed versions and paths without network access
//!
//! # Usage
//!
//! ```bash
//! # Is anything out of date?
//! portable-sync check
//!
//! # Update the installation in D:\Stormhen
//! portable-sync --base-dir D:\Stormhen update
//!
//! # Reinstall even if versions match, without progress bars
//! portable-sync --no-progress update --force
//! ```
//!
//! # Global Options
//!
//! - `--verbose` - Enable debug diagnostics
//! - `--quiet` - Suppress everything except errors
//! - `--no-progress` - Disable progress bars
//! - `--config <path>` - Configuration file (default `portable-sync.toml` in the base directory)
//! - `--base-dir <path>` - Directory holding the installation (default: current directory)
//!
//! # Error Handling
//!
//! Commands return [`anyhow::Result`]; `main` turns failures into a
//! [`crate::core::ErrorContext`] and exits with status 1.

mod check;
mod status;
mod update;

use crate::config::UpdaterConfig;
use crate::core::{EventSink, FanOut, LogFile};
use crate::utils::TerminalRenderer;
use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

/// Settings derived from the global flags.
///
/// Kept separate from [`Cli`] so tests can drive commands without parsing.
#[derive(Debug, Clone, Default)]
pub struct CliConfig {
    /// Default log level when `RUST_LOG` is unset. `None` disables diagnostics.
    pub log_level: Option<String>,
    /// Suppress activity output.
    pub quiet: bool,
    /// Disable progress bars.
    pub no_progress: bool,
    /// Explicit configuration file.
    pub config_path: Option<PathBuf>,
    /// Explicit base directory.
    pub base_dir: Option<PathBuf>,
}

impl CliConfig {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Installs the global `tracing` subscriber writing to stderr.
    ///
    /// Only the first call in a process has an effect.
    pub fn init_logging(&self) {
        let filter = if std::env::var("RUST_LOG").is_ok() {
            EnvFilter::from_default_env()
        } else if let Some(level) = &self.log_level {
            EnvFilter::new(format!("portable_sync={level}"))
        } else {
            return;
        };

        let _ = tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_writer(std::io::stderr)
            .with_target(false)
            .try_init();
    }

    /// Loads the updater configuration and applies `--base-dir`.
    pub async fn load_updater_config(&self) -> Result<UpdaterConfig> {
        let lookup_dir = self.base_dir.clone().unwrap_or_else(|| PathBuf::from("."));
        let path = UpdaterConfig::locate(self.config_path.as_deref(), &lookup_dir);
        let mut config = UpdaterConfig::load(&path)
            .await
            .with_context(|| format!("Failed to load configuration from {}", path.display()))?;

        if let Some(base_dir) = &self.base_dir {
            config.base_dir = base_dir.clone();
        }
        Ok(config)
    }

    /// Event sink for commands: the terminal renderer plus the persistent log.
    pub fn event_sink(&self, config: &UpdaterConfig) -> Arc<dyn EventSink> {
        Arc::new(FanOut::new(vec![
            Arc::new(TerminalRenderer::new(self.quiet).with_progress(!self.no_progress)),
            Arc::new(LogFile::new(config.log_path())),
        ]))
    }
}

/// Keeps a portable Stormhen installation in sync with upstream releases.
#[derive(Parser)]
#[command(
    name = "portable-sync",
    about = "Keep a portable installation in sync with upstream releases",
    version,
    long_about = "portable-sync checks the desktop build and the portable wrapper against their latest \
                  upstream releases, downloads whatever is stale, and swaps the new payload into place."
)]
pub struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable debug diagnostics on stderr.
    #[arg(short, long, global = true, conflicts_with = "quiet")]
    verbose: bool,

    /// Suppress all output except errors.
    #[arg(short, long, global = true)]
    quiet: bool,

    /// Path to the configuration file.
    ///
    /// Defaults to `PORTABLE_SYNC_CONFIG`, then `portable-sync.toml` in the base directory.
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Directory holding the installation, markers, and log.
    #[arg(long, global = true)]
    base_dir: Option<PathBuf>,

    /// Disable progress bars.
    #[arg(long, global = true)]
    no_progress: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Compare installed versions with the latest releases.
    Check(check::CheckCommand),

    /// Download and install the latest releases.
    Update(update::UpdateCommand),

    /// Show installed versions and paths.
    Status(status::StatusCommand),
}

impl Cli {
    /// Runs the selected command with settings from the parsed flags.
    pub async fn execute(self) -> Result<()> {
        let config = self.build_config();
        self.execute_with_config(config).await
    }

    /// Translates the global flags into a [`CliConfig`].
    #[must_use]
    pub fn build_config(&self) -> CliConfig {
        let log_level = if self.verbose {
            Some("debug".to_string())
        } else if self.quiet {
            None
        } else {
            Some("warn".to_string())
        };

        CliConfig {
            log_level,
            quiet: self.quiet,
            no_progress: self.no_progress,
            config_path: self.config.clone(),
            base_dir: self.base_dir.clone(),
        }
    }

    /// Runs the selected command with an explicit [`CliConfig`].
    pub async fn execute_with_config(self, config: CliConfig) -> Result<()> {
        config.init_logging();
        let updater = config.load_updater_config().await?;

        match self.command {
            Commands::Check(cmd) => cmd.execute(updater, &config).await,
            Commands::Update(cmd) => cmd.execute(updater, &config).await,
            Commands::Status(cmd) => cmd.execute(&updater, &config),
        }
    }
}

#[cfg(test)]
mod tests;
