//! Report which components are out of date.

use super::CliConfig;
use crate::config::UpdaterConfig;
use crate::core::{EventSink, LogFile};
use crate::update::{StalenessReport, UpdateOrchestrator};
use anyhow::{Context, Result};
use clap::Args;
use colored::Colorize;
use std::sync::Arc;

/// Compare installed versions with the latest upstream releases.
///
/// Read-only: nothing is downloaded or written apart from the activity log.
#[derive(Args, Debug, Default)]
pub struct CheckCommand {
    /// Print the report as JSON.
    #[arg(long)]
    pub json: bool,
}

impl CheckCommand {
    pub async fn execute(self, updater: UpdaterConfig, cli: &CliConfig) -> Result<()> {
        // Decisions are printed below, so activity only goes to the log file
        let events: Arc<dyn EventSink> = Arc::new(LogFile::new(updater.log_path()));
        let orchestrator = UpdateOrchestrator::new(updater, events)?;

        if !cli.quiet && !self.json {
            println!("{}", "Checking for updates...".cyan());
        }
        let report = orchestrator.check_staleness().await?;

        if self.json {
            let json = serde_json::to_string_pretty(&report).context("Failed to serialize report")?;
            println!("{json}");
        } else if !cli.quiet {
            print_report(&report);
        }
        Ok(())
    }
}

fn print_report(report: &StalenessReport) {
    for decision in report.decisions() {
        println!("  {}", decision.summary());
    }
    if report.any_stale() {
        println!("\n{}", "Run `portable-sync update` to install the latest versions".yellow());
    } else {
        println!("\n{}", "Everything is up to date".green());
    }
}
