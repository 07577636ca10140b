//! Show the local state of the installation.

use super::CliConfig;
use crate::config::UpdaterConfig;
use crate::update::{Component, PayloadSwap, VersionStore};
use anyhow::Result;
use clap::Args;
use colored::Colorize;
use std::path::Path;

/// Show installed versions and paths. Makes no network requests.
#[derive(Args, Debug, Default)]
pub struct StatusCommand {}

impl StatusCommand {
    pub fn execute(self, updater: &UpdaterConfig, cli: &CliConfig) -> Result<()> {
        let desktop = VersionStore::read(&updater.desktop_marker_path())?;
        let portable = VersionStore::read(&updater.portable_marker_path())?;
        if cli.quiet {
            return Ok(());
        }

        for (component, version) in [(Component::Desktop, desktop), (Component::Portable, portable)] {
            let version = match version {
                Some(v) => v.green(),
                None => "not installed".yellow(),
            };
            println!("{:<17} {}", component.display_name(), version);
        }

        println!();
        print_path("Base directory", &updater.base_dir);
        print_path("Payload", &updater.payload_dir());
        print_path("Archive tool", &updater.tool_path());
        print_path("Activity log", &updater.log_path());

        let swap = PayloadSwap::new(updater.payload_dir());
        for leftover in [swap.staging_path(), swap.previous_path()] {
            if leftover.exists() {
                println!(
                    "\n{} {} is left over from an interrupted update and will be cleaned up by the next update",
                    "Note:".yellow(),
                    leftover.display()
                );
            }
        }
        Ok(())
    }
}

fn print_path(label: &str, path: &Path) {
    let state = if path.exists() { "present".green() } else { "missing".dimmed() };
    println!("{:<17} {} ({})", label, path.display(), state);
}
