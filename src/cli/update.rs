//! Download and install the latest releases.

use super::CliConfig;
use crate::config::UpdaterConfig;
use crate::update::UpdateOrchestrator;
use anyhow::Result;
use clap::Args;
use colored::Colorize;
use tokio_util::sync::CancellationToken;
use tracing::debug;

/// Bring the installation up to date.
///
/// Checks both components first and only runs the update when one of them is
/// stale, unless `--force` is given. Ctrl-C cancels a running update; once the
/// new payload has been swapped in the update completes regardless.
#[derive(Args, Debug, Default)]
pub struct UpdateCommand {
    /// Reinstall even when both components are up to date.
    #[arg(short, long)]
    pub force: bool,
}

impl UpdateCommand {
    pub async fn execute(self, updater: UpdaterConfig, cli: &CliConfig) -> Result<()> {
        let events = cli.event_sink(&updater);
        let orchestrator = UpdateOrchestrator::new(updater, events)?;

        if !self.force {
            let report = orchestrator.check_staleness().await?;
            if !report.any_stale() {
                if !cli.quiet {
                    println!("{}", "Already up to date".green());
                }
                return Ok(());
            }
        }

        let cancel = CancellationToken::new();
        let interrupt = {
            let cancel = cancel.clone();
            tokio::spawn(async move {
                if tokio::signal::ctrl_c().await.is_ok() {
                    debug!("Interrupt received, cancelling update");
                    cancel.cancel();
                }
            })
        };

        let result = orchestrator.run_update(&cancel).await;
        interrupt.abort();

        let outcome = result?;
        if !cli.quiet {
            println!(
                "  Desktop build     {}\n  Portable wrapper  {}\n  Payload files     {}",
                outcome.desktop_version.green(),
                outcome.portable_version.green(),
                outcome.payload_files
            );
        }
        Ok(())
    }
}
