//! The `update` command: check, then install and relaunch.

use anyhow::Result;
use clap::Parser;
use colored::Colorize;
use std::sync::Arc;

use crate::cli::progress;
use crate::error::UpdateError;
use crate::updater::{CheckOutcome, Updater};

/// Arguments for `skylift update`.
#[derive(Parser, Debug, Default)]
pub struct UpdateCommand {
    /// Download and validate only; report instead of installing.
    #[arg(long)]
    pub dry_run: bool,
}

impl UpdateCommand {
    /// Run a check cycle and install the staged bundle when one results.
    ///
    /// A successful install relaunches the application and terminates this
    /// process; reaching the end of this function means no install happened
    /// (or `--dry-run` asked for exactly that).
    pub async fn execute(self, updater: Arc<Updater>, quiet: bool) -> Result<()> {
        let renderer = progress::spawn(updater.subscribe(), quiet);
        let outcome = updater.check().await;
        if let Some(renderer) = renderer {
            if matches!(outcome, Ok(CheckOutcome::UpdateReady { .. })) {
                let _ = renderer.await;
            } else {
                renderer.abort();
            }
        }

        let (release, bundle) = match outcome {
            Ok(CheckOutcome::UpdateReady { release, bundle }) => (release, bundle),
            Ok(CheckOutcome::NoViableUpdate) => {
                println!("No viable update in the release feed.");
                return Ok(());
            }
            Err(UpdateError::AlreadyUpToDate { current, .. }) => {
                println!("{} (running {current})", "Already up to date".green());
                return Ok(());
            }
            Err(e) => return Err(e.into()),
        };

        if self.dry_run {
            println!(
                "Would install {} from {} (dry run)",
                release.tag,
                bundle.path().display()
            );
            return Ok(());
        }

        println!("Installing {} and relaunching...", release.tag);
        updater.install(&bundle).await?;
        Ok(())
    }
}
