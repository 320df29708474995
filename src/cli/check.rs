//! The `check` command: one full update check cycle.

use anyhow::Result;
use clap::Parser;
use colored::Colorize;
use std::sync::Arc;

use crate::cli::progress;
use crate::error::UpdateError;
use crate::updater::{CheckOutcome, Updater};

/// Arguments for `skylift check`.
#[derive(Parser, Debug, Default)]
pub struct CheckCommand {}

impl CheckCommand {
    /// Run a check cycle and report the outcome.
    ///
    /// All three terminal conditions exit 0: an update staged, no viable
    /// update, and already up to date. Only real failures propagate.
    pub async fn execute(self, updater: Arc<Updater>, quiet: bool) -> Result<()> {
        let renderer = progress::spawn(updater.subscribe(), quiet);
        let outcome = updater.check().await;
        if let Some(renderer) = renderer {
            if matches!(outcome, Ok(CheckOutcome::UpdateReady { .. })) {
                // The renderer exits on its own once it draws the final
                // Downloaded state.
                let _ = renderer.await;
            } else {
                renderer.abort();
            }
        }

        match outcome {
            Ok(CheckOutcome::UpdateReady { release, bundle }) => {
                println!(
                    "{} {} downloaded and validated",
                    "Update".green().bold(),
                    release.tag
                );
                if !release.display_name.is_empty() {
                    println!("  {}", release.display_name);
                }
                if !release.info_url.is_empty() {
                    println!("  {}", release.info_url.dimmed());
                }
                println!("  staged at {}", bundle.path().display());
                println!("Run {} to install and relaunch.", "skylift update".bold());
                Ok(())
            }
            Ok(CheckOutcome::NoViableUpdate) => {
                println!("No viable update in the release feed.");
                Ok(())
            }
            Err(UpdateError::AlreadyUpToDate { current, .. }) => {
                println!("{} (running {current})", "Already up to date".green());
                Ok(())
            }
            Err(e) => Err(e.into()),
        }
    }
}
