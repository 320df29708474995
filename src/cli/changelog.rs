//! The `changelog` command: print localized release notes.

use anyhow::Result;
use clap::Parser;
use std::sync::Arc;

use crate::release::select;
use crate::updater::Updater;

/// Arguments for `skylift changelog`.
#[derive(Parser, Debug, Default)]
pub struct ChangelogCommand {}

impl ChangelogCommand {
    /// Resolve and print the changelog of the release a check would act on.
    ///
    /// When a viable newer release exists its notes are printed; when the
    /// feed maximum is the running version (or older) the newest release's
    /// notes are printed instead, so `changelog` always answers "what is in
    /// the latest build".
    pub async fn execute(self, updater: Arc<Updater>) -> Result<()> {
        let releases = updater.releases().await?;
        let config = updater.config();

        let selected = select::find_viable_update(
            &releases,
            updater.current_version(),
            config.effective_release_prefix(),
            config.allow_prereleases,
        );

        let release = match selected {
            Ok(Some((release, _))) => release,
            // Up to date, or the newest release lacks a usable asset; the
            // notes of the feed maximum are still the right answer.
            Ok(None) | Err(_) => match releases
                .iter()
                .filter(|r| config.allow_prereleases || !r.prerelease)
                .max()
            {
                Some(release) => release,
                None => {
                    println!("The release feed is empty.");
                    return Ok(());
                }
            },
        };

        let text = updater.localized_changelog(release).await?;
        if !release.display_name.is_empty() {
            println!("# {}\n", release.display_name);
        }
        println!("{text}");
        Ok(())
    }
}
