//! Command-line interface for the skylift update engine.
//!
//! The binary is the "presentation layer" collaborator of the engine: it
//! assembles an [`Updater`](crate::updater::Updater) from configuration and
//! flags, observes the state channel, and renders progress. All update logic
//! lives in the library; each command here is a thin driver.
//!
//! # Available Commands
//!
//! - `check` - run one full check cycle and report whether an update was
//!   staged
//! - `update` - `check`, then install the staged bundle and relaunch
//! - `changelog` - resolve and print the localized release notes
//!
//! # Global Options
//!
//! All commands accept the same global options:
//! - `--owner` / `--repo` - the GitHub repository publishing releases
//! - `--prefix` - asset base name when it differs from the repository name
//! - `--allow-prereleases` - make prereleases eligible for selection
//! - `--skip-signing` - skip signing-identity validation (unsigned builds)
//! - `--langs` - preferred languages for release notes, comma-separated
//! - `--fixture` - serve releases from a JSON file instead of the network
//! - `--config` - path to an alternate configuration file
//! - `--verbose` / `--quiet` - output level
//!
//! Flags overlay the configuration file: anything given on the command line
//! wins over `~/.skylift/config.toml`.
//!
//! # Examples
//!
//! ```bash
//! # Check against the live feed
//! skylift --owner acme --repo myapp check
//!
//! # Full offline run against a canned feed
//! skylift --fixture tests/data/releases.json --skip-signing update
//!
//! # Release notes in Simplified Chinese, falling back to English
//! skylift --owner acme --repo myapp --langs zh-CN,en changelog
//! ```

mod changelog;
mod check;
mod progress;
mod update;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::sync::Arc;

use crate::config::UpdaterConfig;
use crate::source::{FixtureReleaseSource, GithubReleaseSource, ReleaseSource};
use crate::updater::Updater;

/// Top-level CLI for the skylift update engine.
#[derive(Parser)]
#[command(
    name = "skylift",
    about = "Self-update engine for desktop apps distributed through GitHub releases",
    version,
    author
)]
pub struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// GitHub account or organization owning the release repository.
    #[arg(long, global = true)]
    owner: Option<String>,

    /// Repository name within the owner's account.
    #[arg(long, global = true)]
    repo: Option<String>,

    /// Asset base name when it differs from the repository name.
    ///
    /// Assets are expected to be named `<prefix>-<version>.<ext>`.
    #[arg(long, global = true)]
    prefix: Option<String>,

    /// Make releases marked as prereleases eligible for selection.
    #[arg(long, global = true)]
    allow_prereleases: bool,

    /// Skip signing-identity validation.
    ///
    /// Only for development and fixture builds that are never signed.
    #[arg(long, global = true)]
    skip_signing: bool,

    /// Preferred languages for release notes, most preferred first.
    ///
    /// Defaults to the locale environment (`LANGUAGE`, `LC_ALL`, ...).
    #[arg(long, global = true, value_delimiter = ',', value_name = "LANGS")]
    langs: Option<Vec<String>>,

    /// Serve releases from a JSON file in the GitHub feed shape instead of
    /// the network. Downloads synthesize a runnable fixture bundle.
    #[arg(long, global = true, value_name = "RELEASES_JSON")]
    fixture: Option<PathBuf>,

    /// Version to treat as currently running (defaults to this binary's).
    ///
    /// Useful with `--fixture` to exercise specific upgrade paths.
    #[arg(long, global = true, value_name = "VERSION")]
    running_version: Option<String>,

    /// Path to an alternate configuration file.
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Enable verbose output (equivalent to `RUST_LOG=debug`).
    #[arg(short, long, global = true, conflicts_with = "quiet")]
    verbose: bool,

    /// Suppress everything except errors and final results.
    #[arg(short, long, global = true)]
    quiet: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Run one full check cycle: fetch, select, download, extract, validate.
    ///
    /// Exits 0 whether or not an update was found; a staged update is
    /// reported on stdout and left ready for `skylift update`.
    Check(check::CheckCommand),

    /// Check and, if an update was staged, install it and relaunch.
    Update(update::UpdateCommand),

    /// Resolve and print the localized release notes.
    ///
    /// Uses the viable newer release when one exists, otherwise the newest
    /// release in the feed.
    Changelog(changelog::ChangelogCommand),
}

impl Cli {
    /// Dispatch to the selected command.
    pub async fn execute(self) -> Result<()> {
        let updater = Arc::new(self.build_updater().await?);
        let quiet = self.quiet;

        match self.command {
            Commands::Check(cmd) => cmd.execute(updater, quiet).await,
            Commands::Update(cmd) => cmd.execute(updater, quiet).await,
            Commands::Changelog(cmd) => cmd.execute(updater).await,
        }
    }

    /// The log level implied by the verbosity flags, for subscriber setup.
    #[must_use]
    pub fn log_level(&self) -> &'static str {
        if self.verbose {
            "debug"
        } else if self.quiet {
            "error"
        } else {
            "info"
        }
    }

    /// Assemble the updater: config file, then flag overlays, then source.
    async fn build_updater(&self) -> Result<Updater> {
        let mut config = UpdaterConfig::load_with_optional(self.config.clone()).await?;

        if let Some(owner) = &self.owner {
            config.owner = owner.clone();
        }
        if let Some(repo) = &self.repo {
            config.repo = repo.clone();
        }
        if let Some(prefix) = &self.prefix {
            config.release_prefix = Some(prefix.clone());
        }
        if self.allow_prereleases {
            config.allow_prereleases = true;
        }
        if self.skip_signing {
            config.skip_signature_validation = true;
        }
        if let Some(langs) = &self.langs {
            config.preferred_languages = langs.clone();
        }

        if self.fixture.is_none() && (config.owner.is_empty() || config.repo.is_empty()) {
            anyhow::bail!(
                "no release feed configured; pass --owner and --repo, or --fixture, \
                 or set them in {}",
                UpdaterConfig::default_path()
                    .map(|p| p.display().to_string())
                    .unwrap_or_else(|_| "the configuration file".to_string())
            );
        }

        let current = self.resolve_running_version()?;
        let source: Arc<dyn ReleaseSource> = match &self.fixture {
            Some(path) => Arc::new(
                FixtureReleaseSource::from_json_file(path)
                    .await
                    .with_context(|| format!("failed to load fixture feed {}", path.display()))?,
            ),
            None => Arc::new(GithubReleaseSource::new()),
        };

        Ok(Updater::new(config, current).with_release_source(source))
    }

    fn resolve_running_version(&self) -> Result<semver::Version> {
        let raw = self
            .running_version
            .as_deref()
            .unwrap_or(env!("CARGO_PKG_VERSION"));
        let trimmed = raw.strip_prefix(['v', 'V']).unwrap_or(raw);
        semver::Version::parse(trimmed)
            .with_context(|| format!("'{raw}' is not a semantic version"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_parses_global_flags() {
        let cli = Cli::parse_from([
            "skylift",
            "--owner",
            "acme",
            "--repo",
            "myapp",
            "--langs",
            "zh-CN,en",
            "--allow-prereleases",
            "check",
        ]);
        assert_eq!(cli.owner.as_deref(), Some("acme"));
        assert_eq!(cli.repo.as_deref(), Some("myapp"));
        assert_eq!(cli.langs, Some(vec!["zh-CN".to_string(), "en".to_string()]));
        assert!(cli.allow_prereleases);
        assert!(matches!(cli.command, Commands::Check(_)));
    }

    #[test]
    fn test_verbose_and_quiet_conflict() {
        let result = Cli::try_parse_from(["skylift", "--verbose", "--quiet", "check"]);
        assert!(result.is_err());
    }

    #[test]
    fn test_log_level_from_flags() {
        let cli = Cli::parse_from(["skylift", "-v", "check"]);
        assert_eq!(cli.log_level(), "debug");
        let cli = Cli::parse_from(["skylift", "-q", "check"]);
        assert_eq!(cli.log_level(), "error");
        let cli = Cli::parse_from(["skylift", "check"]);
        assert_eq!(cli.log_level(), "info");
    }

    #[test]
    fn test_running_version_override() {
        let cli = Cli::parse_from(["skylift", "--running-version", "v0.1.0", "check"]);
        assert_eq!(
            cli.resolve_running_version().unwrap(),
            semver::Version::new(0, 1, 0)
        );

        let cli = Cli::parse_from(["skylift", "--running-version", "not-a-version", "check"]);
        assert!(cli.resolve_running_version().is_err());
    }

    #[tokio::test]
    async fn test_build_updater_requires_a_feed() {
        let cli = Cli::parse_from(["skylift", "--config", "/nonexistent/nope.toml", "check"]);
        // A missing explicit config file fails before feed validation.
        assert!(cli.build_updater().await.is_err());
    }
}
