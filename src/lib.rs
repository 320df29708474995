//! skylift - a self-update engine for desktop applications
//!
//! skylift keeps a desktop application current against its GitHub releases:
//! it polls the release feed, picks the newest compatible build, streams the
//! archive to disk, extracts and trust-validates the bundle inside, and
//! finally swaps it over the running installation and relaunches.
//!
//! # Architecture Overview
//!
//! The engine is a pipeline of small components orchestrated by one
//! controller:
//!
//! - [`release::select`] chooses the release/asset pair, as pure functions
//!   over the fetched feed
//! - [`source`] abstracts where releases come from ([`source::ReleaseSource`]):
//!   the live GitHub API or a deterministic fixture, behind one trait
//! - [`extract`] unpacks tar/zip archives and finds the application bundle
//! - [`trust`] compares signing identities before anything is installed
//! - [`install`] performs the stage-then-swap replacement and relaunch
//! - [`changelog`] resolves language-tagged release notes
//! - [`updater`] drives a check cycle through all of the above and publishes
//!   the observable [`state::UpdateState`]
//!
//! # Update lifecycle
//!
//! Every check cycle advances the single observable state value through
//! `None → Detected → Downloading → Downloaded`; installation is a separate,
//! explicitly requested step. Failures never regress the state: they travel
//! through the returned `Result` and the rolling diagnostic log, and the
//! next check overwrites the state wholesale.
//!
//! # Example
//!
//! ```rust,no_run
//! use skylift::config::UpdaterConfig;
//! use skylift::updater::{CheckOutcome, Updater};
//!
//! # async fn example() -> Result<(), skylift::error::UpdateError> {
//! let config = UpdaterConfig::new("acme", "myapp");
//! let updater = Updater::new(config, semver::Version::new(1, 0, 0));
//!
//! match updater.check().await? {
//!     CheckOutcome::UpdateReady { release, bundle } => {
//!         println!("version {} staged for install", release.tag);
//!         updater.install(&bundle).await?;
//!     }
//!     CheckOutcome::NoViableUpdate => {}
//! }
//! # Ok(())
//! # }
//! ```
//!
//! # Command-Line Usage
//!
//! The `skylift` binary drives the engine for scripting and demos:
//!
//! ```bash
//! # One check cycle: fetch, select, download, validate
//! skylift --owner acme --repo myapp check
//!
//! # Check and, if an update was staged, install and relaunch
//! skylift --owner acme --repo myapp update
//!
//! # Print the localized release notes for the viable release
//! skylift --owner acme --repo myapp --langs zh-CN,en changelog
//!
//! # Run the whole pipeline against a canned feed (no network)
//! skylift --fixture releases.json --skip-signing check
//! ```

// Core engine
pub mod config;
pub mod error;
pub mod release;
pub mod source;
pub mod state;
pub mod updater;

// Pipeline stages
pub mod bundle;
pub mod changelog;
pub mod extract;
pub mod install;
pub mod trust;

// Supporting modules
pub mod cli;
pub mod constants;

// test_utils module is available for both unit tests and integration tests
#[cfg(any(test, feature = "test-utils"))]
pub mod test_utils;
