//! Update lifecycle orchestration.
//!
//! [`Updater`] wires the leaf components into the public state machine: it
//! fetches the release feed, selects a viable release and asset, drives the
//! download pipeline, extracts and trust-validates the result, and publishes
//! every transition through a watch channel. Installation is a separate,
//! explicitly requested step.
//!
//! # State machine
//!
//! `None → Detected → Downloading → Downloaded`, advanced only while the
//! in-flight guard is held. A failed cycle leaves the state at the last
//! value it reached; the failure itself travels through the returned
//! `Result` and the diagnostic log. A later cycle overwrites the state
//! wholesale when it detects a release again.
//!
//! # Concurrency
//!
//! Checks are serialized by a `try_lock` on an internal mutex: a second
//! check while one is in flight fails fast with
//! [`UpdateError::CheckInProgress`] instead of racing the first. Progress
//! publication is debounced by a recurring timer that re-emits the last
//! known fraction, so observers see a bounded event rate regardless of chunk
//! size; repeated fractions are expected.
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
//!         println!("{} downloaded", release.tag);
//!         updater.install(&bundle).await?;
//!     }
//!     CheckOutcome::NoViableUpdate => println!("nothing to do"),
//! }
//! # Ok(())
//! # }
//! ```

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, info, warn};

use crate::bundle::{self, LocalBundle};
use crate::changelog;
use crate::config::UpdaterConfig;
use crate::constants::{DIAGNOSTIC_LOG_CAPACITY, progress_publish_interval};
use crate::error::UpdateError;
use crate::extract;
use crate::install::{Installer, ProcessHost, SpawnProcessHost};
use crate::release::{Release, select};
use crate::source::{DownloadEvent, GithubReleaseSource, ReleaseSource};
use crate::state::{DiagnosticEntry, DiagnosticLog, StateChannel, UpdateState};
use crate::trust::TrustValidator;

/// Result of one completed check cycle.
#[derive(Debug, Clone)]
pub enum CheckOutcome {
    /// A newer build was downloaded, validated, and staged for install.
    UpdateReady {
        /// The release the staged bundle came from.
        release: Release,
        /// Handle keeping the staged bundle alive until installed.
        bundle: Arc<LocalBundle>,
    },
    /// The feed held no viable newer release: empty after prerelease
    /// filtering, or the newest release carries no matching asset.
    NoViableUpdate,
}

/// Orchestrates update checks and installs against a release source.
pub struct Updater {
    config: UpdaterConfig,
    current_version: semver::Version,
    source: Arc<dyn ReleaseSource>,
    host: Arc<dyn ProcessHost>,
    state: StateChannel,
    diagnostics: DiagnosticLog,
    check_guard: tokio::sync::Mutex<()>,
    progress_interval: Duration,
}

impl Updater {
    /// Create an updater for the application currently at `current_version`,
    /// backed by the live GitHub source.
    pub fn new(config: UpdaterConfig, current_version: semver::Version) -> Self {
        Self {
            config,
            current_version,
            source: Arc::new(GithubReleaseSource::new()),
            host: Arc::new(SpawnProcessHost),
            state: StateChannel::new(),
            diagnostics: DiagnosticLog::new(DIAGNOSTIC_LOG_CAPACITY),
            check_guard: tokio::sync::Mutex::new(()),
            progress_interval: progress_publish_interval(),
        }
    }

    /// Substitute the release source (fixtures, proxied sources).
    #[must_use]
    pub fn with_release_source(mut self, source: Arc<dyn ReleaseSource>) -> Self {
        self.source = source;
        self
    }

    /// Substitute the process host used for relaunch and termination.
    #[must_use]
    pub fn with_process_host(mut self, host: Arc<dyn ProcessHost>) -> Self {
        self.host = host;
        self
    }

    /// Override the progress publication interval (default 500 ms).
    #[must_use]
    pub fn with_progress_interval(mut self, interval: Duration) -> Self {
        self.progress_interval = interval;
        self
    }

    /// Subscribe to state transitions.
    ///
    /// The receiver starts at the current value. Watch channels coalesce:
    /// a slow observer sees the latest state, not every intermediate one.
    pub fn subscribe(&self) -> tokio::sync::watch::Receiver<UpdateState> {
        self.state.subscribe()
    }

    /// The current update state.
    pub fn current_state(&self) -> UpdateState {
        self.state.current()
    }

    /// Snapshot of the rolling diagnostic log, oldest first.
    pub fn diagnostics(&self) -> Vec<DiagnosticEntry> {
        self.diagnostics.entries()
    }

    /// The configuration this updater runs with.
    pub const fn config(&self) -> &UpdaterConfig {
        &self.config
    }

    /// The version the running application reported at construction.
    pub const fn current_version(&self) -> &semver::Version {
        &self.current_version
    }

    /// Run one full check cycle: fetch, select, download, extract, validate.
    ///
    /// On success the state is `Downloaded` and the returned bundle is ready
    /// for [`install`](Self::install). `Ok(NoViableUpdate)` means the feed
    /// had nothing usable; [`UpdateError::AlreadyUpToDate`] means the newest
    /// release is not newer than the running version. Neither touches the
    /// state. Failures are returned as-is and never regress the state; there
    /// is no automatic retry.
    ///
    /// # Errors
    ///
    /// Returns [`UpdateError::CheckInProgress`] when another check holds the
    /// in-flight guard, otherwise whatever component error ended the cycle.
    pub async fn check(&self) -> Result<CheckOutcome, UpdateError> {
        let _guard = self
            .check_guard
            .try_lock()
            .map_err(|_| UpdateError::CheckInProgress)?;

        self.diagnostics.record(format!(
            "Update check started (running version {})",
            self.current_version
        ));

        let releases = self
            .source
            .fetch_releases(&self.config.owner, &self.config.repo)
            .await?;
        debug!(
            "Fetched {} releases for {}/{}",
            releases.len(),
            self.config.owner,
            self.config.repo
        );

        let selected = select::find_viable_update(
            &releases,
            &self.current_version,
            self.config.effective_release_prefix(),
            self.config.allow_prereleases,
        );
        let (release, asset) = match selected {
            Ok(Some((release, asset))) => (release.clone(), asset.clone()),
            Ok(None) => {
                self.diagnostics.record("No viable update in the release feed");
                return Ok(CheckOutcome::NoViableUpdate);
            }
            Err(e) => {
                self.diagnostics.record(e.to_string());
                return Err(e);
            }
        };

        info!(
            "Update {} detected (running {})",
            release.tag, self.current_version
        );
        self.publish(UpdateState::Detected {
            release: release.clone(),
            asset: asset.clone(),
        });

        let staging = tempfile::TempDir::new()?;
        self.diagnostics.record(format!("Downloading {}", asset.name));
        let mut events = self.source.download(&asset, staging.path()).await?;

        self.publish(UpdateState::Downloading {
            release: release.clone(),
            asset: asset.clone(),
            fraction: 0.0,
        });

        let mut ticker = tokio::time::interval(self.progress_interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        // The first tick completes immediately; 0.0 was just published.
        ticker.tick().await;

        let mut last_fraction = 0.0_f64;
        let archive = loop {
            tokio::select! {
                event = events.recv() => match event {
                    Some(Ok(DownloadEvent::Progress(fraction))) => last_fraction = fraction,
                    Some(Ok(DownloadEvent::Finished(path))) => break path,
                    Some(Err(e)) => {
                        self.diagnostics.record(format!("Download failed: {e}"));
                        return Err(e);
                    }
                    None => {
                        let e = UpdateError::DownloadFailed {
                            url: asset.download_url.clone(),
                            reason: "download ended without a terminal event".to_string(),
                        };
                        self.diagnostics.record(format!("Download failed: {e}"));
                        return Err(e);
                    }
                },
                _ = ticker.tick() => {
                    self.publish(UpdateState::Downloading {
                        release: release.clone(),
                        asset: asset.clone(),
                        fraction: last_fraction,
                    });
                }
            }
        };
        debug!("Downloaded archive to {}", archive.display());

        let bundle_path = match extract::extract_and_find_bundle(
            &archive,
            asset.kind,
            &self.config.bundle_extension,
        )
        .await
        {
            Ok(path) => path,
            Err(e) => {
                self.diagnostics.record(format!("Extraction failed: {e}"));
                return Err(e);
            }
        };

        let validator = TrustValidator::new(self.config.skip_signature_validation);
        match self.resolve_install_path() {
            Ok(installed) => {
                // A running bundle without an executable cannot be
                // relaunched, so it must never be updated over.
                if let Err(e) = self.require_installed_executable(&installed) {
                    self.diagnostics
                        .record(format!("Running bundle rejected: {e}"));
                    return Err(e);
                }
                if let Err(e) = validator.validate(&installed, &bundle_path).await {
                    self.diagnostics.record(format!("Trust validation failed: {e}"));
                    return Err(e);
                }
            }
            // Skip mode tolerates an unresolvable running bundle (fixture
            // runs from a bare binary).
            Err(e) if self.config.skip_signature_validation => {
                debug!("Trust validation skipped; running bundle not resolved: {e}");
            }
            Err(e) => {
                self.diagnostics.record(format!("Trust validation failed: {e}"));
                return Err(e);
            }
        }

        let bundle = Arc::new(LocalBundle::staged(bundle_path, staging));
        info!("Update {} downloaded and validated", release.tag);
        self.publish(UpdateState::Downloaded {
            release: release.clone(),
            asset,
            bundle: Arc::clone(&bundle),
        });

        Ok(CheckOutcome::UpdateReady { release, bundle })
    }

    /// Install a downloaded bundle over the running installation and
    /// relaunch.
    ///
    /// The bundle comes from [`CheckOutcome::UpdateReady`] or the
    /// `Downloaded` state. In production this terminates the process through
    /// the configured host and does not return; with a recording host it
    /// returns normally.
    pub async fn install(&self, bundle: &LocalBundle) -> Result<(), UpdateError> {
        let install_path = self.resolve_install_path()?;
        self.require_installed_executable(&install_path)?;
        self.diagnostics.record(format!(
            "Installing {} over {}",
            bundle.path().display(),
            install_path.display()
        ));

        let installer = Installer::new(install_path).with_process_host(Arc::clone(&self.host));
        match installer.install_and_relaunch(bundle).await {
            Ok(()) => Ok(()),
            Err(e) => {
                self.diagnostics.record(format!("Install failed: {e}"));
                Err(e)
            }
        }
    }

    /// Resolve the localized release notes for `release`.
    ///
    /// Consults per-language changelog assets through the release source,
    /// then language-tagged sections embedded in the release body, in the
    /// order of the configured preferred languages.
    pub async fn localized_changelog(&self, release: &Release) -> Result<String, UpdateError> {
        changelog::localized_changelog(
            self.source.as_ref(),
            release,
            &self.config.preferred_languages,
        )
        .await
    }

    /// Fetch the raw release feed through the configured source.
    pub async fn releases(&self) -> Result<Vec<Release>, UpdateError> {
        self.source
            .fetch_releases(&self.config.owner, &self.config.repo)
            .await
    }

    /// Spawn the periodic check loop.
    ///
    /// A first check runs immediately, then one per configured poll
    /// interval. Failures (including a check already in flight) are logged
    /// and do not stop the schedule; the loop runs until the handle is
    /// aborted or the runtime shuts down.
    pub fn run_periodic(self: &Arc<Self>) -> JoinHandle<()> {
        let updater = Arc::clone(self);
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(updater.config.poll_interval());
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                ticker.tick().await;
                match updater.check().await {
                    Ok(CheckOutcome::UpdateReady { release, .. }) => {
                        info!("Periodic check staged update {}", release.tag);
                    }
                    Ok(CheckOutcome::NoViableUpdate) => {
                        debug!("Periodic check found no viable update");
                    }
                    Err(e) if e.is_benign() => debug!("Periodic check: {e}"),
                    Err(UpdateError::CheckInProgress) => {
                        debug!("Periodic check skipped; a check is already running");
                    }
                    Err(e) => warn!("Periodic update check failed: {e}"),
                }
            }
        })
    }

    /// Record a stage change and publish the new state.
    ///
    /// The diagnostic entry is written only when the stage actually changes,
    /// so timer-driven `Downloading` re-publications do not flood the log.
    fn publish(&self, state: UpdateState) {
        let entering = state.stage();
        if self.state.current().stage() != entering {
            self.diagnostics.record(format!("State advanced to {entering}"));
        }
        self.state.publish(state);
    }

    fn resolve_install_path(&self) -> Result<PathBuf, UpdateError> {
        match &self.config.install_path {
            Some(path) => Ok(path.clone()),
            None => bundle::running_bundle_path(&self.config.bundle_extension),
        }
    }

    /// The installed bundle must hold an executable in a known layout,
    /// otherwise it cannot be relaunched after the swap.
    fn require_installed_executable(&self, installed: &Path) -> Result<(), UpdateError> {
        match bundle::bundle_executable(installed) {
            Some(_) => Ok(()),
            None => Err(UpdateError::NoExecutableFound {
                bundle: installed.display().to_string(),
            }),
        }
    }
}
