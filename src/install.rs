//! Bundle installation and relaunch.
//!
//! Replaces the installed application with a validated candidate using a
//! stage-then-swap sequence built entirely from same-volume renames:
//!
//! 1. rename the installed bundle aside to a unique sibling path
//! 2. rename the candidate into the now-vacant install path
//! 3. launch the new executable
//! 4. delete the aside copy, then terminate the running process
//!
//! A complete application exists at the install path or at the aside path at
//! every instant. If moving the candidate in fails, the aside bundle is
//! renamed straight back; if the relaunch fails, the swap is undone the same
//! way. The aside copy is only deleted after the new process has been
//! launched.
//!
//! Launching and self-termination go through the [`ProcessHost`] capability
//! so tests can record them instead of spawning processes and exiting the
//! test runner.

use async_trait::async_trait;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::fs;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::bundle::LocalBundle;
use crate::error::UpdateError;

/// Host-process operations the installer needs but must not own.
#[async_trait]
pub trait ProcessHost: Send + Sync {
    /// Start `executable` as a detached process.
    async fn launch(&self, executable: &Path) -> Result<(), UpdateError>;

    /// Terminate the currently running process.
    ///
    /// The production implementation does not return.
    fn terminate_current(&self);
}

/// Production [`ProcessHost`]: spawns detached and exits the process.
#[derive(Debug, Clone, Copy, Default)]
pub struct SpawnProcessHost;

#[async_trait]
impl ProcessHost for SpawnProcessHost {
    async fn launch(&self, executable: &Path) -> Result<(), UpdateError> {
        info!("Launching {}", executable.display());
        tokio::process::Command::new(executable)
            .stdin(std::process::Stdio::null())
            .stdout(std::process::Stdio::null())
            .stderr(std::process::Stdio::null())
            .spawn()?;
        Ok(())
    }

    fn terminate_current(&self) {
        info!("Update installed; terminating for relaunch");
        std::process::exit(0);
    }
}

/// Swaps a validated candidate bundle into the install path.
pub struct Installer {
    install_path: PathBuf,
    host: Arc<dyn ProcessHost>,
}

impl Installer {
    /// Create an installer targeting `install_path`, the directory the
    /// running bundle occupies (e.g. `/Applications/MyApp.app`).
    pub fn new(install_path: PathBuf) -> Self {
        Self {
            install_path,
            host: Arc::new(SpawnProcessHost),
        }
    }

    /// Substitute the process host (tests use a recording host).
    #[must_use]
    pub fn with_process_host(mut self, host: Arc<dyn ProcessHost>) -> Self {
        self.host = host;
        self
    }

    /// Install `candidate` over the running bundle and relaunch.
    ///
    /// On success the process is terminated through the host; this method
    /// only returns when the host's `terminate_current` does (recording
    /// hosts in tests). On failure the install path is left holding a
    /// complete bundle: the new one if the launch already happened, the old
    /// one otherwise.
    pub async fn install_and_relaunch(&self, candidate: &LocalBundle) -> Result<(), UpdateError> {
        let candidate_exe =
            candidate
                .executable()
                .ok_or_else(|| UpdateError::InvalidDownloadedBundle {
                    bundle: candidate.path().display().to_string(),
                })?;

        // The executable's location relative to its bundle survives the
        // rename; compute the installed location up front.
        let exe_relative = candidate_exe
            .strip_prefix(candidate.path())
            .map_err(|_| UpdateError::InvalidDownloadedBundle {
                bundle: candidate.path().display().to_string(),
            })?
            .to_path_buf();
        let installed_exe = self.install_path.join(&exe_relative);

        let aside_path = self.aside_path();
        info!(
            "Installing {} over {}",
            candidate.path().display(),
            self.install_path.display()
        );

        debug!("Moving installed bundle aside to {}", aside_path.display());
        fs::rename(&self.install_path, &aside_path).await?;

        if let Err(e) = fs::rename(candidate.path(), &self.install_path).await {
            warn!("Failed to move candidate into place: {}", e);
            restore_aside(&aside_path, &self.install_path).await;
            return Err(e.into());
        }

        if let Err(e) = self.host.launch(&installed_exe).await {
            warn!("Relaunch failed, swapping the previous version back");
            // Undo the swap: new bundle back to staging, old bundle back in.
            if let Err(undo) = fs::rename(&self.install_path, candidate.path()).await {
                warn!("Could not move candidate back to staging: {}", undo);
            }
            restore_aside(&aside_path, &self.install_path).await;
            return Err(e);
        }

        if let Err(e) = fs::remove_dir_all(&aside_path).await {
            // The new version is installed and running; a leftover aside
            // directory is cosmetic.
            warn!(
                "Could not remove previous version at {}: {}",
                aside_path.display(),
                e
            );
        }

        self.host.terminate_current();
        Ok(())
    }

    /// Unique sibling path the old bundle is parked at during the swap.
    fn aside_path(&self) -> PathBuf {
        let name = self
            .install_path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "bundle".to_string());
        self.install_path
            .with_file_name(format!("{}.old-{}", name, Uuid::new_v4()))
    }
}

async fn restore_aside(aside_path: &Path, install_path: &Path) {
    if let Err(e) = fs::rename(aside_path, install_path).await {
        warn!(
            "Could not restore previous version from {}: {}",
            aside_path.display(),
            e
        );
    }
}
