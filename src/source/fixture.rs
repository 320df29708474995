//! Deterministic release source for tests and offline demos.
//!
//! Serves a canned release list, answers asset fetches from an in-memory
//! table, and "downloads" by synthesizing a real zip archive containing a
//! minimal runnable bundle after a configurable number of simulated
//! progress steps. Because the archive is real, everything downstream of
//! the source (extraction, bundle discovery, install) runs unmodified
//! against fixture data.
//!
//! A transport failure can be injected mid-download to exercise the
//! one-terminal-event contract without a flaky network.

use async_trait::async_trait;
use std::collections::HashMap;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio::sync::mpsc;
use tracing::debug;

use crate::error::UpdateError;
use crate::release::{Release, ReleaseAsset};
use crate::source::{DownloadEvent, DownloadStream, ReleaseSource};

/// [`ReleaseSource`] with fully scripted behavior.
#[derive(Debug, Clone)]
pub struct FixtureReleaseSource {
    releases: Vec<Release>,
    asset_bytes: HashMap<String, Vec<u8>>,
    bundle_name: String,
    progress_steps: usize,
    step_delay: Duration,
    fail_after_steps: Option<usize>,
}

impl Default for FixtureReleaseSource {
    fn default() -> Self {
        Self {
            releases: Vec::new(),
            asset_bytes: HashMap::new(),
            bundle_name: "MyApp.app".to_string(),
            progress_steps: 5,
            step_delay: Duration::ZERO,
            fail_after_steps: None,
        }
    }
}

impl FixtureReleaseSource {
    /// Empty fixture; populate with the builder methods.
    pub fn new() -> Self {
        Self::default()
    }

    /// Load the release list from a JSON file in the GitHub feed shape.
    pub async fn from_json_file(path: &Path) -> Result<Self, UpdateError> {
        let content = tokio::fs::read_to_string(path).await?;
        let releases: Vec<Release> =
            serde_json::from_str(&content).map_err(|e| UpdateError::Transport {
                operation: "fixture feed".to_string(),
                reason: format!("{}: {e}", path.display()),
            })?;
        Ok(Self::new().with_releases(releases))
    }

    /// Replace the release list.
    #[must_use]
    pub fn with_releases(mut self, releases: Vec<Release>) -> Self {
        self.releases = releases;
        self
    }

    /// Serve `bytes` for fetches of the asset named `name`.
    #[must_use]
    pub fn with_asset_bytes(mut self, name: impl Into<String>, bytes: Vec<u8>) -> Self {
        self.asset_bytes.insert(name.into(), bytes);
        self
    }

    /// Name of the bundle directory synthesized into downloaded archives.
    #[must_use]
    pub fn with_bundle_name(mut self, name: impl Into<String>) -> Self {
        self.bundle_name = name.into();
        self
    }

    /// Number of progress events emitted per download (default 5).
    #[must_use]
    pub fn with_progress_steps(mut self, steps: usize) -> Self {
        self.progress_steps = steps;
        self
    }

    /// Real delay between simulated progress steps (default none).
    #[must_use]
    pub fn with_step_delay(mut self, delay: Duration) -> Self {
        self.step_delay = delay;
        self
    }

    /// Inject a transport failure after `steps` progress events.
    #[must_use]
    pub fn failing_after(mut self, steps: usize) -> Self {
        self.fail_after_steps = Some(steps);
        self
    }
}

#[async_trait]
impl ReleaseSource for FixtureReleaseSource {
    async fn fetch_releases(
        &self,
        owner: &str,
        repo: &str,
    ) -> Result<Vec<Release>, UpdateError> {
        debug!(
            "Fixture feed serving {} releases for {}/{}",
            self.releases.len(),
            owner,
            repo
        );
        Ok(self.releases.clone())
    }

    async fn fetch_asset_bytes(&self, asset: &ReleaseAsset) -> Result<Vec<u8>, UpdateError> {
        self.asset_bytes
            .get(&asset.name)
            .cloned()
            .ok_or_else(|| UpdateError::Transport {
                operation: format!("asset '{}'", asset.name),
                reason: "not present in fixture".to_string(),
            })
    }

    async fn download(
        &self,
        asset: &ReleaseAsset,
        dest_dir: &Path,
    ) -> Result<DownloadStream, UpdateError> {
        let steps = self.progress_steps.max(1);
        let fail_after = self.fail_after_steps;
        let delay = self.step_delay;
        let bundle_name = self.bundle_name.clone();
        let final_path = dest_dir.join(&asset.name);
        let url = asset.download_url.clone();

        let (tx, rx) = mpsc::channel(32);
        tokio::spawn(async move {
            let progress_events = fail_after.unwrap_or(steps).min(steps);
            for step in 1..=progress_events {
                if !delay.is_zero() {
                    tokio::time::sleep(delay).await;
                }
                let fraction = step as f64 / steps as f64;
                if tx.send(Ok(DownloadEvent::Progress(fraction))).await.is_err() {
                    return;
                }
            }

            if fail_after.is_some() {
                let _ = tx
                    .send(Err(UpdateError::DownloadFailed {
                        url,
                        reason: "simulated transport failure".to_string(),
                    }))
                    .await;
                return;
            }

            let result = synthesize_archive(&final_path, &bundle_name).await;
            match result {
                Ok(()) => {
                    let _ = tx.send(Ok(DownloadEvent::Finished(final_path))).await;
                }
                Err(e) => {
                    let _ = tx.send(Err(e)).await;
                }
            }
        });

        Ok(rx)
    }
}

async fn synthesize_archive(final_path: &Path, bundle_name: &str) -> Result<(), UpdateError> {
    let final_path = final_path.to_path_buf();
    let bundle_name = bundle_name.to_string();

    tokio::task::spawn_blocking(move || write_bundle_zip(&final_path, &bundle_name))
        .await
        .map_err(|e| UpdateError::Io(std::io::Error::other(e)))?
}

/// Write a zip archive at `path` containing a minimal runnable bundle.
///
/// The bundle uses the macOS layout with an executable shell script at
/// `<bundle_name>/Contents/MacOS/<stem>`, mode 0755, so extracted fixtures
/// can actually be launched on Unix hosts.
pub fn write_bundle_zip(path: &Path, bundle_name: &str) -> Result<(), UpdateError> {
    let stem = Path::new(bundle_name)
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "App".to_string());

    let file = std::fs::File::create(path)?;
    let mut zip = zip::ZipWriter::new(file);

    let dir_options = zip::write::SimpleFileOptions::default();
    let exe_options = zip::write::SimpleFileOptions::default().unix_permissions(0o755);

    let to_zip_err =
        |e: zip::result::ZipError| UpdateError::Io(std::io::Error::other(e.to_string()));

    zip.add_directory(format!("{bundle_name}/Contents/MacOS"), dir_options)
        .map_err(to_zip_err)?;

    zip.start_file(
        format!("{bundle_name}/Contents/Info.plist"),
        dir_options,
    )
    .map_err(to_zip_err)?;
    zip.write_all(
        format!(
            "<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n<plist version=\"1.0\">\n<dict>\n\
             <key>CFBundleExecutable</key><string>{stem}</string>\n</dict>\n</plist>\n"
        )
        .as_bytes(),
    )?;

    zip.start_file(
        format!("{bundle_name}/Contents/MacOS/{stem}"),
        exe_options,
    )
    .map_err(to_zip_err)?;
    zip.write_all(b"#!/bin/sh\nexit 0\n")?;

    zip.finish().map_err(to_zip_err)?;
    Ok(())
}
