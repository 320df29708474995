//! Test utilities for the update engine.
//!
//! This module provides helpers for writing tests: a once-only logging
//! initializer, a [`ProcessHost`] that records launches instead of spawning
//! processes, and builders for release feed data. It is compiled for unit
//! tests and, behind the `test-utils` feature, for the integration test
//! binary.
//!
//! # Process isolation
//!
//! The production [`ProcessHost`] terminates the current process after a
//! successful install. [`RecordingProcessHost`] exists so install tests can
//! assert on the launch and termination sequence while the test runner keeps
//! running.

use async_trait::async_trait;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Mutex, Once, PoisonError};
use tracing::Level;
use tracing_subscriber::EnvFilter;

use crate::error::UpdateError;
use crate::install::ProcessHost;
use crate::release::{AssetKind, Release, ReleaseAsset};

/// Global flag to ensure logging is only initialized once in tests
static INIT_LOGGING: Once = Once::new();

/// Initialize logging for tests.
///
/// Initializes the tracing subscriber at most once regardless of how many
/// times it's called. Respects the `RUST_LOG` environment variable if set,
/// or uses the provided log level.
///
/// To enable logging in tests via environment variable:
/// ```bash
/// RUST_LOG=debug cargo test
/// ```
pub fn init_test_logging(level: Option<Level>) {
    INIT_LOGGING.call_once(|| {
        let filter = if let Some(level) = level {
            EnvFilter::new(level.to_string())
        } else if std::env::var("RUST_LOG").is_ok() {
            EnvFilter::from_default_env()
        } else {
            // No logging if neither is provided
            return;
        };

        let _ = tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_test_writer()
            .with_target(true)
            .with_thread_ids(false)
            .with_ansi(true)
            .try_init();
    });
}

/// [`ProcessHost`] that records calls instead of performing them.
///
/// `terminate_current` returns normally here, so code paths that follow a
/// successful install keep executing inside the test.
#[derive(Debug, Default)]
pub struct RecordingProcessHost {
    launched: Mutex<Vec<PathBuf>>,
    terminations: AtomicUsize,
    fail_launch: bool,
}

impl RecordingProcessHost {
    /// Host whose `launch` always fails with an I/O error.
    pub fn failing() -> Self {
        Self {
            fail_launch: true,
            ..Self::default()
        }
    }

    /// Executables passed to `launch`, in call order.
    pub fn launched(&self) -> Vec<PathBuf> {
        self.launched
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Number of `terminate_current` calls.
    pub fn terminations(&self) -> usize {
        self.terminations.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ProcessHost for RecordingProcessHost {
    async fn launch(&self, executable: &Path) -> Result<(), UpdateError> {
        if self.fail_launch {
            return Err(UpdateError::Io(std::io::Error::other(
                "simulated launch failure",
            )));
        }
        self.launched
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(executable.to_path_buf());
        Ok(())
    }

    fn terminate_current(&self) {
        self.terminations.fetch_add(1, Ordering::SeqCst);
    }
}

/// Build a release with the given tag and assets.
///
/// The tag may carry a leading `v`; it must parse as a semantic version.
pub fn release(tag: &str, assets: Vec<ReleaseAsset>) -> Release {
    let trimmed = tag.strip_prefix(['v', 'V']).unwrap_or(tag);
    Release {
        tag: semver::Version::parse(trimmed)
            .unwrap_or_else(|e| panic!("test release tag '{tag}' is not semver: {e}")),
        prerelease: false,
        body: String::new(),
        display_name: format!("Release {trimmed}"),
        info_url: format!("https://github.com/acme/myapp/releases/tag/{tag}"),
        assets,
    }
}

/// Build a zip asset named `<prefix>-<version>.zip`.
pub fn zip_asset(prefix: &str, version: &str) -> ReleaseAsset {
    let name = format!("{prefix}-{version}.zip");
    ReleaseAsset {
        download_url: format!("https://example.invalid/assets/{name}"),
        name,
        kind: AssetKind::Zip,
    }
}

/// Build a non-archive asset, e.g. a changelog file.
pub fn raw_asset(name: &str) -> ReleaseAsset {
    ReleaseAsset {
        name: name.to_string(),
        download_url: format!("https://example.invalid/assets/{name}"),
        kind: AssetKind::Unknown,
    }
}

/// Build a release whose only asset is the matching zip archive.
pub fn release_with_zip(prefix: &str, tag: &str) -> Release {
    let version = tag.strip_prefix(['v', 'V']).unwrap_or(tag);
    release(tag, vec![zip_asset(prefix, version)])
}
