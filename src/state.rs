//! Observable update state.
//!
//! One [`UpdateState`] value describes how far the engine has progressed:
//! `None → Detected → Downloading → Downloaded`. The value lives in a
//! `tokio::sync::watch` channel owned by the engine; it is replaced
//! wholesale, never mutated, and only advanced. A failed check leaves the
//! state where it was, with the failure reported through the check's own
//! return value and the [`DiagnosticLog`].
//!
//! Any number of observers may subscribe. A `watch` receiver only yields the
//! most recent value, so slow observers see a subsequence of the transitions
//! rather than a lagging queue, which is the right semantics for driving UI.

use chrono::{DateTime, Utc};
use std::collections::VecDeque;
use std::fmt;
use std::sync::{Arc, Mutex, PoisonError};
use tokio::sync::watch;

use crate::bundle::LocalBundle;
use crate::constants::DIAGNOSTIC_LOG_CAPACITY;
use crate::release::{Release, ReleaseAsset};

/// Where the engine currently stands in the update lifecycle.
#[derive(Debug, Clone, Default)]
pub enum UpdateState {
    /// No viable update is known.
    #[default]
    None,
    /// A viable newer release exists; nothing downloaded yet.
    Detected {
        /// The release that will be fetched.
        release: Release,
        /// The asset selected for download.
        asset: ReleaseAsset,
    },
    /// The asset is being downloaded.
    Downloading {
        /// The release being fetched.
        release: Release,
        /// The asset being fetched.
        asset: ReleaseAsset,
        /// Fraction received so far, in `[0, 1]`. May repeat across
        /// publications; never required to grow between any two samples.
        fraction: f64,
    },
    /// The update is extracted, trust-validated, and ready to install.
    Downloaded {
        /// The release that was fetched.
        release: Release,
        /// The asset that was fetched.
        asset: ReleaseAsset,
        /// Handle to the staged bundle, shared with the installer.
        bundle: Arc<LocalBundle>,
    },
}

impl UpdateState {
    /// Short lifecycle-stage name for logs and status lines.
    pub const fn stage(&self) -> &'static str {
        match self {
            Self::None => "none",
            Self::Detected { .. } => "detected",
            Self::Downloading { .. } => "downloading",
            Self::Downloaded { .. } => "downloaded",
        }
    }

    /// The release this state refers to, if any.
    pub const fn release(&self) -> Option<&Release> {
        match self {
            Self::None => None,
            Self::Detected { release, .. }
            | Self::Downloading { release, .. }
            | Self::Downloaded { release, .. } => Some(release),
        }
    }

    /// Whether no update is known.
    pub const fn is_none(&self) -> bool {
        matches!(self, Self::None)
    }
}

/// Single-writer holder of the observable [`UpdateState`].
///
/// Writes go through [`publish`](Self::publish) and succeed regardless of
/// how many observers exist, including zero.
#[derive(Debug)]
pub struct StateChannel {
    tx: watch::Sender<UpdateState>,
}

impl Default for StateChannel {
    fn default() -> Self {
        Self::new()
    }
}

impl StateChannel {
    /// Create a channel holding [`UpdateState::None`].
    pub fn new() -> Self {
        let (tx, _rx) = watch::channel(UpdateState::None);
        Self { tx }
    }

    /// Replace the current state.
    pub fn publish(&self, state: UpdateState) {
        tracing::debug!("Update state -> {}", state.stage());
        self.tx.send_replace(state);
    }

    /// Snapshot of the current state.
    pub fn current(&self) -> UpdateState {
        self.tx.borrow().clone()
    }

    /// Subscribe to state changes.
    ///
    /// The receiver immediately holds the current value and is woken on
    /// every subsequent publish.
    pub fn subscribe(&self) -> watch::Receiver<UpdateState> {
        self.tx.subscribe()
    }
}

/// One timestamped line in the diagnostic log.
#[derive(Debug, Clone)]
pub struct DiagnosticEntry {
    /// When the event was recorded.
    pub at: DateTime<Utc>,
    /// What happened.
    pub message: String,
}

impl fmt::Display for DiagnosticEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.at.format("%Y-%m-%dT%H:%M:%S%.3fZ"), self.message)
    }
}

/// Bounded in-memory log of lifecycle events, oldest entries evicted first.
///
/// Exists so a settings pane or bug report can show what the updater did
/// recently without scraping process logs. Everything recorded here is also
/// emitted through `tracing`.
#[derive(Debug)]
pub struct DiagnosticLog {
    entries: Mutex<VecDeque<DiagnosticEntry>>,
    capacity: usize,
}

impl Default for DiagnosticLog {
    fn default() -> Self {
        Self::new(DIAGNOSTIC_LOG_CAPACITY)
    }
}

impl DiagnosticLog {
    /// Create a log retaining at most `capacity` entries.
    pub fn new(capacity: usize) -> Self {
        Self {
            entries: Mutex::new(VecDeque::with_capacity(capacity)),
            capacity,
        }
    }

    /// Append an entry, evicting the oldest if at capacity.
    pub fn record(&self, message: impl Into<String>) {
        let message = message.into();
        tracing::debug!("{}", message);

        let mut entries = self.entries.lock().unwrap_or_else(PoisonError::into_inner);
        if entries.len() == self.capacity {
            entries.pop_front();
        }
        entries.push_back(DiagnosticEntry {
            at: Utc::now(),
            message,
        });
    }

    /// Snapshot of the retained entries, oldest first.
    pub fn entries(&self) -> Vec<DiagnosticEntry> {
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .cloned()
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_release() -> Release {
        Release {
            tag: semver::Version::new(1, 2, 0),
            prerelease: false,
            body: String::new(),
            display_name: "1.2.0".to_string(),
            info_url: String::new(),
            assets: vec![],
        }
    }

    fn sample_asset() -> ReleaseAsset {
        ReleaseAsset {
            name: "myapp-1.2.0.zip".to_string(),
            download_url: String::new(),
            kind: crate::release::AssetKind::Zip,
        }
    }

    #[tokio::test]
    async fn test_publish_reaches_subscribers() {
        let channel = StateChannel::new();
        let mut rx = channel.subscribe();
        assert!(rx.borrow().is_none());

        channel.publish(UpdateState::Detected {
            release: sample_release(),
            asset: sample_asset(),
        });

        rx.changed().await.unwrap();
        assert_eq!(rx.borrow().stage(), "detected");
        assert_eq!(channel.current().stage(), "detected");
    }

    #[tokio::test]
    async fn test_publish_with_no_subscribers_does_not_fail() {
        let channel = StateChannel::new();
        channel.publish(UpdateState::Downloading {
            release: sample_release(),
            asset: sample_asset(),
            fraction: 0.5,
        });
        assert_eq!(channel.current().stage(), "downloading");
    }

    #[tokio::test]
    async fn test_late_subscriber_sees_latest_value_only() {
        let channel = StateChannel::new();
        channel.publish(UpdateState::Detected {
            release: sample_release(),
            asset: sample_asset(),
        });
        channel.publish(UpdateState::Downloading {
            release: sample_release(),
            asset: sample_asset(),
            fraction: 0.25,
        });

        let rx = channel.subscribe();
        assert_eq!(rx.borrow().stage(), "downloading");
    }

    #[test]
    fn test_diagnostic_log_caps_entries() {
        let log = DiagnosticLog::new(3);
        for i in 0..5 {
            log.record(format!("event {i}"));
        }

        let entries = log.entries();
        assert_eq!(entries.len(), 3);
        assert_eq!(entries[0].message, "event 2");
        assert_eq!(entries[2].message, "event 4");
    }

    #[test]
    fn test_state_accessors() {
        let state = UpdateState::Detected {
            release: sample_release(),
            asset: sample_asset(),
        };
        assert_eq!(state.release().unwrap().tag, semver::Version::new(1, 2, 0));
        assert!(!state.is_none());
        assert!(UpdateState::None.is_none());
    }
}
