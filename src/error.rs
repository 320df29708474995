//! Error handling for skylift.
//!
//! Everything that can go wrong during an update cycle is captured by
//! [`UpdateError`], one variant per failure class so callers can match on the
//! outcome instead of string-scraping. The engine never panics on a failed
//! check; errors propagate through `Result` and the observable update state
//! stays at the last value it reached.
//!
//! Two kinds of conditions share this type:
//! - **Expected terminals** like [`UpdateError::AlreadyUpToDate`], which end a
//!   check cycle without meaning anything is broken.
//! - **Real failures** like [`UpdateError::DownloadFailed`] or
//!   [`UpdateError::IdentityMismatch`], which abort the cycle.
//!
//! [`user_friendly_error`] converts any error reaching the CLI boundary into
//! an [`ErrorContext`] carrying an actionable suggestion for terminal display.

use colored::Colorize;
use std::fmt;
use thiserror::Error;

/// The error type for every fallible operation in the update engine.
///
/// Variants are grouped by pipeline stage: selection, download, extraction,
/// trust validation, and install. Paths are carried as strings because they
/// exist purely for messages at this point; no caller ever re-opens them.
#[derive(Error, Debug)]
pub enum UpdateError {
    /// The running application bundle has no executable in any known layout.
    ///
    /// Checked before an update is attempted; a bundle without an executable
    /// cannot be relaunched, so updating it would strand the user.
    #[error("no executable found in bundle {bundle}")]
    NoExecutableFound {
        /// Path of the bundle that was searched.
        bundle: String,
    },

    /// A signing identity could not be determined for one side of the
    /// trust comparison.
    ///
    /// Raised when either the running bundle or the downloaded candidate has
    /// no signing identity and signature validation has not been explicitly
    /// skipped.
    #[error("no signing identity available for {bundle}")]
    IdentityUnavailable {
        /// Path of the bundle whose identity could not be read.
        bundle: String,
    },

    /// The downloaded bundle is signed by a different authority than the
    /// running one.
    #[error("signing identity mismatch: running '{running}' vs candidate '{candidate}'")]
    IdentityMismatch {
        /// Identity of the currently running bundle.
        running: String,
        /// Identity of the downloaded candidate bundle.
        candidate: String,
    },

    /// The downloaded and extracted bundle is missing its executable.
    ///
    /// Distinct from [`NoExecutableFound`](Self::NoExecutableFound), which is
    /// about the bundle already installed on disk.
    #[error("downloaded bundle at {bundle} has no executable")]
    InvalidDownloadedBundle {
        /// Path of the extracted candidate bundle.
        bundle: String,
    },

    /// The newest release in the feed is not newer than the running version.
    ///
    /// This is the normal outcome of most checks, not a malfunction. The CLI
    /// reports it as "up to date" and exits zero.
    #[error("already up to date: running {current}, newest available {newest}")]
    AlreadyUpToDate {
        /// Version of the running application.
        current: semver::Version,
        /// Newest version present in the feed after filtering.
        newest: semver::Version,
    },

    /// A download terminated before the full payload arrived.
    #[error("download of {url} failed: {reason}")]
    DownloadFailed {
        /// The asset URL that was being fetched.
        url: String,
        /// Transport-level reason for the failure.
        reason: String,
    },

    /// The selected asset's archive format is not one the extractor handles.
    #[error("unsupported archive format for '{name}'")]
    UnsupportedArchive {
        /// Name of the asset that could not be classified.
        name: String,
    },

    /// Extraction finished but no unambiguous application bundle was found.
    ///
    /// Raised both when the archive contains no bundle directory and when it
    /// contains more than one; picking one of several at random would make
    /// the install nondeterministic.
    #[error("expected exactly one application bundle in {dir}, found {found}")]
    NoAppFound {
        /// Directory that was scanned after extraction.
        dir: String,
        /// How many bundle directories the scan turned up.
        found: usize,
    },

    /// The release feed could not be fetched or decoded.
    ///
    /// Covers connection failures, non-success HTTP statuses, and malformed
    /// JSON, for both the release list and changelog asset fetches.
    #[error("release feed request failed during {operation}: {reason}")]
    Transport {
        /// What was being fetched (e.g. "release list", "changelog asset").
        operation: String,
        /// The underlying transport or decode failure.
        reason: String,
    },

    /// A second update check was started while one was already running.
    ///
    /// Checks are serialized; the caller should wait for the in-flight check
    /// to finish rather than queue another.
    #[error("an update check is already in progress")]
    CheckInProgress,

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl UpdateError {
    /// Whether this error is an expected end-of-cycle condition rather than
    /// a failure worth alarming the user about.
    pub const fn is_benign(&self) -> bool {
        matches!(self, Self::AlreadyUpToDate { .. })
    }
}

/// A user-facing wrapper pairing an error with an actionable suggestion.
///
/// Produced by [`user_friendly_error`] at the CLI boundary; the library never
/// constructs one internally.
#[derive(Debug)]
pub struct ErrorContext {
    /// The underlying error.
    pub error: anyhow::Error,
    /// Optional suggestion for resolving the error.
    pub suggestion: Option<String>,
}

impl ErrorContext {
    /// Create a context with no suggestion attached.
    #[must_use]
    pub fn new(error: anyhow::Error) -> Self {
        Self {
            error,
            suggestion: None,
        }
    }

    /// Attach a suggestion for resolving the error.
    ///
    /// Suggestions are rendered in green to stand apart from the error text.
    #[must_use]
    pub fn with_suggestion(mut self, suggestion: impl Into<String>) -> Self {
        self.suggestion = Some(suggestion.into());
        self
    }

    /// Print the error (and suggestion, when present) to stderr with color.
    pub fn display(&self) {
        eprintln!("{}: {:#}", "error".red().bold(), self.error);

        if let Some(suggestion) = &self.suggestion {
            eprintln!("{}: {}", "suggestion".green(), suggestion);
        }
    }
}

impl fmt::Display for ErrorContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:#}", self.error)?;

        if let Some(suggestion) = &self.suggestion {
            write!(f, "\nSuggestion: {suggestion}")?;
        }

        Ok(())
    }
}

/// Convert any error into an [`ErrorContext`] with a tailored suggestion.
///
/// Recognizes [`UpdateError`] variants and attaches the advice a user can
/// actually act on; everything else passes through without a suggestion.
pub fn user_friendly_error(error: anyhow::Error) -> ErrorContext {
    let suggestion = match error.downcast_ref::<UpdateError>() {
        Some(UpdateError::AlreadyUpToDate { .. }) => None,
        Some(UpdateError::IdentityMismatch { .. }) => Some(
            "The downloaded build is signed by a different authority. Download the \
             application manually from a source you trust."
                .to_string(),
        ),
        Some(UpdateError::IdentityUnavailable { .. }) => Some(
            "Signature validation requires both bundles to be code-signed. Use \
             --skip-signing only for builds you produced yourself."
                .to_string(),
        ),
        Some(UpdateError::Transport { .. }) => Some(
            "Check your network connection. GitHub also rate-limits unauthenticated \
             API requests; waiting a few minutes usually clears it."
                .to_string(),
        ),
        Some(UpdateError::DownloadFailed { .. }) => {
            Some("The download was interrupted. Run the check again to retry.".to_string())
        }
        Some(UpdateError::CheckInProgress) => {
            Some("Wait for the running check to finish before starting another.".to_string())
        }
        Some(UpdateError::NoAppFound { .. }) => Some(
            "The release archive does not contain exactly one application bundle. \
             This is a packaging problem on the publisher's side."
                .to_string(),
        ),
        _ => None,
    };

    let ctx = ErrorContext::new(error);
    match suggestion {
        Some(s) => ctx.with_suggestion(s),
        None => ctx,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display_messages() {
        let err = UpdateError::IdentityMismatch {
            running: "Developer ID Application: A".to_string(),
            candidate: "Developer ID Application: B".to_string(),
        };
        let msg = err.to_string();
        assert!(msg.contains("Developer ID Application: A"));
        assert!(msg.contains("Developer ID Application: B"));

        let err = UpdateError::AlreadyUpToDate {
            current: semver::Version::new(1, 2, 0),
            newest: semver::Version::new(1, 2, 0),
        };
        assert!(err.to_string().contains("1.2.0"));
        assert!(err.is_benign());
    }

    #[test]
    fn test_io_error_conversion() {
        let io = std::io::Error::new(std::io::ErrorKind::NotFound, "gone");
        let err: UpdateError = io.into();
        match err {
            UpdateError::Io(_) => {}
            other => panic!("expected Io variant, got {other:?}"),
        }
    }

    #[test]
    fn test_user_friendly_error_attaches_suggestions() {
        let err = UpdateError::Transport {
            operation: "release list".to_string(),
            reason: "connection refused".to_string(),
        };
        let ctx = user_friendly_error(anyhow::Error::from(err));
        assert!(ctx.suggestion.is_some());

        let err = UpdateError::AlreadyUpToDate {
            current: semver::Version::new(1, 0, 0),
            newest: semver::Version::new(1, 0, 0),
        };
        let ctx = user_friendly_error(anyhow::Error::from(err));
        assert!(ctx.suggestion.is_none());
    }

    #[test]
    fn test_context_display_includes_suggestion() {
        let ctx = ErrorContext::new(anyhow::anyhow!("boom")).with_suggestion("try again");
        let rendered = format!("{ctx}");
        assert!(rendered.contains("boom"));
        assert!(rendered.contains("Suggestion: try again"));
    }
}
