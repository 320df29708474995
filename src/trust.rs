//! Signing-identity trust validation.
//!
//! Before a downloaded bundle may replace the running one, both are reduced
//! to a signing identity string and compared. On macOS the identity is the
//! first `Authority=` line of `codesign -dvvv` output, i.e. the leaf of the
//! signing chain; on other platforms no identity oracle exists and every
//! bundle reads as unsigned.
//!
//! The comparison is deliberately strict: a missing identity on either side
//! rejects, because "unsigned" and "signed by someone else" are
//! indistinguishable to the user at install time. The skip flag exists for
//! development and fixture builds that are never signed; it defaults to off.

use std::path::Path;
use tracing::{debug, info};

use crate::error::UpdateError;

/// Outcome of comparing two signing identities.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TrustDecision {
    /// Identities are equal, or validation is skipped.
    Accept,
    /// At least one side has no identity.
    MissingIdentity,
    /// Both sides are signed, by different authorities.
    Mismatch {
        /// Identity of the running bundle.
        running: String,
        /// Identity of the candidate bundle.
        candidate: String,
    },
}

/// The trust decision table, as a pure function.
///
/// | running | candidate | skip  | result          |
/// |---------|-----------|-------|-----------------|
/// | present | equal     | any   | accept          |
/// | present | differs   | false | mismatch        |
/// | present | differs   | true  | accept          |
/// | absent either side  | false | missing-identity|
/// | absent either side  | true  | accept          |
pub fn evaluate_trust(
    running: Option<&str>,
    candidate: Option<&str>,
    skip_validation: bool,
) -> TrustDecision {
    if skip_validation {
        return TrustDecision::Accept;
    }

    match (running, candidate) {
        (Some(running), Some(candidate)) if running == candidate => TrustDecision::Accept,
        (Some(running), Some(candidate)) => TrustDecision::Mismatch {
            running: running.to_string(),
            candidate: candidate.to_string(),
        },
        _ => TrustDecision::MissingIdentity,
    }
}

/// Extract the first `Authority=` line from `codesign -dvvv` output.
pub(crate) fn authority_from_codesign_output(output: &str) -> Option<String> {
    output
        .lines()
        .find_map(|line| line.strip_prefix("Authority="))
        .map(|authority| authority.trim().to_string())
        .filter(|authority| !authority.is_empty())
}

/// Read the signing identity of the bundle at `path`.
///
/// `Ok(None)` means unsigned (or that this platform has no signature
/// tooling); only process-spawn failures are errors.
#[cfg(target_os = "macos")]
pub async fn signing_identity(path: &Path) -> Result<Option<String>, UpdateError> {
    let output = tokio::process::Command::new("codesign")
        .arg("-dvvv")
        .arg(path)
        .output()
        .await?;

    // codesign exits non-zero for unsigned bundles; that is an answer,
    // not a failure.
    if !output.status.success() {
        debug!("codesign found no signature on {}", path.display());
        return Ok(None);
    }

    // codesign writes its human-readable report to stderr.
    let report = String::from_utf8_lossy(&output.stderr);
    Ok(authority_from_codesign_output(&report))
}

/// Read the signing identity of the bundle at `path`.
///
/// `Ok(None)` means unsigned (or that this platform has no signature
/// tooling); only process-spawn failures are errors.
#[cfg(not(target_os = "macos"))]
pub async fn signing_identity(path: &Path) -> Result<Option<String>, UpdateError> {
    debug!("No signing identity oracle on this platform for {}", path.display());
    Ok(None)
}

/// Validates downloaded bundles against the running installation.
#[derive(Debug, Clone, Copy, Default)]
pub struct TrustValidator {
    skip_validation: bool,
}

impl TrustValidator {
    /// Create a validator. `skip_validation` disables the identity check
    /// entirely and should only be set for unsigned development builds.
    pub const fn new(skip_validation: bool) -> Self {
        Self { skip_validation }
    }

    /// Check that `candidate` is signed by the same authority as `running`.
    ///
    /// # Errors
    ///
    /// - [`UpdateError::IdentityUnavailable`] naming whichever side has no
    ///   identity
    /// - [`UpdateError::IdentityMismatch`] when both are signed but differ
    pub async fn validate(&self, running: &Path, candidate: &Path) -> Result<(), UpdateError> {
        if self.skip_validation {
            info!("Signature validation skipped by configuration");
            return Ok(());
        }

        let running_id = signing_identity(running).await?;
        let candidate_id = signing_identity(candidate).await?;

        match evaluate_trust(running_id.as_deref(), candidate_id.as_deref(), false) {
            TrustDecision::Accept => {
                debug!("Signing identities match");
                Ok(())
            }
            TrustDecision::MissingIdentity => {
                let unsigned = if running_id.is_none() {
                    running
                } else {
                    candidate
                };
                Err(UpdateError::IdentityUnavailable {
                    bundle: unsigned.display().to_string(),
                })
            }
            TrustDecision::Mismatch { running, candidate } => {
                Err(UpdateError::IdentityMismatch { running, candidate })
            }
        }
    }
}
