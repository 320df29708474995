//! Global constants used throughout the skylift codebase.
//!
//! This module contains polling intervals, naming conventions, and other
//! values that are used across multiple modules. Defining them centrally
//! improves maintainability and makes magic numbers more discoverable.

use std::time::Duration;

/// Default interval between periodic update checks (24 hours).
///
/// Daily checks balance freshness against GitHub's unauthenticated API rate
/// limit of 60 requests per hour per IP.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(86_400);

/// Interval at which download progress is published to observers (500ms).
///
/// Byte-stream chunks arrive far faster than any UI can usefully redraw;
/// progress is sampled on this timer instead of forwarded per chunk. The
/// last known fraction may be re-published unchanged on a tick.
pub fn progress_publish_interval() -> Duration {
    Duration::from_millis(500)
}

/// Default directory extension marking an installable application bundle.
pub const DEFAULT_BUNDLE_EXTENSION: &str = "app";

/// Base name of per-language changelog assets (`CHANGELOG.<lang>.<ext>`).
pub const CHANGELOG_ASSET_BASENAME: &str = "changelog";

/// Recognized file extensions for per-language changelog assets.
pub const CHANGELOG_ASSET_EXTENSIONS: &[&str] = &["md", "markdown", "txt"];

/// Base URL of the GitHub REST API.
pub const GITHUB_API_BASE: &str = "https://api.github.com";

/// Suffix appended to in-flight download files.
///
/// The finished payload only ever appears at the final path via rename, so
/// a reader can never observe a partial file there.
pub const PARTIAL_DOWNLOAD_SUFFIX: &str = ".partial";

/// Maximum number of entries retained in the in-memory diagnostic log.
pub const DIAGNOSTIC_LOG_CAPACITY: usize = 256;

/// Environment variable overriding the configuration file path.
pub const CONFIG_PATH_ENV: &str = "SKYLIFT_CONFIG";

/// Environment variable that disables interactive progress bars when set.
pub const NO_PROGRESS_ENV: &str = "SKYLIFT_NO_PROGRESS";
