//! Configuration for the update engine.
//!
//! [`UpdaterConfig`] carries everything the engine needs to know about the
//! application it updates: where the release feed lives, how assets are
//! named, how often to poll, and which languages the user prefers for
//! release notes. It loads from a TOML file at `~/.skylift/config.toml`
//! (overridable via the `SKYLIFT_CONFIG` environment variable or an explicit
//! path) and every field has a serde default, so a partial file or no file
//! at all is valid.
//!
//! # TOML Example
//!
//! ```toml
//! owner = "acme"
//! repo = "myapp"
//! release_prefix = "myapp"
//! poll_interval_secs = 86400
//! allow_prereleases = false
//! skip_signature_validation = false
//! preferred_languages = ["zh-CN", "en"]
//! bundle_extension = "app"
//! ```

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio::fs;

use crate::constants::{CONFIG_PATH_ENV, DEFAULT_BUNDLE_EXTENSION, DEFAULT_POLL_INTERVAL};

/// Settings controlling update checks, validation, and installation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UpdaterConfig {
    /// GitHub account or organization owning the release repository.
    #[serde(default)]
    pub owner: String,

    /// Repository name within the owner's account.
    #[serde(default)]
    pub repo: String,

    /// Base name release archives are published under.
    ///
    /// Assets are expected to be named `<prefix>-<version>.<ext>`. When
    /// unset, the repository name is used.
    #[serde(default)]
    pub release_prefix: Option<String>,

    /// Interval between periodic update checks in seconds.
    ///
    /// # Default: `86400` (24 hours)
    ///
    /// GitHub allows 60 unauthenticated API requests per hour per IP
    /// address; intervals below a minute risk exhausting that budget.
    #[serde(default = "default_poll_interval_secs")]
    pub poll_interval_secs: u64,

    /// Whether releases marked as prereleases are eligible for selection.
    ///
    /// # Default: `false`
    #[serde(default)]
    pub allow_prereleases: bool,

    /// Whether to skip signing-identity comparison before installing.
    ///
    /// Exists for test and fixture execution where bundles are unsigned.
    /// Must stay off in production configuration.
    ///
    /// # Default: `false`
    #[serde(default)]
    pub skip_signature_validation: bool,

    /// Language tags for release-notes resolution, most preferred first.
    ///
    /// # Default: derived from the locale environment
    ///
    /// When absent, the list is read from `LANGUAGE` (colon-separated),
    /// then the first of `LC_ALL`, `LC_MESSAGES`, `LANG` that is set,
    /// with POSIX locale syntax normalized (`zh_CN.UTF-8` becomes `zh-CN`).
    #[serde(default = "system_languages")]
    pub preferred_languages: Vec<String>,

    /// Directory extension that marks an application bundle.
    ///
    /// # Default: `"app"`
    #[serde(default = "default_bundle_extension")]
    pub bundle_extension: String,

    /// Path of the installed bundle to replace.
    ///
    /// When unset, the bundle containing the running executable is used.
    /// Setting it explicitly supports tests and non-standard layouts.
    #[serde(default)]
    pub install_path: Option<PathBuf>,
}

impl Default for UpdaterConfig {
    fn default() -> Self {
        Self {
            owner: String::new(),
            repo: String::new(),
            release_prefix: None,
            poll_interval_secs: default_poll_interval_secs(),
            allow_prereleases: false,
            skip_signature_validation: false,
            preferred_languages: system_languages(),
            bundle_extension: default_bundle_extension(),
            install_path: None,
        }
    }
}

impl UpdaterConfig {
    /// Configuration for `github.com/<owner>/<repo>` with all defaults.
    pub fn new(owner: impl Into<String>, repo: impl Into<String>) -> Self {
        Self {
            owner: owner.into(),
            repo: repo.into(),
            ..Self::default()
        }
    }

    /// Load configuration from the default location.
    ///
    /// Returns the default configuration if no file exists there.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - The default path cannot be determined
    /// - The file exists but cannot be read
    /// - The file contains invalid TOML syntax
    pub async fn load() -> Result<Self> {
        let path = Self::default_path()?;
        if path.exists() {
            Self::load_from(&path).await
        } else {
            Ok(Self::default())
        }
    }

    /// Load configuration from an optional explicit path.
    ///
    /// If a path is provided, loads from that path (the file must exist).
    /// Otherwise behaves like [`UpdaterConfig::load`].
    pub async fn load_with_optional(path: Option<PathBuf>) -> Result<Self> {
        match path {
            Some(path) => Self::load_from(&path).await,
            None => Self::load().await,
        }
    }

    /// Load configuration from a specific file path.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or contains invalid
    /// TOML.
    pub async fn load_from(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .await
            .with_context(|| format!("Failed to read config from {}", path.display()))?;

        toml::from_str(&content)
            .with_context(|| format!("Failed to parse config from {}", path.display()))
    }

    /// Default configuration file location.
    ///
    /// The `SKYLIFT_CONFIG` environment variable overrides the platform
    /// default of `~/.skylift/config.toml` (`%LOCALAPPDATA%\skylift` on
    /// Windows).
    pub fn default_path() -> Result<PathBuf> {
        if let Ok(path) = std::env::var(CONFIG_PATH_ENV) {
            return Ok(PathBuf::from(path));
        }

        let config_dir = if cfg!(target_os = "windows") {
            dirs::data_local_dir()
                .ok_or_else(|| anyhow::anyhow!("Unable to determine local data directory"))?
                .join("skylift")
        } else {
            dirs::home_dir()
                .ok_or_else(|| anyhow::anyhow!("Unable to determine home directory"))?
                .join(".skylift")
        };

        Ok(config_dir.join("config.toml"))
    }

    /// The asset name prefix, falling back to the repository name.
    pub fn effective_release_prefix(&self) -> &str {
        self.release_prefix.as_deref().unwrap_or(&self.repo)
    }

    /// The polling interval as a [`Duration`].
    pub const fn poll_interval(&self) -> Duration {
        Duration::from_secs(self.poll_interval_secs)
    }
}

/// Preferred language tags derived from the locale environment.
///
/// Reads `LANGUAGE` as a colon-separated priority list; when it is unset or
/// empty, falls back to the first of `LC_ALL`, `LC_MESSAGES`, `LANG` that
/// carries a value. Entries are converted from POSIX form: the encoding and
/// modifier suffixes are dropped (`zh_CN.UTF-8` becomes `zh-CN`) and the
/// `C`/`POSIX` locales are ignored.
pub fn system_languages() -> Vec<String> {
    if let Ok(list) = std::env::var("LANGUAGE") {
        let tags: Vec<String> = list.split(':').filter_map(normalize_posix_locale).collect();
        if !tags.is_empty() {
            return tags;
        }
    }

    for var in ["LC_ALL", "LC_MESSAGES", "LANG"] {
        if let Ok(value) = std::env::var(var) {
            if let Some(tag) = normalize_posix_locale(&value) {
                return vec![tag];
            }
        }
    }

    Vec::new()
}

fn normalize_posix_locale(raw: &str) -> Option<String> {
    let base = raw.split(['.', '@']).next().unwrap_or("").trim();
    if base.is_empty() || base == "C" || base == "POSIX" {
        return None;
    }
    Some(base.replace('_', "-"))
}

fn default_poll_interval_secs() -> u64 {
    DEFAULT_POLL_INTERVAL.as_secs()
}

fn default_bundle_extension() -> String {
    DEFAULT_BUNDLE_EXTENSION.to_string()
}
