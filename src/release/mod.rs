//! Release feed data model.
//!
//! Mirrors the subset of the GitHub releases API that the update engine
//! consumes: a [`Release`] is a tagged, versioned publication carrying a
//! markdown body and an ordered list of [`ReleaseAsset`]s. Releases are
//! immutable once fetched and compare by version alone, so feed order never
//! leaks into version ordering.
//!
//! Version tags are normalized at decode time: a leading `v` or `V` is
//! stripped and the remainder must parse as a semantic version. A feed
//! containing a non-semver tag fails decoding as a whole; the engine treats
//! that the same as any other malformed response.

pub mod select;

use serde::{Deserialize, Deserializer};
use std::cmp::Ordering;

/// Archive family of a release asset, derived from its declared MIME type.
///
/// Classification never fails: MIME types outside the known set map to
/// [`AssetKind::Unknown`], which the selector skips and the extractor
/// rejects. The tar family covers all compressed tarballs because the
/// extractor shells out to `tar`, which detects the compression itself.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AssetKind {
    /// A tarball, possibly gzip/xz/bzip2 compressed.
    Tar,
    /// A zip archive.
    Zip,
    /// Anything else; never downloadable.
    Unknown,
}

impl AssetKind {
    /// Classify a declared `content_type` value.
    pub fn from_content_type(content_type: &str) -> Self {
        match content_type {
            "application/x-bzip2" | "application/x-xz" | "application/x-gzip"
            | "application/gzip" => Self::Tar,
            "application/zip" => Self::Zip,
            _ => Self::Unknown,
        }
    }
}

/// A single downloadable file attached to a release.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
pub struct ReleaseAsset {
    /// File name as published (e.g. `myapp-1.2.0.zip`).
    pub name: String,
    /// Direct download URL for the asset payload.
    #[serde(rename = "browser_download_url")]
    pub download_url: String,
    /// Archive family derived from the asset's declared MIME type.
    #[serde(rename = "content_type", deserialize_with = "deserialize_kind")]
    pub kind: AssetKind,
}

/// A tagged, versioned publication in the release feed.
///
/// Equality and ordering are defined by `tag` alone: two releases with the
/// same version are the same release for selection purposes regardless of
/// their bodies or asset lists.
#[derive(Debug, Clone, Deserialize)]
pub struct Release {
    /// Semantic version parsed from the release tag (leading `v` stripped).
    #[serde(rename = "tag_name", deserialize_with = "deserialize_tag")]
    pub tag: semver::Version,
    /// Whether the publisher marked this release as a prerelease.
    #[serde(default)]
    pub prerelease: bool,
    /// Markdown release notes; may embed language-tagged changelog sections.
    #[serde(default)]
    pub body: String,
    /// Human-readable release title.
    #[serde(rename = "name", default)]
    pub display_name: String,
    /// Web page for the release.
    #[serde(rename = "html_url", default)]
    pub info_url: String,
    /// Downloadable assets in the order the feed listed them.
    #[serde(default)]
    pub assets: Vec<ReleaseAsset>,
}

impl PartialEq for Release {
    fn eq(&self, other: &Self) -> bool {
        self.tag == other.tag
    }
}

impl Eq for Release {}

impl PartialOrd for Release {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Release {
    fn cmp(&self, other: &Self) -> Ordering {
        self.tag.cmp(&other.tag)
    }
}

impl Release {
    /// Resolve the changelog section best matching the preferred languages,
    /// consulting only this release's body.
    ///
    /// This is the synchronous companion to
    /// [`Updater::localized_changelog`](crate::updater::Updater::localized_changelog);
    /// it cannot consult per-language changelog assets because that requires
    /// a fetch. See [`crate::changelog`] for the resolution rules.
    pub fn localized_body(&self, preferred_languages: &[String]) -> String {
        crate::changelog::localized_body(&self.body, preferred_languages)
    }
}

fn deserialize_tag<'de, D>(deserializer: D) -> Result<semver::Version, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = String::deserialize(deserializer)?;
    let trimmed = raw.strip_prefix(['v', 'V']).unwrap_or(&raw);
    semver::Version::parse(trimmed).map_err(|e| {
        serde::de::Error::custom(format!("release tag '{raw}' is not a semantic version: {e}"))
    })
}

fn deserialize_kind<'de, D>(deserializer: D) -> Result<AssetKind, D::Error>
where
    D: Deserializer<'de>,
{
    let content_type = String::deserialize(deserializer)?;
    Ok(AssetKind::from_content_type(&content_type))
}
