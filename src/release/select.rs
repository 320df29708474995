//! Version and asset selection.
//!
//! Pure functions deciding which release, if any, an update check should act
//! on. No I/O happens here; the caller supplies the already-fetched feed and
//! gets back either a `(release, asset)` pair, "nothing to do", or
//! [`UpdateError::AlreadyUpToDate`].
//!
//! # Asset naming convention
//!
//! Within the chosen release, an asset qualifies when its lowercased name
//! minus the final extension matches `<prefix>-<version>`:
//!
//! - `<prefix>-<version>.tar.{gz,xz,bz2}` with a tar-family MIME type, or
//! - `<prefix>-<version>.zip` with a zip MIME type.
//!
//! Name and declared MIME type must both agree; a file merely named like an
//! archive is not trusted. The first asset in feed order that qualifies wins.

use semver::Version;

use crate::error::UpdateError;
use crate::release::{AssetKind, Release, ReleaseAsset};

/// Pick the release and asset a check should act on.
///
/// Filters prereleases (unless `allow_prereleases`), takes the maximum
/// remaining release by version, and requires it to be strictly newer than
/// `current`. Releases with equal versions are tied by feed order: the last
/// one listed wins.
///
/// # Returns
///
/// - `Ok(Some((release, asset)))` - a viable update with a usable artifact
/// - `Ok(None)` - no candidate releases, or the newest has no matching
///   asset; both mean "nothing to do", not a malfunction
/// - `Err(AlreadyUpToDate)` - the feed maximum is not newer than `current`
pub fn find_viable_update<'a>(
    releases: &'a [Release],
    current: &Version,
    release_prefix: &str,
    allow_prereleases: bool,
) -> Result<Option<(&'a Release, &'a ReleaseAsset)>, UpdateError> {
    let Some(newest) = releases
        .iter()
        .filter(|release| allow_prereleases || !release.prerelease)
        .max()
    else {
        return Ok(None);
    };

    if newest.tag <= *current {
        return Err(UpdateError::AlreadyUpToDate {
            current: current.clone(),
            newest: newest.tag.clone(),
        });
    }

    Ok(viable_asset(newest, release_prefix).map(|asset| (newest, asset)))
}

/// Find the first asset in `release` matching the naming convention.
///
/// Matching is case-insensitive on the asset name; the configured prefix is
/// lowercased before comparison so `MyApp-1.2.0.zip` matches prefix `myapp`.
pub fn viable_asset<'a>(release: &'a Release, release_prefix: &str) -> Option<&'a ReleaseAsset> {
    let prefix = format!("{}-{}", release_prefix.to_lowercase(), release.tag);

    release.assets.iter().find(|asset| {
        let name = asset.name.to_lowercase();
        let (stem, ext) = match name.rfind('.') {
            Some(dot) => (&name[..dot], &name[dot + 1..]),
            None => (name.as_str(), ""),
        };

        match asset.kind {
            AssetKind::Tar => stem == format!("{prefix}.tar"),
            AssetKind::Zip => stem == prefix && ext == "zip",
            AssetKind::Unknown => false,
        }
    })
}
