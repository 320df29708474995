//! Archive extraction and bundle discovery.
//!
//! Downloaded archives are unpacked next to themselves, in the directory the
//! download pipeline wrote them to, and that directory is then scanned for
//! exactly one application bundle. Tarballs are handed to the system `tar`,
//! which autodetects gzip/xz/bzip2 compression; zip archives go through the
//! `zip` crate on a blocking thread because its extraction is synchronous.

use std::path::{Path, PathBuf};
use tokio::process::Command;
use tracing::{debug, warn};

use crate::error::UpdateError;
use crate::release::AssetKind;

/// Unpack `archive` into its parent directory.
///
/// The archive file itself is left in place; callers scanning for bundles
/// afterwards must ignore it (directories only).
pub async fn extract_archive(archive: &Path, kind: AssetKind) -> Result<(), UpdateError> {
    let workdir = archive.parent().ok_or_else(|| {
        UpdateError::Io(std::io::Error::other(format!(
            "archive path {} has no parent directory",
            archive.display()
        )))
    })?;

    match kind {
        AssetKind::Tar => extract_tar(archive, workdir).await,
        AssetKind::Zip => extract_zip(archive, workdir).await,
        AssetKind::Unknown => Err(UpdateError::UnsupportedArchive {
            name: archive
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_else(|| archive.display().to_string()),
        }),
    }
}

async fn extract_tar(archive: &Path, workdir: &Path) -> Result<(), UpdateError> {
    debug!("Extracting {} with tar", archive.display());

    let output = Command::new("tar")
        .arg("xf")
        .arg(archive)
        .current_dir(workdir)
        .output()
        .await?;

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        return Err(UpdateError::Io(std::io::Error::other(format!(
            "tar exited with {}: {}",
            output.status,
            stderr.trim()
        ))));
    }
    Ok(())
}

async fn extract_zip(archive: &Path, workdir: &Path) -> Result<(), UpdateError> {
    debug!("Extracting {} with the zip crate", archive.display());

    let archive = archive.to_path_buf();
    let workdir = workdir.to_path_buf();

    tokio::task::spawn_blocking(move || -> Result<(), UpdateError> {
        let file = std::fs::File::open(&archive)?;
        let mut zip = zip::ZipArchive::new(file)
            .map_err(|e| UpdateError::Io(std::io::Error::other(format!("zip open: {e}"))))?;
        zip.extract(&workdir)
            .map_err(|e| UpdateError::Io(std::io::Error::other(format!("zip extract: {e}"))))?;
        Ok(())
    })
    .await
    .map_err(|e| UpdateError::Io(std::io::Error::other(e)))?
}

/// Scan `dir` (non-recursively) for exactly one bundle directory.
///
/// A bundle directory is any directory entry whose extension matches
/// `bundle_extension` (case-insensitive). Zero matches and multiple matches
/// both fail with [`UpdateError::NoAppFound`]: with several candidates the
/// choice would depend on directory iteration order, which is OS-defined.
pub async fn find_bundle(dir: &Path, bundle_extension: &str) -> Result<PathBuf, UpdateError> {
    let mut bundles = Vec::new();
    let mut entries = tokio::fs::read_dir(dir).await?;

    while let Some(entry) = entries.next_entry().await? {
        let path = entry.path();
        if !entry.file_type().await?.is_dir() {
            continue;
        }
        let matches = path
            .extension()
            .is_some_and(|ext| ext.to_string_lossy().eq_ignore_ascii_case(bundle_extension));
        if matches {
            bundles.push(path);
        }
    }

    match bundles.len() {
        1 => Ok(bundles.remove(0)),
        found => {
            if found > 1 {
                warn!(
                    "Archive contains {} .{} bundles; refusing to pick one",
                    found, bundle_extension
                );
            }
            Err(UpdateError::NoAppFound {
                dir: dir.display().to_string(),
                found,
            })
        }
    }
}

/// Extract `archive` and return the single bundle it contained.
pub async fn extract_and_find_bundle(
    archive: &Path,
    kind: AssetKind,
    bundle_extension: &str,
) -> Result<PathBuf, UpdateError> {
    extract_archive(archive, kind).await?;

    let workdir = archive.parent().ok_or_else(|| {
        UpdateError::Io(std::io::Error::other(format!(
            "archive path {} has no parent directory",
            archive.display()
        )))
    })?;
    find_bundle(workdir, bundle_extension).await
}
