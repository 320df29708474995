//! Local application bundles.
//!
//! A bundle is the installable unit on disk: a directory named
//! `<Name>.<ext>` (`.app` by default) containing the application. The
//! running installation is a bundle, and so is the candidate produced by
//! extracting a downloaded archive.

use std::path::{Path, PathBuf};
use tempfile::TempDir;

use crate::error::UpdateError;

/// An owned handle to a bundle on disk.
///
/// Bundles extracted from a download live inside a staging directory whose
/// lifetime this handle owns: dropping the last reference removes the
/// staging tree and everything still in it. The handle for the running
/// installation carries no staging directory and cleans up nothing.
#[derive(Debug)]
pub struct LocalBundle {
    path: PathBuf,
    staging: Option<TempDir>,
}

impl LocalBundle {
    /// Wrap a bundle that lives inside an owned staging directory.
    pub fn staged(path: PathBuf, staging: TempDir) -> Self {
        Self {
            path,
            staging: Some(staging),
        }
    }

    /// Wrap an already-installed bundle. No cleanup on drop.
    pub fn installed(path: PathBuf) -> Self {
        Self {
            path,
            staging: None,
        }
    }

    /// Path of the bundle directory itself.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Whether this handle owns a staging directory.
    pub fn is_staged(&self) -> bool {
        self.staging.is_some()
    }

    /// Locate the bundle's executable, if it has one.
    pub fn executable(&self) -> Option<PathBuf> {
        bundle_executable(&self.path)
    }
}

/// Locate the executable inside a bundle directory.
///
/// Layouts are tried in order: `Contents/MacOS/<stem>` (the macOS bundle
/// layout), then `<stem>` directly under the bundle root (flat layout used
/// by fixtures and simpler platforms). `<stem>` is the directory name minus
/// its extension, so `MyApp.app` is expected to contain `MyApp`.
pub fn bundle_executable(bundle: &Path) -> Option<PathBuf> {
    let stem = bundle.file_stem()?;

    let macos_layout = bundle.join("Contents").join("MacOS").join(stem);
    if macos_layout.is_file() {
        return Some(macos_layout);
    }

    let flat_layout = bundle.join(stem);
    if flat_layout.is_file() {
        return Some(flat_layout);
    }

    None
}

/// Locate the bundle the running process was launched from.
///
/// Walks up from `std::env::current_exe()` to the nearest ancestor directory
/// whose extension matches `bundle_extension`. A process started outside a
/// bundle (a bare binary in `target/debug`, say) has no such ancestor; an
/// explicit install path must be configured in that case.
pub fn running_bundle_path(bundle_extension: &str) -> Result<PathBuf, UpdateError> {
    let exe = std::env::current_exe()?;
    for ancestor in exe.ancestors().skip(1) {
        let matches = ancestor
            .extension()
            .is_some_and(|ext| ext.eq_ignore_ascii_case(bundle_extension));
        if matches {
            return Ok(ancestor.to_path_buf());
        }
    }
    Err(UpdateError::Io(std::io::Error::other(format!(
        "running executable {} is not inside a '.{bundle_extension}' bundle; \
         set install_path in the configuration",
        exe.display()
    ))))
}
