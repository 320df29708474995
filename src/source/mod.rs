//! Release sources.
//!
//! A [`ReleaseSource`] is where releases come from: it lists them, serves
//! small asset payloads (changelog files), and streams large ones (the
//! actual update archives) with progress. The engine holds sources behind
//! `Arc<dyn ReleaseSource>` so the live GitHub feed and the deterministic
//! fixture feed are interchangeable everywhere, tests included.
//!
//! Downloads are event streams rather than plain futures: the pipeline
//! pushes [`DownloadEvent::Progress`] values while bytes arrive and ends
//! with exactly one terminal item, either [`DownloadEvent::Finished`] or an
//! `Err`. Nothing follows the terminal item.

pub mod fixture;
pub mod github;

use async_trait::async_trait;
use std::path::{Path, PathBuf};
use tokio::sync::mpsc;

use crate::error::UpdateError;
use crate::release::{Release, ReleaseAsset};

pub use fixture::FixtureReleaseSource;
pub use github::GithubReleaseSource;

/// One event in a download's lifetime.
#[derive(Debug, Clone, PartialEq)]
pub enum DownloadEvent {
    /// Fraction of the payload received so far, in `[0, 1]`.
    ///
    /// Only emitted when the server declared a content length. Fractions may
    /// repeat; consumers must not assume strict growth.
    Progress(f64),
    /// The payload is complete and available at the given path.
    ///
    /// Terminal: the stream yields nothing after this.
    Finished(PathBuf),
}

/// Receiver half of a download event stream.
///
/// The sender side is owned by the download task; the stream closing without
/// a terminal event means that task panicked and should be treated as a
/// failed download.
pub type DownloadStream = mpsc::Receiver<Result<DownloadEvent, UpdateError>>;

/// Capability interface over a release feed.
#[async_trait]
pub trait ReleaseSource: Send + Sync {
    /// Fetch every release published for `owner/repo`. Feed order is
    /// preserved but carries no meaning; callers select by version.
    async fn fetch_releases(&self, owner: &str, repo: &str)
    -> Result<Vec<Release>, UpdateError>;

    /// Fetch a small asset wholesale into memory.
    ///
    /// Meant for changelog files; update archives go through
    /// [`download`](Self::download) instead.
    async fn fetch_asset_bytes(&self, asset: &ReleaseAsset) -> Result<Vec<u8>, UpdateError>;

    /// Start streaming `asset` into `dest_dir`.
    ///
    /// On success the payload lands at `dest_dir/<asset.name>`, and that
    /// path is reported by the terminal [`DownloadEvent::Finished`]. The
    /// final path never holds a partial file: bytes accumulate under a
    /// working name and are renamed into place only once complete.
    async fn download(
        &self,
        asset: &ReleaseAsset,
        dest_dir: &Path,
    ) -> Result<DownloadStream, UpdateError>;
}

/// Hook rewriting outgoing URLs before dispatch.
///
/// Lets deployments behind a proxy or mirror redirect feed and asset
/// requests without reimplementing a source. The default rewriter returns
/// the URL unchanged. Closures qualify:
///
/// ```rust,no_run
/// use skylift::source::GithubReleaseSource;
///
/// let source = GithubReleaseSource::new().with_url_rewriter(|url: &str| {
///     url.replace("https://api.github.com", "https://github-mirror.internal")
/// });
/// ```
pub trait UrlRewriter: Send + Sync {
    /// Rewrite one outgoing URL.
    fn rewrite(&self, url: &str) -> String;
}

impl<F> UrlRewriter for F
where
    F: Fn(&str) -> String + Send + Sync,
{
    fn rewrite(&self, url: &str) -> String {
        self(url)
    }
}

/// The default no-op rewriter.
#[derive(Debug, Clone, Copy, Default)]
pub struct IdentityRewriter;

impl UrlRewriter for IdentityRewriter {
    fn rewrite(&self, url: &str) -> String {
        url.to_string()
    }
}
