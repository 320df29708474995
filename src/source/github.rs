//! Live GitHub release source.
//!
//! Talks to the GitHub REST API (`/repos/{owner}/{repo}/releases`) and
//! serves asset payloads from their `browser_download_url`. Every outgoing
//! URL passes through the configured [`UrlRewriter`] first, so a mirror or
//! proxy deployment only has to swap hostnames.
//!
//! The download path implements the streaming pipeline: bytes accumulate in
//! `<name>.partial` next to the final destination and are renamed into place
//! after a successful sync, so the final path either holds a complete
//! payload or nothing at all.

use async_trait::async_trait;
use futures::StreamExt;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::fs;
use tokio::io::AsyncWriteExt;
use tokio::sync::mpsc;
use tracing::{debug, warn};

use crate::constants::{GITHUB_API_BASE, PARTIAL_DOWNLOAD_SUFFIX};
use crate::error::UpdateError;
use crate::release::{Release, ReleaseAsset};
use crate::source::{DownloadEvent, DownloadStream, IdentityRewriter, ReleaseSource, UrlRewriter};

const USER_AGENT: &str = concat!("skylift/", env!("CARGO_PKG_VERSION"));

/// Capacity of a download's event channel.
///
/// Bounded so a stalled consumer applies backpressure to the byte stream
/// instead of buffering unbounded progress events.
const EVENT_CHANNEL_CAPACITY: usize = 32;

/// [`ReleaseSource`] backed by the public GitHub API.
pub struct GithubReleaseSource {
    client: reqwest::Client,
    api_base: String,
    rewriter: Arc<dyn UrlRewriter>,
}

impl Default for GithubReleaseSource {
    fn default() -> Self {
        Self {
            client: reqwest::Client::new(),
            api_base: GITHUB_API_BASE.to_string(),
            rewriter: Arc::new(IdentityRewriter),
        }
    }
}

impl GithubReleaseSource {
    /// Create a source against the public GitHub API.
    pub fn new() -> Self {
        Self::default()
    }

    /// Override the API base URL (GitHub Enterprise installations).
    #[must_use]
    pub fn with_api_base(mut self, api_base: impl Into<String>) -> Self {
        self.api_base = api_base.into();
        self
    }

    /// Install a rewriter applied to every outgoing URL.
    #[must_use]
    pub fn with_url_rewriter(mut self, rewriter: impl UrlRewriter + 'static) -> Self {
        self.rewriter = Arc::new(rewriter);
        self
    }

    fn feed_url(&self, owner: &str, repo: &str) -> String {
        self.rewriter
            .rewrite(&format!("{}/repos/{owner}/{repo}/releases", self.api_base))
    }

    fn get(&self, url: &str) -> reqwest::RequestBuilder {
        self.client
            .get(url)
            .header(reqwest::header::USER_AGENT, USER_AGENT)
    }
}

#[async_trait]
impl ReleaseSource for GithubReleaseSource {
    async fn fetch_releases(
        &self,
        owner: &str,
        repo: &str,
    ) -> Result<Vec<Release>, UpdateError> {
        let url = self.feed_url(owner, repo);
        debug!("Fetching release feed from {}", url);

        let response =
            self.get(&url)
                .send()
                .await
                .map_err(|e| UpdateError::Transport {
                    operation: "release list".to_string(),
                    reason: e.to_string(),
                })?;

        let status = response.status();
        if !status.is_success() {
            return Err(UpdateError::Transport {
                operation: "release list".to_string(),
                reason: format!("HTTP {status} from {url}"),
            });
        }

        let releases: Vec<Release> =
            response.json().await.map_err(|e| UpdateError::Transport {
                operation: "release list".to_string(),
                reason: format!("response decode failed: {e}"),
            })?;

        debug!("Feed returned {} releases", releases.len());
        Ok(releases)
    }

    async fn fetch_asset_bytes(&self, asset: &ReleaseAsset) -> Result<Vec<u8>, UpdateError> {
        let url = self.rewriter.rewrite(&asset.download_url);
        debug!("Fetching asset '{}' from {}", asset.name, url);

        let response =
            self.get(&url)
                .send()
                .await
                .map_err(|e| UpdateError::Transport {
                    operation: format!("asset '{}'", asset.name),
                    reason: e.to_string(),
                })?;

        let status = response.status();
        if !status.is_success() {
            return Err(UpdateError::Transport {
                operation: format!("asset '{}'", asset.name),
                reason: format!("HTTP {status} from {url}"),
            });
        }

        let bytes = response.bytes().await.map_err(|e| UpdateError::Transport {
            operation: format!("asset '{}'", asset.name),
            reason: e.to_string(),
        })?;
        Ok(bytes.to_vec())
    }

    async fn download(
        &self,
        asset: &ReleaseAsset,
        dest_dir: &Path,
    ) -> Result<DownloadStream, UpdateError> {
        let url = self.rewriter.rewrite(&asset.download_url);
        debug!("Starting download of '{}' from {}", asset.name, url);

        let response = self
            .get(&url)
            .send()
            .await
            .map_err(|e| UpdateError::DownloadFailed {
                url: url.clone(),
                reason: e.to_string(),
            })?;

        let status = response.status();
        if !status.is_success() {
            return Err(UpdateError::DownloadFailed {
                url,
                reason: format!("HTTP {status}"),
            });
        }

        // Zero-length headers are useless for progress; treat them as absent.
        let total = response.content_length().filter(|len| *len > 0);
        let final_path = dest_dir.join(&asset.name);
        let partial_path =
            dest_dir.join(format!("{}{}", asset.name, PARTIAL_DOWNLOAD_SUFFIX));

        let (tx, rx) = mpsc::channel(EVENT_CHANNEL_CAPACITY);
        tokio::spawn(async move {
            match stream_to_disk(response, url, total, &partial_path, &final_path, &tx).await {
                Ok(path) => {
                    let _ = tx.send(Ok(DownloadEvent::Finished(path))).await;
                }
                Err(e) => {
                    if fs::remove_file(&partial_path).await.is_err() {
                        debug!("No partial file to clean up at {}", partial_path.display());
                    }
                    warn!("Download failed: {}", e);
                    let _ = tx.send(Err(e)).await;
                }
            }
        });

        Ok(rx)
    }
}

/// Drive `response`'s byte stream into `partial_path`, then rename it to
/// `final_path`.
///
/// Progress events are emitted only when `total` is known. The rename is the
/// commit point; every failure before it leaves only the partial file, which
/// the caller removes.
async fn stream_to_disk(
    response: reqwest::Response,
    url: String,
    total: Option<u64>,
    partial_path: &Path,
    final_path: &Path,
    tx: &mpsc::Sender<Result<DownloadEvent, UpdateError>>,
) -> Result<PathBuf, UpdateError> {
    let mut file = fs::File::create(partial_path).await?;
    let mut stream = response.bytes_stream();
    let mut received: u64 = 0;

    while let Some(chunk) = stream.next().await {
        let chunk = chunk.map_err(|e| UpdateError::DownloadFailed {
            url: url.clone(),
            reason: e.to_string(),
        })?;
        file.write_all(&chunk).await?;
        received += chunk.len() as u64;

        if let Some(total) = total {
            let fraction = (received as f64 / total as f64).min(1.0);
            if tx.send(Ok(DownloadEvent::Progress(fraction))).await.is_err() {
                // Receiver gone; nobody will consume the payload either.
                return Err(UpdateError::DownloadFailed {
                    url,
                    reason: "download observer dropped".to_string(),
                });
            }
        }
    }

    file.sync_all().await?;
    drop(file);
    fs::rename(partial_path, final_path).await?;

    debug!(
        "Download complete: {} bytes at {}",
        received,
        final_path.display()
    );
    Ok(final_path.to_path_buf())
}
