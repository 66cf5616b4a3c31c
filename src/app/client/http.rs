//! HTTP transport built on reqwest
//!
//! Executes each [`RequestKind`] against the task's locator:
//!
//! - `Get` / `Post`: the response body becomes the payload
//! - `Download`: the body is streamed to `<destination>.part` and renamed
//!   into place once complete; the payload is the destination path
//! - `Upload`: the source file is sent as a chunked body with upload progress;
//!   the response body becomes the payload
//!
//! Non-2xx statuses are failures. Requests can be rate limited with
//! `governor`; retrying is left to the orchestrator.

use std::num::NonZeroU32;
use std::path::{Path, PathBuf};
use std::time::Duration;

use futures::future::BoxFuture;
use governor::clock::DefaultClock;
use governor::state::{InMemoryState, NotKeyed};
use governor::{Jitter, Quota, RateLimiter};
use reqwest::header::CONTENT_LENGTH;
use reqwest::{Body, Client, RequestBuilder, Response};
use tokio::fs::File;
use tokio::io::AsyncWriteExt;
use tracing::{debug, info, warn};
use url::Url;

use crate::app::models::{Direction, RequestKind, Task};
use crate::app::worker::{ProgressReporter, Transport};
use crate::constants::files;
use crate::errors::{ConfigResult, TransportError, TransportResult};

use super::config::ClientConfig;

type DirectLimiter = RateLimiter<NotKeyed, InMemoryState, DefaultClock>;

/// Transport performing real HTTP transfers
#[derive(Debug)]
pub struct HttpTransport {
    client: Client,
    rate_limiter: Option<DirectLimiter>,
}

impl HttpTransport {
    /// Create a transport from a prepared client
    ///
    /// A `rate_limit_rps` of 0 disables rate limiting.
    pub fn new(client: Client, rate_limit_rps: u32) -> Self {
        let rate_limiter =
            NonZeroU32::new(rate_limit_rps).map(|rps| RateLimiter::direct(Quota::per_second(rps)));
        Self {
            client,
            rate_limiter,
        }
    }

    /// Build the client and transport from configuration
    pub fn from_config(config: &ClientConfig) -> ConfigResult<Self> {
        let client = config.build_http_client()?;
        Ok(Self::new(client, config.rate_limit_rps))
    }

    pub fn is_rate_limited(&self) -> bool {
        self.rate_limiter.is_some()
    }

    async fn throttle(&self) {
        if let Some(limiter) = &self.rate_limiter {
            limiter
                .until_ready_with_jitter(Jitter::up_to(Duration::from_millis(100)))
                .await;
        }
    }

    /// Send a request and reject non-success statuses
    async fn send(&self, request: RequestBuilder) -> TransportResult<Response> {
        self.throttle().await;
        let response = request.send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(TransportError::Status {
                status: status.as_u16(),
            });
        }
        Ok(response)
    }

    async fn download_to(
        &self,
        url: Url,
        destination: &Path,
        progress: &ProgressReporter,
    ) -> TransportResult<Vec<u8>> {
        if let Some(parent) = destination.parent() {
            if !parent.as_os_str().is_empty() {
                tokio::fs::create_dir_all(parent).await?;
            }
        }

        let response = self.send(self.client.get(url)).await?;
        let partial = PartialFile::new(temp_path_for(destination));

        stream_to_file(response, partial.path(), progress).await?;

        tokio::fs::rename(partial.path(), destination)
            .await
            .map_err(|_| TransportError::AtomicOperationFailed {
                temp_path: partial.path().to_path_buf(),
                final_path: destination.to_path_buf(),
            })?;
        partial.keep();

        info!("Downloaded {}", destination.display());
        Ok(destination.display().to_string().into_bytes())
    }

    async fn upload_from(
        &self,
        url: Url,
        source: &Path,
        progress: &ProgressReporter,
    ) -> TransportResult<Vec<u8>> {
        let data = tokio::fs::read(source).await?;
        let total = data.len() as u64;
        let chunks: Vec<Vec<u8>> = data
            .chunks(files::UPLOAD_CHUNK_SIZE)
            .map(<[u8]>::to_vec)
            .collect();

        // Chunks are pulled as the connection accepts them
        let reporter = progress.clone();
        let mut sent = 0u64;
        let body = futures::stream::iter(chunks.into_iter().map(move |chunk| {
            sent += chunk.len() as u64;
            reporter.try_report(Direction::Upload, sent, total);
            Ok::<Vec<u8>, std::io::Error>(chunk)
        }));

        let request = self
            .client
            .post(url)
            .header(CONTENT_LENGTH, total.to_string())
            .body(Body::wrap_stream(body));
        let response = self.send(request).await?;

        debug!("Uploaded {} ({} bytes)", source.display(), total);
        read_body(response, progress).await
    }
}

impl Transport for HttpTransport {
    fn execute<'a>(
        &'a self,
        task: &'a Task,
        progress: ProgressReporter,
    ) -> BoxFuture<'a, TransportResult<Vec<u8>>> {
        Box::pin(async move {
            let url = Url::parse(&task.locator).map_err(|e| TransportError::InvalidUrl {
                url: task.locator.clone(),
                error: e.to_string(),
            })?;

            match &task.kind {
                RequestKind::Get => {
                    let response = self.send(self.client.get(url)).await?;
                    read_body(response, &progress).await
                }
                RequestKind::Post { body } => {
                    let response = self.send(self.client.post(url).body(body.clone())).await?;
                    read_body(response, &progress).await
                }
                RequestKind::Download { destination } => {
                    self.download_to(url, destination, &progress).await
                }
                RequestKind::Upload { source } => self.upload_from(url, source, &progress).await,
            }
        })
    }

    fn name(&self) -> &'static str {
        "http"
    }
}

/// Temporary path used while a download is in flight
pub fn temp_path_for(destination: &Path) -> PathBuf {
    let mut name = destination
        .file_name()
        .map(|n| n.to_os_string())
        .unwrap_or_default();
    name.push(files::TEMP_FILE_SUFFIX);
    destination.with_file_name(name)
}

/// In-flight download file, removed on drop unless kept
///
/// Covers both error returns and the future being dropped when the task is
/// stopped mid-stream.
struct PartialFile {
    path: PathBuf,
    keep: bool,
}

impl PartialFile {
    fn new(path: PathBuf) -> Self {
        Self { path, keep: false }
    }

    fn path(&self) -> &Path {
        &self.path
    }

    /// The file was renamed into place; leave the path alone
    fn keep(mut self) {
        self.keep = true;
    }
}

impl Drop for PartialFile {
    fn drop(&mut self) {
        if self.keep {
            return;
        }
        match std::fs::remove_file(&self.path) {
            Ok(()) => debug!("Removed partial download {}", self.path.display()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => warn!("Failed to remove {}: {}", self.path.display(), e),
        }
    }
}

/// Collect a response body in memory, reporting download progress per chunk
async fn read_body(mut response: Response, progress: &ProgressReporter) -> TransportResult<Vec<u8>> {
    let total = response.content_length().unwrap_or(0);
    let mut body = Vec::new();
    let mut received = 0u64;

    while let Some(chunk) = response.chunk().await? {
        received += chunk.len() as u64;
        body.extend_from_slice(&chunk);
        progress.download(received, total).await;
    }

    Ok(body)
}

async fn stream_to_file(
    mut response: Response,
    path: &Path,
    progress: &ProgressReporter,
) -> TransportResult<()> {
    let total = response.content_length().unwrap_or(0);
    let mut file = File::create(path).await?;
    let mut received = 0u64;

    while let Some(chunk) = response.chunk().await? {
        file.write_all(&chunk).await?;
        received += chunk.len() as u64;
        progress.download(received, total).await;
    }

    file.flush().await?;
    Ok(())
}
