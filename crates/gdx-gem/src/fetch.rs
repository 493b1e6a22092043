//! Streaming archive download.

use std::path::{Path, PathBuf};
use std::time::Duration;

use tokio::io::AsyncWriteExt;

use crate::GemError;

/// What [`GemFetcher::fetch`] did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FetchOutcome {
    /// The archive was already on disk; no request was made.
    Cached,
    /// The archive was streamed from the registry.
    Downloaded { bytes: u64 },
}

/// Streams `.gem` archives to disk.
pub struct GemFetcher {
    http: reqwest::Client,
}

impl GemFetcher {
    /// # Panics
    ///
    /// Panics if the underlying `reqwest::Client` fails to build.
    #[must_use]
    pub fn new(timeout: Duration, user_agent: &str) -> Self {
        Self {
            http: reqwest::Client::builder()
                .user_agent(user_agent)
                .timeout(timeout)
                .build()
                .expect("reqwest client should build"),
        }
    }

    /// Download `url` to `dest` unless `dest` already exists.
    ///
    /// Bytes are written to `<dest>.part` chunk by chunk and renamed to `dest`
    /// only after the body is complete, so an existing `dest` is always a
    /// whole archive.
    ///
    /// # Errors
    ///
    /// Returns [`GemError::Transport`], [`GemError::Timeout`] or
    /// [`GemError::DownloadStatus`] for network failures, and
    /// [`GemError::Io`] if the file cannot be written. The partial file is
    /// removed on failure.
    pub async fn fetch(&self, url: &str, dest: &Path) -> Result<FetchOutcome, GemError> {
        if dest.is_file() {
            tracing::debug!(path = %dest.display(), "archive already downloaded");
            return Ok(FetchOutcome::Cached);
        }

        let partial = partial_path(dest);
        let result = self.stream_to(url, &partial).await;
        match result {
            Ok(bytes) => {
                tokio::fs::rename(&partial, dest).await?;
                tracing::info!(url, bytes, path = %dest.display(), "archive downloaded");
                Ok(FetchOutcome::Downloaded { bytes })
            }
            Err(err) => {
                let _ = tokio::fs::remove_file(&partial).await;
                Err(err)
            }
        }
    }

    async fn stream_to(&self, url: &str, partial: &Path) -> Result<u64, GemError> {
        tracing::debug!(url, "downloading archive");
        let mut resp = self
            .http
            .get(url)
            .send()
            .await
            .map_err(|e| GemError::transport(url, e))?;

        let status = resp.status();
        if !status.is_success() {
            return Err(GemError::DownloadStatus {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }

        if let Some(parent) = partial.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        let mut file = tokio::fs::File::create(partial).await?;
        let mut bytes = 0u64;
        while let Some(chunk) = resp.chunk().await.map_err(|e| GemError::transport(url, e))? {
            file.write_all(&chunk).await?;
            bytes += chunk.len() as u64;
        }
        file.flush().await?;
        file.sync_all().await?;
        Ok(bytes)
    }
}

fn partial_path(dest: &Path) -> PathBuf {
    let mut name = dest.file_name().unwrap_or_default().to_os_string();
    name.push(".part");
    dest.with_file_name(name)
}
