//! Remote fetch: bring a URL's content into local storage.
//!
//! The task runner talks to a [`Downloader`] trait so tests can substitute
//! scripted fetchers; [`HttpDownloader`] is the production implementation,
//! streaming the response body to disk chunk by chunk. Artifacts are named
//! `{task_id}-{sanitized-name}` so concurrent tasks never clobber each
//! other's downloads.

use std::io;
use std::path::Path;

use async_trait::async_trait;
use futures::StreamExt;
use tokio::io::AsyncWriteExt;

use crate::mediatype;

#[derive(Debug, thiserror::Error)]
pub enum DownloadError {
    #[error("unsupported url scheme in {0}")]
    Scheme(String),

    #[error("request failed: {0}")]
    Request(String),

    #[error("server responded with status {0}")]
    Status(u16),

    #[error("download io: {0}")]
    Io(#[from] io::Error),
}

/// Fetches a remote resource into `dest_dir` and returns the artifact
/// file name.
#[async_trait]
pub trait Downloader: Send + Sync + 'static {
    async fn download(
        &self,
        url: &str,
        dest_dir: &Path,
        task_id: &str,
    ) -> Result<String, DownloadError>;
}

/// Production downloader on reqwest.
pub struct HttpDownloader {
    client: reqwest::Client,
}

impl HttpDownloader {
    pub fn new() -> Self {
        Self {
            client: reqwest::Client::new(),
        }
    }
}

impl Default for HttpDownloader {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Downloader for HttpDownloader {
    async fn download(
        &self,
        url: &str,
        dest_dir: &Path,
        task_id: &str,
    ) -> Result<String, DownloadError> {
        if !url.starts_with("http://") && !url.starts_with("https://") {
            return Err(DownloadError::Scheme(url.to_string()));
        }

        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|err| DownloadError::Request(err.to_string()))?;
        let status = response.status();
        if !status.is_success() {
            return Err(DownloadError::Status(status.as_u16()));
        }

        let content_type = response
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);
        let filename = artifact_name(url, task_id, content_type.as_deref());
        let dest = dest_dir.join(&filename);

        let mut file = tokio::fs::File::create(&dest).await?;
        let mut body = response.bytes_stream();
        while let Some(chunk) = body.next().await {
            let chunk = chunk.map_err(|err| DownloadError::Request(err.to_string()))?;
            file.write_all(&chunk).await?;
        }
        file.flush().await?;

        tracing::debug!(url = %url, artifact = %filename, "download complete");
        Ok(filename)
    }
}

/// Artifact name for a URL: the sanitized last path segment, prefixed with
/// the task id. Falls back to `download` plus a content-type extension
/// when the URL path carries no usable name.
fn artifact_name(url: &str, task_id: &str, content_type: Option<&str>) -> String {
    let path = url.split(['?', '#']).next().unwrap_or(url);
    let segment = path.rsplit('/').next().unwrap_or("");
    let mut name = sanitize_filename(segment);

    if name.is_empty() || !name.contains('.') {
        let base = if name.is_empty() { "download" } else { &name };
        name = match content_type.and_then(mediatype::extension_for_mime) {
            Some(ext) => format!("{base}.{ext}"),
            None => base.to_string(),
        };
    }
    format!("{task_id}-{name}")
}

/// Keep only filesystem-safe characters; path separators and anything
/// exotic become `_`, and leading dots are stripped.
pub fn sanitize_filename(name: &str) -> String {
    name.chars()
        .map(|c| match c {
            'a'..='z' | 'A'..='Z' | '0'..='9' | '.' | '-' | '_' => c,
            _ => '_',
        })
        .collect::<String>()
        .trim_start_matches('.')
        .to_string()
}
