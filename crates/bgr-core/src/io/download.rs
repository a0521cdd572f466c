//! Asset downloads with streaming SHA256.

use std::path::Path;

use bgr_schema::Sha256Digest;
use futures::StreamExt;
use reqwest::Client;
use sha2::{Digest, Sha256};
use thiserror::Error;
use tokio::fs::File;
use tokio::io::AsyncWriteExt;

use crate::Reporter;

#[derive(Error, Debug)]
pub enum DownloadError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Stream `url` into `dest` (created or truncated), hashing as it goes.
///
/// Progress is reported against `label`. Returns the digest of the bytes
/// written.
pub async fn download_to_file(
    client: &Client,
    url: &str,
    dest: &Path,
    label: &str,
    reporter: &dyn Reporter,
) -> Result<Sha256Digest, DownloadError> {
    tracing::debug!(%url, dest = %dest.display(), "downloading");

    let response = client
        .get(url)
        .header(reqwest::header::USER_AGENT, crate::USER_AGENT)
        .send()
        .await?
        .error_for_status()?;

    let total_size = response.content_length();
    reporter.downloading(label, 0, total_size);

    let mut file = File::create(dest).await?;
    let mut stream = response.bytes_stream();
    let mut hasher = Sha256::new();
    let mut downloaded: u64 = 0;

    while let Some(chunk) = stream.next().await {
        let chunk = chunk?;
        file.write_all(&chunk).await?;
        hasher.update(&chunk);
        downloaded += chunk.len() as u64;
        reporter.downloading(label, downloaded, total_size);
    }

    file.flush().await?;
    file.sync_all().await?;

    Ok(Sha256Digest::from_hasher(hasher))
}

/// Fetch a small text asset (e.g. a checksum manifest) into memory.
pub async fn download_text(client: &Client, url: &str) -> Result<String, DownloadError> {
    tracing::debug!(%url, "fetching text asset");

    let text = client
        .get(url)
        .header(reqwest::header::USER_AGENT, crate::USER_AGENT)
        .send()
        .await?
        .error_for_status()?
        .text()
        .await?;

    Ok(text)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::NullReporter;
    use mockito::Server;

    #[tokio::test]
    async fn streams_body_and_hashes_it() {
        let mut server = Server::new_async().await;
        let _m = server
            .mock("GET", "/asset")
            .with_status(200)
            .with_body("binary-bytes")
            .create_async()
            .await;

        let dir = tempfile::tempdir().unwrap();
        let dest = dir.path().join("asset");
        let url = format!("{}/asset", server.url());

        let digest = download_to_file(&Client::new(), &url, &dest, "asset", &NullReporter)
            .await
            .unwrap();

        assert_eq!(std::fs::read(&dest).unwrap(), b"binary-bytes");
        assert_eq!(digest, Sha256Digest::compute(b"binary-bytes"));
    }

    #[tokio::test]
    async fn http_errors_propagate() {
        let mut server = Server::new_async().await;
        let _m = server
            .mock("GET", "/missing")
            .with_status(404)
            .create_async()
            .await;

        let url = format!("{}/missing", server.url());
        let err = download_text(&Client::new(), &url).await.unwrap_err();
        assert!(matches!(err, DownloadError::Http(_)));
    }
}
