//! Fetch layer with retry, backoff and hard size caps.
//!
//! Handles `http(s)://` through reqwest and `file://` through tokio::fs, so
//! the rest of the pipeline treats local and remote repositories alike.

use std::time::{Duration, Instant};

use backoff::{future::retry_notify, ExponentialBackoff};
use reqwest::{Client, StatusCode};
use serde_json::Value;
use tracing::{debug, warn};
use url::Url;

use crate::config::PipelineConfig;
use crate::error::{Result, ZbrsError};

const INITIAL_INTERVAL: Duration = Duration::from_millis(200);
const MAX_INTERVAL: Duration = Duration::from_secs(5);

const UTF8_BOM: &[u8] = &[0xEF, 0xBB, 0xBF];

/// Which timeout applies to a request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum FetchKind {
    /// Manifests and indexes
    Json,
    /// Book files and other bulk content
    Download,
}

pub(crate) struct FetchClient {
    client: Client,
    json_timeout: Duration,
    download_timeout: Duration,
    max_retries: u32,
}

impl FetchClient {
    pub(crate) fn new(config: &PipelineConfig) -> Result<Self> {
        let client = Client::builder()
            .user_agent(&config.user_agent)
            .build()
            .map_err(|e| ZbrsError::network("", format!("Failed to create HTTP client: {e}")))?;

        Ok(Self {
            client,
            json_timeout: config.json_timeout,
            download_timeout: config.download_timeout,
            max_retries: config.max_retries,
        })
    }

    /// Fetch a document and parse it as JSON after stripping a leading BOM.
    pub(crate) async fn fetch_json(&self, url: &Url, max_size: u64) -> Result<(Vec<u8>, Value)> {
        let bytes = self.fetch(url, FetchKind::Json, max_size).await?;
        let value = parse_json(url.as_str(), &bytes)?;
        Ok((bytes, value))
    }

    /// Fetch raw bytes, refusing anything larger than `max_size`.
    pub(crate) async fn fetch(&self, url: &Url, kind: FetchKind, max_size: u64) -> Result<Vec<u8>> {
        match url.scheme() {
            "file" => read_local(url, max_size).await,
            "http" | "https" => self.fetch_remote(url, kind, max_size).await,
            other => Err(ZbrsError::network(
                url.as_str(),
                format!("Unsupported protocol '{other}'"),
            )),
        }
    }

    async fn fetch_remote(&self, url: &Url, kind: FetchKind, max_size: u64) -> Result<Vec<u8>> {
        let timeout = match kind {
            FetchKind::Json => self.json_timeout,
            FetchKind::Download => self.download_timeout,
        };

        retry_notify(
            self.build_backoff(timeout),
            || async move { self.fetch_once(url, timeout, max_size).await },
            |err: ZbrsError, duration: Duration| {
                warn!(
                    error = %err,
                    retry_after_ms = duration.as_millis() as u64,
                    "Retry scheduled"
                );
            },
        )
        .await
    }

    async fn fetch_once(
        &self,
        url: &Url,
        timeout: Duration,
        max_size: u64,
    ) -> std::result::Result<Vec<u8>, backoff::Error<ZbrsError>> {
        let start = Instant::now();

        let mut response = self
            .client
            .get(url.clone())
            .timeout(timeout)
            .send()
            .await
            .map_err(|e| {
                let latency_ms = start.elapsed().as_millis() as u64;
                if is_transient_error(&e) {
                    warn!(url = %url, error = %e, latency_ms, "Transient error, will retry");
                    backoff::Error::transient(ZbrsError::network(url.as_str(), e.to_string()))
                } else {
                    warn!(url = %url, error = %e, latency_ms, "Permanent error, aborting");
                    backoff::Error::permanent(ZbrsError::network(url.as_str(), e.to_string()))
                }
            })?;

        let status = response.status();
        debug!(url = %url, status = %status, "Received HTTP response");

        if !status.is_success() {
            let latency_ms = start.elapsed().as_millis() as u64;
            let err = ZbrsError::network(url.as_str(), format!("HTTP status {status}"));
            return if is_transient_status(status) {
                warn!(status = %status, latency_ms, "Transient HTTP status, will retry");
                Err(backoff::Error::transient(err))
            } else {
                warn!(status = %status, latency_ms, "Permanent HTTP error");
                Err(backoff::Error::permanent(err))
            };
        }

        if let Some(declared) = response.content_length() {
            if declared > max_size {
                return Err(backoff::Error::permanent(too_large(url, declared, max_size)));
            }
        }

        let mut body = Vec::new();
        loop {
            let chunk = response.chunk().await.map_err(|e| {
                backoff::Error::permanent(ZbrsError::network(
                    url.as_str(),
                    format!("Failed to read body: {e}"),
                ))
            })?;
            let Some(chunk) = chunk else { break };
            if (body.len() + chunk.len()) as u64 > max_size {
                return Err(backoff::Error::permanent(too_large(
                    url,
                    (body.len() + chunk.len()) as u64,
                    max_size,
                )));
            }
            body.extend_from_slice(&chunk);
        }

        debug!(
            url = %url,
            bytes = body.len(),
            latency_ms = start.elapsed().as_millis() as u64,
            "Request completed successfully"
        );
        Ok(body)
    }

    fn build_backoff(&self, timeout: Duration) -> ExponentialBackoff {
        ExponentialBackoff {
            initial_interval: INITIAL_INTERVAL,
            max_interval: MAX_INTERVAL,
            max_elapsed_time: Some(timeout * self.max_retries.max(1)),
            ..Default::default()
        }
    }
}

async fn read_local(url: &Url, max_size: u64) -> Result<Vec<u8>> {
    let path = url
        .to_file_path()
        .map_err(|()| ZbrsError::network(url.as_str(), "Not a local file path"))?;

    let metadata = tokio::fs::metadata(&path)
        .await
        .map_err(|e| ZbrsError::network(url.as_str(), e.to_string()))?;
    if metadata.len() > max_size {
        return Err(too_large(url, metadata.len(), max_size));
    }

    let bytes = tokio::fs::read(&path)
        .await
        .map_err(|e| ZbrsError::network(url.as_str(), e.to_string()))?;
    debug!(path = %path.display(), bytes = bytes.len(), "Read local file");
    Ok(bytes)
}

fn too_large(url: &Url, size: u64, max_size: u64) -> ZbrsError {
    ZbrsError::network(
        url.as_str(),
        format!("Payload of {size} bytes exceeds the limit of {max_size} bytes"),
    )
}

/// Drop a leading UTF-8 byte-order mark.
pub(crate) fn strip_bom(bytes: &[u8]) -> &[u8] {
    bytes.strip_prefix(UTF8_BOM).unwrap_or(bytes)
}

/// Parse a JSON payload; malformed bodies count as network failures.
pub(crate) fn parse_json(url: &str, bytes: &[u8]) -> Result<Value> {
    serde_json::from_slice(strip_bom(bytes))
        .map_err(|e| ZbrsError::network(url, format!("Invalid JSON: {e}")))
}

/// Check if a reqwest error is transient and should be retried.
pub(crate) fn is_transient_error(error: &reqwest::Error) -> bool {
    error.is_timeout() || error.is_connect() || error.is_request()
}

/// Check if an HTTP status code indicates a transient error.
pub(crate) fn is_transient_status(status: StatusCode) -> bool {
    matches!(
        status,
        StatusCode::TOO_MANY_REQUESTS
            | StatusCode::SERVICE_UNAVAILABLE
            | StatusCode::GATEWAY_TIMEOUT
            | StatusCode::BAD_GATEWAY
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_strip_bom() {
        assert_eq!(strip_bom(b"\xEF\xBB\xBF{}"), b"{}");
        assert_eq!(strip_bom(b"{}"), b"{}");
    }

    #[test]
    fn test_parse_json_with_bom() {
        let value = parse_json("file:///index.json", b"\xEF\xBB\xBF{\"a\":1}").unwrap();
        assert_eq!(value["a"], 1);
    }

    #[test]
    fn test_parse_json_failure_is_network_error() {
        let err = parse_json("https://example.org/manifest.json", b"<html>").unwrap_err();
        assert!(err.is_network());
        assert!(err.to_string().contains("https://example.org/manifest.json"));
    }

    #[test]
    fn test_transient_status_codes() {
        assert!(is_transient_status(StatusCode::TOO_MANY_REQUESTS));
        assert!(is_transient_status(StatusCode::SERVICE_UNAVAILABLE));
        assert!(is_transient_status(StatusCode::GATEWAY_TIMEOUT));
        assert!(is_transient_status(StatusCode::BAD_GATEWAY));
        assert!(!is_transient_status(StatusCode::NOT_FOUND));
        assert!(!is_transient_status(StatusCode::INTERNAL_SERVER_ERROR));
    }

    #[tokio::test]
    async fn test_local_size_cap() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("book.json");
        std::fs::write(&path, vec![b' '; 64]).unwrap();
        let url = Url::from_file_path(&path).unwrap();

        let client = FetchClient::new(&PipelineConfig::default()).unwrap();
        assert_eq!(client.fetch(&url, FetchKind::Download, 64).await.unwrap().len(), 64);

        let err = client.fetch(&url, FetchKind::Download, 63).await.unwrap_err();
        assert!(err.is_network());
        assert!(err.to_string().contains("exceeds"));
    }

    #[tokio::test]
    async fn test_missing_local_file() {
        let dir = tempfile::tempdir().unwrap();
        let url = Url::from_file_path(dir.path().join("absent.json")).unwrap();
        let client = FetchClient::new(&PipelineConfig::default()).unwrap();
        assert!(client
            .fetch(&url, FetchKind::Json, 1024)
            .await
            .unwrap_err()
            .is_network());
    }
}
