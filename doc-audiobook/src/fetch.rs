//! HTTP download of generated audio fragments.

use std::io::Write;
use std::path::Path;
use std::time::Duration;

use futures_util::StreamExt;
use thiserror::Error;

/// Download-related errors.
#[derive(Debug, Error)]
pub enum DownloadError {
    #[error("HTTP error: {status} for {url}")]
    HttpStatus { status: u16, url: String },

    #[error("Network error: {0}")]
    Network(String),

    #[error("Failed to write {path}: {source}")]
    Write {
        path: String,
        #[source]
        source: std::io::Error,
    },
}

/// Downloads remote audio into local files, one attempt per URL.
pub struct Fetcher {
    client: reqwest::Client,
}

impl Fetcher {
    /// Build a fetcher with reasonable timeouts.
    pub fn new(timeout: Duration) -> Result<Self, DownloadError> {
        let client = reqwest::Client::builder()
            .connect_timeout(Duration::from_secs(30))
            .timeout(timeout)
            .build()
            .map_err(|e| DownloadError::Network(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self { client })
    }

    /// Download `url` into `destination`.
    ///
    /// A failed download never leaves a file behind.
    pub async fn fetch(&self, url: &str, destination: &Path) -> Result<(), DownloadError> {
        let result = self.fetch_once(url, destination).await;
        if result.is_err() && destination.exists() {
            if let Err(e) = std::fs::remove_file(destination) {
                log::warn!("Could not remove partial download {}: {}", destination.display(), e);
            }
        }
        result
    }

    async fn fetch_once(&self, url: &str, destination: &Path) -> Result<(), DownloadError> {
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| DownloadError::Network(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(DownloadError::HttpStatus {
                status: status.as_u16(),
                url: url.to_string(),
            });
        }

        let write_err = |source| DownloadError::Write {
            path: destination.display().to_string(),
            source,
        };

        let mut file = std::fs::File::create(destination).map_err(write_err)?;

        let mut stream = response.bytes_stream();
        while let Some(chunk) = stream.next().await {
            let chunk = chunk.map_err(|e| DownloadError::Network(e.to_string()))?;
            file.write_all(&chunk).map_err(write_err)?;
        }
        file.flush().map_err(write_err)?;

        Ok(())
    }
}

/// Format bytes for human-readable display.
pub fn format_bytes(bytes: u64) -> String {
    const KB: u64 = 1024;
    const MB: u64 = KB * 1024;
    const GB: u64 = MB * 1024;

    if bytes >= GB {
        format!("{:.1} GB", bytes as f64 / GB as f64)
    } else if bytes >= MB {
        format!("{:.1} MB", bytes as f64 / MB as f64)
    } else if bytes >= KB {
        format!("{:.1} KB", bytes as f64 / KB as f64)
    } else {
        format!("{} B", bytes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn fetcher() -> Fetcher {
        Fetcher::new(Duration::from_secs(10)).unwrap()
    }

    #[test]
    fn test_format_bytes() {
        assert_eq!(format_bytes(512), "512 B");
        assert_eq!(format_bytes(1024), "1.0 KB");
        assert_eq!(format_bytes(1024 * 1024), "1.0 MB");
        assert_eq!(format_bytes(1024 * 1024 * 1024), "1.0 GB");
        assert_eq!(format_bytes(1536 * 1024), "1.5 MB");
    }

    #[tokio::test]
    async fn test_fetch_writes_body() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/audio/1.wav"))
            .respond_with(ResponseTemplate::new(200).set_body_bytes(b"RIFFdata".to_vec()))
            .mount(&server)
            .await;

        let temp_dir = TempDir::new().unwrap();
        let dest = temp_dir.path().join("chunk_001.wav");
        fetcher()
            .fetch(&format!("{}/audio/1.wav", server.uri()), &dest)
            .await
            .unwrap();

        assert_eq!(std::fs::read(&dest).unwrap(), b"RIFFdata");
    }

    #[tokio::test]
    async fn test_fetch_non_success_leaves_no_file() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;

        let temp_dir = TempDir::new().unwrap();
        let dest = temp_dir.path().join("chunk_002.wav");
        let err = fetcher()
            .fetch(&format!("{}/missing.wav", server.uri()), &dest)
            .await
            .unwrap_err();

        assert!(matches!(err, DownloadError::HttpStatus { status: 404, .. }));
        assert!(!dest.exists());
    }

    #[tokio::test]
    async fn test_fetch_unreachable_host() {
        let temp_dir = TempDir::new().unwrap();
        let dest = temp_dir.path().join("chunk_003.wav");
        let err = fetcher()
            .fetch("http://127.0.0.1:9/nothing.wav", &dest)
            .await
            .unwrap_err();

        assert!(matches!(err, DownloadError::Network(_)));
        assert!(!dest.exists());
    }
}
