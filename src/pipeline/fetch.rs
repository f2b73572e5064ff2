//! Fetch stage: download the document behind a URL to a local temp file.
//!
//! The encode stage needs a file-system path, and keeping the bytes in a
//! `TempDir` means cleanup happens automatically when [`FetchedDocument`]
//! is dropped, even on panic. The PDF magic bytes (`%PDF`) are validated
//! before returning so the completion provider never receives an HTML
//! error page dressed up as a document.

use crate::error::CrawlError;
use std::path::{Path, PathBuf};
use tempfile::TempDir;
use tracing::info;
use url::Url;

/// A downloaded document. The `TempDir` is kept alive to prevent cleanup
/// until the pipeline is done with the file.
#[derive(Debug)]
pub struct FetchedDocument {
    path: PathBuf,
    _temp_dir: TempDir,
}

impl FetchedDocument {
    pub fn path(&self) -> &Path {
        &self.path
    }
}

/// Download `url` into a temp directory and return a handle to the file.
///
/// Fails with [`CrawlError::InvalidUrl`] on malformed URLs,
/// [`CrawlError::NoFilename`] when the URL path carries no file name, and
/// [`CrawlError::DownloadFailed`]/[`CrawlError::DownloadTimeout`] on
/// transport problems or non-2xx responses.
pub async fn download_document(url: &str, timeout_secs: u64) -> Result<FetchedDocument, CrawlError> {
    let parsed = Url::parse(url).map_err(|_| CrawlError::InvalidUrl {
        url: url.to_string(),
    })?;
    if !matches!(parsed.scheme(), "http" | "https") || parsed.host_str().is_none() {
        return Err(CrawlError::InvalidUrl {
            url: url.to_string(),
        });
    }

    let filename = filename_from_url(&parsed).ok_or_else(|| CrawlError::NoFilename {
        url: url.to_string(),
    })?;

    info!(url, "downloading document");

    let client = reqwest::Client::builder()
        .timeout(std::time::Duration::from_secs(timeout_secs))
        .build()
        .map_err(|e| CrawlError::DownloadFailed {
            url: url.to_string(),
            reason: e.to_string(),
        })?;

    let response = client.get(parsed).send().await.map_err(|e| {
        if e.is_timeout() {
            CrawlError::DownloadTimeout {
                url: url.to_string(),
                secs: timeout_secs,
            }
        } else {
            CrawlError::DownloadFailed {
                url: url.to_string(),
                reason: e.to_string(),
            }
        }
    })?;

    if !response.status().is_success() {
        return Err(CrawlError::DownloadFailed {
            url: url.to_string(),
            reason: format!("HTTP {}", response.status()),
        });
    }

    let bytes = response
        .bytes()
        .await
        .map_err(|e| CrawlError::DownloadFailed {
            url: url.to_string(),
            reason: e.to_string(),
        })?;

    // A body shorter than the magic itself cannot be a PDF either.
    if bytes.len() < 4 || &bytes[..4] != b"%PDF" {
        let mut magic = [0u8; 4];
        let n = bytes.len().min(4);
        magic[..n].copy_from_slice(&bytes[..n]);
        return Err(CrawlError::NotAPdf {
            url: url.to_string(),
            magic,
        });
    }

    let temp_dir = TempDir::new().map_err(|e| CrawlError::Internal(e.to_string()))?;
    let path = temp_dir.path().join(&filename);
    tokio::fs::write(&path, &bytes)
        .await
        .map_err(|e| CrawlError::Internal(format!("Failed to write temp file: {e}")))?;

    info!(path = %path.display(), bytes = bytes.len(), "downloaded document");

    Ok(FetchedDocument {
        path,
        _temp_dir: temp_dir,
    })
}

/// Last non-empty segment of the URL path, if any.
fn filename_from_url(url: &Url) -> Option<String> {
    let last = url.path_segments()?.filter(|s| !s.is_empty()).next_back()?;
    Some(last.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn malformed_url_is_rejected_without_network() {
        let err = download_document("not a url", 5).await.unwrap_err();
        assert!(matches!(err, CrawlError::InvalidUrl { .. }));

        let err = download_document("ftp://example.com/a.pdf", 5)
            .await
            .unwrap_err();
        assert!(matches!(err, CrawlError::InvalidUrl { .. }));
    }

    #[tokio::test]
    async fn url_without_filename_is_rejected_without_network() {
        let err = download_document("https://example.com/", 5).await.unwrap_err();
        assert!(matches!(err, CrawlError::NoFilename { .. }));
    }

    #[test]
    fn filename_extraction() {
        let url = Url::parse("https://www.irs.gov/pub/irs-pdf/fw9.pdf").unwrap();
        assert_eq!(filename_from_url(&url).as_deref(), Some("fw9.pdf"));

        let url = Url::parse("https://example.com/").unwrap();
        assert_eq!(filename_from_url(&url), None);

        // Trailing slash: take the last non-empty segment.
        let url = Url::parse("https://example.com/docs/").unwrap();
        assert_eq!(filename_from_url(&url).as_deref(), Some("docs"));
    }
}
