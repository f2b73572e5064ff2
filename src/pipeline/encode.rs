//! Encode stage: document file → base64 string.
//!
//! The completion API takes the document as a base64 data block in the JSON
//! request body, so the whole file is read and encoded in one go. PDFs the
//! crawler handles are a few MB at most; streaming the encode is not worth
//! the complexity.

use crate::error::CrawlError;
use base64::{engine::general_purpose::STANDARD, Engine as _};
use std::io::ErrorKind;
use std::path::Path;
use tracing::debug;

/// Read a local document and encode its contents as base64 for the API
/// request. Fails with not-found, not-a-file, or permission errors.
pub fn encode_file(path: &Path) -> Result<String, CrawlError> {
    if !path.exists() {
        return Err(CrawlError::FileNotFound {
            path: path.to_path_buf(),
        });
    }
    if !path.is_file() {
        return Err(CrawlError::NotAFile {
            path: path.to_path_buf(),
        });
    }

    let bytes = std::fs::read(path).map_err(|e| match e.kind() {
        ErrorKind::PermissionDenied => CrawlError::PermissionDenied {
            path: path.to_path_buf(),
        },
        ErrorKind::NotFound => CrawlError::FileNotFound {
            path: path.to_path_buf(),
        },
        _ => CrawlError::ReadFailed {
            path: path.to_path_buf(),
            source: e,
        },
    })?;

    let encoded = STANDARD.encode(&bytes);
    debug!(path = %path.display(), bytes = bytes.len(), b64_len = encoded.len(), "encoded document");
    Ok(encoded)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn encodes_file_contents() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("doc.pdf");
        std::fs::write(&path, b"%PDF-1.4 test").unwrap();

        let encoded = encode_file(&path).unwrap();
        assert_eq!(STANDARD.decode(&encoded).unwrap(), b"%PDF-1.4 test");
    }

    #[test]
    fn missing_file_is_not_found() {
        let dir = TempDir::new().unwrap();
        let err = encode_file(&dir.path().join("nope.pdf")).unwrap_err();
        assert!(matches!(err, CrawlError::FileNotFound { .. }));
    }

    #[test]
    fn directory_is_not_a_file() {
        let dir = TempDir::new().unwrap();
        let err = encode_file(dir.path()).unwrap_err();
        assert!(matches!(err, CrawlError::NotAFile { .. }));
    }
}
