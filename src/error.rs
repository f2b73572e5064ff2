//! Error types for the benchcrawl library.
//!
//! One enum, grouped by pipeline stage, so a failure is always attributable
//! to the stage that produced it (fetch, encode, completion, parse,
//! normalize, merge, queue). Every stage-local error is logged with context
//! at the point of failure and propagated unchanged to the caller — the one
//! deliberate exception is a store that exists but cannot be loaded, which
//! [`crate::store::merge`] recovers from by overwriting (see that module).

use std::path::PathBuf;
use thiserror::Error;

/// All errors returned by the benchcrawl library.
#[derive(Debug, Error)]
pub enum CrawlError {
    // ── Fetch stage ───────────────────────────────────────────────────────
    /// The document source is not a well-formed HTTP/HTTPS URL.
    #[error("Invalid document URL '{url}': not a valid HTTP/HTTPS URL")]
    InvalidUrl { url: String },

    /// No file name could be derived from the URL path.
    #[error("Could not extract a file name from URL: '{url}'")]
    NoFilename { url: String },

    /// HTTP URL was syntactically valid but the download failed.
    #[error("Failed to download '{url}': {reason}\nCheck your internet connection.")]
    DownloadFailed { url: String, reason: String },

    /// Download exceeded the configured timeout.
    #[error("Download timed out after {secs}s for '{url}'\nIncrease --download-timeout.")]
    DownloadTimeout { url: String, secs: u64 },

    /// The bytes were fetched but do not start with the PDF magic header.
    #[error("Downloaded file is not a valid PDF: '{url}'\nFirst bytes: {magic:?}")]
    NotAPdf { url: String, magic: [u8; 4] },

    // ── Encode stage ──────────────────────────────────────────────────────
    /// Document file was not found at the given path.
    #[error("Document file not found: '{path}'")]
    FileNotFound { path: PathBuf },

    /// The path exists but is not a regular file.
    #[error("Path is not a file: '{path}'")]
    NotAFile { path: PathBuf },

    /// Process does not have read permission on the file.
    #[error("Permission denied reading '{path}'\nTry: chmod +r {path:?}")]
    PermissionDenied { path: PathBuf },

    /// Any other I/O failure while reading the document.
    #[error("Error reading document '{path}': {source}")]
    ReadFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    // ── Completion stage ──────────────────────────────────────────────────
    /// The completion provider is not configured (missing API key etc.).
    #[error("Completion provider is not configured.\n{hint}")]
    ProviderNotConfigured { hint: String },

    /// The completion API returned an error — quota, auth, network or a
    /// response with no text content. Not retried at this layer.
    #[error("Completion request failed: {message}")]
    CompletionFailed { message: String },

    // ── Parse stage ───────────────────────────────────────────────────────
    /// The completion text could not be parsed as a delimited table.
    /// The whole document's extraction is discarded; no partial recovery.
    #[error("Failed to parse extracted table: {detail}")]
    TableParse { detail: String },

    // ── Normalize stage ───────────────────────────────────────────────────
    /// The extracted table is missing a required column.
    #[error("Extracted table must contain columns {required:?}, found {found:?}")]
    MissingColumns {
        required: &'static [&'static str],
        found: Vec<String>,
    },

    // ── Queue (driving list) ──────────────────────────────────────────────
    /// The driving list could not be read or parsed.
    #[error("Failed to read crawl queue '{path}': {detail}")]
    QueueLoad { path: PathBuf, detail: String },

    /// The driving list has no row left to crawl.
    #[error("Crawl queue '{path}' has no pending rows")]
    QueueEmpty { path: PathBuf },

    // ── I/O ───────────────────────────────────────────────────────────────
    /// Could not persist the store, queue or results file.
    #[error("Failed to write '{path}': {source}")]
    OutputWriteFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    // ── Config ────────────────────────────────────────────────────────────
    /// Builder validation failed.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    // ── Catch-all ─────────────────────────────────────────────────────────
    /// Unexpected internal error.
    #[error("Internal error: {0}")]
    Internal(String),
}
