//! The driving list: the outer CSV of documents awaiting extraction.
//!
//! The queue carries at least a `url` column; any other columns belong to
//! whoever produces the file and are passed through untouched. Only the
//! crawl bookkeeping columns (`crawled_timestamp`, `success`, `cost`) are
//! written here, and only after the full pipeline has succeeded — a failed
//! run leaves the queue exactly as it found it.

use crate::error::CrawlError;
use crate::record::format_timestamp;
use chrono::NaiveDateTime;
use std::path::Path;
use tracing::info;

const URL_COLUMN: &str = "url";
const BOOKKEEPING_COLUMNS: [&str; 3] = ["crawled_timestamp", "success", "cost"];

/// Whole queue file in memory: header plus rows, all columns preserved.
struct QueueFile {
    headers: Vec<String>,
    rows: Vec<Vec<String>>,
}

/// Read the URL of the first row of the queue — the document to crawl next.
pub fn next_document(path: &Path) -> Result<String, CrawlError> {
    let queue = load(path)?;
    let url_idx = url_column(&queue, path)?;

    let first = queue.rows.first().ok_or_else(|| CrawlError::QueueEmpty {
        path: path.to_path_buf(),
    })?;

    let url = first.get(url_idx).cloned().unwrap_or_default();
    if url.is_empty() {
        return Err(CrawlError::QueueLoad {
            path: path.to_path_buf(),
            detail: "first row has an empty url".into(),
        });
    }
    info!(url, "next document from crawl queue");
    Ok(url)
}

/// Write crawl bookkeeping back to the first row and persist the queue.
///
/// Bookkeeping columns are created on the fly when the queue does not carry
/// them yet; existing columns of any name are preserved as-is.
pub fn mark_crawled(
    path: &Path,
    crawled_at: NaiveDateTime,
    success: bool,
    cost: f64,
) -> Result<(), CrawlError> {
    let mut queue = load(path)?;
    if queue.rows.is_empty() {
        return Err(CrawlError::QueueEmpty {
            path: path.to_path_buf(),
        });
    }

    let values = [
        format_timestamp(&crawled_at),
        success.to_string(),
        cost.to_string(),
    ];
    for (column, value) in BOOKKEEPING_COLUMNS.iter().zip(values) {
        let idx = ensure_column(&mut queue, column);
        queue.rows[0][idx] = value;
    }

    save(&queue, path)?;
    info!(path = %path.display(), "updated crawl metadata for first queue row");
    Ok(())
}

fn load(path: &Path) -> Result<QueueFile, CrawlError> {
    let queue_err = |detail: String| CrawlError::QueueLoad {
        path: path.to_path_buf(),
        detail,
    };

    let mut reader = csv::ReaderBuilder::new()
        .flexible(true)
        .from_path(path)
        .map_err(|e| queue_err(e.to_string()))?;

    let headers: Vec<String> = reader
        .headers()
        .map_err(|e| queue_err(e.to_string()))?
        .iter()
        .map(str::to_owned)
        .collect();

    let mut rows = Vec::new();
    for record in reader.records() {
        let record = record.map_err(|e| queue_err(e.to_string()))?;
        let mut row: Vec<String> = record.iter().map(str::to_owned).collect();
        // Short rows happen when bookkeeping cells were never written.
        row.resize(headers.len(), String::new());
        rows.push(row);
    }
    Ok(QueueFile { headers, rows })
}

fn url_column(queue: &QueueFile, path: &Path) -> Result<usize, CrawlError> {
    queue
        .headers
        .iter()
        .position(|h| h == URL_COLUMN)
        .ok_or_else(|| CrawlError::QueueLoad {
            path: path.to_path_buf(),
            detail: format!("queue has no '{URL_COLUMN}' column, found {:?}", queue.headers),
        })
}

/// Index of `column`, appending it (and padding every row) when absent.
fn ensure_column(queue: &mut QueueFile, column: &str) -> usize {
    if let Some(idx) = queue.headers.iter().position(|h| h == column) {
        return idx;
    }
    queue.headers.push(column.to_string());
    for row in &mut queue.rows {
        row.push(String::new());
    }
    queue.headers.len() - 1
}

fn save(queue: &QueueFile, path: &Path) -> Result<(), CrawlError> {
    let write_failed = |source: std::io::Error| CrawlError::OutputWriteFailed {
        path: path.to_path_buf(),
        source,
    };

    let tmp_path = path.with_extension("csv.tmp");
    {
        let mut writer = csv::Writer::from_path(&tmp_path).map_err(|e| {
            CrawlError::OutputWriteFailed {
                path: tmp_path.clone(),
                source: std::io::Error::other(e.to_string()),
            }
        })?;
        writer
            .write_record(&queue.headers)
            .map_err(|e| write_failed(std::io::Error::other(e.to_string())))?;
        for row in &queue.rows {
            writer
                .write_record(row)
                .map_err(|e| write_failed(std::io::Error::other(e.to_string())))?;
        }
        writer.flush().map_err(write_failed)?;
    }
    std::fs::rename(&tmp_path, path).map_err(write_failed)
}
