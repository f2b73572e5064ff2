//! The persistent source store: a CSV keyed by `url`, merged incrementally.
//!
//! The store is shared, file-resident state with an open-ended lifetime
//! across runs. Access is single-writer: there is no locking, so concurrent
//! runs against the same store path can lose updates on the load-modify-
//! persist sequence — callers must serialize ingestion externally.
//!
//! Load failures other than "file does not exist" are recoverable by
//! policy: the store is overwritten with the new batch, accepting loss of
//! prior history, and the condition is logged as a warning rather than
//! propagated. This matches the append-or-rebuild semantics the downstream
//! crawler expects.

use crate::error::CrawlError;
use crate::record::SourceRecord;
use std::collections::HashSet;
use std::io::ErrorKind;
use std::path::Path;
use tracing::{info, warn};

/// Column order of the store file. `csv::Writer` only emits headers on the
/// first `serialize` call, so an empty store needs them written by hand.
const COLUMNS: [&str; 8] = [
    "name",
    "url",
    "origin_url",
    "crawled_timestamp",
    "added_timestamp",
    "type",
    "success",
    "cost",
];

/// Merge newly normalized records into the store at `path`.
///
/// Records whose `url` already exists in the store are skipped; existing
/// rows keep their `crawled_timestamp`/`success`/`cost` untouched — the
/// merge never regresses known crawl state. Returns the number of rows
/// actually appended.
pub fn merge(new_records: &[SourceRecord], path: &Path) -> Result<usize, CrawlError> {
    match load(path) {
        Ok(mut existing) => {
            let known: HashSet<&str> = existing.iter().map(|r| r.url.as_str()).collect();
            let fresh: Vec<SourceRecord> = new_records
                .iter()
                .filter(|r| !known.contains(r.url.as_str()))
                .cloned()
                .collect();
            drop(known);

            if fresh.is_empty() {
                info!(path = %path.display(), "no new URLs to add, store unchanged");
                return Ok(0);
            }

            let added = fresh.len();
            existing.extend(fresh);
            save(&existing, path)?;
            info!(added, path = %path.display(), "appended new rows to existing store");
            Ok(added)
        }
        Err(LoadError::NotFound) => {
            info!(path = %path.display(), "no existing store, creating new file");
            save(new_records, path)?;
            Ok(new_records.len())
        }
        Err(LoadError::Unreadable(detail)) => {
            warn!(
                path = %path.display(),
                detail,
                "could not load existing store, overwriting with new batch"
            );
            save(new_records, path)?;
            Ok(new_records.len())
        }
    }
}

/// Why a store failed to load. Internal: `merge` maps each case to its
/// fallback; callers never see this type.
enum LoadError {
    NotFound,
    Unreadable(String),
}

/// Load all records from the store CSV.
fn load(path: &Path) -> Result<Vec<SourceRecord>, LoadError> {
    let mut reader = match csv::Reader::from_path(path) {
        Ok(r) => r,
        Err(e) => {
            if let csv::ErrorKind::Io(io) = e.kind() {
                if io.kind() == ErrorKind::NotFound {
                    return Err(LoadError::NotFound);
                }
            }
            return Err(LoadError::Unreadable(e.to_string()));
        }
    };

    let mut records = Vec::new();
    for row in reader.deserialize() {
        let record: SourceRecord = row.map_err(|e| LoadError::Unreadable(e.to_string()))?;
        records.push(record);
    }
    Ok(records)
}

/// Persist `records` to `path` atomically (temp file + rename) so a failed
/// write never leaves a truncated store behind.
pub(crate) fn save(records: &[SourceRecord], path: &Path) -> Result<(), CrawlError> {
    let write_failed = |source: std::io::Error| CrawlError::OutputWriteFailed {
        path: path.to_path_buf(),
        source,
    };

    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent).map_err(write_failed)?;
        }
    }

    let tmp_path = path.with_extension("csv.tmp");
    {
        let mut writer = csv::Writer::from_path(&tmp_path).map_err(|e| {
            CrawlError::OutputWriteFailed {
                path: tmp_path.clone(),
                source: std::io::Error::other(e.to_string()),
            }
        })?;
        if records.is_empty() {
            writer
                .write_record(COLUMNS)
                .map_err(|e| CrawlError::OutputWriteFailed {
                    path: tmp_path.clone(),
                    source: std::io::Error::other(e.to_string()),
                })?;
        }
        for record in records {
            writer.serialize(record).map_err(|e| CrawlError::OutputWriteFailed {
                path: tmp_path.clone(),
                source: std::io::Error::other(e.to_string()),
            })?;
        }
        writer.flush().map_err(write_failed)?;
    }
    std::fs::rename(&tmp_path, path).map_err(write_failed)
}
