//! Source normalization: classify citations, canonicalize publisher URLs,
//! and turn raw extracted rows into [`SourceRecord`]s.
//!
//! This is the core of the crate. Everything here is a pure per-row function
//! composed over an ordered sequence of rows — no table-wide transforms — so
//! the edge-case rules (placeholder handling, suffix appending) stay
//! auditable and unit-testable in isolation.
//!
//! Deduplication is deliberately NOT done here: the normalizer may emit
//! duplicate URLs when the input cites the same paper twice. Dedup against
//! history is the merge step's job ([`crate::store::merge`]).

use crate::error::CrawlError;
use crate::pipeline::table::ExtractedTable;
use crate::record::{RawRow, SourceRecord, SourceType};
use chrono::NaiveDateTime;
use tracing::{debug, info};
use url::Url;

/// The literal citation value meaning "no source available".
pub const PLACEHOLDER: &str = "-";

/// Columns the extracted table must expose for normalization.
pub const REQUIRED_COLUMNS: &[&str] = &["name", "source"];

/// Standard suffix of a directly downloadable document.
const PDF_SUFFIX: &str = ".pdf";

/// Decide whether a raw citation string is a well-formed, fetchable URL.
///
/// A candidate is valid iff it parses as an absolute URL with an `http` or
/// `https` scheme and a host. Paper titles, bare dashes and empty strings
/// all fail to parse and are rejected. No network access, no existence
/// check; parse failures translate to `false` rather than an error.
pub fn is_valid_url(candidate: &str) -> bool {
    match Url::parse(candidate) {
        Ok(u) => {
            let valid = matches!(u.scheme(), "http" | "https") && u.host_str().is_some();
            debug!(url = candidate, valid, "classified citation");
            valid
        }
        Err(_) => {
            debug!(url = candidate, "citation is not a URL");
            false
        }
    }
}

/// Rewrite known publisher landing-page URLs into direct PDF links.
///
/// Best-effort, pattern-based, for the small set of publishers the crawler
/// targets — no network redirects are followed. Rules in order, first match
/// wins:
///
/// 1. arXiv abstract page (`/abs/`) → `/pdf/` + `.pdf` suffix
/// 2. arXiv URL without `/pdf/` → append `.pdf`
/// 3. ACL Anthology URL → append `.pdf`
/// 4. anything else → unchanged
///
/// Suffix appends are skipped when the URL already ends in `.pdf`, which
/// makes the function idempotent: `canonicalize_source_url` applied twice
/// equals applied once.
///
/// Must only be called on inputs accepted by [`is_valid_url`]; on anything
/// unparseable it returns the input unchanged.
pub fn canonicalize_source_url(source: &str) -> String {
    let host = match Url::parse(source) {
        Ok(u) => u.host_str().map(str::to_owned),
        Err(_) => None,
    };
    let Some(host) = host else {
        return source.to_string();
    };

    if host_matches(&host, "arxiv.org") {
        if source.contains("/abs/") {
            let result = format!("{}{}", source.replace("/abs/", "/pdf/"), PDF_SUFFIX);
            debug!(from = source, to = %result, "arXiv abstract URL → PDF");
            return result;
        }
        if !source.contains("/pdf/") && !source.ends_with(PDF_SUFFIX) {
            let result = format!("{source}{PDF_SUFFIX}");
            debug!(from = source, to = %result, "appended PDF suffix to arXiv URL");
            return result;
        }
    } else if host_matches(&host, "aclanthology.org") && !source.ends_with(PDF_SUFFIX) {
        let result = format!("{source}{PDF_SUFFIX}");
        debug!(from = source, to = %result, "appended PDF suffix to ACL URL");
        return result;
    }

    source.to_string()
}

/// Host equality including subdomains (`www.arxiv.org` counts as `arxiv.org`).
fn host_matches(host: &str, domain: &str) -> bool {
    host == domain || host.ends_with(&format!(".{domain}"))
}

/// Normalize an extracted table into source records.
///
/// Requires the table to expose `name` and `source` columns; anything else
/// is a schema error, fatal to the call. Rows whose citation is the `-`
/// placeholder or fails URL classification are dropped (intended filtering,
/// not an error). Surviving rows are emitted in input order with a shared
/// `added_timestamp` and null crawl state.
pub fn normalize(
    table: &ExtractedTable,
    source_type: SourceType,
    origin_url: &str,
    now: NaiveDateTime,
) -> Result<Vec<SourceRecord>, CrawlError> {
    info!(%source_type, rows = table.len(), "normalizing extracted sources");

    let rows = table.select_rows(REQUIRED_COLUMNS)?;
    let initial = rows.len();

    let records: Vec<SourceRecord> = rows
        .into_iter()
        .filter_map(|row| {
            let source = row.source.trim();
            if !keep_citation(source) {
                return None;
            }
            let url = canonicalize_source_url(source);
            Some(SourceRecord {
                name: row.name,
                url,
                origin_url: origin_url.to_string(),
                crawled_timestamp: None,
                added_timestamp: now,
                source_type,
                success: None,
                cost: None,
            })
        })
        .collect();

    info!(
        kept = records.len(),
        dropped = initial - records.len(),
        "filtered citations without a usable URL"
    );
    Ok(records)
}

/// Keep a row only when its citation is a real URL.
///
/// The `-` placeholder means "no source" and is treated as absent; it is
/// checked explicitly (scoped to the source column) rather than relying on
/// it merely failing URL classification.
fn keep_citation(source: &str) -> bool {
    let source = source.trim();
    if source.is_empty() || source == PLACEHOLDER {
        return false;
    }
    is_valid_url(source)
}

/// Extract `name`/`source` pairs from an already-validated table.
impl ExtractedTable {
    pub(crate) fn select_rows(
        &self,
        required: &'static [&'static str],
    ) -> Result<Vec<RawRow>, CrawlError> {
        let mut indices = Vec::with_capacity(required.len());
        for col in required {
            match self.headers.iter().position(|h| h == col) {
                Some(i) => indices.push(i),
                None => {
                    return Err(CrawlError::MissingColumns {
                        required,
                        found: self.headers.clone(),
                    })
                }
            }
        }
        let (name_idx, source_idx) = (indices[0], indices[1]);

        Ok(self
            .rows
            .iter()
            .map(|row| RawRow {
                name: row.get(name_idx).cloned().unwrap_or_default(),
                source: row.get(source_idx).cloned().unwrap_or_default(),
            })
            .collect())
    }
}
