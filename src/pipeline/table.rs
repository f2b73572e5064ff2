//! Table parsing: completion text → [`ExtractedTable`].
//!
//! The completion provider is asked for bare CSV, but models occasionally
//! wrap the table in a Markdown code fence or pad cells with whitespace.
//! Fences are stripped and fields trimmed before parsing; anything beyond
//! that (ragged rows, unbalanced quotes) is a parse error, fatal to the
//! run — the whole document's extraction is discarded rather than guessing
//! at a partial table.

use crate::error::CrawlError;
use tracing::{debug, info};

/// A parsed delimited table: one header row plus data rows of equal width.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtractedTable {
    pub headers: Vec<String>,
    pub rows: Vec<Vec<String>>,
}

impl ExtractedTable {
    /// Number of data rows (excluding the header).
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

/// Parse the completion text as a CSV table.
pub fn parse_table(completion: &str) -> Result<ExtractedTable, CrawlError> {
    let body = strip_code_fences(completion);

    let mut reader = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .from_reader(body.as_bytes());

    let headers: Vec<String> = reader
        .headers()
        .map_err(|e| CrawlError::TableParse {
            detail: format!("invalid header row: {e}"),
        })?
        .iter()
        .map(str::to_owned)
        .collect();

    if headers.is_empty() {
        return Err(CrawlError::TableParse {
            detail: "completion contained no table".into(),
        });
    }
    debug!(?headers, "parsed table header");

    let mut rows = Vec::new();
    for (i, record) in reader.records().enumerate() {
        let record = record.map_err(|e| CrawlError::TableParse {
            detail: format!("row {}: {e}", i + 1),
        })?;
        rows.push(record.iter().map(str::to_owned).collect());
    }

    info!(rows = rows.len(), columns = headers.len(), "parsed extracted table");
    Ok(ExtractedTable { headers, rows })
}

/// Strip a surrounding Markdown code fence (```csv … ```), if present.
fn strip_code_fences(text: &str) -> &str {
    let trimmed = text.trim();
    let Some(rest) = trimmed.strip_prefix("```") else {
        return trimmed;
    };
    let Some(rest) = rest.strip_suffix("```") else {
        return trimmed;
    };
    // Drop the info string ("csv", "text", …) on the opening fence line.
    match rest.split_once('\n') {
        Some((_, body)) => body.trim(),
        None => rest.trim(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_plain_csv() {
        let t = parse_table("name,test_type,source\nMMLU,5-shot,https://a.org\n").unwrap();
        assert_eq!(t.headers, vec!["name", "test_type", "source"]);
        assert_eq!(t.rows, vec![vec!["MMLU", "5-shot", "https://a.org"]]);
    }

    #[test]
    fn trims_cell_whitespace() {
        // Model output often indents continuation rows.
        let t = parse_table("name,source\n    MMLU, https://a.org\n").unwrap();
        assert_eq!(t.rows[0], vec!["MMLU", "https://a.org"]);
    }

    #[test]
    fn strips_markdown_fence() {
        let t = parse_table("```csv\nname,source\nMMLU,https://a.org\n```").unwrap();
        assert_eq!(t.headers, vec!["name", "source"]);
        assert_eq!(t.len(), 1);
    }

    #[test]
    fn quoted_commas_survive() {
        let t = parse_table("name,source\n\"GPQA (Diamond), v2\",https://a.org\n").unwrap();
        assert_eq!(t.rows[0][0], "GPQA (Diamond), v2");
    }

    #[test]
    fn ragged_row_is_parse_error() {
        let err = parse_table("name,source\nMMLU,https://a.org,extra\n").unwrap_err();
        assert!(matches!(err, CrawlError::TableParse { .. }));
    }

    #[test]
    fn empty_completion_is_parse_error_or_empty_table() {
        // Header-only output parses to an empty table; the orchestrator
        // decides what to do with zero rows.
        let t = parse_table("name,source\n").unwrap();
        assert!(t.is_empty());
    }
}
