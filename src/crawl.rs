//! The per-document crawl pipeline and the queue-driven entry point.
//!
//! [`crawl_document`] runs fetch → encode → completion → parse → normalize
//! → merge for one document URL. [`run`] wraps it with the driving-list
//! bookkeeping: pick the first queued document, crawl it, and write
//! `crawled_timestamp`/`success`/`cost` back — but only after the whole
//! pipeline succeeded, so a failed run never claims a document as crawled.
//!
//! Execution is sequential end-to-end, one document at a time. There is no
//! in-process parallelism and no cancellation; concurrent runs against the
//! same store are unsupported (see [`crate::store`]).

use crate::config::CrawlConfig;
use crate::error::CrawlError;
use crate::pipeline::completion::{AnthropicProvider, CompletionProvider};
use crate::pipeline::table::ExtractedTable;
use crate::pipeline::{encode, fetch, table};
use crate::prompts::EXTRACTION_PROMPT;
use crate::record::{SourceRecord, SourceType};
use crate::{queue, sources, store};
use std::path::Path;
use std::sync::Arc;
use std::time::Instant;
use tracing::{error, info};

/// Cost written to the queue for a crawled document. Real cost accounting
/// is future work; token usage is reported in [`CrawlStats`] meanwhile.
pub const CRAWL_COST_PLACEHOLDER: f64 = 0.1;

/// Everything a completed crawl produced.
#[derive(Debug, Clone)]
pub struct CrawlOutput {
    /// The normalized records of this run (pre-merge, may contain URLs the
    /// store already knew).
    pub records: Vec<SourceRecord>,
    pub stats: CrawlStats,
}

/// Counters for one crawl run.
#[derive(Debug, Clone, Default, serde::Serialize)]
pub struct CrawlStats {
    /// Rows in the extracted table before filtering.
    pub rows_extracted: usize,
    /// Rows that survived normalization.
    pub records_normalized: usize,
    /// Rows actually appended to the store (post-dedupe).
    pub records_added: usize,
    pub input_tokens: u64,
    pub output_tokens: u64,
    pub fetch_duration_ms: u64,
    pub completion_duration_ms: u64,
    pub total_duration_ms: u64,
}

/// Crawl one document URL: extract its benchmark table and merge the
/// normalized sources into the store.
///
/// Every stage failure is logged with its stage name and propagated
/// unchanged; no stage is retried here. The only state mutation a failed
/// run can leave behind is the raw results file of an earlier successful
/// stage — the store and queue are untouched on failure.
pub async fn crawl_document(
    document_url: &str,
    config: &CrawlConfig,
) -> Result<CrawlOutput, CrawlError> {
    let total_start = Instant::now();
    info!(url = document_url, "starting crawl");

    let provider = resolve_provider(config)?;

    // ── Stage 1: fetch ───────────────────────────────────────────────────
    let fetch_start = Instant::now();
    let document = fetch::download_document(document_url, config.download_timeout_secs)
        .await
        .inspect_err(|e| error!(stage = "fetch", url = document_url, error = %e, "stage failed"))?;
    let fetch_duration_ms = fetch_start.elapsed().as_millis() as u64;

    // ── Stage 2: encode ──────────────────────────────────────────────────
    let encoded = encode::encode_file(document.path())
        .inspect_err(|e| error!(stage = "encode", error = %e, "stage failed"))?;

    // ── Stage 3: completion ──────────────────────────────────────────────
    let prompt = config.prompt.as_deref().unwrap_or(EXTRACTION_PROMPT);
    let completion_start = Instant::now();
    let completion = provider
        .extract_table(&encoded, prompt)
        .await
        .inspect_err(|e| error!(stage = "completion", error = %e, "stage failed"))?;
    let completion_duration_ms = completion_start.elapsed().as_millis() as u64;

    // ── Stage 4: parse ───────────────────────────────────────────────────
    let extracted = table::parse_table(&completion.text)
        .inspect_err(|e| error!(stage = "parse", error = %e, "stage failed"))?;

    // Keep the full benchmark×model matrix around before it is reduced to
    // name/source pairs.
    if let Some(ref results_path) = config.results_path {
        write_results(&extracted, results_path)?;
        info!(path = %results_path.display(), "saved raw benchmark results");
    }

    // ── Stage 5: normalize ───────────────────────────────────────────────
    let now = chrono::Local::now().naive_local();
    let records = sources::normalize(&extracted, SourceType::Benchmark, document_url, now)
        .inspect_err(|e| error!(stage = "normalize", error = %e, "stage failed"))?;

    // ── Stage 6: merge ───────────────────────────────────────────────────
    let records_added = store::merge(&records, &config.store_path)
        .inspect_err(|e| error!(stage = "merge", error = %e, "stage failed"))?;

    let stats = CrawlStats {
        rows_extracted: extracted.len(),
        records_normalized: records.len(),
        records_added,
        input_tokens: completion.input_tokens,
        output_tokens: completion.output_tokens,
        fetch_duration_ms,
        completion_duration_ms,
        total_duration_ms: total_start.elapsed().as_millis() as u64,
    };

    info!(
        url = document_url,
        rows = stats.rows_extracted,
        normalized = stats.records_normalized,
        added = stats.records_added,
        total_ms = stats.total_duration_ms,
        "crawl complete"
    );

    Ok(CrawlOutput { records, stats })
}

/// Crawl the first document of the driving list and record the result.
///
/// Reads `config.queue_path` for the next document URL, runs
/// [`crawl_document`], then writes the crawl bookkeeping back to that row.
pub async fn run(config: &CrawlConfig) -> Result<CrawlOutput, CrawlError> {
    let document_url = queue::next_document(&config.queue_path)?;

    let output = crawl_document(&document_url, config).await?;

    queue::mark_crawled(
        &config.queue_path,
        chrono::Local::now().naive_local(),
        true,
        CRAWL_COST_PLACEHOLDER,
    )?;

    Ok(output)
}

/// Use the injected provider when present, otherwise build the default
/// Anthropic client from the environment.
fn resolve_provider(config: &CrawlConfig) -> Result<Arc<dyn CompletionProvider>, CrawlError> {
    if let Some(ref provider) = config.provider {
        return Ok(Arc::clone(provider));
    }
    let provider =
        AnthropicProvider::from_env(config.model.as_str())?.with_max_tokens(config.max_tokens);
    Ok(Arc::new(provider))
}

/// Persist the extracted table verbatim, atomically (temp file + rename)
/// like the store and queue writes.
fn write_results(extracted: &ExtractedTable, path: &Path) -> Result<(), CrawlError> {
    let write_failed = |detail: String| CrawlError::OutputWriteFailed {
        path: path.to_path_buf(),
        source: std::io::Error::other(detail),
    };

    let tmp_path = path.with_extension("csv.tmp");
    {
        let mut writer =
            csv::Writer::from_path(&tmp_path).map_err(|e| write_failed(e.to_string()))?;
        writer
            .write_record(&extracted.headers)
            .map_err(|e| write_failed(e.to_string()))?;
        for row in &extracted.rows {
            writer
                .write_record(row)
                .map_err(|e| write_failed(e.to_string()))?;
        }
        writer
            .flush()
            .map_err(|e| write_failed(e.to_string()))?;
    }
    std::fs::rename(&tmp_path, path).map_err(|e| write_failed(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn write_results_round_trips_table() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("results.csv");
        let extracted = ExtractedTable {
            headers: vec!["name".into(), "Claude 3 Opus".into(), "source".into()],
            rows: vec![vec!["MMLU".into(), "86.8%".into(), "https://a.org".into()]],
        };

        write_results(&extracted, &path).unwrap();

        let reread = table::parse_table(&std::fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(reread, extracted);
        // The staging file is renamed away, never left beside the results.
        assert!(!dir.path().join("results.csv.tmp").exists());
    }

    #[test]
    fn resolve_provider_prefers_injected() {
        struct Fake;
        #[async_trait::async_trait]
        impl CompletionProvider for Fake {
            async fn extract_table(
                &self,
                _document_base64: &str,
                _prompt: &str,
            ) -> Result<crate::pipeline::completion::Completion, CrawlError> {
                unreachable!("not called in this test")
            }
        }

        let config = CrawlConfig::builder()
            .provider(Arc::new(Fake))
            .build()
            .unwrap();
        assert!(resolve_provider(&config).is_ok());
    }
}
