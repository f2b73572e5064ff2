//! Integration tests for the full crawl pipeline.
//!
//! The completion provider is faked (no API key, no LLM traffic) and the
//! document fetch is served by a one-shot HTTP listener on localhost, so
//! these tests exercise fetch → encode → completion → parse → normalize →
//! merge → bookkeeping end to end without leaving the machine.

use benchcrawl::{
    crawl_document, run, Completion, CompletionProvider, CrawlConfig, CrawlError, SourceRecord,
};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tempfile::TempDir;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;

// ── Test doubles ─────────────────────────────────────────────────────────────

/// Fake provider returning a canned table, recording how it was called.
struct FakeProvider {
    table: String,
    calls: AtomicUsize,
}

impl FakeProvider {
    fn new(table: &str) -> Arc<Self> {
        Arc::new(Self {
            table: table.to_string(),
            calls: AtomicUsize::new(0),
        })
    }
}

#[async_trait::async_trait]
impl CompletionProvider for FakeProvider {
    async fn extract_table(
        &self,
        document_base64: &str,
        prompt: &str,
    ) -> Result<Completion, CrawlError> {
        assert!(!document_base64.is_empty(), "provider got an empty document");
        assert!(prompt.contains("source"), "prompt must describe the source column");
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(Completion {
            text: self.table.clone(),
            input_tokens: 1200,
            output_tokens: 80,
        })
    }
}

/// Provider that always fails, for failure-path tests.
struct FailingProvider;

#[async_trait::async_trait]
impl CompletionProvider for FailingProvider {
    async fn extract_table(&self, _: &str, _: &str) -> Result<Completion, CrawlError> {
        Err(CrawlError::CompletionFailed {
            message: "quota exceeded".into(),
        })
    }
}

/// Serve one HTTP 200 response with the given body, returning the URL.
async fn serve_body_once(body: &'static [u8]) -> String {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    tokio::spawn(async move {
        let (mut socket, _) = listener.accept().await.unwrap();
        let mut buf = [0u8; 4096];
        let _ = socket.read(&mut buf).await;

        let response = format!(
            "HTTP/1.1 200 OK\r\nContent-Type: application/pdf\r\nContent-Length: {}\r\nConnection: close\r\n\r\n",
            body.len()
        );
        socket.write_all(response.as_bytes()).await.unwrap();
        socket.write_all(body).await.unwrap();
        socket.shutdown().await.ok();
    });

    format!("http://{addr}/model_card.pdf")
}

/// Serve one HTTP response containing a minimal PDF body, returning the URL.
async fn serve_pdf_once() -> String {
    serve_body_once(b"%PDF-1.4 fake model card").await
}

fn config_in(dir: &TempDir, provider: Arc<dyn CompletionProvider>) -> CrawlConfig {
    CrawlConfig::builder()
        .store_path(dir.path().join("benchmark_sources.csv"))
        .queue_path(dir.path().join("model_sources.csv"))
        .results_path(dir.path().join("benchmark_results.csv"))
        .provider(provider)
        .build()
        .unwrap()
}

fn read_store(path: &Path) -> Vec<SourceRecord> {
    let mut reader = csv::Reader::from_path(path).unwrap();
    reader.deserialize().map(|r| r.unwrap()).collect()
}

fn write_queue(path: &PathBuf, url: &str) {
    std::fs::write(
        path,
        format!("url,crawled_timestamp,success,cost\n{url},,,\n"),
    )
    .unwrap();
}

const CANNED_TABLE: &str = "\
name,test_type,Claude 3 Opus,GPT-4,source
MMLU,5-shot,86.8%,86.4%,https://arxiv.org/abs/2201.11903
DROP,F1 Score,83.1,80.9,https://aclanthology.org/N19-1246/
BIG-Bench-Hard,3-shot CoT,86.8%,83.1%,Beyond the imitation game
MBPP,Pass@1,86.4%,-,-
";

// ── crawl_document ───────────────────────────────────────────────────────────

#[tokio::test]
async fn crawl_document_extracts_normalizes_and_merges() {
    let dir = TempDir::new().unwrap();
    let provider = FakeProvider::new(CANNED_TABLE);
    let config = config_in(&dir, provider.clone());
    let url = serve_pdf_once().await;

    let output = crawl_document(&url, &config).await.unwrap();

    assert_eq!(provider.calls.load(Ordering::SeqCst), 1);
    assert_eq!(output.stats.rows_extracted, 4);
    assert_eq!(output.stats.records_normalized, 2);
    assert_eq!(output.stats.records_added, 2);
    assert_eq!(output.stats.input_tokens, 1200);

    let store = read_store(&config.store_path);
    assert_eq!(store.len(), 2);
    assert_eq!(store[0].name, "MMLU");
    assert_eq!(store[0].url, "https://arxiv.org/pdf/2201.11903.pdf");
    assert_eq!(store[0].origin_url, url);
    assert!(store[0].crawled_timestamp.is_none());
    assert!(store[0].success.is_none());
    assert_eq!(store[1].url, "https://aclanthology.org/N19-1246/.pdf");

    // Raw results table is persisted verbatim, full model matrix included.
    let results = std::fs::read_to_string(config.results_path.as_ref().unwrap()).unwrap();
    assert!(results.contains("Claude 3 Opus"));
    assert!(results.contains("BIG-Bench-Hard"));
}

#[tokio::test]
async fn repeated_crawls_do_not_duplicate_store_rows() {
    let dir = TempDir::new().unwrap();
    let provider = FakeProvider::new(CANNED_TABLE);
    let config = config_in(&dir, provider);

    let first = crawl_document(&serve_pdf_once().await, &config).await.unwrap();
    let second = crawl_document(&serve_pdf_once().await, &config).await.unwrap();

    assert_eq!(first.stats.records_added, 2);
    assert_eq!(second.stats.records_added, 0);
    assert_eq!(read_store(&config.store_path).len(), 2);
}

#[tokio::test]
async fn truncated_non_pdf_response_is_rejected_before_completion() {
    let dir = TempDir::new().unwrap();
    let provider = FakeProvider::new(CANNED_TABLE);
    let config = config_in(&dir, provider.clone());
    // Too short to even carry the %PDF magic.
    let url = serve_body_once(b"%PD").await;

    let err = crawl_document(&url, &config).await.unwrap_err();
    assert!(matches!(err, CrawlError::NotAPdf { .. }));
    assert_eq!(provider.calls.load(Ordering::SeqCst), 0);
    assert!(!config.store_path.exists());
}

#[tokio::test]
async fn completion_failure_leaves_no_store_behind() {
    let dir = TempDir::new().unwrap();
    let config = config_in(&dir, Arc::new(FailingProvider));
    let url = serve_pdf_once().await;

    let err = crawl_document(&url, &config).await.unwrap_err();
    assert!(matches!(err, CrawlError::CompletionFailed { .. }));
    assert!(!config.store_path.exists());
}

#[tokio::test]
async fn malformed_completion_is_a_parse_error() {
    let dir = TempDir::new().unwrap();
    // Ragged rows: no partial recovery, the extraction is discarded.
    let provider = FakeProvider::new("name,source\nMMLU,https://a.org,extra,cells\n");
    let config = config_in(&dir, provider);
    let url = serve_pdf_once().await;

    let err = crawl_document(&url, &config).await.unwrap_err();
    assert!(matches!(err, CrawlError::TableParse { .. }));
    assert!(!config.store_path.exists());
}

#[tokio::test]
async fn missing_source_column_is_a_schema_error() {
    let dir = TempDir::new().unwrap();
    let provider = FakeProvider::new("name,score\nMMLU,86.8%\n");
    let config = config_in(&dir, provider);
    let url = serve_pdf_once().await;

    let err = crawl_document(&url, &config).await.unwrap_err();
    assert!(matches!(err, CrawlError::MissingColumns { .. }));
}

#[tokio::test]
async fn fenced_completion_output_is_accepted() {
    let dir = TempDir::new().unwrap();
    let fenced = format!("```csv\n{CANNED_TABLE}```");
    let provider = FakeProvider::new(&fenced);
    let config = config_in(&dir, provider);
    let url = serve_pdf_once().await;

    let output = crawl_document(&url, &config).await.unwrap();
    assert_eq!(output.stats.records_normalized, 2);
}

// ── run (queue-driven) ───────────────────────────────────────────────────────

#[tokio::test]
async fn run_crawls_first_queue_row_and_writes_bookkeeping() {
    let dir = TempDir::new().unwrap();
    let provider = FakeProvider::new(CANNED_TABLE);
    let config = config_in(&dir, provider);
    let url = serve_pdf_once().await;
    write_queue(&config.queue_path, &url);

    let output = run(&config).await.unwrap();
    assert_eq!(output.stats.records_added, 2);

    let queue = std::fs::read_to_string(&config.queue_path).unwrap();
    let first_row = queue.lines().nth(1).unwrap();
    assert!(first_row.starts_with(&url));
    assert!(first_row.contains("true"), "success flag written: {first_row}");
    assert!(first_row.ends_with("0.1"), "cost placeholder written: {first_row}");
    // A timestamp was recorded.
    let crawled = first_row.split(',').nth(1).unwrap();
    assert!(!crawled.is_empty(), "crawled_timestamp written: {first_row}");
}

#[tokio::test]
async fn failed_run_leaves_queue_bookkeeping_untouched() {
    let dir = TempDir::new().unwrap();
    let config = config_in(&dir, Arc::new(FailingProvider));
    let url = serve_pdf_once().await;
    write_queue(&config.queue_path, &url);
    let before = std::fs::read_to_string(&config.queue_path).unwrap();

    assert!(run(&config).await.is_err());

    let after = std::fs::read_to_string(&config.queue_path).unwrap();
    assert_eq!(before, after);
}

#[tokio::test]
async fn run_against_empty_queue_is_reported() {
    let dir = TempDir::new().unwrap();
    let config = config_in(&dir, FakeProvider::new(CANNED_TABLE));
    std::fs::write(&config.queue_path, "url,crawled_timestamp,success,cost\n").unwrap();

    let err = run(&config).await.unwrap_err();
    assert!(matches!(err, CrawlError::QueueEmpty { .. }));
}

// ── merge against pre-existing crawl state ───────────────────────────────────

#[tokio::test]
async fn crawl_never_regresses_existing_crawl_state() {
    let dir = TempDir::new().unwrap();
    let provider = FakeProvider::new(CANNED_TABLE);
    let config = config_in(&dir, provider);

    // Seed a store where MMLU's paper was already crawled successfully.
    std::fs::write(
        &config.store_path,
        "name,url,origin_url,crawled_timestamp,added_timestamp,type,success,cost\n\
         MMLU,https://arxiv.org/pdf/2201.11903.pdf,https://old.example/p.pdf,\
         2025-01-09 11:00:00.000000,2025-01-09 10:54:17.495720,benchmark,true,0.1\n",
    )
    .unwrap();

    let url = serve_pdf_once().await;
    let output = crawl_document(&url, &config).await.unwrap();
    assert_eq!(output.stats.records_added, 1); // only DROP is new

    let store = read_store(&config.store_path);
    assert_eq!(store.len(), 2);
    assert_eq!(store[0].success, Some(true));
    assert_eq!(store[0].cost, Some(0.1));
    assert_eq!(store[0].origin_url, "https://old.example/p.pdf");
}
