//! # benchcrawl
//!
//! Extract benchmark provenance tables from PDF research papers with an LLM
//! and build a deduplicated CSV of benchmark → downloadable-paper links.
//!
//! ## Why this crate?
//!
//! Model cards and papers publish their evaluation results as tables whose
//! rows cite the benchmark's paper — sometimes as a URL, sometimes as a bare
//! title, sometimes not at all. This crate asks a document-capable LLM for
//! that table, keeps only the rows with a real URL, rewrites known publisher
//! landing pages (arXiv abstracts, ACL Anthology entries) into direct PDF
//! links, and merges the result into a persistent store keyed by URL so
//! repeated runs never duplicate a source.
//!
//! ## Pipeline Overview
//!
//! ```text
//! queue.csv (first row)
//!  │
//!  ├─ 1. Fetch      download the PDF to a temp dir
//!  ├─ 2. Encode     PDF bytes → base64
//!  ├─ 3. Completion LLM extracts the benchmark table as CSV
//!  ├─ 4. Parse      CSV text → table
//!  ├─ 5. Normalize  classify + canonicalize citations → SourceRecord
//!  ├─ 6. Merge      append-by-url into the source store
//!  └─ 7. Bookkeep   write crawled_timestamp/success/cost to the queue row
//! ```
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use benchcrawl::{crawl_document, CrawlConfig};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     // Provider built from ANTHROPIC_API_KEY unless injected explicitly.
//!     let config = CrawlConfig::default();
//!     let output = crawl_document("https://example.com/model_card.pdf", &config).await?;
//!     println!("added {} new sources", output.stats.records_added);
//!     Ok(())
//! }
//! ```
//!
//! ## Feature Flags
//!
//! | Feature | Default | Description |
//! |---------|---------|-------------|
//! | `cli`   | on      | Enables the `benchcrawl` binary (clap + anyhow + tracing-subscriber) |
//!
//! Disable `cli` when using only the library:
//! ```toml
//! benchcrawl = { version = "0.2", default-features = false }
//! ```

// ── Modules ──────────────────────────────────────────────────────────────

pub mod config;
pub mod crawl;
pub mod error;
pub mod pipeline;
pub mod prompts;
pub mod queue;
pub mod record;
pub mod sources;
pub mod store;

// ── Re-exports ───────────────────────────────────────────────────────────

pub use config::{CrawlConfig, CrawlConfigBuilder, DEFAULT_MODEL};
pub use crawl::{crawl_document, run, CrawlOutput, CrawlStats, CRAWL_COST_PLACEHOLDER};
pub use error::CrawlError;
pub use pipeline::completion::{AnthropicProvider, Completion, CompletionProvider};
pub use record::{RawRow, SourceRecord, SourceType};
pub use sources::{canonicalize_source_url, is_valid_url, normalize};
pub use store::merge;
