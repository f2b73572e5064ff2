//! CLI binary for benchcrawl.
//!
//! A thin shim over the library crate that maps CLI flags to `CrawlConfig`
//! and prints run statistics.

use anyhow::{Context, Result};
use benchcrawl::{crawl_document, run, CrawlConfig, CrawlOutput};
use clap::Parser;
use indicatif::{ProgressBar, ProgressStyle};
use std::io::{self, Write};
use std::path::PathBuf;
use std::time::Duration;
use tracing_subscriber::EnvFilter;

// ── ANSI colour helpers (no extra deps) ──────────────────────────────────────

fn green(s: &str) -> String {
    format!("\x1b[32m{s}\x1b[0m")
}
fn bold(s: &str) -> String {
    format!("\x1b[1m{s}\x1b[0m")
}
fn dim(s: &str) -> String {
    format!("\x1b[2m{s}\x1b[0m")
}

const AFTER_HELP: &str = r#"EXAMPLES:
  # Crawl the first pending document of the queue
  benchcrawl --queue model_sources.csv --store benchmark_sources.csv

  # One-shot: crawl a specific paper, no queue bookkeeping
  benchcrawl --url https://arxiv.org/pdf/2303.08774.pdf

  # Use a different model and print stats as JSON
  benchcrawl --model claude-3-5-haiku-latest --json

ENVIRONMENT VARIABLES:
  ANTHROPIC_API_KEY     API credential for the completion provider
  BENCHCRAWL_QUEUE      Default --queue path
  BENCHCRAWL_STORE      Default --store path
  BENCHCRAWL_MODEL      Default --model

SETUP:
  1. Set API key:  export ANTHROPIC_API_KEY=sk-ant-...
  2. Crawl:        benchcrawl --queue model_sources.csv
"#;

/// Extract benchmark provenance tables from PDF papers with an LLM.
#[derive(Parser, Debug)]
#[command(
    name = "benchcrawl",
    version,
    about = "Extract benchmark provenance tables from PDF papers with an LLM",
    long_about = "Crawl PDF research papers, extract their benchmark-evaluation tables with a \
document-capable LLM, and merge the cited benchmark sources into a deduplicated CSV store.",
    color = clap::ColorChoice::Auto,
    after_long_help = AFTER_HELP
)]
struct Cli {
    /// Crawl this document URL directly instead of the queue's first row
    /// (skips queue bookkeeping).
    #[arg(long)]
    url: Option<String>,

    /// Driving list CSV with the documents to crawl (needs a `url` column).
    #[arg(long, env = "BENCHCRAWL_QUEUE", default_value = "model_sources.csv")]
    queue: PathBuf,

    /// Deduplicated source store CSV.
    #[arg(long, env = "BENCHCRAWL_STORE", default_value = "benchmark_sources.csv")]
    store: PathBuf,

    /// Where to save the raw extracted table.
    #[arg(long, env = "BENCHCRAWL_RESULTS", default_value = "benchmark_results.csv")]
    results: PathBuf,

    /// Skip saving the raw extracted table.
    #[arg(long)]
    no_results: bool,

    /// Completion model identifier.
    #[arg(long, env = "BENCHCRAWL_MODEL")]
    model: Option<String>,

    /// Max tokens the model may generate.
    #[arg(long, env = "BENCHCRAWL_MAX_TOKENS", default_value_t = 2048)]
    max_tokens: usize,

    /// Path to a text file containing a custom extraction prompt.
    #[arg(long, env = "BENCHCRAWL_PROMPT")]
    prompt: Option<PathBuf>,

    /// Document download timeout in seconds.
    #[arg(long, env = "BENCHCRAWL_DOWNLOAD_TIMEOUT", default_value_t = 120)]
    download_timeout: u64,

    /// Print run statistics as JSON on stdout.
    #[arg(long)]
    json: bool,

    /// Enable DEBUG-level tracing logs.
    #[arg(short, long)]
    verbose: bool,

    /// Suppress all output except errors.
    #[arg(short, long)]
    quiet: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // ── Logging setup ────────────────────────────────────────────────────
    let filter = if cli.quiet {
        "error"
    } else if cli.verbose {
        "debug"
    } else {
        "info"
    };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)),
        )
        .with_writer(io::stderr)
        .init();

    let config = build_config(&cli).await?;

    // A spinner while the pipeline is in flight; the completion call can
    // take tens of seconds and gives no intermediate feedback.
    let spinner = if !cli.quiet && !cli.json {
        let bar = ProgressBar::new_spinner();
        bar.set_style(
            ProgressStyle::with_template("{spinner:.cyan} {msg}")
                .unwrap_or_else(|_| ProgressStyle::default_spinner()),
        );
        bar.set_message("Extracting benchmark table…");
        bar.enable_steady_tick(Duration::from_millis(80));
        Some(bar)
    } else {
        None
    };

    let result = if let Some(ref url) = cli.url {
        crawl_document(url, &config).await
    } else {
        run(&config).await
    };

    if let Some(bar) = spinner {
        bar.finish_and_clear();
    }

    let output = result.context("Crawl failed")?;
    report(&cli, &output)?;
    Ok(())
}

/// Map CLI args to `CrawlConfig`.
async fn build_config(cli: &Cli) -> Result<CrawlConfig> {
    let prompt = if let Some(ref path) = cli.prompt {
        Some(
            tokio::fs::read_to_string(path)
                .await
                .with_context(|| format!("Failed to read prompt from {path:?}"))?,
        )
    } else {
        None
    };

    let mut builder = CrawlConfig::builder()
        .queue_path(&cli.queue)
        .store_path(&cli.store)
        .max_tokens(cli.max_tokens)
        .download_timeout_secs(cli.download_timeout);

    builder = if cli.no_results {
        builder.no_results()
    } else {
        builder.results_path(&cli.results)
    };
    if let Some(ref model) = cli.model {
        builder = builder.model(model.as_str());
    }
    if let Some(prompt) = prompt {
        builder = builder.prompt(prompt);
    }

    builder.build().context("Invalid configuration")
}

fn report(cli: &Cli, output: &CrawlOutput) -> Result<()> {
    if cli.json {
        let json = serde_json::to_string_pretty(&output.stats)
            .context("Failed to serialise stats")?;
        let mut stdout = io::stdout().lock();
        stdout.write_all(json.as_bytes()).context("Failed to write to stdout")?;
        stdout.write_all(b"\n").ok();
        return Ok(());
    }

    if !cli.quiet {
        let s = &output.stats;
        eprintln!(
            "{} {} rows extracted, {} normalized, {} added to {}",
            green("✔"),
            s.rows_extracted,
            s.records_normalized,
            bold(&s.records_added.to_string()),
            cli.store.display(),
        );
        eprintln!(
            "   {} tokens in  /  {} tokens out  —  {}ms total",
            dim(&s.input_tokens.to_string()),
            dim(&s.output_tokens.to_string()),
            s.total_duration_ms,
        );
    }
    Ok(())
}
