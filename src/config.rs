//! Configuration for a crawl run.
//!
//! All behaviour is controlled through [`CrawlConfig`], built via its
//! [`CrawlConfigBuilder`]. One struct means a run's configuration can be
//! shared, logged, and diffed against another run's to explain output
//! differences.
//!
//! The completion provider is an explicit field rather than a module-level
//! client: tests inject a fake through [`CrawlConfigBuilder::provider`] and
//! never touch process-wide state.

use crate::error::CrawlError;
use crate::pipeline::completion::{CompletionProvider, DEFAULT_MAX_TOKENS};
use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;

/// Default completion model.
pub const DEFAULT_MODEL: &str = "claude-3-5-sonnet-latest";

/// Configuration for crawling documents and merging extracted sources.
///
/// # Example
/// ```rust
/// use benchcrawl::CrawlConfig;
///
/// let config = CrawlConfig::builder()
///     .store_path("data/benchmark_sources.csv")
///     .queue_path("data/model_sources.csv")
///     .model("claude-3-5-sonnet-latest")
///     .build()
///     .unwrap();
/// ```
#[derive(Clone)]
pub struct CrawlConfig {
    /// Where the deduplicated source store CSV lives. Default:
    /// `benchmark_sources.csv`.
    pub store_path: PathBuf,

    /// The driving list of documents to crawl. Default: `model_sources.csv`.
    pub queue_path: PathBuf,

    /// Where the raw extracted benchmark×model table is written verbatim
    /// before normalization. `None` skips the write. Default:
    /// `benchmark_results.csv`.
    pub results_path: Option<PathBuf>,

    /// Completion model identifier. Default: [`DEFAULT_MODEL`].
    pub model: String,

    /// Maximum tokens the model may generate. Default: 2048 — benchmark
    /// tables are small; a large budget only invites commentary.
    pub max_tokens: usize,

    /// Custom extraction prompt. If None, uses
    /// [`crate::prompts::EXTRACTION_PROMPT`].
    pub prompt: Option<String>,

    /// Pre-constructed completion provider. Takes precedence over building
    /// one from `model` + `ANTHROPIC_API_KEY`.
    pub provider: Option<Arc<dyn CompletionProvider>>,

    /// Document download timeout in seconds. Default: 120.
    pub download_timeout_secs: u64,
}

impl Default for CrawlConfig {
    fn default() -> Self {
        Self {
            store_path: PathBuf::from("benchmark_sources.csv"),
            queue_path: PathBuf::from("model_sources.csv"),
            results_path: Some(PathBuf::from("benchmark_results.csv")),
            model: DEFAULT_MODEL.to_string(),
            max_tokens: DEFAULT_MAX_TOKENS,
            prompt: None,
            provider: None,
            download_timeout_secs: 120,
        }
    }
}

impl fmt::Debug for CrawlConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CrawlConfig")
            .field("store_path", &self.store_path)
            .field("queue_path", &self.queue_path)
            .field("results_path", &self.results_path)
            .field("model", &self.model)
            .field("max_tokens", &self.max_tokens)
            .field("prompt", &self.prompt.as_ref().map(|p| p.len()))
            .field("provider", &self.provider.as_ref().map(|_| "<dyn CompletionProvider>"))
            .field("download_timeout_secs", &self.download_timeout_secs)
            .finish()
    }
}

impl CrawlConfig {
    /// Create a new builder for `CrawlConfig`.
    pub fn builder() -> CrawlConfigBuilder {
        CrawlConfigBuilder {
            config: Self::default(),
        }
    }
}

/// Builder for [`CrawlConfig`].
#[derive(Debug)]
pub struct CrawlConfigBuilder {
    config: CrawlConfig,
}

impl CrawlConfigBuilder {
    pub fn store_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.config.store_path = path.into();
        self
    }

    pub fn queue_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.config.queue_path = path.into();
        self
    }

    pub fn results_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.config.results_path = Some(path.into());
        self
    }

    /// Skip persisting the raw extracted table.
    pub fn no_results(mut self) -> Self {
        self.config.results_path = None;
        self
    }

    pub fn model(mut self, model: impl Into<String>) -> Self {
        self.config.model = model.into();
        self
    }

    pub fn max_tokens(mut self, n: usize) -> Self {
        self.config.max_tokens = n.max(1);
        self
    }

    pub fn prompt(mut self, prompt: impl Into<String>) -> Self {
        self.config.prompt = Some(prompt.into());
        self
    }

    pub fn provider(mut self, provider: Arc<dyn CompletionProvider>) -> Self {
        self.config.provider = Some(provider);
        self
    }

    pub fn download_timeout_secs(mut self, secs: u64) -> Self {
        self.config.download_timeout_secs = secs;
        self
    }

    /// Build the configuration, validating constraints.
    pub fn build(self) -> Result<CrawlConfig, CrawlError> {
        let c = &self.config;
        if c.store_path == c.queue_path {
            return Err(CrawlError::InvalidConfig(
                "store_path and queue_path must differ".into(),
            ));
        }
        if c.model.is_empty() {
            return Err(CrawlError::InvalidConfig("model must not be empty".into()));
        }
        Ok(self.config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        let config = CrawlConfig::builder().build().unwrap();
        assert_eq!(config.model, DEFAULT_MODEL);
        assert_eq!(config.max_tokens, 2048);
        assert!(config.provider.is_none());
    }

    #[test]
    fn same_store_and_queue_path_rejected() {
        let err = CrawlConfig::builder()
            .store_path("sources.csv")
            .queue_path("sources.csv")
            .build()
            .unwrap_err();
        assert!(matches!(err, CrawlError::InvalidConfig(_)));
    }

    #[test]
    fn empty_model_rejected() {
        let err = CrawlConfig::builder().model("").build().unwrap_err();
        assert!(matches!(err, CrawlError::InvalidConfig(_)));
    }

    #[test]
    fn debug_does_not_leak_provider_internals() {
        let config = CrawlConfig::default();
        let dbg = format!("{config:?}");
        assert!(dbg.contains("store_path"));
    }
}
