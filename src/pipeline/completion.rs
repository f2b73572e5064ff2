//! Completion stage: send the encoded document to an LLM and get a table.
//!
//! The provider is a trait rather than a concrete client so callers (and
//! tests) can inject their own implementation through
//! [`crate::config::CrawlConfig::provider`] — no process-wide client state.
//! Failures here are surfaced as [`CrawlError::CompletionFailed`] with no
//! retry; whether a failed extraction is worth re-running is the caller's
//! call, not this layer's.

use crate::error::CrawlError;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

/// Result of one completion call: the raw table text plus token usage.
#[derive(Debug, Clone)]
pub struct Completion {
    pub text: String,
    pub input_tokens: u64,
    pub output_tokens: u64,
}

/// A generative model that can extract a tabular text answer from a
/// base64-encoded document.
#[async_trait]
pub trait CompletionProvider: Send + Sync {
    /// Ask the model for the benchmark table of the given document.
    async fn extract_table(
        &self,
        document_base64: &str,
        prompt: &str,
    ) -> Result<Completion, CrawlError>;
}

// ── Anthropic messages API ────────────────────────────────────────────────

const DEFAULT_BASE_URL: &str = "https://api.anthropic.com/v1";
const API_VERSION: &str = "2023-06-01";
// Beta gate for base64 PDF document blocks.
const PDF_BETA: &str = "pdfs-2024-09-25";

/// Default completion budget; benchmark tables fit comfortably in 2048
/// output tokens.
pub const DEFAULT_MAX_TOKENS: usize = 2048;

/// [`CompletionProvider`] backed by the Anthropic messages API, sending the
/// PDF as a base64 document content block.
pub struct AnthropicProvider {
    http_client: reqwest::Client,
    api_key: String,
    model: String,
    max_tokens: usize,
    base_url: String,
}

impl AnthropicProvider {
    pub fn new(api_key: impl Into<String>, model: impl Into<String>) -> Self {
        Self {
            http_client: reqwest::Client::new(),
            api_key: api_key.into(),
            model: model.into(),
            max_tokens: DEFAULT_MAX_TOKENS,
            base_url: DEFAULT_BASE_URL.to_string(),
        }
    }

    /// Create from the `ANTHROPIC_API_KEY` environment variable.
    pub fn from_env(model: impl Into<String>) -> Result<Self, CrawlError> {
        let api_key = std::env::var("ANTHROPIC_API_KEY").map_err(|_| {
            CrawlError::ProviderNotConfigured {
                hint: "Set ANTHROPIC_API_KEY, or inject a provider via CrawlConfig::builder().provider(...).".into(),
            }
        })?;
        Ok(Self::new(api_key, model))
    }

    /// Override the API endpoint (proxies, mock servers).
    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into();
        self
    }

    pub fn with_max_tokens(mut self, max_tokens: usize) -> Self {
        self.max_tokens = max_tokens;
        self
    }
}

#[async_trait]
impl CompletionProvider for AnthropicProvider {
    async fn extract_table(
        &self,
        document_base64: &str,
        prompt: &str,
    ) -> Result<Completion, CrawlError> {
        let request = MessagesRequest {
            model: &self.model,
            max_tokens: self.max_tokens,
            messages: vec![Message {
                role: "user",
                content: vec![
                    ContentBlock::Document {
                        source: DocumentSource {
                            kind: "base64",
                            media_type: "application/pdf",
                            data: document_base64,
                        },
                    },
                    ContentBlock::Text { text: prompt },
                ],
            }],
        };

        info!(model = %self.model, "requesting table extraction");

        let response = self
            .http_client
            .post(format!("{}/messages", self.base_url))
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", API_VERSION)
            .header("anthropic-beta", PDF_BETA)
            .json(&request)
            .send()
            .await
            .map_err(|e| CrawlError::CompletionFailed {
                message: e.to_string(),
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(CrawlError::CompletionFailed {
                message: format!("HTTP {status}: {}", truncate(&body, 500)),
            });
        }

        let parsed: MessagesResponse =
            response
                .json()
                .await
                .map_err(|e| CrawlError::CompletionFailed {
                    message: format!("invalid response body: {e}"),
                })?;

        let text = parsed
            .content
            .iter()
            .find(|block| block.kind == "text")
            .map(|block| block.text.clone())
            .ok_or_else(|| CrawlError::CompletionFailed {
                message: "response contained no text block".into(),
            })?;

        debug!(
            input_tokens = parsed.usage.input_tokens,
            output_tokens = parsed.usage.output_tokens,
            chars = text.len(),
            "received completion"
        );

        Ok(Completion {
            text,
            input_tokens: parsed.usage.input_tokens,
            output_tokens: parsed.usage.output_tokens,
        })
    }
}

fn truncate(s: &str, max: usize) -> &str {
    match s.char_indices().nth(max) {
        Some((idx, _)) => &s[..idx],
        None => s,
    }
}

// ── Wire types ────────────────────────────────────────────────────────────

#[derive(Serialize)]
struct MessagesRequest<'a> {
    model: &'a str,
    max_tokens: usize,
    messages: Vec<Message<'a>>,
}

#[derive(Serialize)]
struct Message<'a> {
    role: &'static str,
    content: Vec<ContentBlock<'a>>,
}

#[derive(Serialize)]
#[serde(tag = "type", rename_all = "lowercase")]
enum ContentBlock<'a> {
    Document { source: DocumentSource<'a> },
    Text { text: &'a str },
}

#[derive(Serialize)]
struct DocumentSource<'a> {
    #[serde(rename = "type")]
    kind: &'static str,
    media_type: &'static str,
    data: &'a str,
}

#[derive(Deserialize)]
struct MessagesResponse {
    content: Vec<ResponseBlock>,
    #[serde(default)]
    usage: Usage,
}

#[derive(Deserialize)]
struct ResponseBlock {
    #[serde(rename = "type")]
    kind: String,
    #[serde(default)]
    text: String,
}

#[derive(Deserialize, Default)]
struct Usage {
    #[serde(default)]
    input_tokens: u64,
    #[serde(default)]
    output_tokens: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn request_body_shape() {
        let request = MessagesRequest {
            model: "claude-3-5-sonnet-latest",
            max_tokens: 2048,
            messages: vec![Message {
                role: "user",
                content: vec![
                    ContentBlock::Document {
                        source: DocumentSource {
                            kind: "base64",
                            media_type: "application/pdf",
                            data: "JVBERi0=",
                        },
                    },
                    ContentBlock::Text { text: "extract" },
                ],
            }],
        };
        let json = serde_json::to_value(&request).unwrap();

        assert_eq!(json["model"], "claude-3-5-sonnet-latest");
        assert_eq!(json["messages"][0]["content"][0]["type"], "document");
        assert_eq!(
            json["messages"][0]["content"][0]["source"]["media_type"],
            "application/pdf"
        );
        assert_eq!(json["messages"][0]["content"][1]["type"], "text");
    }

    #[test]
    fn response_parsing_takes_first_text_block() {
        let body = r#"{
            "content": [{"type": "text", "text": "name,source\nMMLU,https://a.org"}],
            "usage": {"input_tokens": 1200, "output_tokens": 80}
        }"#;
        let parsed: MessagesResponse = serde_json::from_str(body).unwrap();
        assert_eq!(parsed.usage.input_tokens, 1200);
        assert!(parsed.content[0].text.starts_with("name,source"));
    }

    #[test]
    fn response_without_usage_defaults_to_zero() {
        let body = r#"{"content": [{"type": "text", "text": "x"}]}"#;
        let parsed: MessagesResponse = serde_json::from_str(body).unwrap();
        assert_eq!(parsed.usage.input_tokens, 0);
    }
}
