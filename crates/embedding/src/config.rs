use serde::{Deserialize, Serialize};

use crate::retry::RetryConfig;

/// Environment variable consulted when `api_key` is not set explicitly.
pub const API_KEY_ENV: &str = "OPENAI_API_KEY";

/// Runtime configuration for the embedding provider.
///
/// # Example
/// ```no_run
/// use embedding::{build_provider, EmbeddingConfig};
///
/// let cfg = EmbeddingConfig {
///     mode: "api".into(),
///     api_url: Some("https://api.openai.com/v1/embeddings".into()),
///     api_key: Some("sk-xxx".into()),
///     ..Default::default()
/// };
///
/// let provider = build_provider(&cfg).expect("provider");
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct EmbeddingConfig {
    /// `"api"` (remote HTTP) or `"stub"` (deterministic, offline).
    pub mode: String,
    /// Embedding endpoint when [`mode`](Self::mode) is `"api"`.
    pub api_url: Option<String>,
    /// Bearer token. Falls back to `OPENAI_API_KEY` when absent.
    #[serde(skip_serializing)]
    pub api_key: Option<String>,
    /// Payload dialect: `"openai"` (default), `"hf"`, or `"custom"`.
    pub api_provider: Option<String>,
    /// Model name sent to the provider and reported by the embedder.
    pub model_name: String,
    /// Per-request timeout in seconds.
    pub timeout_secs: u64,
    /// Inputs longer than this many tokens are truncated before sending.
    pub max_input_tokens: usize,
    /// Texts sent per API request.
    pub batch_size: usize,
    /// L2-normalize returned vectors.
    pub normalize: bool,
    /// Vector length produced in stub mode.
    pub stub_dim: usize,
    /// Backoff policy for retryable failures.
    pub retry: RetryConfig,
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            mode: "api".into(),
            api_url: Some("https://api.openai.com/v1/embeddings".into()),
            api_key: None,
            api_provider: Some("openai".into()),
            model_name: "text-embedding-ada-002".into(),
            timeout_secs: 30,
            max_input_tokens: 8000,
            batch_size: 64,
            normalize: false,
            stub_dim: 256,
            retry: RetryConfig::default(),
        }
    }
}

impl EmbeddingConfig {
    /// Offline configuration backed by the deterministic stub.
    pub fn stub() -> Self {
        Self {
            mode: "stub".into(),
            model_name: "stub-hashing".into(),
            ..Default::default()
        }
    }

    /// Explicit key, else the `OPENAI_API_KEY` environment variable.
    pub fn resolved_api_key(&self) -> Option<String> {
        self.api_key
            .clone()
            .filter(|k| !k.trim().is_empty())
            .or_else(|| std::env::var(API_KEY_ENV).ok())
            .filter(|k| !k.trim().is_empty())
    }
}
