//! Topic embeddings for topicmatch.
//!
//! Turns free-text student topics and supervisor research areas into dense
//! vectors the allocator can compare. Two providers ship here:
//!
//! - **API mode** - POSTs to a hosted embedding endpoint (OpenAI by default,
//!   Hugging Face or a custom dialect on request). Rate limits and server
//!   errors are retried with exponential backoff.
//! - **Stub mode** - Deterministic feature hashing. No network, no keys.
//!   Good for tests and local demos.
//!
//! Callers hold an `Arc<dyn EmbeddingProvider>` built from an
//! [`EmbeddingConfig`] and never care which one they got.
//!
//! ```
//! use embedding::{build_provider, EmbeddingConfig};
//!
//! #[tokio::main]
//! async fn main() {
//!     let provider = build_provider(&EmbeddingConfig::stub()).unwrap();
//!     let v = provider.embed("graph neural networks").await.unwrap();
//!     assert_eq!(v.len(), 256);
//! }
//! ```
//!
//! ## Env vars to know
//!
//! - `OPENAI_API_KEY` - used when the config carries no explicit key.

pub mod config;
pub mod error;
pub mod retry;
mod serde_millis;

mod api;
mod normalize;
mod stub;

pub use crate::api::ApiEmbedder;
pub use crate::config::{EmbeddingConfig, API_KEY_ENV};
pub use crate::error::EmbeddingError;
pub use crate::retry::{execute_with_retry, RetryConfig};
pub use crate::stub::StubEmbedder;

use async_trait::async_trait;
use std::sync::Arc;

/// Anything that can turn text into a vector.
#[async_trait]
pub trait EmbeddingProvider: Send + Sync {
    /// Model identifier reported in logs and job results.
    fn model_name(&self) -> &str;

    async fn embed(&self, text: &str) -> Result<Vec<f32>, EmbeddingError>;

    /// Embed every text, preserving order. The default issues one call per text.
    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, EmbeddingError> {
        let mut out = Vec::with_capacity(texts.len());
        for text in texts {
            out.push(self.embed(text).await?);
        }
        Ok(out)
    }
}

/// Build the provider selected by `cfg.mode`.
///
/// `"api"` yields an [`ApiEmbedder`]; `"stub"` (or its alias `"fast"`) yields
/// a [`StubEmbedder`]. Any other mode is an [`EmbeddingError::InvalidConfig`].
pub fn build_provider(cfg: &EmbeddingConfig) -> Result<Arc<dyn EmbeddingProvider>, EmbeddingError> {
    match cfg.mode.as_str() {
        "api" => {
            let provider = ApiEmbedder::new(cfg)?;
            tracing::info!(model = %cfg.model_name, "using remote embedding provider");
            Ok(Arc::new(provider))
        }
        "stub" | "fast" => {
            tracing::info!(dim = cfg.stub_dim, "using stub embedding provider");
            Ok(Arc::new(StubEmbedder::new(cfg.stub_dim, cfg.normalize)))
        }
        other => Err(EmbeddingError::InvalidConfig(format!(
            "unknown embedding mode `{other}` (expected \"api\" or \"stub\")"
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stub_mode_builds_stub() {
        let provider = build_provider(&EmbeddingConfig::stub()).unwrap();
        assert_eq!(provider.model_name(), "stub-hashing");
    }

    #[test]
    fn unknown_mode_is_rejected() {
        let cfg = EmbeddingConfig {
            mode: "onnx".into(),
            ..Default::default()
        };
        assert!(matches!(
            build_provider(&cfg),
            Err(EmbeddingError::InvalidConfig(msg)) if msg.contains("onnx")
        ));
    }

    #[test]
    fn api_mode_with_key_builds() {
        let cfg = EmbeddingConfig {
            api_key: Some("sk-test".into()),
            ..Default::default()
        };
        let provider = build_provider(&cfg).unwrap();
        assert_eq!(provider.model_name(), "text-embedding-ada-002");
    }
}
