use async_trait::async_trait;
use fxhash::hash64;

use crate::normalize::l2_normalize_in_place;
use crate::{EmbeddingError, EmbeddingProvider};

/// Deterministic offline embedder.
///
/// Each lowercased word is hashed into one of `dim` buckets with a hash-derived
/// sign, so texts sharing vocabulary end up with a positive cosine similarity.
/// No network, no model files; used for tests, demos and `mode = "stub"`.
#[derive(Debug, Clone)]
pub struct StubEmbedder {
    dim: usize,
    normalize: bool,
    model_name: String,
}

impl StubEmbedder {
    pub fn new(dim: usize, normalize: bool) -> Self {
        Self {
            dim: dim.max(1),
            normalize,
            model_name: "stub-hashing".into(),
        }
    }

    pub fn dim(&self) -> usize {
        self.dim
    }

    fn vectorize(&self, text: &str) -> Vec<f32> {
        let mut v = vec![0f32; self.dim];
        for word in text.split(|c: char| !c.is_alphanumeric()).filter(|w| !w.is_empty()) {
            let h = hash64(word.to_lowercase().as_bytes());
            let bucket = (h % self.dim as u64) as usize;
            let sign = if (h >> 63) == 0 { 1.0 } else { -1.0 };
            v[bucket] += sign;
        }
        if self.normalize {
            l2_normalize_in_place(&mut v);
        }
        v
    }
}

#[async_trait]
impl EmbeddingProvider for StubEmbedder {
    fn model_name(&self) -> &str {
        &self.model_name
    }

    async fn embed(&self, text: &str) -> Result<Vec<f32>, EmbeddingError> {
        Ok(self.vectorize(text))
    }
}
