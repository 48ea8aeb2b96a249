use async_trait::async_trait;
use serde_json::{json, Value};
use std::time::Duration;

use crate::normalize::{l2_normalize_in_place, truncate_to_token_limit};
use crate::retry::{execute_with_retry, RetryConfig};
use crate::{EmbeddingConfig, EmbeddingError, EmbeddingProvider};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ApiProviderKind {
    HuggingFace,
    OpenAI,
    Custom,
}

fn api_provider_kind(cfg: &EmbeddingConfig) -> ApiProviderKind {
    let provider = cfg
        .api_provider
        .as_deref()
        .unwrap_or("openai")
        .to_ascii_lowercase();
    match provider.as_str() {
        "hf" | "huggingface" => ApiProviderKind::HuggingFace,
        "openai" | "gpt" => ApiProviderKind::OpenAI,
        _ => ApiProviderKind::Custom,
    }
}

/// Embedding provider backed by a remote HTTP endpoint.
///
/// Requests are batched by `batch_size`, inputs are truncated to
/// `max_input_tokens`, and retryable failures (429, 5xx, transport) are
/// retried with exponential backoff per [`RetryConfig`].
#[derive(Debug, Clone)]
pub struct ApiEmbedder {
    client: reqwest::Client,
    url: String,
    auth_header: Option<String>,
    provider: ApiProviderKind,
    model_name: String,
    max_input_tokens: usize,
    batch_size: usize,
    normalize: bool,
    retry: RetryConfig,
}

impl ApiEmbedder {
    pub fn new(cfg: &EmbeddingConfig) -> Result<Self, EmbeddingError> {
        let url = cfg
            .api_url
            .clone()
            .filter(|u| !u.trim().is_empty())
            .ok_or_else(|| EmbeddingError::InvalidConfig("api_url is required for api mode".into()))?;
        let provider = api_provider_kind(cfg);

        let api_key = cfg.resolved_api_key();
        if provider == ApiProviderKind::OpenAI && api_key.is_none() {
            return Err(EmbeddingError::InvalidConfig(
                "an api key is required for the openai provider (set api_key or OPENAI_API_KEY)"
                    .into(),
            ));
        }
        if cfg.batch_size == 0 {
            return Err(EmbeddingError::InvalidConfig(
                "batch_size must be greater than zero".into(),
            ));
        }

        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(cfg.timeout_secs))
            .connect_timeout(Duration::from_secs(10))
            .pool_max_idle_per_host(8)
            .build()
            .map_err(|e| EmbeddingError::InvalidConfig(format!("http client: {e}")))?;

        Ok(Self {
            client,
            url,
            auth_header: api_key.map(|key| format!("Bearer {key}")),
            provider,
            model_name: cfg.model_name.clone(),
            max_input_tokens: cfg.max_input_tokens,
            batch_size: cfg.batch_size,
            normalize: cfg.normalize,
            retry: cfg.retry,
        })
    }

    async fn embed_chunk(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, EmbeddingError> {
        let inputs: Vec<String> = texts
            .iter()
            .map(|t| truncate_to_token_limit(t, self.max_input_tokens))
            .collect();
        let payload = build_api_payload(self.provider, &inputs, &self.model_name);

        let response = execute_with_retry(&self.retry, |_| self.send_request(&payload)).await?;
        let mut vectors = parse_embeddings_from_value(response)?;

        if vectors.len() != inputs.len() {
            return Err(EmbeddingError::InvalidResponse(format!(
                "API returned {} embeddings for {} inputs",
                vectors.len(),
                inputs.len()
            )));
        }
        if self.normalize {
            vectors.iter_mut().for_each(|v| l2_normalize_in_place(v));
        }
        Ok(vectors)
    }

    async fn send_request(&self, payload: &Value) -> Result<Value, EmbeddingError> {
        let mut request = self.client.post(&self.url).json(payload);
        if let Some(header) = self.auth_header.as_deref() {
            request = request.header(reqwest::header::AUTHORIZATION, header);
        }

        let response = request
            .send()
            .await
            .map_err(|e| EmbeddingError::Transport(format!("HTTP request failed: {e}")))?;

        let status = response.status();
        if status == reqwest::StatusCode::TOO_MANY_REQUESTS {
            let body = response.text().await.unwrap_or_default();
            return Err(EmbeddingError::RateLimited(body));
        }
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(EmbeddingError::Provider {
                status: status.as_u16(),
                message: body,
            });
        }

        response
            .json::<Value>()
            .await
            .map_err(|e| EmbeddingError::InvalidResponse(format!("invalid JSON response: {e}")))
    }
}

#[async_trait]
impl EmbeddingProvider for ApiEmbedder {
    fn model_name(&self) -> &str {
        &self.model_name
    }

    async fn embed(&self, text: &str) -> Result<Vec<f32>, EmbeddingError> {
        self.embed_chunk(&[text.to_string()])
            .await?
            .pop()
            .ok_or_else(|| EmbeddingError::InvalidResponse("API response did not contain embeddings".into()))
    }

    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, EmbeddingError> {
        let mut out = Vec::with_capacity(texts.len());
        for chunk in texts.chunks(self.batch_size) {
            out.extend(self.embed_chunk(chunk).await?);
        }
        tracing::debug!(texts = texts.len(), model = %self.model_name, "embedded batch");
        Ok(out)
    }
}

fn build_api_payload(provider: ApiProviderKind, texts: &[String], model_name: &str) -> Value {
    match provider {
        ApiProviderKind::HuggingFace => json!({ "inputs": texts }),
        ApiProviderKind::OpenAI => json!({ "input": texts, "model": model_name }),
        ApiProviderKind::Custom => json!({ "texts": texts }),
    }
}

fn parse_embeddings_from_value(value: Value) -> Result<Vec<Vec<f32>>, EmbeddingError> {
    match value {
        Value::Object(mut map) => {
            if let Some(embeddings) = map.remove("embeddings") {
                return parse_embedding_collection(embeddings);
            }

            if let Some(Value::Array(items)) = map.remove("data") {
                let mut indexed = Vec::with_capacity(items.len());
                for (position, item) in items.into_iter().enumerate() {
                    let Value::Object(mut obj) = item else {
                        return Err(EmbeddingError::InvalidResponse(
                            "unexpected entry inside `data` array".into(),
                        ));
                    };
                    let embedding = obj.remove("embedding").ok_or_else(|| {
                        EmbeddingError::InvalidResponse("missing `embedding` field in data item".into())
                    })?;
                    let index = obj
                        .get("index")
                        .and_then(Value::as_u64)
                        .map(|i| i as usize)
                        .unwrap_or(position);
                    indexed.push((index, parse_embedding_vector(embedding)?));
                }
                // OpenAI tags each item with the input position it belongs to.
                indexed.sort_by_key(|(index, _)| *index);
                return Ok(indexed.into_iter().map(|(_, v)| v).collect());
            }

            Err(EmbeddingError::InvalidResponse(
                "unsupported API response shape".into(),
            ))
        }
        other => parse_embedding_collection(other),
    }
}

fn parse_embedding_collection(value: Value) -> Result<Vec<Vec<f32>>, EmbeddingError> {
    match value {
        Value::Array(items) => {
            if items.is_empty() {
                Ok(Vec::new())
            } else if items.iter().all(|item| matches!(item, Value::Array(_))) {
                items.into_iter().map(parse_embedding_vector).collect()
            } else {
                parse_embedding_vector(Value::Array(items)).map(|vec| vec![vec])
            }
        }
        other => parse_embedding_vector(other).map(|vec| vec![vec]),
    }
}

fn parse_embedding_vector(value: Value) -> Result<Vec<f32>, EmbeddingError> {
    match value {
        Value::Array(values) => values
            .into_iter()
            .map(|entry| match entry {
                Value::Number(num) => num.as_f64().map(|f| f as f32).ok_or_else(|| {
                    EmbeddingError::InvalidResponse("non-finite embedding value".into())
                }),
                other => Err(EmbeddingError::InvalidResponse(format!(
                    "embedding entries must be numbers, got {other:?}"
                ))),
            })
            .collect(),
        other => Err(EmbeddingError::InvalidResponse(format!(
            "embedding vector must be an array, got {other:?}"
        ))),
    }
}
