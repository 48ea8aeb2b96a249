use thiserror::Error;

/// Errors surfaced by an [`EmbeddingProvider`](crate::EmbeddingProvider).
#[derive(Debug, Clone, Error, PartialEq)]
pub enum EmbeddingError {
    /// The provider answered HTTP 429. Retried with backoff.
    #[error("rate limited by embedding provider: {0}")]
    RateLimited(String),
    /// The provider answered with a non-success status other than 429.
    /// Server-side (5xx) failures are retried, client-side ones are not.
    #[error("embedding provider returned HTTP {status}: {message}")]
    Provider { status: u16, message: String },
    /// The request never produced a response (timeout, refused connection, DNS).
    #[error("transport failure: {0}")]
    Transport(String),
    /// The response body could not be turned into vectors.
    #[error("invalid provider response: {0}")]
    InvalidResponse(String),
    /// Configuration is inconsistent (e.g. api mode without an endpoint).
    #[error("invalid embedding config: {0}")]
    InvalidConfig(String),
}

impl EmbeddingError {
    /// Whether another attempt could plausibly succeed.
    pub fn is_retryable(&self) -> bool {
        match self {
            EmbeddingError::RateLimited(_) | EmbeddingError::Transport(_) => true,
            EmbeddingError::Provider { status, .. } => *status >= 500,
            EmbeddingError::InvalidResponse(_) | EmbeddingError::InvalidConfig(_) => false,
        }
    }
}
