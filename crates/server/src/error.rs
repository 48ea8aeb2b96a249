use allocator::AllocationError;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use embedding::EmbeddingError;
use roster::RosterError;
use serde::{Deserialize, Serialize};
use topicmatch::PipelineError;

pub type ServerResult<T> = Result<T, ServerError>;

/// Server error types
#[derive(Debug, thiserror::Error)]
pub enum ServerError {
    #[error("Authentication failed: {0}")]
    Authentication(String),

    #[error("Rate limit exceeded")]
    RateLimitExceeded,

    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("Roster error: {0}")]
    Roster(#[from] RosterError),

    #[error("Embedding error: {0}")]
    Embedding(#[from] EmbeddingError),

    #[error("Allocation error: {0}")]
    Allocation(#[from] AllocationError),

    #[error("Internal server error: {0}")]
    Internal(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Not found")]
    NotFound,
}

/// Body of every error response: `{"error": {"code", "message"}}`.
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: ErrorDetail,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ErrorDetail {
    pub code: String,
    pub message: String,
}

impl ServerError {
    /// Get HTTP status code for this error
    pub fn status_code(&self) -> StatusCode {
        match self {
            ServerError::Authentication(_) => StatusCode::UNAUTHORIZED,
            ServerError::RateLimitExceeded => StatusCode::TOO_MANY_REQUESTS,
            ServerError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ServerError::NotFound => StatusCode::NOT_FOUND,
            ServerError::Allocation(_) => StatusCode::UNPROCESSABLE_ENTITY,
            // Provider throttling is temporary; tell the caller to come back.
            ServerError::Embedding(EmbeddingError::RateLimited(_)) => {
                StatusCode::SERVICE_UNAVAILABLE
            }
            ServerError::Embedding(EmbeddingError::InvalidConfig(_)) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
            ServerError::Embedding(_) => StatusCode::BAD_GATEWAY,
            ServerError::Roster(_) | ServerError::Internal(_) | ServerError::Config(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    /// Get error code string
    pub fn error_code(&self) -> &'static str {
        match self {
            ServerError::Authentication(_) => "AUTH_FAILED",
            ServerError::RateLimitExceeded => "RATE_LIMIT_EXCEEDED",
            ServerError::BadRequest(_) => "BAD_REQUEST",
            ServerError::Roster(_) => "ROSTER_ERROR",
            ServerError::Embedding(EmbeddingError::RateLimited(_)) => "EMBEDDING_RATE_LIMITED",
            ServerError::Embedding(_) => "EMBEDDING_ERROR",
            ServerError::Allocation(AllocationError::DimensionMismatch { .. }) => {
                "DIMENSION_MISMATCH"
            }
            ServerError::Allocation(AllocationError::InvalidCapacity { .. }) => "INVALID_CAPACITY",
            ServerError::Allocation(AllocationError::NonFiniteEmbedding { .. }) => {
                "NON_FINITE_EMBEDDING"
            }
            ServerError::Allocation(_) => "ALLOCATION_ERROR",
            ServerError::Internal(_) => "INTERNAL_ERROR",
            ServerError::Config(_) => "CONFIG_ERROR",
            ServerError::NotFound => "NOT_FOUND",
        }
    }
}

impl IntoResponse for ServerError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let body = ErrorResponse {
            error: ErrorDetail {
                code: self.error_code().to_string(),
                message: self.to_string(),
            },
        };

        if status.is_server_error() {
            tracing::error!(code = %body.error.code, error = %body.error.message, "request failed");
        }

        (status, Json(body)).into_response()
    }
}

impl From<PipelineError> for ServerError {
    fn from(err: PipelineError) -> Self {
        match err {
            PipelineError::Roster(e) => ServerError::Roster(e),
            PipelineError::Embedding(e) => ServerError::Embedding(e),
            PipelineError::Allocation(e) => ServerError::Allocation(e),
            other => ServerError::Internal(other.to_string()),
        }
    }
}

impl From<serde_json::Error> for ServerError {
    fn from(err: serde_json::Error) -> Self {
        ServerError::BadRequest(format!("JSON parse error: {err}"))
    }
}
