//! Error types for the Siegel RAG pipeline

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use std::path::PathBuf;
use thiserror::Error;

use crate::retrieval::RetrievalResult;

/// Result type alias for pipeline operations
pub type Result<T> = std::result::Result<T, Error>;

/// Pipeline errors
#[derive(Debug, Error)]
pub enum Error {
    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// IO error (corpus or storage unreadable)
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Corpus root missing or not a directory
    #[error("Corpus directory not found: {}", .0.display())]
    CorpusNotFound(PathBuf),

    /// No persisted index at the configured location
    #[error("No persisted index at {}", .0.display())]
    IndexNotFound(PathBuf),

    /// Persisted index exists but cannot be used
    #[error("Persisted index at {} is corrupt: {message}", path.display())]
    IndexCorrupt { path: PathBuf, message: String },

    /// Index could not be built or loaded for this process
    #[error("Index unavailable: {0}")]
    IndexUnavailable(String),

    /// Build-time and query-time embedding models disagree
    #[error("Embedding model mismatch: index built with {expected}, got {actual}")]
    EmbeddingModelMismatch { expected: String, actual: String },

    /// External service kept failing after all retries
    #[error("{service} unavailable after {attempts} attempt(s): {message}")]
    ServiceUnavailable {
        service: String,
        attempts: u32,
        message: String,
    },

    /// The model returned unusable output
    #[error("Answer generation failed: {0}")]
    GenerationFailed(String),

    /// Rejected before any external call
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// Retryable provider failure (timeout, rate limit, 5xx, connection)
    #[error("Transient provider error: {0}")]
    Transient(String),

    /// Non-retryable provider failure
    #[error("Provider error: {0}")]
    Provider(String),

    /// Embedding response unusable
    #[error("Embedding generation failed: {0}")]
    Embedding(String),

    /// JSON error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// HTTP client error
    #[error("HTTP request error: {0}")]
    Http(#[from] reqwest::Error),

    /// CSV export error
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    /// Config file parse error
    #[error("Config parse error: {0}")]
    Toml(#[from] toml::de::Error),

    /// Internal error
    #[error("Internal error: {0}")]
    Internal(String),
}

impl Error {
    /// Create an index corrupt error
    pub fn index_corrupt(path: impl Into<PathBuf>, message: impl Into<String>) -> Self {
        Self::IndexCorrupt {
            path: path.into(),
            message: message.into(),
        }
    }

    /// Create an embedding error
    pub fn embedding(message: impl Into<String>) -> Self {
        Self::Embedding(message.into())
    }

    /// Create an invalid argument error
    pub fn invalid_argument(message: impl Into<String>) -> Self {
        Self::InvalidArgument(message.into())
    }

    /// Create an internal error
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal(message.into())
    }

    /// Whether a retry of the same call may succeed
    pub fn is_transient(&self) -> bool {
        match self {
            Error::Transient(_) => true,
            Error::Http(err) => err.is_timeout() || err.is_connect() || err.is_request(),
            _ => false,
        }
    }

    /// Short machine-readable tag, used in logs and HTTP bodies
    pub fn kind(&self) -> &'static str {
        match self {
            Error::Config(_) | Error::Toml(_) => "config_error",
            Error::Io(_) => "io_error",
            Error::CorpusNotFound(_) => "corpus_not_found",
            Error::IndexNotFound(_) => "index_not_found",
            Error::IndexCorrupt { .. } => "index_corrupt",
            Error::IndexUnavailable(_) => "index_unavailable",
            Error::EmbeddingModelMismatch { .. } => "embedding_model_mismatch",
            Error::ServiceUnavailable { .. } => "service_unavailable",
            Error::GenerationFailed(_) => "generation_failed",
            Error::InvalidArgument(_) => "invalid_argument",
            Error::Transient(_) | Error::Provider(_) | Error::Http(_) => "provider_error",
            Error::Embedding(_) => "embedding_error",
            Error::Json(_) => "json_error",
            Error::Csv(_) => "csv_error",
            Error::Internal(_) => "internal_error",
        }
    }

    fn status(&self) -> StatusCode {
        match self {
            Error::InvalidArgument(_) | Error::Json(_) => StatusCode::BAD_REQUEST,
            Error::ServiceUnavailable { .. } | Error::IndexUnavailable(_) => {
                StatusCode::SERVICE_UNAVAILABLE
            }
            Error::GenerationFailed(_) | Error::Transient(_) | Error::Provider(_) | Error::Http(_) => {
                StatusCode::BAD_GATEWAY
            }
            Error::IndexNotFound(_) | Error::CorpusNotFound(_) => StatusCode::NOT_FOUND,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

/// Failure of a single `ask` call.
///
/// Carries the retrieval result when retrieval finished before the failure,
/// so callers can still show sources when generation did not succeed.
#[derive(Debug, Error)]
#[error("{error}")]
pub struct QueryError {
    /// What went wrong
    #[source]
    pub error: Error,
    /// Retrieval result produced before the failure, if any
    pub retrieval: Option<RetrievalResult>,
}

impl QueryError {
    /// Attach a retrieval result to an error
    pub fn with_retrieval(error: Error, retrieval: RetrievalResult) -> Self {
        Self {
            error,
            retrieval: Some(retrieval),
        }
    }

    /// Distinct source documents discovered before the failure
    pub fn sources(&self) -> Vec<String> {
        self.retrieval
            .as_ref()
            .map(RetrievalResult::document_ids)
            .unwrap_or_default()
    }
}

impl From<Error> for QueryError {
    fn from(error: Error) -> Self {
        Self {
            error,
            retrieval: None,
        }
    }
}

impl IntoResponse for Error {
    fn into_response(self) -> Response {
        let body = Json(json!({
            "error": {
                "type": self.kind(),
                "message": self.to_string(),
            }
        }));

        (self.status(), body).into_response()
    }
}

impl IntoResponse for QueryError {
    fn into_response(self) -> Response {
        let sources = self.sources();
        let body = Json(json!({
            "error": {
                "type": self.error.kind(),
                "message": self.error.to_string(),
                "sources": sources,
            }
        }));

        (self.error.status(), body).into_response()
    }
}
