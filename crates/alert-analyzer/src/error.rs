//! Error types for the alert analyzer

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

/// Result type alias for analyzer operations
pub type Result<T> = std::result::Result<T, Error>;

/// Alert analyzer errors
#[derive(Debug, Error)]
pub enum Error {
    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Submitted payload failed validation
    #[error("Invalid request payload: {0}")]
    Validation(String),

    /// Queue mirror could not be read or written
    #[error("Queue persistence error: {0}")]
    Persistence(String),

    /// The work queue no longer hands out items
    #[error("Work queue is closed")]
    QueueClosed,

    /// Ollama/LLM error
    #[error("LLM error: {0}")]
    Llm(String),

    /// Prompt template could not be loaded
    #[error("Prompt template error: {0}")]
    Prompt(String),

    /// Analysis artifact could not be written
    #[error("Artifact error: {0}")]
    Artifact(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Internal error
    #[error("Internal error: {0}")]
    Internal(String),
}

impl Error {
    /// Create a validation error
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    /// Create an LLM error
    pub fn llm(message: impl Into<String>) -> Self {
        Self::Llm(message.into())
    }

    /// Create an artifact error
    pub fn artifact(message: impl Into<String>) -> Self {
        Self::Artifact(message.into())
    }

    /// Create an internal error
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal(message.into())
    }
}

impl IntoResponse for Error {
    fn into_response(self) -> Response {
        let (status, error_type, message) = match &self {
            Error::Config(msg) => (StatusCode::INTERNAL_SERVER_ERROR, "config_error", msg.clone()),
            Error::Validation(msg) => (
                StatusCode::BAD_REQUEST,
                "validation_error",
                format!("Invalid request payload: {}", msg),
            ),
            Error::Persistence(msg) => {
                (StatusCode::INTERNAL_SERVER_ERROR, "persistence_error", msg.clone())
            }
            Error::QueueClosed => (
                StatusCode::SERVICE_UNAVAILABLE,
                "queue_closed",
                "Work queue is closed".to_string(),
            ),
            Error::Llm(msg) => (StatusCode::SERVICE_UNAVAILABLE, "llm_error", msg.clone()),
            Error::Prompt(msg) => (StatusCode::INTERNAL_SERVER_ERROR, "prompt_error", msg.clone()),
            Error::Artifact(msg) => {
                (StatusCode::INTERNAL_SERVER_ERROR, "artifact_error", msg.clone())
            }
            Error::Io(err) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "io_error",
                err.to_string(),
            ),
            Error::Json(err) => (StatusCode::BAD_REQUEST, "json_error", err.to_string()),
            Error::Internal(msg) => {
                (StatusCode::INTERNAL_SERVER_ERROR, "internal_error", msg.clone())
            }
        };

        let body = Json(json!({
            "error": {
                "type": error_type,
                "message": message,
            }
        }));

        (status, body).into_response()
    }
}
