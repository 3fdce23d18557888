//! Error handling for the Weatherboy backend
//!
//! One error type covers the ingestion taxonomy (transport, decode, field
//! parse, persistence, missing configuration) and the read API responses.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use shared::FieldError;
use thiserror::Error;

/// Application error types
#[derive(Error, Debug)]
pub enum AppError {
    // Ingestion errors
    #[error("Transport error: {0}")]
    Transport(String),

    #[error("Upstream {endpoint} returned status {status}")]
    UpstreamStatus { endpoint: String, status: u16 },

    #[error("Decode error: {0}")]
    Decode(String),

    #[error("Field parse error: {0}")]
    FieldParse(#[from] FieldError),

    #[error("Missing configuration: {0}")]
    MissingConfig(String),

    // Bulletin collaborators
    #[error("Text extraction failed: {0}")]
    Extraction(String),

    #[error("Summarization failed: {0}")]
    Summarization(String),

    // Storage errors
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Persistence error: {0}")]
    Persistence(String),

    #[error("File I/O error: {0}")]
    Io(#[from] std::io::Error),

    // API errors
    #[error("Resource not found: {0}")]
    NotFound(String),

    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Internal server error: {0}")]
    Internal(String),
}

impl AppError {
    /// True for failures of the persistence gateway
    pub fn is_persistence(&self) -> bool {
        matches!(self, AppError::Database(_) | AppError::Persistence(_))
    }

    /// True for failures that happened before any upstream call was made
    pub fn is_missing_config(&self) -> bool {
        matches!(self, AppError::MissingConfig(_))
    }
}

impl From<reqwest::Error> for AppError {
    fn from(e: reqwest::Error) -> Self {
        AppError::Transport(e.to_string())
    }
}

/// Error response structure
#[derive(Serialize)]
pub struct ErrorResponse {
    pub error: ErrorDetail,
}

#[derive(Serialize)]
pub struct ErrorDetail {
    pub code: String,
    pub message: String,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, code, message) = match &self {
            AppError::NotFound(resource) => (
                StatusCode::NOT_FOUND,
                "NOT_FOUND",
                format!("{} not found", resource),
            ),
            AppError::Transport(_) | AppError::UpstreamStatus { .. } => (
                StatusCode::BAD_GATEWAY,
                "UPSTREAM_ERROR",
                self.to_string(),
            ),
            AppError::Decode(_) | AppError::FieldParse(_) => (
                StatusCode::BAD_GATEWAY,
                "UPSTREAM_PAYLOAD_ERROR",
                self.to_string(),
            ),
            AppError::Extraction(_) | AppError::Summarization(_) => (
                StatusCode::BAD_GATEWAY,
                "EXTERNAL_SERVICE_ERROR",
                self.to_string(),
            ),
            AppError::Database(_) | AppError::Persistence(_) | AppError::Io(_) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "STORAGE_ERROR",
                "A storage error occurred".to_string(),
            ),
            AppError::MissingConfig(_) | AppError::Configuration(_) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "CONFIGURATION_ERROR",
                self.to_string(),
            ),
            AppError::Internal(_) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "INTERNAL_ERROR",
                "An internal server error occurred".to_string(),
            ),
        };

        if status.is_server_error() {
            tracing::error!("Error: {:?}", self);
        }

        let body = ErrorResponse {
            error: ErrorDetail {
                code: code.to_string(),
                message,
            },
        };
        (status, Json(body)).into_response()
    }
}

/// Result type alias for services, adapters and handlers
pub type AppResult<T> = Result<T, AppError>;
