//! Error type system for BookShelf
//!
//! This module provides the service-wide error type with:
//! - HTTP status code mapping
//! - Stable error-type names for API responses
//! - Error context and chaining support
//! - JSON error bodies carrying a trace ID

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Main error type for the BookShelf backend
#[derive(Debug, thiserror::Error)]
pub enum BookshelfError {
    // System-level errors
    #[error("System initialization failed: {0}")]
    InitializationError(String),

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Database error: {0}")]
    DatabaseError(#[from] rusqlite::Error),

    #[error("Connection pool error: {0}")]
    PoolError(#[from] r2d2::Error),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    // Outbound provider errors. These never cross an adapter boundary on the
    // search path; they exist for the detail-fetch internals and logging.
    #[error("Upstream request failed: {0}")]
    HttpError(#[from] reqwest::Error),

    #[error("Upstream response error: {0}")]
    UpstreamError(String),

    // API-level errors
    #[error("Unknown metadata provider: {0}")]
    ProviderNotFound(String),

    #[error("Resource not found: {0}")]
    NotFound(String),

    #[error("Import session not found or expired")]
    SessionNotFound,

    #[error("{0}")]
    ValidationError(String),

    #[error("Upload error: {0}")]
    MultipartError(#[from] axum::extract::multipart::MultipartError),

    #[error("Task error: {0}")]
    TaskError(String),
}

impl BookshelfError {
    /// Get the HTTP status code for this error
    pub fn status_code(&self) -> StatusCode {
        match self {
            // 400 Bad Request
            BookshelfError::ValidationError(_) | BookshelfError::MultipartError(_) => {
                StatusCode::BAD_REQUEST
            }

            // 404 Not Found
            BookshelfError::NotFound(_)
            | BookshelfError::ProviderNotFound(_)
            | BookshelfError::SessionNotFound => StatusCode::NOT_FOUND,

            // 502 Bad Gateway
            BookshelfError::HttpError(_) | BookshelfError::UpstreamError(_) => {
                StatusCode::BAD_GATEWAY
            }

            // 500 Internal Server Error
            BookshelfError::InitializationError(_)
            | BookshelfError::ConfigError(_)
            | BookshelfError::DatabaseError(_)
            | BookshelfError::PoolError(_)
            | BookshelfError::IoError(_)
            | BookshelfError::TaskError(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Get the error type name for API responses
    pub fn error_type(&self) -> &'static str {
        match self {
            BookshelfError::InitializationError(_) => "InitializationError",
            BookshelfError::ConfigError(_) => "ConfigError",
            BookshelfError::DatabaseError(_) => "DatabaseError",
            BookshelfError::PoolError(_) => "PoolError",
            BookshelfError::IoError(_) => "IoError",
            BookshelfError::HttpError(_) => "HttpError",
            BookshelfError::UpstreamError(_) => "UpstreamError",
            BookshelfError::ProviderNotFound(_) => "ProviderNotFound",
            BookshelfError::NotFound(_) => "NotFound",
            BookshelfError::SessionNotFound => "SessionNotFound",
            BookshelfError::ValidationError(_) => "ValidationError",
            BookshelfError::MultipartError(_) => "MultipartError",
            BookshelfError::TaskError(_) => "TaskError",
        }
    }
}

/// Error response structure for API endpoints
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    /// Error type identifier
    pub error: String,
    /// Human-readable error message
    pub message: String,
    /// Optional additional details
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
    /// Unique trace ID for this error
    pub trace_id: String,
}

impl ErrorResponse {
    /// Create a new error response with a generated trace ID
    pub fn new(error: String, message: String) -> Self {
        Self {
            error,
            message,
            details: None,
            trace_id: Uuid::new_v4().to_string(),
        }
    }

    /// Create an error response with additional details
    pub fn with_details(error: String, message: String, details: serde_json::Value) -> Self {
        Self {
            error,
            message,
            details: Some(details),
            trace_id: Uuid::new_v4().to_string(),
        }
    }

    /// Create an error response from a BookshelfError
    pub fn from_error(error: &BookshelfError) -> Self {
        Self::new(error.error_type().to_string(), error.to_string())
    }
}

/// Implement IntoResponse for BookshelfError to enable automatic error handling in Axum
impl IntoResponse for BookshelfError {
    fn into_response(self) -> Response {
        let status_code = self.status_code();
        let error_response = ErrorResponse::from_error(&self);

        tracing::error!(
            error_type = self.error_type(),
            trace_id = %error_response.trace_id,
            status_code = %status_code,
            "Request failed: {}",
            self
        );

        (status_code, Json(error_response)).into_response()
    }
}

/// Result type alias for operations that can fail with BookshelfError
pub type Result<T> = std::result::Result<T, BookshelfError>;

/// Context extension trait for adding context to errors
pub trait ErrorContext<T> {
    /// Add context to an error
    fn context(self, context: impl Into<String>) -> Result<T>;

    /// Add context to an error using a closure
    fn with_context<F>(self, f: F) -> Result<T>
    where
        F: FnOnce() -> String;
}

impl<T, E> ErrorContext<T> for std::result::Result<T, E>
where
    E: std::fmt::Display,
{
    fn context(self, context: impl Into<String>) -> Result<T> {
        self.map_err(|e| {
            let context_str = context.into();
            BookshelfError::InitializationError(format!("{}: {}", context_str, e))
        })
    }

    fn with_context<F>(self, f: F) -> Result<T>
    where
        F: FnOnce() -> String,
    {
        self.map_err(|e| {
            let context_str = f();
            BookshelfError::InitializationError(format!("{}: {}", context_str, e))
        })
    }
}
