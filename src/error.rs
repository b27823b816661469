//! # Error Handling
//!
//! This module defines the relay's error types and how they're converted to HTTP responses.
//!
//! ## Key Rust Concepts for Error Handling:
//!
//! ### Enums for Error Types
//! - **Variants**: Each enum variant represents a different kind of failure
//! - **Pattern matching**: `match` decides the HTTP status for each variant
//!
//! ### Traits for Error Conversion
//! - **From trait**: Lets `?` turn library errors into `AppError` automatically
//! - **ResponseError trait**: Converts errors to HTTP responses
//! - **Display trait**: Defines how errors are formatted in logs
//!
//! ## Response contract:
//! Every error body is a single JSON object with one `error` string field.
//! Clients only ever see the message, never the category prefix used in logs.

use actix_web::http::StatusCode;
use actix_web::{HttpResponse, ResponseError};
use serde_json::json;
use std::fmt;

/// Message returned when the `audio` field is absent.
pub const NO_AUDIO_MESSAGE: &str = "No audio file provided";

/// Message returned when the `audio` field exceeds the ingestion limit.
pub const FILE_TOO_LARGE_MESSAGE: &str = "File too large";

/// Custom error types for the application.
///
/// ## Error Categories:
/// - **ValidationError**: Client sent no sample or a malformed form (400)
/// - **PayloadTooLarge**: Sample exceeds the upload limit (413)
/// - **UpstreamError**: Provider answered with a failure (500)
/// - **TransportError**: Provider could not be reached (500)
/// - **ConfigError**: Configuration problems (500)
/// - **Internal**: Anything else on the server side (500)
///
/// ## Usage Example:
/// ```rust,ignore
/// return Err(AppError::ValidationError(NO_AUDIO_MESSAGE.to_string()));
/// ```
#[derive(Debug)]
pub enum AppError {
    /// Required input missing or unreadable
    ValidationError(String),

    /// Uploaded sample is bigger than the ingestion limit
    PayloadTooLarge(String),

    /// Provider returned a non-success status or an unusable body
    UpstreamError(String),

    /// Network-level failure talking to the provider
    TransportError(String),

    /// Configuration file or environment variable problems
    ConfigError(String),

    /// Internal server errors
    Internal(String),
}

impl AppError {
    /// The client-facing message, without the category prefix.
    pub fn message(&self) -> &str {
        match self {
            AppError::ValidationError(msg)
            | AppError::PayloadTooLarge(msg)
            | AppError::UpstreamError(msg)
            | AppError::TransportError(msg)
            | AppError::ConfigError(msg)
            | AppError::Internal(msg) => msg,
        }
    }
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AppError::ValidationError(msg) => write!(f, "Validation error: {}", msg),
            AppError::PayloadTooLarge(msg) => write!(f, "Payload too large: {}", msg),
            AppError::UpstreamError(msg) => write!(f, "Upstream error: {}", msg),
            AppError::TransportError(msg) => write!(f, "Transport error: {}", msg),
            AppError::ConfigError(msg) => write!(f, "Configuration error: {}", msg),
            AppError::Internal(msg) => write!(f, "Internal error: {}", msg),
        }
    }
}

/// Converts relay errors into HTTP responses.
///
/// ## HTTP Status Code Mapping:
/// - ValidationError → 400 (Bad Request)
/// - PayloadTooLarge → 413 (Payload Too Large)
/// - everything else → 500 (Internal Server Error)
///
/// ## JSON Response Format:
/// ```json
/// { "error": "Limit exceeded" }
/// ```
impl ResponseError for AppError {
    fn status_code(&self) -> StatusCode {
        match self {
            AppError::ValidationError(_) => StatusCode::BAD_REQUEST,
            AppError::PayloadTooLarge(_) => StatusCode::PAYLOAD_TOO_LARGE,
            AppError::UpstreamError(_)
            | AppError::TransportError(_)
            | AppError::ConfigError(_)
            | AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_response(&self) -> HttpResponse {
        HttpResponse::build(self.status_code()).json(json!({
            "error": self.message()
        }))
    }
}

/// Automatic conversion from anyhow::Error to AppError.
///
/// When you use `?` with an anyhow::Error, it becomes an AppError::Internal.
impl From<anyhow::Error> for AppError {
    fn from(err: anyhow::Error) -> Self {
        AppError::Internal(err.to_string())
    }
}

/// Any reqwest failure that reaches `?` is a transport problem: status codes are
/// inspected explicitly before the body is read, so they never arrive here.
impl From<reqwest::Error> for AppError {
    fn from(err: reqwest::Error) -> Self {
        AppError::TransportError(err.to_string())
    }
}

impl From<config::ConfigError> for AppError {
    fn from(err: config::ConfigError) -> Self {
        AppError::ConfigError(err.to_string())
    }
}

/// Type alias for Results that use our custom error type.
pub type AppResult<T> = Result<T, AppError>;
