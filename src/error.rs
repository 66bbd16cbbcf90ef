//! Error types shared by the backend and the widget engine.
//!
//! Being unauthenticated is deliberately absent from these enums: a missing or
//! unrenewable token is reported as regular data (`authenticated: false`),
//! never as a failure.

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use thiserror::Error;

use crate::types::ApiResponse;

/// Startup configuration problems. Any of these aborts the server.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("{0} must be set")]
    Missing(&'static str),

    #[error("{var} is invalid: {reason}")]
    Invalid { var: &'static str, reason: String },
}

/// Failures talking to Spotify, Riot or Data Dragon.
#[derive(Debug, Error)]
pub enum UpstreamError {
    /// Network or protocol error from the HTTP client
    #[error("HTTP request failed: {0}")]
    Request(#[from] reqwest::Error),

    /// The fixed request timeout elapsed
    #[error("Request timeout")]
    Timeout,

    /// Still rate limited after the retry budget was spent
    #[error("Rate limit exceeded")]
    RateLimited,

    /// Upstream rejected the credentials (401/403)
    #[error("{0}")]
    Unauthorized(String),

    /// Upstream reported the resource missing (404)
    #[error("{0}")]
    NotFound(String),

    /// Any other non-success status
    #[error("HTTP {status}: {message}")]
    Status { status: u16, message: String },

    /// Response body did not match the expected shape
    #[error("Failed to parse response: {0}")]
    Parse(String),
}

impl UpstreamError {
    /// Classifies a transport error, separating timeouts from the rest.
    pub fn from_transport(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            UpstreamError::Timeout
        } else {
            UpstreamError::Request(err)
        }
    }

    /// Maps a non-success upstream status and body to an error.
    pub fn from_status(status: u16, body: String) -> Self {
        match status {
            401 | 403 => UpstreamError::Unauthorized(body),
            404 => UpstreamError::NotFound(body),
            429 => UpstreamError::RateLimited,
            _ => UpstreamError::Status {
                status,
                message: body,
            },
        }
    }

    pub fn status_code(&self) -> StatusCode {
        match self {
            UpstreamError::Timeout => StatusCode::GATEWAY_TIMEOUT,
            UpstreamError::RateLimited => StatusCode::TOO_MANY_REQUESTS,
            UpstreamError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            UpstreamError::NotFound(_) => StatusCode::NOT_FOUND,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

/// Errors surfaced by route handlers, rendered as the uniform envelope.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("{error}: {message}")]
    BadRequest { error: String, message: String },

    #[error("Not Found: {0}")]
    NotFound(String),

    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    #[error("{context}: {source}")]
    Upstream {
        context: &'static str,
        #[source]
        source: UpstreamError,
    },

    #[error("Internal server error: {0}")]
    Internal(String),
}

impl ApiError {
    pub fn upstream(context: &'static str, source: UpstreamError) -> Self {
        ApiError::Upstream { context, source }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, body) = match self {
            ApiError::BadRequest { error, message } => (
                StatusCode::BAD_REQUEST,
                ApiResponse::<()>::failure(error, message),
            ),
            ApiError::NotFound(message) => (
                StatusCode::NOT_FOUND,
                ApiResponse::<()>::failure("Not Found", message),
            ),
            ApiError::Unauthorized(message) => (
                StatusCode::UNAUTHORIZED,
                ApiResponse::<()>::failure("Unauthorized", message),
            ),
            ApiError::Upstream { context, source } => (
                source.status_code(),
                ApiResponse::<()>::failure(context, source.to_string()),
            ),
            ApiError::Internal(message) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                ApiResponse::<()>::failure("Internal server error", message),
            ),
        };

        (status, Json(body)).into_response()
    }
}

pub type ApiResult<T> = Result<T, ApiError>;

/// Errors seen by the widget engine when talking to the folio backend.
#[derive(Debug, Error)]
pub enum WidgetError {
    #[error("HTTP request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("Backend error ({status}): {message}")]
    Backend { status: u16, message: String },

    #[error("Failed to parse response: {0}")]
    Parse(String),
}
