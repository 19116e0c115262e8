//! Error types for sphere-sync
//!
//! `SyncError` is the pipeline taxonomy; `ApiError` maps it (and request
//! validation failures) onto HTTP responses.

use std::time::Duration;

use axum::{
    http::{header, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

use crate::client::FetchError;

/// Failure of a sync or one of its stages
#[derive(Debug, Error)]
pub enum SyncError {
    /// Missing or rejected credentials; never retried
    #[error("Not authenticated: {0}")]
    Auth(String),

    /// Upstream rate limit still active; do not retry before it elapses
    #[error("Rate limited, retry after {retry_after_secs}s")]
    RateLimited { retry_after_secs: u64 },

    /// Upstream forbids the scope; sources absorb this as an empty result
    #[error("Permission denied for {scope}")]
    Permission { scope: String },

    /// A phase envelope elapsed
    #[error("{phase} exceeded its time budget")]
    Timeout { phase: &'static str },

    /// Network failure after the internal retry
    #[error("Network error: {0}")]
    Transport(String),

    /// Any other non-success upstream status
    #[error("Upstream error {status}: {message}")]
    Upstream { status: u16, message: String },

    /// Upstream body did not match the expected record
    #[error("Parse error: {0}")]
    Parse(String),

    /// Caller aborted the sync
    #[error("Sync cancelled")]
    Cancelled,

    /// Payload store failure
    #[error("Storage error: {0}")]
    Storage(#[from] sphere_common::Error),

    #[error("Internal error: {0}")]
    Internal(String),
}

fn ceil_secs(d: Duration) -> u64 {
    let secs = d.as_secs();
    if d.subsec_nanos() > 0 {
        secs + 1
    } else {
        secs
    }
}

impl SyncError {
    /// Classify a fetch failure for the given upstream scope
    pub fn from_fetch(err: FetchError, scope: &str) -> Self {
        match err {
            FetchError::Http { status: 401, .. } => {
                SyncError::Auth(format!("upstream rejected token for {}", scope))
            }
            FetchError::Http { status: 403, .. } => SyncError::Permission {
                scope: scope.to_string(),
            },
            FetchError::Http { status, body } => SyncError::Upstream {
                status,
                message: body,
            },
            FetchError::RateLimited { retry_after } => SyncError::RateLimited {
                retry_after_secs: ceil_secs(retry_after).max(1),
            },
            FetchError::Timeout(d) => {
                SyncError::Transport(format!("{} request timed out after {:?}", scope, d))
            }
            FetchError::Network(msg) => SyncError::Transport(msg),
            FetchError::Parse(msg) => SyncError::Parse(msg),
        }
    }

    /// Seconds the caller should wait before retrying, if known
    pub fn retry_after_secs(&self) -> Option<u64> {
        match self {
            SyncError::RateLimited { retry_after_secs } => Some(*retry_after_secs),
            _ => None,
        }
    }

    /// Message suitable for end users
    pub fn user_message(&self) -> String {
        match self {
            SyncError::Auth(_) => "Not authenticated. Please log in again.".to_string(),
            SyncError::RateLimited { retry_after_secs } => format!(
                "The music service is rate limiting requests. Try again in {} seconds.",
                retry_after_secs
            ),
            SyncError::Permission { scope } => {
                format!("Access to {} was not granted.", scope)
            }
            SyncError::Timeout { .. } => "Sync took too long. Please retry.".to_string(),
            SyncError::Transport(_) | SyncError::Upstream { .. } => {
                "Could not reach the music service. Please retry.".to_string()
            }
            SyncError::Cancelled => "Sync was cancelled.".to_string(),
            SyncError::Parse(_) | SyncError::Storage(_) | SyncError::Internal(_) => {
                "Sync failed unexpectedly. Please retry.".to_string()
            }
        }
    }
}

impl From<FetchError> for SyncError {
    fn from(err: FetchError) -> Self {
        SyncError::from_fetch(err, "music API")
    }
}

/// API error type
#[derive(Debug, Error)]
pub enum ApiError {
    /// Invalid request (400)
    #[error("Invalid request: {0}")]
    BadRequest(String),

    /// Resource not found (404)
    #[error("Resource not found: {0}")]
    NotFound(String),

    /// Conflict (409), e.g. sync already running for the session
    #[error("Conflict: {0}")]
    Conflict(String),

    /// Sync pipeline failure
    #[error(transparent)]
    Sync(#[from] SyncError),

    /// sphere-common error
    #[error("Common error: {0}")]
    Common(#[from] sphere_common::Error),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let retry_after = match &self {
            ApiError::Sync(e) => e.retry_after_secs(),
            _ => None,
        };

        let (status, error_code, message) = match &self {
            ApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, "BAD_REQUEST", msg.clone()),
            ApiError::NotFound(msg) => (StatusCode::NOT_FOUND, "NOT_FOUND", msg.clone()),
            ApiError::Conflict(msg) => (StatusCode::CONFLICT, "CONFLICT", msg.clone()),
            ApiError::Common(err) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "COMMON_ERROR",
                err.to_string(),
            ),
            ApiError::Sync(err) => {
                let (status, code) = match err {
                    SyncError::Auth(_) => (StatusCode::UNAUTHORIZED, "NOT_AUTHENTICATED"),
                    SyncError::RateLimited { .. } => {
                        (StatusCode::TOO_MANY_REQUESTS, "RATE_LIMITED")
                    }
                    SyncError::Permission { .. } => (StatusCode::FORBIDDEN, "PERMISSION_DENIED"),
                    SyncError::Timeout { .. } => (StatusCode::GATEWAY_TIMEOUT, "TIMEOUT"),
                    SyncError::Cancelled => (StatusCode::CONFLICT, "CANCELLED"),
                    SyncError::Transport(_) | SyncError::Upstream { .. } => {
                        (StatusCode::BAD_GATEWAY, "UPSTREAM_ERROR")
                    }
                    SyncError::Parse(_) | SyncError::Storage(_) | SyncError::Internal(_) => {
                        (StatusCode::INTERNAL_SERVER_ERROR, "INTERNAL_ERROR")
                    }
                };
                (status, code, err.user_message())
            }
        };

        let mut error = json!({
            "code": error_code,
            "message": message,
        });
        if let Some(secs) = retry_after {
            error["retry_after_seconds"] = json!(secs);
        }

        let mut response = (status, Json(json!({ "error": error }))).into_response();
        if let Some(secs) = retry_after {
            if let Ok(value) = HeaderValue::from_str(&secs.to_string()) {
                response.headers_mut().insert(header::RETRY_AFTER, value);
            }
        }
        response
    }
}

/// Result type for API handlers
pub type ApiResult<T> = Result<T, ApiError>;
