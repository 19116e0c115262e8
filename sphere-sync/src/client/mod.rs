//! Upstream music API access
//!
//! - `rate_limit`: shared cool-down state
//! - `fetch_client`: timeout/retry/backoff around every call
//! - `responses`: typed endpoint records
//! - `TokenProvider`: where the bearer string comes from

pub mod fetch_client;
pub mod rate_limit;
pub mod responses;

pub use fetch_client::{backoff_delay, FetchClient, FetchError, FetchPolicy};
pub use rate_limit::{CooldownBounds, RateLimitState};

use async_trait::async_trait;

use crate::error::SyncError;

/// Source of the bearer token for upstream calls
///
/// Token refresh and storage live outside this crate; a provider only has
/// to hand back a currently valid token string.
#[async_trait]
pub trait TokenProvider: Send + Sync {
    async fn bearer_token(&self) -> Result<String, SyncError>;
}

/// Fixed token, e.g. taken from an incoming request's Authorization header
#[derive(Debug, Clone)]
pub struct StaticToken(String);

impl StaticToken {
    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }
}

#[async_trait]
impl TokenProvider for StaticToken {
    async fn bearer_token(&self) -> Result<String, SyncError> {
        if self.0.trim().is_empty() {
            return Err(SyncError::Auth("empty bearer token".to_string()));
        }
        Ok(self.0.clone())
    }
}
