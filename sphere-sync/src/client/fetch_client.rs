//! Rate-limited fetch client
//!
//! Every upstream call goes through [`FetchClient::fetch`]:
//! 1. Wait out the shared cool-down, if any
//! 2. Issue the request with a fixed timeout
//! 3. On 429 extend the shared cool-down from the retry-after hint
//! 4. Retry once on 429, 5xx or transport failure; other 4xx fail at once
//! 5. On 2xx clear the shared cool-down

use std::sync::Arc;
use std::time::Duration;

use rand::Rng;
use reqwest::header::{HeaderMap, RETRY_AFTER};
use reqwest::StatusCode;
use serde::de::DeserializeOwned;
use sphere_common::time::parse_seconds_hint;
use thiserror::Error;

use super::rate_limit::{CooldownBounds, RateLimitState};

const USER_AGENT: &str = concat!("sphere-sync/", env!("CARGO_PKG_VERSION"));

/// Outcome of a failed fetch
#[derive(Debug, Error)]
pub enum FetchError {
    /// Transport failure (connection refused, reset, DNS, ...)
    #[error("Network error: {0}")]
    Network(String),

    /// Request exceeded the per-call timeout
    #[error("Request timed out after {0:?}")]
    Timeout(Duration),

    /// Non-success status that is not a rate limit
    #[error("HTTP {status}: {body}")]
    Http { status: u16, body: String },

    /// Still rate limited after retries; caller should wait `retry_after`
    #[error("Rate limited, retry after {retry_after:?}")]
    RateLimited { retry_after: Duration },

    /// Response body did not match the expected shape
    #[error("Parse error: {0}")]
    Parse(String),
}

impl FetchError {
    pub fn status(&self) -> Option<u16> {
        match self {
            FetchError::Http { status, .. } => Some(*status),
            FetchError::RateLimited { .. } => Some(429),
            _ => None,
        }
    }

    /// Upstream refused the scope (403)
    pub fn is_permission_denied(&self) -> bool {
        self.status() == Some(403)
    }
}

/// Timeout, retry and backoff parameters
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FetchPolicy {
    /// Per-call timeout
    pub timeout: Duration,
    /// Automatic retries after the first attempt
    pub max_retries: u32,
    /// Exponential backoff base (`base * 2^attempt`)
    pub backoff_base: Duration,
    /// Upper bound of uniform random jitter added to the backoff
    pub backoff_jitter: Duration,
    /// Backoff cap
    pub backoff_cap: Duration,
    pub cooldown: CooldownBounds,
}

impl Default for FetchPolicy {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(25),
            max_retries: 1,
            backoff_base: Duration::from_millis(500),
            backoff_jitter: Duration::from_millis(250),
            backoff_cap: Duration::from_millis(3500),
            cooldown: CooldownBounds::default(),
        }
    }
}

/// Backoff before retry number `attempt + 1` (non-429 failures)
pub fn backoff_delay(policy: &FetchPolicy, attempt: u32, jitter: Duration) -> Duration {
    let exp = policy
        .backoff_base
        .saturating_mul(2u32.saturating_pow(attempt));
    (exp + jitter.min(policy.backoff_jitter)).min(policy.backoff_cap)
}

/// Read the retry-after hint of a 429 response
fn retry_after_hint(headers: &HeaderMap) -> Option<Duration> {
    headers
        .get(RETRY_AFTER)
        .and_then(|v| v.to_str().ok())
        .and_then(parse_seconds_hint)
}

/// HTTP client sharing one [`RateLimitState`] with every other client
/// built from the same state
#[derive(Clone)]
pub struct FetchClient {
    http_client: reqwest::Client,
    rate_limit: Arc<RateLimitState>,
    policy: FetchPolicy,
}

impl FetchClient {
    pub fn new(policy: FetchPolicy, rate_limit: Arc<RateLimitState>) -> Result<Self, FetchError> {
        let http_client = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .timeout(policy.timeout)
            .build()
            .map_err(|e| FetchError::Network(e.to_string()))?;

        Ok(Self {
            http_client,
            rate_limit,
            policy,
        })
    }

    pub fn rate_limit(&self) -> &Arc<RateLimitState> {
        &self.rate_limit
    }

    pub fn policy(&self) -> &FetchPolicy {
        &self.policy
    }

    /// GET `url` with a bearer token, applying cool-down, timeout and retry
    pub async fn fetch(&self, url: &str, bearer: &str) -> Result<reqwest::Response, FetchError> {
        let mut attempt: u32 = 0;

        loop {
            self.rate_limit.wait_for_cooldown().await;

            tracing::debug!(url = %url, attempt, "Upstream request");

            let result = self
                .http_client
                .get(url)
                .bearer_auth(bearer)
                .send()
                .await;

            let can_retry = attempt < self.policy.max_retries;

            match result {
                Ok(response) if response.status().is_success() => {
                    self.rate_limit.clear().await;
                    return Ok(response);
                }
                Ok(response) if response.status() == StatusCode::TOO_MANY_REQUESTS => {
                    let hint = retry_after_hint(response.headers());
                    let cooldown = self.rate_limit.note_rate_limited(hint).await;
                    if !can_retry {
                        return Err(FetchError::RateLimited {
                            retry_after: cooldown,
                        });
                    }
                    // The cool-down wait at the top of the loop is the backoff
                    tracing::warn!(url = %url, attempt, "429 from upstream, retrying after cool-down");
                }
                Ok(response) if response.status().is_server_error() => {
                    let status = response.status().as_u16();
                    if !can_retry {
                        let body = response.text().await.unwrap_or_default();
                        return Err(FetchError::Http { status, body });
                    }
                    self.sleep_backoff(url, attempt, &format!("HTTP {}", status)).await;
                }
                Ok(response) => {
                    let status = response.status().as_u16();
                    let body = response.text().await.unwrap_or_default();
                    tracing::debug!(url = %url, status, "Non-retryable upstream status");
                    return Err(FetchError::Http { status, body });
                }
                Err(e) if e.is_timeout() => {
                    tracing::warn!(url = %url, timeout_ms = self.policy.timeout.as_millis() as u64, "Upstream request timed out");
                    return Err(FetchError::Timeout(self.policy.timeout));
                }
                Err(e) => {
                    if !can_retry {
                        return Err(FetchError::Network(e.to_string()));
                    }
                    self.sleep_backoff(url, attempt, &e.to_string()).await;
                }
            }

            attempt += 1;
        }
    }

    /// GET and decode a JSON body into an explicit record type
    pub async fn get_json<T: DeserializeOwned>(&self, url: &str, bearer: &str) -> Result<T, FetchError> {
        let response = self.fetch(url, bearer).await?;
        let bytes = response.bytes().await.map_err(|e| {
            if e.is_timeout() {
                FetchError::Timeout(self.policy.timeout)
            } else {
                FetchError::Network(e.to_string())
            }
        })?;
        serde_json::from_slice(&bytes).map_err(|e| FetchError::Parse(format!("{}: {}", url, e)))
    }

    async fn sleep_backoff(&self, url: &str, attempt: u32, reason: &str) {
        let jitter_ms = self.policy.backoff_jitter.as_millis() as u64;
        let jitter = Duration::from_millis(rand::thread_rng().gen_range(0..=jitter_ms));
        let delay = backoff_delay(&self.policy, attempt, jitter);
        tracing::warn!(
            url = %url,
            attempt,
            backoff_ms = delay.as_millis() as u64,
            reason,
            "Retryable upstream failure, backing off"
        );
        tokio::time::sleep(delay).await;
    }
}
