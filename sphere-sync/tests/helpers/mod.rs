//! Shared test helpers

#![allow(dead_code)]

pub mod mock_api;

use std::sync::Arc;

use sphere_sync::client::{FetchClient, FetchPolicy, RateLimitState};
use sphere_sync::config::SyncSettings;

/// Settings pointed at a mock upstream
pub fn test_settings(base_url: &str) -> SyncSettings {
    SyncSettings {
        api_base_url: base_url.to_string(),
        ..SyncSettings::default()
    }
}

/// Fetch client with a fresh rate-limit state
pub fn test_client(policy: FetchPolicy) -> (FetchClient, Arc<RateLimitState>) {
    let rate_limit = Arc::new(RateLimitState::new(policy.cooldown));
    let client = FetchClient::new(policy, rate_limit.clone()).unwrap();
    (client, rate_limit)
}
