//! Runtime settings resolution for sphere-sync
//!
//! Built-in defaults, overridden by the TOML `[sync]` table, with the
//! upstream base URL overridable from the environment:
//! ENV (`SPHERE_API_BASE_URL`) → TOML → default.

use std::time::Duration;

use sphere_common::config::TomlConfig;
use sphere_common::time::millis_to_duration;
use sphere_common::{Error, Result};
use tracing::info;

use crate::client::FetchPolicy;
use crate::embedding::LayoutPolicy;
use crate::models::SyncMode;

/// Environment override for the upstream API base URL
pub const API_BASE_URL_ENV_VAR: &str = "SPHERE_API_BASE_URL";

/// Default upstream API
pub const DEFAULT_API_BASE_URL: &str = "https://api.spotify.com/v1";

/// Time budgets for the two network phases of a sync
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PhaseEnvelopes {
    pub track_fetch: Duration,
    pub feature_fetch: Duration,
}

/// Resolved settings for the sync pipeline
#[derive(Debug, Clone)]
pub struct SyncSettings {
    pub api_base_url: String,
    pub quick_limit: usize,
    pub full_limit: usize,
    pub min_limit: usize,
    pub max_limit: usize,
    pub fetch: FetchPolicy,
    pub quick_envelopes: PhaseEnvelopes,
    pub full_envelopes: PhaseEnvelopes,
    pub layout: LayoutPolicy,
    /// Power iterations per principal component
    pub power_iterations: usize,
    /// Upstream ceiling for the batch features endpoint
    pub feature_batch_size: usize,
}

impl Default for SyncSettings {
    fn default() -> Self {
        Self {
            api_base_url: DEFAULT_API_BASE_URL.to_string(),
            quick_limit: 20,
            full_limit: 180,
            min_limit: 20,
            max_limit: 1000,
            fetch: FetchPolicy::default(),
            quick_envelopes: PhaseEnvelopes {
                track_fetch: Duration::from_secs(28),
                feature_fetch: Duration::from_secs(35),
            },
            full_envelopes: PhaseEnvelopes {
                track_fetch: Duration::from_secs(60),
                feature_fetch: Duration::from_secs(50),
            },
            layout: LayoutPolicy::default(),
            power_iterations: 60,
            feature_batch_size: 100,
        }
    }
}

impl SyncSettings {
    /// Resolve settings from the TOML config and environment
    pub fn from_toml(toml: &TomlConfig) -> Result<Self> {
        let mut settings = Self::default();
        let sync = &toml.sync;

        if let Some(url) = std::env::var(API_BASE_URL_ENV_VAR)
            .ok()
            .filter(|v| !v.trim().is_empty())
        {
            info!("Upstream API base URL loaded from environment variable");
            settings.api_base_url = url;
        } else if let Some(url) = &toml.api_base_url {
            settings.api_base_url = url.clone();
        }
        settings.api_base_url = settings.api_base_url.trim_end_matches('/').to_string();

        if let Some(v) = sync.quick_limit {
            settings.quick_limit = v;
        }
        if let Some(v) = sync.full_limit {
            settings.full_limit = v;
        }
        if let Some(v) = sync.min_limit {
            settings.min_limit = v;
        }
        if let Some(v) = sync.max_limit {
            settings.max_limit = v;
        }
        if let Some(v) = sync.collapsed_ratio {
            settings.layout.collapsed_ratio = v;
        }
        if let Some(v) = sync.min_spread {
            settings.layout.min_spread = v;
        }
        if let Some(ms) = sync.http_timeout_ms {
            settings.fetch.timeout = millis_to_duration(ms);
        }
        if let Some(v) = sync.max_retries {
            settings.fetch.max_retries = v;
        }

        settings.validate()?;
        Ok(settings)
    }

    fn validate(&self) -> Result<()> {
        if self.min_limit == 0 || self.min_limit > self.max_limit {
            return Err(Error::Config(format!(
                "sync limits must satisfy 0 < min_limit <= max_limit (got {}..{})",
                self.min_limit, self.max_limit
            )));
        }
        if !(self.layout.collapsed_ratio > 0.0 && self.layout.collapsed_ratio <= 1.0) {
            return Err(Error::Config(format!(
                "collapsed_ratio must be in (0, 1], got {}",
                self.layout.collapsed_ratio
            )));
        }
        if !(self.layout.min_spread >= 0.0 && self.layout.min_spread.is_finite()) {
            return Err(Error::Config(format!(
                "min_spread must be a non-negative number, got {}",
                self.layout.min_spread
            )));
        }
        if self.fetch.timeout.is_zero() {
            return Err(Error::Config("http_timeout_ms must be positive".to_string()));
        }
        Ok(())
    }

    /// Track limit for a sync: caller override clamped to
    /// `[min_limit, max_limit]`, else the mode default
    pub fn resolve_limit(&self, mode: SyncMode, requested: Option<usize>) -> usize {
        match requested {
            Some(limit) => limit.clamp(self.min_limit, self.max_limit),
            None => match mode {
                SyncMode::Quick => self.quick_limit,
                SyncMode::Full => self.full_limit,
            },
        }
    }

    pub fn envelopes(&self, mode: SyncMode) -> PhaseEnvelopes {
        match mode {
            SyncMode::Quick => self.quick_envelopes,
            SyncMode::Full => self.full_envelopes,
        }
    }
}
