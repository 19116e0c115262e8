//! Shared rate-limit cool-down
//!
//! One account-wide limit governs every outbound call, so all concurrent
//! fetches share a single "unavailable until" instant. Any 429 extends it,
//! any success clears it.
//!
//! Time comes from `tokio::time`, so tests drive the clock with
//! `tokio::time::pause` / `advance`.

use std::time::Duration;

use sphere_common::time::clamp_duration;
use tokio::sync::Mutex;
use tokio::time::Instant;

/// Bounds applied to every cool-down wait
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CooldownBounds {
    pub min: Duration,
    pub max: Duration,
    /// Used when a 429 carries no usable retry-after hint
    pub default: Duration,
}

impl Default for CooldownBounds {
    fn default() -> Self {
        Self {
            min: Duration::from_secs(1),
            max: Duration::from_secs(180),
            default: Duration::from_secs(20),
        }
    }
}

/// Process-wide rate-limit state, shared by reference between clients
#[derive(Debug)]
pub struct RateLimitState {
    unavailable_until: Mutex<Option<Instant>>,
    bounds: CooldownBounds,
}

impl RateLimitState {
    pub fn new(bounds: CooldownBounds) -> Self {
        Self {
            unavailable_until: Mutex::new(None),
            bounds,
        }
    }

    pub fn bounds(&self) -> CooldownBounds {
        self.bounds
    }

    /// Remaining cool-down, `None` when calls may proceed
    pub async fn remaining(&self) -> Option<Duration> {
        let until = *self.unavailable_until.lock().await;
        until.and_then(|t| {
            let now = Instant::now();
            (t > now).then(|| t - now)
        })
    }

    /// Record a 429 response
    ///
    /// The hint is clamped to the bounds (default when absent). The shared
    /// cool-down only ever grows here: a shorter hint never shrinks a
    /// longer pending wait. Returns the cool-down now in effect.
    pub async fn note_rate_limited(&self, hint: Option<Duration>) -> Duration {
        let wait = clamp_duration(
            hint.unwrap_or(self.bounds.default),
            self.bounds.min,
            self.bounds.max,
        );

        let mut until = self.unavailable_until.lock().await;
        let now = Instant::now();
        let candidate = now + wait;
        let effective = match *until {
            Some(existing) if existing > candidate => existing,
            _ => candidate,
        };
        *until = Some(effective);

        tracing::warn!(
            hint_ms = hint.map(|h| h.as_millis() as u64),
            cooldown_ms = (effective - now).as_millis() as u64,
            "Upstream rate limit hit, shared cool-down extended"
        );

        effective - now
    }

    /// Release the cool-down after a successful response
    pub async fn clear(&self) {
        let mut until = self.unavailable_until.lock().await;
        if until.take().is_some() {
            tracing::debug!("Rate-limit cool-down cleared");
        }
    }

    /// Sleep out any active cool-down before issuing a request
    ///
    /// Each sleep is clamped to the bounds. Re-checks after waking in case
    /// another call extended the cool-down meanwhile. Returns total time slept.
    pub async fn wait_for_cooldown(&self) -> Duration {
        let mut slept = Duration::ZERO;
        while let Some(remaining) = self.remaining().await {
            let wait = clamp_duration(remaining, self.bounds.min, self.bounds.max);
            tracing::debug!(wait_ms = wait.as_millis() as u64, "Waiting out rate-limit cool-down");
            tokio::time::sleep(wait).await;
            slept += wait;
        }
        slept
    }
}

impl Default for RateLimitState {
    fn default() -> Self {
        Self::new(CooldownBounds::default())
    }
}
