//! Timestamp and duration utilities

use chrono::{DateTime, Utc};
use std::time::Duration;

/// Get current UTC timestamp
pub fn now() -> DateTime<Utc> {
    Utc::now()
}

/// Convert milliseconds to duration
pub fn millis_to_duration(millis: u64) -> Duration {
    Duration::from_millis(millis)
}

/// Clamp a duration into `[min, max]`
///
/// Used for cool-down waits, where both an upstream hint and a locally
/// computed remainder must stay inside fixed bounds.
pub fn clamp_duration(value: Duration, min: Duration, max: Duration) -> Duration {
    value.max(min).min(max)
}

/// Parse a `Retry-After` style value given in (possibly fractional) seconds
///
/// Returns `None` for empty, negative, non-finite or non-numeric input.
pub fn parse_seconds_hint(raw: &str) -> Option<Duration> {
    let secs: f64 = raw.trim().parse().ok()?;
    if !secs.is_finite() || secs < 0.0 {
        return None;
    }
    Some(Duration::from_millis((secs * 1000.0).round() as u64))
}
