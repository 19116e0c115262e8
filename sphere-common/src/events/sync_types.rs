//! Sync progress record types
//!
//! Supporting types for the out-of-band progress stream a sync publishes.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Overall status of a session's most recent sync
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SyncStatus {
    /// No sync has run for the session
    Idle,
    /// A sync is in flight
    Running,
    /// Last sync finished and stored a payload
    Done,
    /// Last sync failed
    Error,
}

/// Pipeline phase a progress record refers to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SyncPhase {
    Idle,
    AuthVerify,
    TrackFetch,
    FeatureFetch,
    Embedding,
    Done,
    Error,
}

impl SyncPhase {
    pub fn as_str(&self) -> &'static str {
        match self {
            SyncPhase::Idle => "idle",
            SyncPhase::AuthVerify => "auth_verify",
            SyncPhase::TrackFetch => "track_fetch",
            SyncPhase::FeatureFetch => "feature_fetch",
            SyncPhase::Embedding => "embedding",
            SyncPhase::Done => "done",
            SyncPhase::Error => "error",
        }
    }
}

/// One progress record
///
/// `percent` is always within 0-100. `track_count` is present once the
/// library has been fetched; `error` and `retry_after_seconds` only on
/// failure records.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SyncProgress {
    pub status: SyncStatus,
    pub percent: u8,
    pub phase: SyncPhase,
    pub message: String,
    pub updated_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub track_count: Option<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub retry_after_seconds: Option<u64>,
}

impl SyncProgress {
    /// Record for a session that has never synced
    pub fn idle() -> Self {
        Self {
            status: SyncStatus::Idle,
            percent: 0,
            phase: SyncPhase::Idle,
            message: "Waiting for sync".to_string(),
            updated_at: Utc::now(),
            track_count: None,
            error: None,
            retry_after_seconds: None,
        }
    }

    /// Record for an in-flight phase
    pub fn running(phase: SyncPhase, percent: u8, message: impl Into<String>) -> Self {
        Self {
            status: SyncStatus::Running,
            percent: percent.min(100),
            phase,
            message: message.into(),
            updated_at: Utc::now(),
            track_count: None,
            error: None,
            retry_after_seconds: None,
        }
    }

    /// Terminal success record
    pub fn done(track_count: usize) -> Self {
        Self {
            status: SyncStatus::Done,
            percent: 100,
            phase: SyncPhase::Done,
            message: format!("Sphere ready with {} tracks", track_count),
            updated_at: Utc::now(),
            track_count: Some(track_count),
            error: None,
            retry_after_seconds: None,
        }
    }

    /// Terminal failure record
    pub fn failed(
        message: impl Into<String>,
        error: impl Into<String>,
        retry_after_seconds: Option<u64>,
    ) -> Self {
        Self {
            status: SyncStatus::Error,
            percent: 100,
            phase: SyncPhase::Error,
            message: message.into(),
            updated_at: Utc::now(),
            track_count: None,
            error: Some(error.into()),
            retry_after_seconds,
        }
    }

    pub fn with_track_count(mut self, track_count: usize) -> Self {
        self.track_count = Some(track_count);
        self
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self.status, SyncStatus::Done | SyncStatus::Error)
    }
}
