//! sphere-sync library interface
//!
//! Fetches a user's library from the upstream music API, embeds it on a
//! unit sphere and serves the result over HTTP.

pub mod api;
pub mod client;
pub mod config;
pub mod embedding;
pub mod error;
pub mod models;
pub mod services;
pub mod store;

pub use crate::error::{ApiError, ApiResult, SyncError};

use std::collections::HashMap;
use std::sync::Arc;

use axum::Router;
use chrono::{DateTime, Utc};
use sphere_common::events::EventBus;
use tokio::sync::RwLock;
use tokio_util::sync::CancellationToken;
use tower_http::trace::TraceLayer;

use crate::client::RateLimitState;
use crate::config::SyncSettings;
use crate::services::{SyncOrchestrator, SyncProgressTracker};
use crate::store::PayloadStore;

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub settings: Arc<SyncSettings>,
    /// Shared by every upstream call of every sync
    pub rate_limit: Arc<RateLimitState>,
    pub orchestrator: Arc<SyncOrchestrator>,
    pub store: Arc<dyn PayloadStore>,
    pub tracker: SyncProgressTracker,
    /// Event bus for SSE broadcasting
    pub event_bus: EventBus,
    /// Cancellation tokens of in-flight syncs, by session
    pub active_syncs: Arc<RwLock<HashMap<String, CancellationToken>>>,
    /// Service startup timestamp for uptime tracking
    pub startup_time: DateTime<Utc>,
    /// Last sync error for diagnostics
    pub last_error: Arc<RwLock<Option<String>>>,
}

impl AppState {
    pub fn new(
        settings: SyncSettings,
        store: Arc<dyn PayloadStore>,
        event_bus: EventBus,
    ) -> Result<Self, SyncError> {
        let settings = Arc::new(settings);
        let rate_limit = Arc::new(RateLimitState::new(settings.fetch.cooldown));
        let tracker = SyncProgressTracker::new(event_bus.clone());
        let orchestrator = SyncOrchestrator::new(
            settings.clone(),
            rate_limit.clone(),
            store.clone(),
            tracker.clone(),
        )?;

        Ok(Self {
            settings,
            rate_limit,
            orchestrator: Arc::new(orchestrator),
            store,
            tracker,
            event_bus,
            active_syncs: Arc::new(RwLock::new(HashMap::new())),
            startup_time: sphere_common::time::now(),
            last_error: Arc::new(RwLock::new(None)),
        })
    }
}

/// Build application router
pub fn build_router(state: AppState) -> Router {
    use axum::routing::get;

    Router::new()
        .merge(api::sync_routes())
        .route("/api/sync/events", get(api::sync_event_stream))
        .merge(api::health_routes())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
