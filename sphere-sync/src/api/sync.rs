//! Sync API handlers
//!
//! POST /api/sync, GET /api/sync/status, POST /api/sync/cancel,
//! GET /api/sphere
//!
//! Every route is scoped to the session named by the `X-Session-Id` header
//! (or `session_id` query parameter), defaulting to "default".

use std::collections::HashMap;
use std::future::Future;
use std::panic::AssertUnwindSafe;

use axum::{
    extract::{Query, State},
    http::{header::AUTHORIZATION, HeaderMap},
    routing::{get, post},
    Json, Router,
};
use futures::FutureExt;
use serde::{Deserialize, Serialize};
use sphere_common::events::SyncProgress;
use tokio::sync::RwLock;
use tokio_util::sync::CancellationToken;

use crate::client::StaticToken;
use crate::error::{ApiError, ApiResult, SyncError};
use crate::models::{SpherePayload, SyncRequest};
use crate::AppState;

/// Header naming the caller's session
pub const SESSION_HEADER: &str = "x-session-id";

pub const DEFAULT_SESSION: &str = "default";

/// Query fallback for clients that cannot set headers (e.g. EventSource)
#[derive(Debug, Default, Deserialize)]
pub struct SessionQuery {
    pub session_id: Option<String>,
}

/// Resolve the session: header, then query, then the default session
pub fn session_id(headers: &HeaderMap, query: &SessionQuery) -> String {
    headers
        .get(SESSION_HEADER)
        .and_then(|v| v.to_str().ok())
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .or_else(|| query.session_id.clone().filter(|s| !s.trim().is_empty()))
        .unwrap_or_else(|| DEFAULT_SESSION.to_string())
}

/// Bearer token from the Authorization header
fn bearer_token(headers: &HeaderMap) -> Result<StaticToken, SyncError> {
    let value = headers
        .get(AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .ok_or_else(|| SyncError::Auth("missing Authorization header".to_string()))?;

    let token = value
        .strip_prefix("Bearer ")
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .ok_or_else(|| SyncError::Auth("Authorization header is not a bearer token".to_string()))?;

    Ok(StaticToken::new(token))
}

/// Drive `sync` to completion and free the session's slot in `active`,
/// including when the sync panics
async fn run_tracked<F>(
    active: &RwLock<HashMap<String, CancellationToken>>,
    session_id: &str,
    sync: F,
) -> Result<SpherePayload, SyncError>
where
    F: Future<Output = Result<SpherePayload, SyncError>>,
{
    let result = AssertUnwindSafe(sync)
        .catch_unwind()
        .await
        .unwrap_or_else(|_| Err(SyncError::Internal("sync task panicked".to_string())));

    active.write().await.remove(session_id);
    result
}

/// POST /api/sync
///
/// Runs the sync and returns the stored payload. The sync runs in its own
/// task, so a dropped connection does not abort it. 409 while another sync
/// for the same session is in flight.
pub async fn start_sync(
    State(state): State<AppState>,
    Query(query): Query<SessionQuery>,
    headers: HeaderMap,
    Json(request): Json<SyncRequest>,
) -> ApiResult<Json<SpherePayload>> {
    let session_id = session_id(&headers, &query);
    let tokens = bearer_token(&headers)?;

    let cancel = CancellationToken::new();
    {
        let mut active = state.active_syncs.write().await;
        if active.contains_key(&session_id) {
            return Err(ApiError::Conflict(format!(
                "Sync already running for session {}",
                session_id
            )));
        }
        active.insert(session_id.clone(), cancel.clone());
    }

    tracing::info!(
        session_id = %session_id,
        mode = request.mode.as_str(),
        limit = ?request.limit,
        "Sync requested"
    );

    let task_state = state.clone();
    let task_session = session_id.clone();
    let handle = tokio::spawn(async move {
        let result = run_tracked(
            &task_state.active_syncs,
            &task_session,
            task_state
                .orchestrator
                .sync(&task_session, &request, &tokens, &cancel),
        )
        .await;

        if let Err(e) = &result {
            *task_state.last_error.write().await = Some(e.to_string());
        }
        result
    });

    let payload = handle
        .await
        .map_err(|e| SyncError::Internal(format!("sync task failed: {}", e)))??;

    Ok(Json(payload))
}

/// GET /api/sync/status
pub async fn sync_status(
    State(state): State<AppState>,
    Query(query): Query<SessionQuery>,
    headers: HeaderMap,
) -> Json<SyncProgress> {
    let session_id = session_id(&headers, &query);
    Json(state.tracker.get(&session_id).await)
}

#[derive(Debug, Serialize)]
pub struct CancelSyncResponse {
    pub session_id: String,
    pub cancelled: bool,
}

/// POST /api/sync/cancel
///
/// Stops the session's sync from issuing new page requests.
pub async fn cancel_sync(
    State(state): State<AppState>,
    Query(query): Query<SessionQuery>,
    headers: HeaderMap,
) -> ApiResult<Json<CancelSyncResponse>> {
    let session_id = session_id(&headers, &query);

    let active = state.active_syncs.read().await;
    let token = active
        .get(&session_id)
        .ok_or_else(|| ApiError::NotFound(format!("No sync running for session {}", session_id)))?;
    token.cancel();

    tracing::info!(session_id = %session_id, "Sync cancellation requested");
    Ok(Json(CancelSyncResponse {
        session_id,
        cancelled: true,
    }))
}

/// GET /api/sphere
pub async fn get_sphere(
    State(state): State<AppState>,
    Query(query): Query<SessionQuery>,
    headers: HeaderMap,
) -> ApiResult<Json<SpherePayload>> {
    let session_id = session_id(&headers, &query);
    let payload = state
        .store
        .load(&session_id)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("No sphere stored for session {}", session_id)))?;
    Ok(Json(payload))
}

pub fn sync_routes() -> Router<AppState> {
    Router::new()
        .route("/api/sync", post(start_sync))
        .route("/api/sync/status", get(sync_status))
        .route("/api/sync/cancel", post(cancel_sync))
        .route("/api/sphere", get(get_sphere))
}
