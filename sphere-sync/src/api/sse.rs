//! Server-Sent Events for sync progress
//!
//! GET /api/sync/events streams the session's progress records as they
//! change, starting with the current one.

use std::convert::Infallible;
use std::time::Duration;

use axum::{
    extract::{Query, State},
    http::HeaderMap,
    response::sse::{Event, KeepAlive, Sse},
};
use futures::stream::Stream;
use sphere_common::events::SphereEvent;
use tokio::sync::broadcast::error::RecvError;
use tracing::{debug, info, warn};

use super::sync::{session_id, SessionQuery};
use crate::AppState;

const HEARTBEAT_INTERVAL: Duration = Duration::from_secs(15);

fn to_sse_event(event: &SphereEvent) -> Option<Event> {
    match serde_json::to_string(event) {
        Ok(json) => Some(Event::default().event(event.event_type()).data(json)),
        Err(e) => {
            warn!("SSE: Failed to serialize event {}: {}", event.event_type(), e);
            None
        }
    }
}

/// GET /api/sync/events
pub async fn sync_event_stream(
    State(state): State<AppState>,
    Query(query): Query<SessionQuery>,
    headers: HeaderMap,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    let session_id = session_id(&headers, &query);
    info!(session_id = %session_id, "New SSE client connected to sync events");

    let mut rx = state.event_bus.subscribe();
    let current = state.tracker.get(&session_id).await;

    let stream = async_stream::stream! {
        let snapshot = SphereEvent::SyncProgressUpdated {
            session_id: session_id.clone(),
            progress: current,
        };
        if let Some(event) = to_sse_event(&snapshot) {
            yield Ok(event);
        }

        loop {
            tokio::select! {
                _ = tokio::time::sleep(HEARTBEAT_INTERVAL) => {
                    debug!("SSE: Sending heartbeat");
                    yield Ok(Event::default().comment("heartbeat"));
                }

                received = rx.recv() => {
                    match received {
                        Ok(event) if event.session_id() == session_id => {
                            if let Some(sse) = to_sse_event(&event) {
                                yield Ok(sse);
                            }
                        }
                        Ok(_) => {}
                        Err(RecvError::Lagged(skipped)) => {
                            warn!(skipped, "SSE: Client lagged, events dropped");
                        }
                        Err(RecvError::Closed) => break,
                    }
                }
            }
        }
    };

    Sse::new(stream).keep_alive(KeepAlive::new().interval(HEARTBEAT_INTERVAL).text("heartbeat"))
}
