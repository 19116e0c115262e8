//! Event system for the sphere services
//!
//! Provides shared event definitions and the EventBus that fans them out
//! to SSE subscribers.

mod sync_types;

pub use sync_types::{SyncPhase, SyncProgress, SyncStatus};

use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;

/// Sphere event types
///
/// Events are broadcast via EventBus and serialized for SSE transmission.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum SphereEvent {
    /// A session's progress record changed
    SyncProgressUpdated {
        /// Session the record belongs to
        session_id: String,
        /// New progress record
        progress: SyncProgress,
    },

    /// A sync stored a new payload
    SpherePayloadStored {
        session_id: String,
        track_count: usize,
        timestamp: chrono::DateTime<chrono::Utc>,
    },
}

impl SphereEvent {
    /// Get event type as string for SSE event names and filtering
    pub fn event_type(&self) -> &str {
        match self {
            SphereEvent::SyncProgressUpdated { .. } => "SyncProgressUpdated",
            SphereEvent::SpherePayloadStored { .. } => "SpherePayloadStored",
        }
    }

    /// Session the event belongs to
    pub fn session_id(&self) -> &str {
        match self {
            SphereEvent::SyncProgressUpdated { session_id, .. }
            | SphereEvent::SpherePayloadStored { session_id, .. } => session_id,
        }
    }
}

// ========================================
// EventBus Implementation
// ========================================

/// Central event distribution bus
///
/// Uses tokio::broadcast internally:
/// - Non-blocking publish (slow subscribers don't block producers)
/// - Multiple concurrent subscribers
/// - Lagged message detection for slow subscribers
///
/// # Examples
///
/// ```
/// use sphere_common::events::{EventBus, SphereEvent, SyncProgress};
///
/// let event_bus = EventBus::new(100);
/// let mut rx = event_bus.subscribe();
///
/// event_bus.emit_lossy(SphereEvent::SyncProgressUpdated {
///     session_id: "default".to_string(),
///     progress: SyncProgress::idle(),
/// });
///
/// assert!(rx.try_recv().is_ok());
/// ```
#[derive(Clone)]
pub struct EventBus {
    tx: broadcast::Sender<SphereEvent>,
}

impl EventBus {
    /// Creates a new EventBus with specified channel capacity
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity);
        Self { tx }
    }

    /// Subscribe to all future events
    ///
    /// Events emitted before subscription are not received.
    pub fn subscribe(&self) -> broadcast::Receiver<SphereEvent> {
        self.tx.subscribe()
    }

    /// Emit an event, ignoring if no subscribers are listening
    pub fn emit_lossy(&self, event: SphereEvent) {
        let _ = self.tx.send(event);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_emit_without_subscribers_is_dropped() {
        let bus = EventBus::new(10);
        bus.emit_lossy(SphereEvent::SyncProgressUpdated {
            session_id: "s1".to_string(),
            progress: SyncProgress::idle(),
        });

        let mut rx = bus.subscribe();
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_subscriber_receives_events() {
        let bus = EventBus::new(10);
        let mut rx = bus.subscribe();

        bus.emit_lossy(SphereEvent::SyncProgressUpdated {
            session_id: "s1".to_string(),
            progress: SyncProgress::done(4),
        });

        let event = rx.recv().await.unwrap();
        assert_eq!(event.event_type(), "SyncProgressUpdated");
        assert_eq!(event.session_id(), "s1");
    }

    #[test]
    fn test_event_serialization_is_tagged() {
        let event = SphereEvent::SpherePayloadStored {
            session_id: "s1".to_string(),
            track_count: 7,
            timestamp: chrono::Utc::now(),
        };
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["type"], "SpherePayloadStored");
        assert_eq!(json["track_count"], 7);
    }
}
