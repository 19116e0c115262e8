//! Sync progress reporting
//!
//! Two layers:
//! - `ProgressObserver`: per-page callback used by the aggregator
//! - `SyncProgressTracker`: latest record per session, broadcast on change
//!
//! Both are best-effort. Nothing here returns an error, so a reporting
//! problem can never abort a sync.

use std::collections::HashMap;
use std::sync::Arc;

use sphere_common::events::{EventBus, SphereEvent, SyncProgress};
use tokio::sync::RwLock;
use tracing::debug;

/// Library source a pagination walk reads from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LibrarySource {
    Liked,
    SavedCollections,
    Recent,
}

impl LibrarySource {
    pub fn as_str(&self) -> &'static str {
        match self {
            LibrarySource::Liked => "liked",
            LibrarySource::SavedCollections => "saved_collections",
            LibrarySource::Recent => "recent",
        }
    }
}

/// Observer notified after every fetched page
pub trait ProgressObserver: Send + Sync {
    /// `items_so_far` is the running count for `source` alone
    fn on_items(&self, source: LibrarySource, items_so_far: usize);
}

/// Observer that ignores every notification
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopProgress;

impl ProgressObserver for NoopProgress {
    fn on_items(&self, _source: LibrarySource, _items_so_far: usize) {}
}

/// Latest progress record per session
#[derive(Clone)]
pub struct SyncProgressTracker {
    records: Arc<RwLock<HashMap<String, SyncProgress>>>,
    event_bus: EventBus,
}

impl SyncProgressTracker {
    pub fn new(event_bus: EventBus) -> Self {
        Self {
            records: Arc::new(RwLock::new(HashMap::new())),
            event_bus,
        }
    }

    /// Store and broadcast a new record for `session_id`
    pub async fn update(&self, session_id: &str, progress: SyncProgress) {
        debug!(
            session_id = %session_id,
            percent = progress.percent,
            phase = progress.phase.as_str(),
            "Sync progress"
        );

        self.records
            .write()
            .await
            .insert(session_id.to_string(), progress.clone());

        self.event_bus.emit_lossy(SphereEvent::SyncProgressUpdated {
            session_id: session_id.to_string(),
            progress,
        });
    }

    /// Latest record, `idle` when the session never synced
    pub async fn get(&self, session_id: &str) -> SyncProgress {
        self.records
            .read()
            .await
            .get(session_id)
            .cloned()
            .unwrap_or_else(SyncProgress::idle)
    }

    pub fn event_bus(&self) -> &EventBus {
        &self.event_bus
    }
}
