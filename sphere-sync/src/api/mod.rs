//! HTTP API handlers for sphere-sync
//!
//! REST for sync control and payload retrieval, SSE for progress.

pub mod health;
pub mod sse;
pub mod sync;

pub use health::health_routes;
pub use sse::sync_event_stream;
pub use sync::{sync_routes, SESSION_HEADER};
