//! Payload persistence
//!
//! One stored payload per session. Saving replaces the previous payload
//! as a whole.

pub mod memory;
pub mod sqlite;

pub use memory::MemoryPayloadStore;
pub use sqlite::{init_database_pool, SqlitePayloadStore};

use async_trait::async_trait;
use sphere_common::Result;

use crate::models::SpherePayload;

#[async_trait]
pub trait PayloadStore: Send + Sync {
    /// Store `payload` for `session_id`, replacing any earlier one
    async fn save(&self, session_id: &str, payload: &SpherePayload) -> Result<()>;

    /// Last stored payload for `session_id`
    async fn load(&self, session_id: &str) -> Result<Option<SpherePayload>>;
}
