use std::collections::HashMap;

use async_trait::async_trait;
use sphere_common::Result;
use tokio::sync::RwLock;

use super::PayloadStore;
use crate::models::SpherePayload;

/// In-process store, contents lost on exit
#[derive(Default)]
pub struct MemoryPayloadStore {
    payloads: RwLock<HashMap<String, SpherePayload>>,
}

impl MemoryPayloadStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl PayloadStore for MemoryPayloadStore {
    async fn save(&self, session_id: &str, payload: &SpherePayload) -> Result<()> {
        self.payloads
            .write()
            .await
            .insert(session_id.to_string(), payload.clone());
        Ok(())
    }

    async fn load(&self, session_id: &str) -> Result<Option<SpherePayload>> {
        Ok(self.payloads.read().await.get(session_id).cloned())
    }
}
