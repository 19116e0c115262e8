//! Audio-feature batch fetcher
//!
//! Resolves features for a list of track ids in batches of at most
//! `batch_size` (the upstream ceiling is 100). Batches run one after the
//! other. Ids the upstream does not know are simply absent from the result.

use std::collections::HashMap;

use tracing::{debug, warn};

use crate::client::responses::AudioFeaturesResponse;
use crate::client::FetchClient;
use crate::error::SyncError;
use crate::models::AudioFeatures;

pub struct AudioFeatureFetcher {
    client: FetchClient,
    base_url: String,
    batch_size: usize,
}

impl AudioFeatureFetcher {
    pub fn new(client: FetchClient, base_url: impl Into<String>, batch_size: usize) -> Self {
        Self {
            client,
            base_url: base_url.into(),
            batch_size: batch_size.clamp(1, 100),
        }
    }

    /// Fetch features for `ids`
    ///
    /// A 403 from the features endpoint ends the walk and returns what was
    /// accumulated so far; any other failure aborts.
    pub async fn fetch_features(
        &self,
        ids: &[String],
        token: &str,
    ) -> Result<HashMap<String, AudioFeatures>, SyncError> {
        let mut features = HashMap::with_capacity(ids.len());

        for (batch_index, chunk) in ids.chunks(self.batch_size).enumerate() {
            let url = format!("{}/audio-features?ids={}", self.base_url, chunk.join(","));

            let response: AudioFeaturesResponse = match self.client.get_json(&url, token).await {
                Ok(response) => response,
                Err(e) if e.is_permission_denied() => {
                    warn!(
                        batch = batch_index,
                        resolved = features.len(),
                        "Audio features endpoint forbidden, continuing with partial features"
                    );
                    return Ok(features);
                }
                Err(e) => return Err(SyncError::from_fetch(e, "audio features")),
            };

            let before = features.len();
            for obj in response.audio_features.into_iter().flatten() {
                features.insert(obj.id.clone(), AudioFeatures::from(obj));
            }

            debug!(
                batch = batch_index,
                requested = chunk.len(),
                resolved = features.len() - before,
                "Audio feature batch fetched"
            );
        }

        Ok(features)
    }
}
