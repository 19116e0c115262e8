//! Sync orchestrator
//!
//! Runs one sync end to end and publishes progress at fixed milestones:
//!
//! | Phase          | Percent      |
//! |----------------|--------------|
//! | auth verify    | 8            |
//! | track fetch    | 20 → 55      |
//! | feature fetch  | 58, then 72  |
//! | embedding      | 84           |
//! | done / error   | 100          |
//!
//! Track fetch and feature fetch each run inside a time envelope; when one
//! elapses the in-flight work is dropped and the sync fails with a timeout.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use rand::rngs::StdRng;
use rand::SeedableRng;
use sphere_common::events::{SphereEvent, SyncPhase, SyncProgress};
use tokio::sync::watch;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, Instrument};
use uuid::Uuid;

use super::audio_features::AudioFeatureFetcher;
use super::feature_synthesizer::synthesize;
use super::library_aggregator::LibraryAggregator;
use super::progress::{LibrarySource, ProgressObserver, SyncProgressTracker};
use crate::client::responses::UserProfile;
use crate::client::{FetchClient, RateLimitState, TokenProvider};
use crate::config::SyncSettings;
use crate::embedding;
use crate::error::SyncError;
use crate::models::{FeatureSource, SpherePayload, SyncRequest};
use crate::store::PayloadStore;

const AUTH_VERIFY_PERCENT: u8 = 8;
const TRACK_FETCH_START_PERCENT: u8 = 20;
const TRACK_FETCH_SPAN: usize = 35;
const FEATURE_FETCH_PERCENT: u8 = 58;
const FEATURES_RESOLVED_PERCENT: u8 = 72;
const EMBEDDING_PERCENT: u8 = 84;

/// Percent reported while `fetched` of `limit` tracks are in
pub fn track_fetch_percent(fetched: usize, limit: usize) -> u8 {
    let span = if limit == 0 {
        TRACK_FETCH_SPAN
    } else {
        (TRACK_FETCH_SPAN * fetched / limit).min(TRACK_FETCH_SPAN)
    };
    TRACK_FETCH_START_PERCENT + span as u8
}

/// Sums per-source counts and publishes the total
struct TrackCountObserver {
    counts: [AtomicUsize; 3],
    total: watch::Sender<usize>,
}

impl TrackCountObserver {
    fn new(total: watch::Sender<usize>) -> Self {
        Self {
            counts: Default::default(),
            total,
        }
    }
}

impl ProgressObserver for TrackCountObserver {
    fn on_items(&self, source: LibrarySource, items_so_far: usize) {
        let slot = match source {
            LibrarySource::Liked => 0,
            LibrarySource::SavedCollections => 1,
            LibrarySource::Recent => 2,
        };
        self.counts[slot].store(items_so_far, Ordering::Relaxed);
        let total = self.counts.iter().map(|c| c.load(Ordering::Relaxed)).sum();
        self.total.send_replace(total);
    }
}

pub struct SyncOrchestrator {
    settings: Arc<SyncSettings>,
    client: FetchClient,
    store: Arc<dyn PayloadStore>,
    tracker: SyncProgressTracker,
    rng_seed: Option<u64>,
}

impl SyncOrchestrator {
    pub fn new(
        settings: Arc<SyncSettings>,
        rate_limit: Arc<RateLimitState>,
        store: Arc<dyn PayloadStore>,
        tracker: SyncProgressTracker,
    ) -> Result<Self, SyncError> {
        let client = FetchClient::new(settings.fetch, rate_limit)?;
        Ok(Self {
            settings,
            client,
            store,
            tracker,
            rng_seed: None,
        })
    }

    /// Seed power iteration so embeddings are reproducible
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.rng_seed = Some(seed);
        self
    }

    /// Run a sync for `session_id`
    ///
    /// On failure the session's progress record is set to `error` (with the
    /// retry hint when rate limited) before the error is returned.
    pub async fn sync(
        &self,
        session_id: &str,
        request: &SyncRequest,
        tokens: &dyn TokenProvider,
        cancel: &CancellationToken,
    ) -> Result<SpherePayload, SyncError> {
        let sync_id = Uuid::new_v4();
        let span = tracing::info_span!("sync", %sync_id, session_id = %session_id, mode = request.mode.as_str());

        let result = self
            .run(session_id, request, tokens, cancel)
            .instrument(span)
            .await;

        if let Err(e) = &result {
            error!(%sync_id, session_id = %session_id, error = %e, "Sync failed");
            self.tracker
                .update(
                    session_id,
                    SyncProgress::failed(e.user_message(), e.to_string(), e.retry_after_secs()),
                )
                .await;
        }

        result
    }

    async fn run(
        &self,
        session_id: &str,
        request: &SyncRequest,
        tokens: &dyn TokenProvider,
        cancel: &CancellationToken,
    ) -> Result<SpherePayload, SyncError> {
        let settings = &self.settings;
        let limit = settings.resolve_limit(request.mode, request.limit);
        let envelopes = settings.envelopes(request.mode);

        // Auth verify
        self.tracker
            .update(
                session_id,
                SyncProgress::running(SyncPhase::AuthVerify, AUTH_VERIFY_PERCENT, "Verifying session"),
            )
            .await;
        let token = tokens.bearer_token().await?;
        let profile: UserProfile = self
            .client
            .get_json(&format!("{}/me", settings.api_base_url), &token)
            .await
            .map_err(|e| SyncError::from_fetch(e, "profile"))?;
        info!(user = %profile.id, limit, "Session verified");

        // Track fetch
        self.tracker
            .update(
                session_id,
                SyncProgress::running(
                    SyncPhase::TrackFetch,
                    TRACK_FETCH_START_PERCENT,
                    "Fetching your library",
                ),
            )
            .await;

        let aggregator = LibraryAggregator::new(self.client.clone(), settings.api_base_url.clone());
        let (count_tx, mut count_rx) = watch::channel(0usize);
        let observer = TrackCountObserver::new(count_tx);

        let fetch = tokio::time::timeout(
            envelopes.track_fetch,
            aggregator.fetch_library(&token, limit, request.mode.sources(), &observer, cancel),
        );
        tokio::pin!(fetch);

        let fetched = loop {
            tokio::select! {
                result = &mut fetch => break result,
                Ok(()) = count_rx.changed() => {
                    let so_far = *count_rx.borrow_and_update();
                    self.tracker
                        .update(
                            session_id,
                            SyncProgress::running(
                                SyncPhase::TrackFetch,
                                track_fetch_percent(so_far, limit),
                                format!("Fetched {} tracks", so_far.min(limit)),
                            ),
                        )
                        .await;
                }
            }
        };
        let tracks = fetched.map_err(|_| SyncError::Timeout {
            phase: "track fetch",
        })??;

        if cancel.is_cancelled() {
            return Err(SyncError::Cancelled);
        }

        // Feature fetch
        self.tracker
            .update(
                session_id,
                SyncProgress::running(
                    SyncPhase::FeatureFetch,
                    FEATURE_FETCH_PERCENT,
                    "Fetching audio features",
                )
                .with_track_count(tracks.len()),
            )
            .await;

        let fetcher = AudioFeatureFetcher::new(
            self.client.clone(),
            settings.api_base_url.clone(),
            settings.feature_batch_size,
        );
        let ids: Vec<String> = tracks.iter().map(|t| t.id.clone()).collect();
        let mut features = tokio::time::timeout(envelopes.feature_fetch, fetcher.fetch_features(&ids, &token))
            .await
            .map_err(|_| SyncError::Timeout {
                phase: "feature fetch",
            })??;

        let pairs: Vec<_> = tracks
            .into_iter()
            .map(|track| {
                let f = features.remove(&track.id).unwrap_or_else(|| synthesize(&track));
                (track, f)
            })
            .collect();
        let real = pairs
            .iter()
            .filter(|(_, f)| f.source == FeatureSource::Api)
            .count();
        info!(
            real,
            synthesized = pairs.len() - real,
            "Audio features resolved"
        );

        self.tracker
            .update(
                session_id,
                SyncProgress::running(
                    SyncPhase::FeatureFetch,
                    FEATURES_RESOLVED_PERCENT,
                    "Audio features resolved",
                )
                .with_track_count(pairs.len()),
            )
            .await;

        // Embedding
        self.tracker
            .update(
                session_id,
                SyncProgress::running(SyncPhase::Embedding, EMBEDDING_PERCENT, "Building your sphere")
                    .with_track_count(pairs.len()),
            )
            .await;

        let mut rng = match self.rng_seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        let payload = embedding::build_payload(
            pairs,
            &settings.layout,
            settings.power_iterations,
            &mut rng,
        );

        self.store.save(session_id, &payload).await?;
        self.tracker.event_bus().emit_lossy(SphereEvent::SpherePayloadStored {
            session_id: session_id.to_string(),
            track_count: payload.track_count,
            timestamp: payload.generated_at,
        });

        info!(
            tracks = payload.track_count,
            layout = ?payload.layout,
            "Sphere payload stored"
        );
        self.tracker
            .update(session_id, SyncProgress::done(payload.track_count))
            .await;

        Ok(payload)
    }
}
