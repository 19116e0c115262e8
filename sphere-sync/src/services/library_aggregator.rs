//! Paginated library aggregator
//!
//! Walks up to three library sources concurrently, each following the
//! upstream `next` cursor until exhausted or its cap is reached:
//! - liked tracks (cap `limit`)
//! - saved collections (cap `max(1, limit / 5)` collections, each walked
//!   for its tracks)
//! - recently played (cap `limit`)
//!
//! All walks share one `FetchClient`, so a 429 on any of them holds back
//! the others. A source the token is not authorized for contributes
//! nothing instead of failing the aggregation.

use std::collections::HashMap;

use serde::de::DeserializeOwned;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use super::progress::{LibrarySource, ProgressObserver};
use crate::client::responses::{Page, PlayHistoryItem, PlaylistItem, PlaylistObject, SavedTrackItem};
use crate::client::FetchClient;
use crate::error::SyncError;
use crate::models::{RawTrack, SourceToggles};

const LIKED_PAGE_SIZE: usize = 50;
const PLAYLIST_PAGE_SIZE: usize = 50;
const PLAYLIST_TRACKS_PAGE_SIZE: usize = 100;
const RECENT_PAGE_SIZE: usize = 50;

pub struct LibraryAggregator {
    client: FetchClient,
    base_url: String,
}

impl LibraryAggregator {
    pub fn new(client: FetchClient, base_url: impl Into<String>) -> Self {
        Self {
            client,
            base_url: base_url.into(),
        }
    }

    /// Fetch the deduplicated library, at most `limit` tracks
    ///
    /// Later sources overwrite earlier ones for the same id (liked, then
    /// saved collections, then recently played); first-seen order is kept.
    /// Cancelling `cancel` stops new page requests; pages already in flight
    /// complete and their tracks are kept.
    pub async fn fetch_library(
        &self,
        token: &str,
        limit: usize,
        sources: SourceToggles,
        observer: &dyn ProgressObserver,
        cancel: &CancellationToken,
    ) -> Result<Vec<RawTrack>, SyncError> {
        let liked = async {
            if !sources.liked {
                return Ok(Vec::new());
            }
            let url = format!("{}/me/tracks?limit={}", self.base_url, LIKED_PAGE_SIZE);
            let result = self
                .walk_pages::<SavedTrackItem, _>(
                    &url,
                    token,
                    limit,
                    LibrarySource::Liked,
                    observer,
                    cancel,
                    |item| item.track.into_raw_track(),
                )
                .await;
            degrade_on_permission(LibrarySource::Liked, result)
        };

        let saved = async {
            if !sources.saved_collections {
                return Ok(Vec::new());
            }
            let result = self
                .walk_saved_collections(token, limit, observer, cancel)
                .await;
            degrade_on_permission(LibrarySource::SavedCollections, result)
        };

        let recent = async {
            if !sources.recent {
                return Ok(Vec::new());
            }
            let url = format!(
                "{}/me/player/recently-played?limit={}",
                self.base_url, RECENT_PAGE_SIZE
            );
            let result = self
                .walk_pages::<PlayHistoryItem, _>(
                    &url,
                    token,
                    limit,
                    LibrarySource::Recent,
                    observer,
                    cancel,
                    |item| item.track.into_raw_track(),
                )
                .await;
            degrade_on_permission(LibrarySource::Recent, result)
        };

        let (liked, saved, recent) = tokio::join!(liked, saved, recent);
        let (liked, saved, recent) = (liked?, saved?, recent?);

        info!(
            liked = liked.len(),
            saved_collections = saved.len(),
            recent = recent.len(),
            "Library sources fetched"
        );

        Ok(merge_sources(vec![liked, saved, recent], limit))
    }

    /// Follow `next` cursors from `first_url`, collecting up to `cap` tracks
    #[allow(clippy::too_many_arguments)]
    async fn walk_pages<T, F>(
        &self,
        first_url: &str,
        token: &str,
        cap: usize,
        source: LibrarySource,
        observer: &dyn ProgressObserver,
        cancel: &CancellationToken,
        extract: F,
    ) -> Result<Vec<RawTrack>, SyncError>
    where
        T: DeserializeOwned,
        F: Fn(T) -> Option<RawTrack>,
    {
        let mut tracks = Vec::new();
        let mut next = Some(first_url.to_string());

        while let Some(url) = next.take() {
            if cancel.is_cancelled() {
                debug!(source = source.as_str(), "Walk cancelled before next page");
                break;
            }

            let page: Page<T> = self
                .client
                .get_json(&url, token)
                .await
                .map_err(|e| SyncError::from_fetch(e, source.as_str()))?;

            tracks.extend(page.items.into_iter().filter_map(&extract));
            observer.on_items(source, tracks.len().min(cap));

            if tracks.len() >= cap {
                break;
            }
            next = page.next;
        }

        tracks.truncate(cap);
        Ok(tracks)
    }

    /// Walk the saved collection listing, then each collection's tracks
    async fn walk_saved_collections(
        &self,
        token: &str,
        limit: usize,
        observer: &dyn ProgressObserver,
        cancel: &CancellationToken,
    ) -> Result<Vec<RawTrack>, SyncError> {
        let collection_cap = (limit / 5).max(1);
        let source = LibrarySource::SavedCollections;

        let mut collections: Vec<PlaylistObject> = Vec::new();
        let mut next = Some(format!(
            "{}/me/playlists?limit={}",
            self.base_url, PLAYLIST_PAGE_SIZE
        ));
        while let Some(url) = next.take() {
            if cancel.is_cancelled() {
                break;
            }
            let page: Page<PlaylistObject> = self
                .client
                .get_json(&url, token)
                .await
                .map_err(|e| SyncError::from_fetch(e, source.as_str()))?;
            collections.extend(page.items);
            if collections.len() >= collection_cap {
                break;
            }
            next = page.next;
        }
        collections.truncate(collection_cap);

        let mut tracks = Vec::new();
        for collection in collections {
            if tracks.len() >= limit || cancel.is_cancelled() {
                break;
            }
            if collection.tracks.total == 0 {
                continue;
            }

            let url = with_page_size(&collection.tracks.href, PLAYLIST_TRACKS_PAGE_SIZE);
            let remaining = limit - tracks.len();
            let already = tracks.len();
            let collected = self
                .walk_pages::<PlaylistItem, _>(
                    &url,
                    token,
                    remaining,
                    source,
                    &OffsetObserver { inner: observer, offset: already },
                    cancel,
                    |item| item.track.and_then(|t| t.into_raw_track()),
                )
                .await?;

            debug!(
                collection = %collection.name,
                tracks = collected.len(),
                "Collection tracks fetched"
            );
            tracks.extend(collected);
        }

        Ok(tracks)
    }
}

/// Reports a collection walk's count on top of the tracks already gathered
struct OffsetObserver<'a> {
    inner: &'a dyn ProgressObserver,
    offset: usize,
}

impl ProgressObserver for OffsetObserver<'_> {
    fn on_items(&self, source: LibrarySource, items_so_far: usize) {
        self.inner.on_items(source, self.offset + items_so_far);
    }
}

fn with_page_size(href: &str, page_size: usize) -> String {
    let sep = if href.contains('?') { '&' } else { '?' };
    format!("{}{}limit={}", href, sep, page_size)
}

/// A forbidden source contributes nothing
fn degrade_on_permission(
    source: LibrarySource,
    result: Result<Vec<RawTrack>, SyncError>,
) -> Result<Vec<RawTrack>, SyncError> {
    match result {
        Err(SyncError::Permission { scope }) => {
            warn!(source = source.as_str(), scope = %scope, "Source not authorized, skipping");
            Ok(Vec::new())
        }
        other => other,
    }
}

/// Merge source batches in order, deduplicating by id
///
/// A later occurrence replaces the earlier record in place, so the output
/// keeps first-seen order with last-seen metadata. Truncated to `limit`.
pub fn merge_sources(batches: Vec<Vec<RawTrack>>, limit: usize) -> Vec<RawTrack> {
    let mut index: HashMap<String, usize> = HashMap::new();
    let mut merged: Vec<RawTrack> = Vec::new();

    for track in batches.into_iter().flatten() {
        match index.get(&track.id) {
            Some(&i) => merged[i] = track,
            None => {
                index.insert(track.id.clone(), merged.len());
                merged.push(track);
            }
        }
    }

    merged.truncate(limit);
    merged
}
