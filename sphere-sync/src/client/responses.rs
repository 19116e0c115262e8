//! Upstream response records
//!
//! One explicit type per endpoint shape. Required fields must be present
//! in the body; the nullable ones (`next`, track `id`) deserialize through
//! `Option::deserialize` so an absent key is still a parse failure.

use serde::Deserialize;

use crate::models::{AudioFeatures, FeatureSource, RawTrack};

/// Cursor-paginated listing
#[derive(Debug, Clone, Deserialize)]
pub struct Page<T> {
    pub items: Vec<T>,
    #[serde(deserialize_with = "Option::deserialize")]
    pub next: Option<String>,
}

/// `GET /me`
#[derive(Debug, Clone, Deserialize)]
pub struct UserProfile {
    pub id: String,
    #[serde(default)]
    pub display_name: Option<String>,
}

/// Item of `GET /me/tracks`
#[derive(Debug, Clone, Deserialize)]
pub struct SavedTrackItem {
    pub track: TrackObject,
}

/// Item of `GET /me/player/recently-played`
#[derive(Debug, Clone, Deserialize)]
pub struct PlayHistoryItem {
    pub track: TrackObject,
}

/// Item of `GET /me/playlists`
#[derive(Debug, Clone, Deserialize)]
pub struct PlaylistObject {
    pub id: String,
    pub name: String,
    pub tracks: PlaylistTracksRef,
}

/// Link to a playlist's track listing
#[derive(Debug, Clone, Deserialize)]
pub struct PlaylistTracksRef {
    pub href: String,
    pub total: u32,
}

/// Item of a playlist track listing; `track` is null for removed entries
#[derive(Debug, Clone, Deserialize)]
pub struct PlaylistItem {
    pub track: Option<TrackObject>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TrackObject {
    /// Null for local files, which are skipped
    #[serde(deserialize_with = "Option::deserialize")]
    pub id: Option<String>,
    pub name: String,
    #[serde(default)]
    pub uri: Option<String>,
    pub artists: Vec<ArtistObject>,
    pub album: AlbumObject,
    #[serde(default)]
    pub external_urls: Option<ExternalUrls>,
    #[serde(default)]
    pub preview_url: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ArtistObject {
    pub name: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AlbumObject {
    pub name: String,
    #[serde(default)]
    pub images: Vec<ImageObject>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ImageObject {
    pub url: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ExternalUrls {
    #[serde(default)]
    pub spotify: Option<String>,
}

impl TrackObject {
    /// Convert to the internal record; `None` for id-less tracks
    pub fn into_raw_track(self) -> Option<RawTrack> {
        let id = self.id.filter(|id| !id.is_empty())?;
        Some(RawTrack {
            id,
            name: self.name,
            uri: self.uri,
            artists: self.artists.into_iter().map(|a| a.name).collect(),
            album: self.album.name,
            image_url: self.album.images.into_iter().next().map(|i| i.url),
            external_url: self.external_urls.and_then(|u| u.spotify),
            preview_url: self.preview_url,
        })
    }
}

/// `GET /audio-features?ids=...`; unknown ids come back as null entries
#[derive(Debug, Clone, Deserialize)]
pub struct AudioFeaturesResponse {
    pub audio_features: Vec<Option<AudioFeaturesObject>>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AudioFeaturesObject {
    pub id: String,
    pub energy: f64,
    pub tempo: f64,
    pub valence: f64,
    pub danceability: f64,
    pub acousticness: f64,
    pub instrumentalness: f64,
    pub speechiness: f64,
    pub liveness: f64,
    pub key: i32,
    pub loudness: f64,
    pub mode: i32,
    pub time_signature: i32,
}

impl From<AudioFeaturesObject> for AudioFeatures {
    fn from(obj: AudioFeaturesObject) -> Self {
        Self {
            id: obj.id,
            energy: obj.energy,
            tempo: obj.tempo,
            valence: obj.valence,
            danceability: obj.danceability,
            acousticness: obj.acousticness,
            instrumentalness: obj.instrumentalness,
            speechiness: obj.speechiness,
            liveness: obj.liveness,
            key: obj.key,
            loudness: obj.loudness,
            mode: obj.mode,
            time_signature: obj.time_signature,
            source: FeatureSource::Api,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn track_json(id: serde_json::Value) -> serde_json::Value {
        json!({
            "id": id,
            "name": "Song",
            "uri": "spotify:track:x",
            "artists": [{"name": "A"}, {"name": "B"}],
            "album": {"name": "Album", "images": [{"url": "https://img/1"}, {"url": "https://img/2"}]},
            "external_urls": {"spotify": "https://open/x"},
            "preview_url": null
        })
    }

    #[test]
    fn test_track_converts_to_raw_track() {
        let obj: TrackObject = serde_json::from_value(track_json(json!("x"))).unwrap();
        let track = obj.into_raw_track().unwrap();

        assert_eq!(track.id, "x");
        assert_eq!(track.artists, vec!["A", "B"]);
        assert_eq!(track.image_url.as_deref(), Some("https://img/1"));
        assert_eq!(track.external_url.as_deref(), Some("https://open/x"));
        assert_eq!(track.preview_url, None);
    }

    #[test]
    fn test_local_file_track_is_skipped() {
        let obj: TrackObject = serde_json::from_value(track_json(json!(null))).unwrap();
        assert!(obj.into_raw_track().is_none());
    }

    #[test]
    fn test_missing_required_field_is_parse_failure() {
        let mut value = track_json(json!("x"));
        value.as_object_mut().unwrap().remove("album");
        assert!(serde_json::from_value::<TrackObject>(value).is_err());

        let page = json!({"items": []});
        assert!(serde_json::from_value::<Page<SavedTrackItem>>(page).is_err());
    }

    #[test]
    fn test_absent_track_id_is_parse_failure() {
        let mut value = track_json(json!("x"));
        value.as_object_mut().unwrap().remove("id");
        assert!(serde_json::from_value::<TrackObject>(value).is_err());

        let page = json!({"items": [{"track": track_json(json!(null))}], "next": null});
        let parsed: Page<SavedTrackItem> = serde_json::from_value(page).unwrap();
        assert!(parsed.next.is_none());
        assert!(parsed.items[0].track.id.is_none());
    }

    #[test]
    fn test_audio_features_with_null_entries() {
        let body = json!({
            "audio_features": [
                null,
                {
                    "id": "a", "energy": 0.5, "tempo": 120.0, "valence": 0.4,
                    "danceability": 0.6, "acousticness": 0.1, "instrumentalness": 0.0,
                    "speechiness": 0.05, "liveness": 0.2, "key": 7, "loudness": -6.0,
                    "mode": 1, "time_signature": 4
                }
            ]
        });
        let parsed: AudioFeaturesResponse = serde_json::from_value(body).unwrap();
        assert!(parsed.audio_features[0].is_none());

        let features: AudioFeatures = parsed.audio_features[1].clone().unwrap().into();
        assert_eq!(features.id, "a");
        assert_eq!(features.source, FeatureSource::Api);
    }
}
