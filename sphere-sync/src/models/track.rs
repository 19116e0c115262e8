//! Track and audio-feature records

use serde::{Deserialize, Serialize};

/// Number of feature dimensions used by the embedding
pub const FEATURE_COUNT: usize = 8;

/// Standardized feature row, index-aligned to [`FeatureKey::ALL`]
pub type FeatureVector = [f64; FEATURE_COUNT];

/// Point in embedding space
pub type Position3 = [f64; 3];

/// A track as listed by the upstream library
///
/// Identity is `id`; everything else is display metadata.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawTrack {
    pub id: String,
    pub name: String,
    pub uri: Option<String>,
    pub artists: Vec<String>,
    pub album: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub external_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub preview_url: Option<String>,
}

/// Where an [`AudioFeatures`] record came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FeatureSource {
    Api,
    Synthesized,
}

/// Per-track audio features
///
/// The eight tracked dimensions feed the embedding; `key`, `loudness`,
/// `mode` and `time_signature` are carried through for display only.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AudioFeatures {
    pub id: String,
    pub energy: f64,
    /// Beats per minute
    pub tempo: f64,
    pub valence: f64,
    pub danceability: f64,
    pub acousticness: f64,
    pub instrumentalness: f64,
    pub speechiness: f64,
    pub liveness: f64,
    /// Pitch class 0-11, -1 when unknown
    pub key: i32,
    /// Decibels, typically -60..0
    pub loudness: f64,
    /// 1 = major, 0 = minor
    pub mode: i32,
    pub time_signature: i32,
    pub source: FeatureSource,
}

/// Canonical ordering of the tracked feature dimensions
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FeatureKey {
    Energy,
    Tempo,
    Valence,
    Danceability,
    Acousticness,
    Instrumentalness,
    Speechiness,
    Liveness,
}

impl FeatureKey {
    /// Column order of every [`FeatureVector`]
    pub const ALL: [FeatureKey; FEATURE_COUNT] = [
        FeatureKey::Energy,
        FeatureKey::Tempo,
        FeatureKey::Valence,
        FeatureKey::Danceability,
        FeatureKey::Acousticness,
        FeatureKey::Instrumentalness,
        FeatureKey::Speechiness,
        FeatureKey::Liveness,
    ];

    /// Features that get a semantic axis in the payload
    pub const SEMANTIC: [FeatureKey; 4] = [
        FeatureKey::Energy,
        FeatureKey::Tempo,
        FeatureKey::Valence,
        FeatureKey::Acousticness,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            FeatureKey::Energy => "energy",
            FeatureKey::Tempo => "tempo",
            FeatureKey::Valence => "valence",
            FeatureKey::Danceability => "danceability",
            FeatureKey::Acousticness => "acousticness",
            FeatureKey::Instrumentalness => "instrumentalness",
            FeatureKey::Speechiness => "speechiness",
            FeatureKey::Liveness => "liveness",
        }
    }

    /// Raw (unscaled) value of this dimension
    pub fn raw_value(&self, features: &AudioFeatures) -> f64 {
        match self {
            FeatureKey::Energy => features.energy,
            FeatureKey::Tempo => features.tempo,
            FeatureKey::Valence => features.valence,
            FeatureKey::Danceability => features.danceability,
            FeatureKey::Acousticness => features.acousticness,
            FeatureKey::Instrumentalness => features.instrumentalness,
            FeatureKey::Speechiness => features.speechiness,
            FeatureKey::Liveness => features.liveness,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_features() -> AudioFeatures {
        AudioFeatures {
            id: "t1".to_string(),
            energy: 0.1,
            tempo: 120.0,
            valence: 0.3,
            danceability: 0.4,
            acousticness: 0.5,
            instrumentalness: 0.6,
            speechiness: 0.7,
            liveness: 0.8,
            key: 5,
            loudness: -7.5,
            mode: 1,
            time_signature: 4,
            source: FeatureSource::Api,
        }
    }

    #[test]
    fn test_canonical_order_reads_each_field() {
        let features = sample_features();
        let values: Vec<f64> = FeatureKey::ALL
            .iter()
            .map(|k| k.raw_value(&features))
            .collect();
        assert_eq!(values, vec![0.1, 120.0, 0.3, 0.4, 0.5, 0.6, 0.7, 0.8]);
    }

    #[test]
    fn test_semantic_keys_are_subset_of_all() {
        for key in FeatureKey::SEMANTIC {
            assert!(FeatureKey::ALL.contains(&key));
        }
    }

    #[test]
    fn test_raw_track_json_shape() {
        let track = RawTrack {
            id: "abc".to_string(),
            name: "Song".to_string(),
            uri: None,
            artists: vec!["A".to_string(), "B".to_string()],
            album: "Album".to_string(),
            image_url: None,
            external_url: Some("https://example.com/abc".to_string()),
            preview_url: None,
        };
        let json = serde_json::to_value(&track).unwrap();
        assert_eq!(json["externalUrl"], "https://example.com/abc");
        assert!(json.get("imageUrl").is_none());
        assert!(json["uri"].is_null());
    }
}
