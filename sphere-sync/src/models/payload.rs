//! Sphere payload: the stored result of one sync

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::track::{AudioFeatures, FeatureKey, FeatureVector, Position3, RawTrack};

/// Which layout policy produced the payload's positions
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LayoutOrigin {
    /// Every position is a normalized PCA projection
    Pca,
    /// PCA layout kept, some collapsed points replaced by Fibonacci points
    Mixed,
    /// PCA layout discarded, all positions from the Fibonacci sphere
    Fibonacci,
}

/// One track with everything derived from it
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EmbeddedTrack {
    pub track: RawTrack,
    pub features: AudioFeatures,
    pub vector: FeatureVector,
    pub position: Position3,
}

/// Direction in embedding space most correlated with each semantic feature
///
/// Each vector is unit length, or all zeros when the feature has no
/// correlation with any coordinate.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SemanticAxes {
    pub energy: Position3,
    pub tempo: Position3,
    pub valence: Position3,
    pub acousticness: Position3,
}

impl SemanticAxes {
    pub fn zero() -> Self {
        Self {
            energy: [0.0; 3],
            tempo: [0.0; 3],
            valence: [0.0; 3],
            acousticness: [0.0; 3],
        }
    }

    pub fn get(&self, key: FeatureKey) -> Option<&Position3> {
        match key {
            FeatureKey::Energy => Some(&self.energy),
            FeatureKey::Tempo => Some(&self.tempo),
            FeatureKey::Valence => Some(&self.valence),
            FeatureKey::Acousticness => Some(&self.acousticness),
            _ => None,
        }
    }

    pub(crate) fn set(&mut self, key: FeatureKey, axis: Position3) {
        match key {
            FeatureKey::Energy => self.energy = axis,
            FeatureKey::Tempo => self.tempo = axis,
            FeatureKey::Valence => self.valence = axis,
            FeatureKey::Acousticness => self.acousticness = axis,
            _ => {}
        }
    }
}

/// Result of one sync invocation
///
/// Replaces any previously stored payload for the same session as a whole.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SpherePayload {
    pub generated_at: DateTime<Utc>,
    pub track_count: usize,
    pub layout: LayoutOrigin,
    pub tracks: Vec<EmbeddedTrack>,
    pub axes: SemanticAxes,
}
