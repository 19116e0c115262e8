//! Embedding pipeline
//!
//! features → standardized matrix → PCA projection → unit-sphere layout,
//! plus semantic axes over the final positions.

pub mod feature_matrix;
pub mod pca;
pub mod semantic_axes;
pub mod sphere_layout;

pub use sphere_layout::{fibonacci_point, LayoutPolicy};

use rand::Rng;

use crate::models::{AudioFeatures, EmbeddedTrack, RawTrack, SpherePayload};

/// Build the payload for tracks paired with their features
pub fn build_payload<R: Rng + ?Sized>(
    pairs: Vec<(RawTrack, AudioFeatures)>,
    policy: &LayoutPolicy,
    power_iterations: usize,
    rng: &mut R,
) -> SpherePayload {
    let (tracks, features): (Vec<RawTrack>, Vec<AudioFeatures>) = pairs.into_iter().unzip();

    let vectors = feature_matrix::standardize(&features);
    let raw_positions = pca::embed(&vectors, power_iterations, rng);
    let (positions, layout) = sphere_layout::place(&raw_positions, policy);
    let axes = semantic_axes::semantic_axes(&positions, &features);

    let embedded: Vec<EmbeddedTrack> = tracks
        .into_iter()
        .zip(features)
        .zip(vectors)
        .zip(positions)
        .map(|(((track, features), vector), position)| EmbeddedTrack {
            track,
            features,
            vector,
            position,
        })
        .collect();

    SpherePayload {
        generated_at: chrono::Utc::now(),
        track_count: embedded.len(),
        layout,
        tracks: embedded,
        axes,
    }
}
