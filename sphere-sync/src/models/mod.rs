//! Data models for sphere-sync
//!
//! - Track and audio-feature records
//! - The stored sphere payload
//! - Sync request parameters

pub mod payload;
pub mod sync_request;
pub mod track;

pub use payload::{EmbeddedTrack, LayoutOrigin, SemanticAxes, SpherePayload};
pub use sync_request::{SourceToggles, SyncMode, SyncRequest};
pub use track::{
    AudioFeatures, FeatureKey, FeatureSource, FeatureVector, Position3, RawTrack, FEATURE_COUNT,
};
