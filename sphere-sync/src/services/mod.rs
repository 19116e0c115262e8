//! Sync pipeline services
//!
//! - `library_aggregator`: concurrent paginated walks over library sources
//! - `audio_features`: batched feature lookup
//! - `feature_synthesizer`: deterministic stand-in features
//! - `progress`: progress observer and per-session tracker
//! - `sync_orchestrator`: one sync end to end

pub mod audio_features;
pub mod feature_synthesizer;
pub mod library_aggregator;
pub mod progress;
pub mod sync_orchestrator;

pub use audio_features::AudioFeatureFetcher;
pub use feature_synthesizer::synthesize;
pub use library_aggregator::{merge_sources, LibraryAggregator};
pub use progress::{LibrarySource, NoopProgress, ProgressObserver, SyncProgressTracker};
pub use sync_orchestrator::SyncOrchestrator;
