//! Sync request parameters

use serde::{Deserialize, Serialize};

/// Sync mode selected by the caller
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SyncMode {
    /// Small library sample: liked + recently played only
    Quick,
    /// All three sources
    Full,
}

impl SyncMode {
    /// Sources enabled for this mode
    pub fn sources(&self) -> SourceToggles {
        match self {
            SyncMode::Quick => SourceToggles {
                liked: true,
                saved_collections: false,
                recent: true,
            },
            SyncMode::Full => SourceToggles::all(),
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            SyncMode::Quick => "quick",
            SyncMode::Full => "full",
        }
    }
}

/// Which library sources an aggregation walks
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SourceToggles {
    pub liked: bool,
    pub saved_collections: bool,
    pub recent: bool,
}

impl SourceToggles {
    pub fn all() -> Self {
        Self {
            liked: true,
            saved_collections: true,
            recent: true,
        }
    }
}

impl Default for SourceToggles {
    fn default() -> Self {
        Self::all()
    }
}

/// Body of `POST /api/sync`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SyncRequest {
    pub mode: SyncMode,
    #[serde(default)]
    pub limit: Option<usize>,
}
