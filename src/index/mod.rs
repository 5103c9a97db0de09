//! Per-user nearest-neighbor indices over labeled embeddings.
//!
//! A [`UserIndex`] is either empty or fitted over a complete set of one
//! user's labeled examples. Fitting replaces the whole snapshot; there is no
//! incremental insertion, which keeps the concurrency story simple and
//! matches how rebuilds always consume the full current example set.

mod user_index;

pub use user_index::UserIndex;

use serde::{Deserialize, Serialize};

use crate::embedder::Embedding;

/// Label reported when no sound can be identified
pub const UNKNOWN_LABEL: &str = "unknown";

/// Error type for index operations
#[derive(Debug, thiserror::Error)]
pub enum IndexError {
    #[error("Index operation failed: {0}")]
    OperationFailed(String),

    #[error("Invalid embedding dimension: expected {expected}, got {got}")]
    DimensionMismatch { expected: usize, got: usize },
}

/// One labeled training sample, produced by ingestion for the caller to
/// persist. Logically append-only: never mutated, only superseded by being
/// excluded from a future rebuild.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LabeledExample {
    /// The acoustic embedding
    pub embedding: Embedding,
    /// Sound this sample belongs to; None for catalog-wide negatives
    pub sound_id: Option<String>,
    /// Sample kind label, e.g. "positive" or "negative"
    pub kind: String,
}

/// The fit-time unit: a labeled example joined against the caller's sound
/// catalog so the index can report display names.
#[derive(Debug, Clone)]
pub struct IndexEntry {
    pub embedding: Embedding,
    pub sound_id: Option<String>,
    pub sound_name: Option<String>,
}

/// Result of classifying one clip. Ephemeral; never stored by the engine.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Prediction {
    /// Sound identifier of the best match, or "unknown"
    pub label: String,
    /// Sound identifier, if the best match has one
    pub sound_id: Option<String>,
    /// Sound display name, if known
    pub sound_name: Option<String>,
    /// Confidence in [0, 1]; decreases with nearest-neighbor distance
    pub confidence: f32,
}

impl Prediction {
    /// The fixed answer for an empty index or an unlabeled best match
    pub fn unknown() -> Self {
        Self {
            label: UNKNOWN_LABEL.to_string(),
            sound_id: None,
            sound_name: None,
            confidence: 0.0,
        }
    }
}

/// Counts returned by an index rebuild
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RebuildSummary {
    /// Number of examples the index was fitted over
    pub samples: usize,
    /// Number of sound definitions in the caller's catalog
    pub sounds: usize,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unknown_prediction() {
        let p = Prediction::unknown();
        assert_eq!(p.label, UNKNOWN_LABEL);
        assert!(p.sound_id.is_none());
        assert!(p.sound_name.is_none());
        assert_eq!(p.confidence, 0.0);
    }
}
