//! One user's nearest-neighbor index with atomic snapshot replacement.

use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};

use tracing::{debug, warn};
use usearch::{Index, IndexOptions, MetricKind, ScalarKind};

use crate::embedder::Embedding;

use super::{IndexEntry, IndexError, Prediction, UNKNOWN_LABEL};

/// Neighbor count ceiling; k = min(K_NEIGHBORS, example count)
const K_NEIGHBORS: usize = 5;

/// Helper trait to recover from poisoned RwLocks
trait RecoverableLock<T> {
    fn read_or_recover(&self) -> RwLockReadGuard<'_, T>;
    fn write_or_recover(&self) -> RwLockWriteGuard<'_, T>;
}

impl<T> RecoverableLock<T> for RwLock<T> {
    fn read_or_recover(&self) -> RwLockReadGuard<'_, T> {
        self.read().unwrap_or_else(|poisoned| {
            warn!("RwLock was poisoned during read, recovering");
            poisoned.into_inner()
        })
    }

    fn write_or_recover(&self) -> RwLockWriteGuard<'_, T> {
        self.write().unwrap_or_else(|poisoned| {
            warn!("RwLock was poisoned during write, recovering");
            poisoned.into_inner()
        })
    }
}

/// An immutable fitted snapshot: the search structure plus parallel label
/// metadata, keyed by insertion order (usearch key == vector position).
struct FittedIndex {
    search: Index,
    sound_ids: Vec<Option<String>>,
    sound_names: Vec<Option<String>>,
    dimension: usize,
    k: usize,
}

enum IndexState {
    Empty,
    Fitted(FittedIndex),
}

/// Per-user two-state index: empty or fitted.
///
/// `fit` builds the replacement snapshot entirely off to the side and swaps
/// a single `Arc` under a brief write lock, so a concurrent `predict` always
/// observes either the old or the new snapshot in its entirety.
pub struct UserIndex {
    state: RwLock<Arc<IndexState>>,
}

impl std::fmt::Debug for UserIndex {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("UserIndex")
            .field("examples", &self.example_count())
            .finish()
    }
}

impl Default for UserIndex {
    fn default() -> Self {
        Self::new()
    }
}

impl UserIndex {
    /// Create an empty index
    pub fn new() -> Self {
        Self {
            state: RwLock::new(Arc::new(IndexState::Empty)),
        }
    }

    /// Replace the entire index with one fitted over `entries`.
    ///
    /// An empty list transitions the index to its explicit empty state; this
    /// is a valid snapshot, not an error.
    pub fn fit(&self, entries: Vec<IndexEntry>) -> Result<(), IndexError> {
        let next = if entries.is_empty() {
            Arc::new(IndexState::Empty)
        } else {
            Arc::new(IndexState::Fitted(Self::build(entries)?))
        };

        *self.state.write_or_recover() = next;
        Ok(())
    }

    fn build(entries: Vec<IndexEntry>) -> Result<FittedIndex, IndexError> {
        let dimension = entries[0].embedding.len();
        let count = entries.len();

        for entry in &entries {
            if entry.embedding.len() != dimension {
                return Err(IndexError::DimensionMismatch {
                    expected: dimension,
                    got: entry.embedding.len(),
                });
            }
        }

        let options = IndexOptions {
            dimensions: dimension,
            metric: MetricKind::Cos,
            quantization: ScalarKind::F32,
            connectivity: 16,     // M parameter for HNSW
            expansion_add: 128,   // ef_construction
            expansion_search: 64, // ef for search
            multi: false,
        };

        let search = Index::new(&options).map_err(|e| IndexError::OperationFailed(e.to_string()))?;
        search
            .reserve(count)
            .map_err(|e| IndexError::OperationFailed(e.to_string()))?;

        let mut sound_ids = Vec::with_capacity(count);
        let mut sound_names = Vec::with_capacity(count);

        for (key, entry) in entries.into_iter().enumerate() {
            search
                .add(key as u64, entry.embedding.data())
                .map_err(|e| IndexError::OperationFailed(e.to_string()))?;
            sound_ids.push(entry.sound_id);
            sound_names.push(entry.sound_name);
        }

        debug!(examples = count, dimension, "Fitted user index");

        Ok(FittedIndex {
            search,
            sound_ids,
            sound_names,
            dimension,
            k: K_NEIGHBORS.min(count),
        })
    }

    /// Classify an embedding against the current snapshot.
    ///
    /// Returns the unknown prediction for an empty index. Only the single
    /// nearest neighbor determines the result; confidence is
    /// clamp(1 - cosine_distance, 0, 1).
    pub fn predict(&self, embedding: &Embedding) -> Result<Prediction, IndexError> {
        // Clone the snapshot Arc and release the lock before searching, so
        // a long query never blocks a concurrent fit.
        let snapshot = self.state.read_or_recover().clone();

        let fitted = match snapshot.as_ref() {
            IndexState::Empty => return Ok(Prediction::unknown()),
            IndexState::Fitted(fitted) => fitted,
        };

        if embedding.len() != fitted.dimension {
            return Err(IndexError::DimensionMismatch {
                expected: fitted.dimension,
                got: embedding.len(),
            });
        }

        let matches = fitted
            .search
            .search(embedding.data(), fitted.k)
            .map_err(|e| IndexError::OperationFailed(e.to_string()))?;

        let (best_key, distance) = match (matches.keys.first(), matches.distances.first()) {
            (Some(&key), Some(&distance)) => (key as usize, distance),
            _ => return Ok(Prediction::unknown()),
        };

        let confidence = (1.0 - distance).clamp(0.0, 1.0);
        let sound_id = fitted.sound_ids.get(best_key).cloned().flatten();
        let sound_name = fitted.sound_names.get(best_key).cloned().flatten();

        Ok(Prediction {
            label: sound_id
                .clone()
                .unwrap_or_else(|| UNKNOWN_LABEL.to_string()),
            sound_id,
            sound_name,
            confidence,
        })
    }

    /// Whether the index currently holds a fitted snapshot
    pub fn is_fitted(&self) -> bool {
        matches!(self.state.read_or_recover().as_ref(), IndexState::Fitted(_))
    }

    /// Number of examples in the current snapshot
    pub fn example_count(&self) -> usize {
        match self.state.read_or_recover().as_ref() {
            IndexState::Empty => 0,
            IndexState::Fitted(fitted) => fitted.sound_ids.len(),
        }
    }
}
