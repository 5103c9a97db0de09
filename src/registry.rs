//! Process-wide mapping from user identifier to that user's index.

use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use tracing::{debug, warn};

use crate::index::{IndexEntry, IndexError, UserIndex};

/// Lazily-populated map of per-user indices.
///
/// Lives for the process lifetime with no eviction; a deployment serving an
/// unbounded user population should layer an LRU or TTL policy on top.
/// Different users' indices are fully independent: the map lock is held only
/// for lookup or insert, never across fit or predict.
#[derive(Default)]
pub struct ClassifierRegistry {
    indices: RwLock<HashMap<String, Arc<UserIndex>>>,
}

impl std::fmt::Debug for ClassifierRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ClassifierRegistry")
            .field("users", &self.user_count())
            .finish()
    }
}

impl ClassifierRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Return the index for `user_id`, creating an empty one on first access.
    ///
    /// Uses a single write lock with the entry API so concurrent first access
    /// by the same user yields exactly one index.
    pub fn get_or_create(&self, user_id: &str) -> Arc<UserIndex> {
        let mut indices = self.indices.write().unwrap_or_else(|poisoned| {
            warn!("Registry lock was poisoned, recovering");
            poisoned.into_inner()
        });

        indices
            .entry(user_id.to_string())
            .or_insert_with(|| {
                debug!(user_id, "Creating index for new user");
                Arc::new(UserIndex::new())
            })
            .clone()
    }

    /// Refit the user's index over their complete current example set
    pub fn rebuild(&self, user_id: &str, entries: Vec<IndexEntry>) -> Result<(), IndexError> {
        self.get_or_create(user_id).fit(entries)
    }

    /// Number of users with an index in this process
    pub fn user_count(&self) -> usize {
        self.indices
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .len()
    }
}
