use crate::CacheKey;
use parking_lot::RwLock;
use socialgraph_core::UserId;
use std::collections::{HashMap, HashSet};
use tracing::debug;

/// Tracks which cache keys depend on which users.
///
/// Every computed result registers the users whose graph or interaction
/// data contributed to it. Invalidating a set of users then drops exactly
/// the keys that could be stale. Callers pass the mutated user together
/// with its current neighbors for the conservative scope required by the
/// invalidation policy.
pub struct InvalidationManager {
    user_keys: RwLock<HashMap<UserId, HashSet<CacheKey>>>,
}

impl InvalidationManager {
    pub fn new() -> Self {
        Self {
            user_keys: RwLock::new(HashMap::new()),
        }
    }

    /// Register a cache key against every user in its computation scope.
    pub fn register(&self, scope: &[UserId], key: &CacheKey) {
        let mut mappings = self.user_keys.write();
        for user in scope {
            mappings.entry(*user).or_default().insert(key.clone());
        }
    }

    /// Collect and drop every key registered to any of the given users.
    /// The returned keys are also scrubbed from the remaining mappings so
    /// the index does not accumulate dead references.
    pub fn invalidate_users<I>(&self, users: I) -> Vec<CacheKey>
    where
        I: IntoIterator<Item = UserId>,
    {
        let mut mappings = self.user_keys.write();
        let mut dropped: HashSet<CacheKey> = HashSet::new();

        for user in users {
            if let Some(keys) = mappings.remove(&user) {
                dropped.extend(keys);
            }
        }
        if dropped.is_empty() {
            return Vec::new();
        }

        mappings.retain(|_, keys| {
            keys.retain(|key| !dropped.contains(key));
            !keys.is_empty()
        });

        debug!(count = dropped.len(), "cache keys invalidated");
        dropped.into_iter().collect()
    }

    pub fn tracked_users(&self) -> usize {
        self.user_keys.read().len()
    }

    pub fn tracked_keys(&self) -> usize {
        let mappings = self.user_keys.read();
        let mut keys: HashSet<&CacheKey> = HashSet::new();
        for set in mappings.values() {
            keys.extend(set.iter());
        }
        keys.len()
    }
}

impl Default for InvalidationManager {
    fn default() -> Self {
        Self::new()
    }
}
