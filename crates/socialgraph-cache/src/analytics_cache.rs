use crate::{CacheConfig, CacheEntry, CacheKey, CacheSizeEstimator, CacheStats, CachedValue};
use dashmap::DashMap;
use parking_lot::{Mutex, RwLock};
use socialgraph_core::Result;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::interval;
use tracing::debug;

/// Memoization layer for graph analytics results.
///
/// Entries carry a per-entry TTL; expired entries are purged lazily on
/// lookup and swept by a periodic background pass. When the cache exceeds
/// its capacity, the still-valid entry with the oldest
/// `(last_accessed, created_at)` pair is evicted first.
pub struct AnalyticsCache {
    entries: DashMap<CacheKey, CacheEntry<CachedValue>>,
    memory_usage: Mutex<usize>,
    counters: RwLock<CacheStats>,
    config: CacheConfig,
}

impl AnalyticsCache {
    pub fn new(config: CacheConfig) -> Self {
        Self {
            entries: DashMap::new(),
            memory_usage: Mutex::new(0),
            counters: RwLock::new(CacheStats::default()),
            config,
        }
    }

    /// Look up an unexpired entry. An entry past its deadline is removed and
    /// reported as a miss, never returned as a hit.
    pub fn get(&self, key: &CacheKey) -> Result<Option<CachedValue>> {
        if let Some(mut entry) = self.entries.get_mut(key) {
            if entry.is_expired() {
                drop(entry);
                self.remove_entry(key);
                let mut counters = self.counters.write();
                counters.misses += 1;
                counters.expired_cleanup_count += 1;
                return Ok(None);
            }

            entry.touch();
            let value = entry.value.clone();
            drop(entry);

            self.counters.write().hits += 1;
            Ok(Some(value))
        } else {
            self.counters.write().misses += 1;
            Ok(None)
        }
    }

    pub fn insert(&self, key: CacheKey, value: CachedValue, ttl: Duration) -> Result<()> {
        let size_bytes = value.estimate_size() + std::mem::size_of::<CacheKey>();
        self.ensure_capacity(size_bytes);

        let entry = CacheEntry::new(value, size_bytes, ttl);
        {
            let mut memory_usage = self.memory_usage.lock();
            *memory_usage += size_bytes;
        }
        if let Some(old) = self.entries.insert(key, entry) {
            let mut memory_usage = self.memory_usage.lock();
            *memory_usage = memory_usage.saturating_sub(old.size_bytes);
        }

        self.counters.write().insertions += 1;
        Ok(())
    }

    pub fn insert_with_default_ttl(&self, key: CacheKey, value: CachedValue) -> Result<()> {
        self.insert(key, value, self.config.default_ttl)
    }

    /// Remove a single entry. Removing an absent key is a no-op.
    pub fn remove(&self, key: &CacheKey) -> Result<()> {
        self.remove_entry(key);
        Ok(())
    }

    /// Remove a batch of entries, returning how many were present.
    pub fn remove_many(&self, keys: &[CacheKey]) -> usize {
        keys.iter().filter(|key| self.remove_entry(key)).count()
    }

    pub fn clear(&self) {
        self.entries.clear();
        *self.memory_usage.lock() = 0;
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Sweep out every expired entry. Returns the number removed.
    pub fn cleanup_expired(&self) -> usize {
        let expired: Vec<CacheKey> = self
            .entries
            .iter()
            .filter(|entry| entry.value().is_expired())
            .map(|entry| entry.key().clone())
            .collect();

        let mut removed = 0;
        for key in expired {
            if self.remove_entry(&key) {
                removed += 1;
            }
        }

        if removed > 0 {
            self.counters.write().expired_cleanup_count += removed as u64;
            debug!(removed, "expired cache entries swept");
        }
        removed
    }

    pub fn stats(&self) -> CacheStats {
        let mut stats = self.counters.read().clone();
        stats.entries = self.entries.len();
        stats.memory_usage = *self.memory_usage.lock() as u64;
        stats
    }

    fn remove_entry(&self, key: &CacheKey) -> bool {
        if let Some((_, entry)) = self.entries.remove(key) {
            let mut memory_usage = self.memory_usage.lock();
            *memory_usage = memory_usage.saturating_sub(entry.size_bytes);
            true
        } else {
            false
        }
    }

    fn over_capacity(&self, incoming_bytes: usize) -> bool {
        self.entries.len() >= self.config.max_entries
            || *self.memory_usage.lock() + incoming_bytes > self.config.max_memory_bytes
    }

    fn ensure_capacity(&self, incoming_bytes: usize) {
        if !self.over_capacity(incoming_bytes) {
            return;
        }
        // Expired entries go first; live entries are only evicted when the
        // sweep was not enough.
        self.cleanup_expired();

        while self.over_capacity(incoming_bytes) {
            let victim = self
                .entries
                .iter()
                .filter(|entry| !entry.value().is_expired())
                .min_by_key(|entry| (entry.value().last_accessed, entry.value().created_at))
                .map(|entry| entry.key().clone());

            match victim {
                Some(key) => {
                    if self.remove_entry(&key) {
                        self.counters.write().evictions += 1;
                        debug!(%key, "cache entry evicted");
                    }
                }
                None => break,
            }
        }
    }

    /// Start the periodic expired-entry sweep.
    pub fn start_cleanup_task(self: Arc<Self>, cleanup_interval: Duration) -> tokio::task::JoinHandle<()> {
        let cache = self;
        tokio::spawn(async move {
            let mut ticker = interval(cleanup_interval);
            loop {
                ticker.tick().await;
                let removed = cache.cleanup_expired();
                if removed > 0 {
                    debug!(removed, "background cache sweep completed");
                }
            }
        })
    }
}

impl Default for AnalyticsCache {
    fn default() -> Self {
        Self::new(CacheConfig::default())
    }
}
