use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use socialgraph_core::{
    CirclesResult, InfluenceDistribution, Recommendation, RelationshipStrength, UserId,
};
use std::fmt;
use std::time::{Duration, SystemTime};

/// Analytics operations whose results are memoized.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CacheOp {
    Circles,
    Influence,
    RelationshipStrength,
    Recommendations,
}

impl fmt::Display for CacheOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            CacheOp::Circles => "circles",
            CacheOp::Influence => "influence",
            CacheOp::RelationshipStrength => "relationship_strength",
            CacheOp::Recommendations => "recommendations",
        };
        write!(f, "{}", s)
    }
}

/// Cache key: the subject user, the operation, and a hash of the
/// operation-specific parameters.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CacheKey {
    pub user_id: UserId,
    pub op: CacheOp,
    pub params_hash: String,
}

impl CacheKey {
    fn hash_params(parts: &[&[u8]]) -> String {
        let mut hasher = Sha256::new();
        for part in parts {
            hasher.update(part);
        }
        format!("{:x}", hasher.finalize())
    }

    pub fn circles(user_id: UserId) -> Self {
        Self {
            user_id,
            op: CacheOp::Circles,
            params_hash: Self::hash_params(&[]),
        }
    }

    pub fn influence(user_id: UserId, max_distance: u32) -> Self {
        Self {
            user_id,
            op: CacheOp::Influence,
            params_hash: Self::hash_params(&[&max_distance.to_le_bytes()]),
        }
    }

    /// Keyed per requesting viewer for privacy scoping; the target is part
    /// of the params.
    pub fn relationship(viewer: UserId, target: UserId) -> Self {
        Self {
            user_id: viewer,
            op: CacheOp::RelationshipStrength,
            params_hash: Self::hash_params(&[target.as_bytes()]),
        }
    }

    pub fn recommendations(user_id: UserId) -> Self {
        Self {
            user_id,
            op: CacheOp::Recommendations,
            params_hash: Self::hash_params(&[]),
        }
    }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}:{}", self.user_id, self.op, &self.params_hash[..12])
    }
}

/// Cache entry with TTL and access tracking.
#[derive(Debug, Clone)]
pub struct CacheEntry<T> {
    pub value: T,
    pub created_at: SystemTime,
    pub last_accessed: SystemTime,
    pub expires_at: SystemTime,
    pub access_count: u64,
    pub size_bytes: usize,
}

impl<T> CacheEntry<T> {
    pub fn new(value: T, size_bytes: usize, ttl: Duration) -> Self {
        let now = SystemTime::now();
        Self {
            value,
            created_at: now,
            last_accessed: now,
            expires_at: now + ttl,
            access_count: 1,
            size_bytes,
        }
    }

    pub fn is_expired(&self) -> bool {
        SystemTime::now() > self.expires_at
    }

    pub fn touch(&mut self) {
        self.last_accessed = SystemTime::now();
        self.access_count += 1;
    }
}

/// Cache performance statistics.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CacheStats {
    pub hits: u64,
    pub misses: u64,
    pub insertions: u64,
    pub evictions: u64,
    pub expired_cleanup_count: u64,
    pub entries: usize,
    pub memory_usage: u64,
}

impl CacheStats {
    /// Hit fraction in [0,1]. Zero when no lookups were recorded.
    pub fn hit_rate(&self) -> f64 {
        if self.hits + self.misses == 0 {
            0.0
        } else {
            self.hits as f64 / (self.hits + self.misses) as f64
        }
    }
}

/// Cache configuration options.
#[derive(Debug, Clone)]
pub struct CacheConfig {
    pub max_entries: usize,
    pub max_memory_bytes: usize,
    pub default_ttl: Duration,
    pub cleanup_interval: Duration,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            max_entries: 10_000,
            max_memory_bytes: 64 * 1024 * 1024, // 64MB
            default_ttl: Duration::from_secs(300),
            cleanup_interval: Duration::from_secs(60),
        }
    }
}

/// Trait for cache size estimation.
pub trait CacheSizeEstimator {
    fn estimate_size(&self) -> usize;
}

impl CacheSizeEstimator for CirclesResult {
    fn estimate_size(&self) -> usize {
        std::mem::size_of::<Self>()
            + self
                .circles
                .iter()
                .map(|c| std::mem::size_of_val(c) + c.members.len() * std::mem::size_of::<UserId>())
                .sum::<usize>()
    }
}

impl CacheSizeEstimator for InfluenceDistribution {
    fn estimate_size(&self) -> usize {
        std::mem::size_of::<Self>() + self.distribution.len() * std::mem::size_of::<u64>() * 2
    }
}

impl CacheSizeEstimator for RelationshipStrength {
    fn estimate_size(&self) -> usize {
        std::mem::size_of::<Self>()
    }
}

impl CacheSizeEstimator for Vec<Recommendation> {
    fn estimate_size(&self) -> usize {
        std::mem::size_of::<Self>() + self.len() * std::mem::size_of::<Recommendation>()
    }
}

/// The value side of the cache: one variant per memoized operation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum CachedValue {
    Circles(CirclesResult),
    Influence(InfluenceDistribution),
    Relationship(RelationshipStrength),
    Recommendations(Vec<Recommendation>),
}

impl CachedValue {
    pub fn into_circles(self) -> Option<CirclesResult> {
        match self {
            CachedValue::Circles(v) => Some(v),
            _ => None,
        }
    }

    pub fn into_influence(self) -> Option<InfluenceDistribution> {
        match self {
            CachedValue::Influence(v) => Some(v),
            _ => None,
        }
    }

    pub fn into_relationship(self) -> Option<RelationshipStrength> {
        match self {
            CachedValue::Relationship(v) => Some(v),
            _ => None,
        }
    }

    pub fn into_recommendations(self) -> Option<Vec<Recommendation>> {
        match self {
            CachedValue::Recommendations(v) => Some(v),
            _ => None,
        }
    }
}

impl CacheSizeEstimator for CachedValue {
    fn estimate_size(&self) -> usize {
        match self {
            CachedValue::Circles(v) => v.estimate_size(),
            CachedValue::Influence(v) => v.estimate_size(),
            CachedValue::Relationship(v) => v.estimate_size(),
            CachedValue::Recommendations(v) => v.estimate_size(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_key_params_are_deterministic() {
        let user = UserId::new_v4();
        let target = UserId::new_v4();

        assert_eq!(CacheKey::circles(user), CacheKey::circles(user));
        assert_eq!(
            CacheKey::influence(user, 3),
            CacheKey::influence(user, 3)
        );
        assert_ne!(
            CacheKey::influence(user, 2).params_hash,
            CacheKey::influence(user, 3).params_hash
        );
        assert_ne!(
            CacheKey::relationship(user, target),
            CacheKey::relationship(target, user)
        );
    }

    #[test]
    fn test_entry_expiry_invariant() {
        let entry = CacheEntry::new(1u32, 4, Duration::from_secs(60));
        assert!(entry.expires_at >= entry.created_at);
        assert!(!entry.is_expired());

        let stale = CacheEntry::new(1u32, 4, Duration::ZERO);
        std::thread::sleep(Duration::from_millis(5));
        assert!(stale.is_expired());
    }

    #[test]
    fn test_stats_hit_rate() {
        let mut stats = CacheStats::default();
        assert_eq!(stats.hit_rate(), 0.0);

        stats.hits = 3;
        stats.misses = 1;
        assert_eq!(stats.hit_rate(), 0.75);
    }
}
