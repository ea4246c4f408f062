use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Maximum hop depth accepted for influence queries.
pub const MAX_HOP_DEPTH: u32 = 6;

/// Tunables for the pairwise relationship score.
///
/// Each raw input is normalized with the saturating function `1 - exp(-x/k)`
/// so the score approaches but never reaches 1, then the two components are
/// blended with the configured weights.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct ScoringConfig {
    pub mutual_scale_k: f64,
    pub interaction_scale_k: f64,
    pub mutual_weight: f64,
    pub interaction_weight: f64,
}

impl Default for ScoringConfig {
    fn default() -> Self {
        Self {
            mutual_scale_k: 4.0,
            interaction_scale_k: 12.0,
            mutual_weight: 0.5,
            interaction_weight: 0.5,
        }
    }
}

/// Strength thresholds partitioning direct friends into circles.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct CircleConfig {
    pub close_threshold: f64,
    pub distant_threshold: f64,
}

impl Default for CircleConfig {
    fn default() -> Self {
        Self {
            close_threshold: 0.6,
            distant_threshold: 0.25,
        }
    }
}

/// Engine-level tunables: hop depth, upstream deadlines, per-operation TTLs.
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Default maximum hop depth for influence queries.
    pub max_distance: u32,
    /// Deadline for a single upstream collaborator call.
    pub upstream_timeout: Duration,
    /// Pause before the single retry after an upstream timeout.
    pub retry_backoff: Duration,
    /// Maximum number of recommendations returned.
    pub recommendation_limit: usize,
    /// How many activity-ranked candidates to request from the collaborator.
    pub activity_candidate_limit: usize,
    pub circles_ttl: Duration,
    pub influence_ttl: Duration,
    pub relationship_ttl: Duration,
    pub recommendations_ttl: Duration,
    /// Interval of the expired-entry sweep over the cache.
    pub sweep_interval: Duration,
    pub scoring: ScoringConfig,
    pub circles: CircleConfig,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            max_distance: 3,
            upstream_timeout: Duration::from_secs(2),
            retry_backoff: Duration::from_millis(100),
            recommendation_limit: 20,
            activity_candidate_limit: 20,
            circles_ttl: Duration::from_secs(300),
            influence_ttl: Duration::from_secs(600),
            relationship_ttl: Duration::from_secs(300),
            recommendations_ttl: Duration::from_secs(180),
            sweep_interval: Duration::from_secs(60),
            scoring: ScoringConfig::default(),
            circles: CircleConfig::default(),
        }
    }
}
