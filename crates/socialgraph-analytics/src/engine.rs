use crate::circles::CircleClassifier;
use crate::recommend::RecommendationEngine;
use crate::scoring::RelationshipScorer;
use crate::upstream::with_retry;
use socialgraph_cache::{
    parse_period, AnalyticsCache, CacheConfig, CacheKey, CachedValue, CurrentMetrics, Flight,
    FlightOutcome, FlightRole, InvalidationManager, MetricsCollector, MetricsConfig,
    MetricsSnapshot,
};
use socialgraph_core::{
    ActivityRanker, CirclesResult, EngineConfig, FriendRequestState, GraphStore,
    InfluenceDistribution, InteractionSignal, PrivacyCheck, Recommendation, RelationshipStrength,
    Result, SocialGraphError, UserId,
};
use socialgraph_graph::{GraphEvent, InfluenceCalculator};
use std::future::Future;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::broadcast;
use tokio::time::interval;
use tracing::{debug, info, warn};

/// Facade wiring the analytics calculators, the result cache, and the
/// metrics collector into the exposed operations.
///
/// Read path: cache lookup, then on a miss the computation runs once per
/// key (concurrent misses collapse into a single flight) and the result is
/// stored back. Every access records its outcome and wall-clock latency.
/// The cache is a performance layer only: if it misbehaves, requests fall
/// back to direct computation instead of failing.
pub struct AnalyticsEngine {
    graph: Arc<dyn GraphStore>,
    interactions: Arc<dyn InteractionSignal>,
    cache: Arc<AnalyticsCache>,
    invalidation: Arc<InvalidationManager>,
    metrics: Arc<MetricsCollector>,
    flight: Flight<CacheKey, CachedValue>,
    scorer: RelationshipScorer,
    classifier: CircleClassifier,
    recommender: RecommendationEngine,
    config: EngineConfig,
}

impl AnalyticsEngine {
    pub fn new(
        graph: Arc<dyn GraphStore>,
        interactions: Arc<dyn InteractionSignal>,
        privacy: Arc<dyn PrivacyCheck>,
        requests: Arc<dyn FriendRequestState>,
        activity: Arc<dyn ActivityRanker>,
        config: EngineConfig,
    ) -> Self {
        Self::with_configs(
            graph,
            interactions,
            privacy,
            requests,
            activity,
            config,
            CacheConfig::default(),
            MetricsConfig::default(),
        )
    }

    #[allow(clippy::too_many_arguments)]
    pub fn with_configs(
        graph: Arc<dyn GraphStore>,
        interactions: Arc<dyn InteractionSignal>,
        privacy: Arc<dyn PrivacyCheck>,
        requests: Arc<dyn FriendRequestState>,
        activity: Arc<dyn ActivityRanker>,
        config: EngineConfig,
        cache_config: CacheConfig,
        metrics_config: MetricsConfig,
    ) -> Self {
        let recommender = RecommendationEngine::new(
            Arc::clone(&graph),
            activity,
            privacy,
            requests,
            config.clone(),
        );
        Self {
            graph,
            interactions,
            cache: Arc::new(AnalyticsCache::new(cache_config)),
            invalidation: Arc::new(InvalidationManager::new()),
            metrics: Arc::new(MetricsCollector::with_config(metrics_config)),
            flight: Flight::new(),
            scorer: RelationshipScorer::new(config.scoring),
            classifier: CircleClassifier::new(config.circles),
            recommender,
            config,
        }
    }

    pub fn cache(&self) -> &Arc<AnalyticsCache> {
        &self.cache
    }

    pub fn metrics(&self) -> &Arc<MetricsCollector> {
        &self.metrics
    }

    /// Classify the user's direct friends into strength circles.
    pub async fn circles(&self, user: UserId) -> Result<CirclesResult> {
        let key = CacheKey::circles(user);
        let value = self
            .cached(key, self.config.circles_ttl, || self.compute_circles(user))
            .await?;
        value
            .into_circles()
            .ok_or_else(|| Self::mismatched_entry("circles"))
    }

    /// Influence reach at the default maximum hop depth.
    pub async fn influence(&self, user: UserId) -> Result<InfluenceDistribution> {
        self.influence_with_depth(user, self.config.max_distance).await
    }

    pub async fn influence_with_depth(
        &self,
        user: UserId,
        max_distance: u32,
    ) -> Result<InfluenceDistribution> {
        let key = CacheKey::influence(user, max_distance);
        let value = self
            .cached(key, self.config.influence_ttl, || {
                self.compute_influence(user, max_distance)
            })
            .await?;
        value
            .into_influence()
            .ok_or_else(|| Self::mismatched_entry("influence"))
    }

    /// Pairwise relationship strength, keyed per requesting viewer.
    pub async fn relationship_strength(
        &self,
        viewer: UserId,
        target: UserId,
    ) -> Result<RelationshipStrength> {
        if viewer == target {
            return Err(SocialGraphError::InvalidParameter(
                "viewer and target must differ".to_string(),
            ));
        }
        let key = CacheKey::relationship(viewer, target);
        let value = self
            .cached(key, self.config.relationship_ttl, || {
                self.compute_relationship(viewer, target)
            })
            .await?;
        value
            .into_relationship()
            .ok_or_else(|| Self::mismatched_entry("relationship"))
    }

    /// Deduplicated, ranked friend suggestions.
    pub async fn recommendations(&self, user: UserId) -> Result<Vec<Recommendation>> {
        let key = CacheKey::recommendations(user);
        let value = self
            .cached(key, self.config.recommendations_ttl, || {
                self.compute_recommendations(user)
            })
            .await?;
        value
            .into_recommendations()
            .ok_or_else(|| Self::mismatched_entry("recommendations"))
    }

    /// Current cache telemetry aggregate.
    pub fn cache_metrics(&self) -> CurrentMetrics {
        let stats = self.cache.stats();
        self.metrics.current_metrics(stats.entries, stats.memory_usage)
    }

    /// Snapshot history over a trailing window like `"1h"` or `"7d"`.
    pub fn cache_metrics_history(&self, period: &str) -> Result<Vec<MetricsSnapshot>> {
        let window = parse_period(period)?;
        Ok(self.metrics.history(window))
    }

    /// Push channel for live dashboard updates.
    pub fn subscribe_metrics(&self) -> broadcast::Receiver<MetricsSnapshot> {
        self.metrics.subscribe()
    }

    /// Drop every cache entry whose computation involved `user` or any of
    /// its current neighbors. Correctness favors over-invalidation.
    pub async fn invalidate_user(&self, user: UserId) -> Result<usize> {
        let mut scope = vec![user];
        match self.graph.neighbors(user).await {
            Ok(neighbors) => scope.extend(neighbors),
            // The user may already be gone from the graph; its own entries
            // still need to be dropped.
            Err(SocialGraphError::UserNotFound(_)) => {}
            Err(e) => return Err(e),
        }

        let keys = self.invalidation.invalidate_users(scope);
        let removed = self.cache.remove_many(&keys);
        info!(%user, dropped = keys.len(), removed, "cache invalidated");
        Ok(removed)
    }

    /// Start the periodic cache sweep and metrics snapshot tickers.
    pub fn start_background_tasks(&self) -> Vec<tokio::task::JoinHandle<()>> {
        let sweep = Arc::clone(&self.cache).start_cleanup_task(self.config.sweep_interval);

        let cache = Arc::clone(&self.cache);
        let metrics = Arc::clone(&self.metrics);
        let snapshot_interval = metrics.config().snapshot_interval;
        let snapshots = tokio::spawn(async move {
            let mut ticker = interval(snapshot_interval);
            loop {
                ticker.tick().await;
                let stats = cache.stats();
                metrics.take_snapshot(stats.entries, stats.memory_usage);
            }
        });

        vec![sweep, snapshots]
    }

    /// Consume graph mutation events and invalidate the affected users.
    pub fn watch_graph_events(
        self: Arc<Self>,
        mut events: broadcast::Receiver<GraphEvent>,
    ) -> tokio::task::JoinHandle<()> {
        tokio::spawn(async move {
            loop {
                match events.recv().await {
                    Ok(event) => self.handle_graph_event(event).await,
                    Err(broadcast::error::RecvError::Lagged(skipped)) => {
                        warn!(skipped, "graph event stream lagged");
                    }
                    Err(broadcast::error::RecvError::Closed) => break,
                }
            }
        })
    }

    async fn handle_graph_event(&self, event: GraphEvent) {
        let affected: Vec<UserId> = match event {
            GraphEvent::UserAdded(_) => return,
            GraphEvent::UserRemoved(user) => vec![user],
            GraphEvent::FriendshipAdded { a, b }
            | GraphEvent::FriendshipRemoved { a, b }
            | GraphEvent::InteractionRecorded { a, b } => vec![a, b],
        };
        for user in affected {
            if let Err(e) = self.invalidate_user(user).await {
                warn!(%user, error = %e, "event-driven invalidation failed");
            }
        }
    }

    fn mismatched_entry(op: &str) -> SocialGraphError {
        SocialGraphError::CacheUnavailable(format!("mismatched cache entry for {}", op))
    }

    /// Cache-aside read path shared by every operation. The compute closure
    /// returns the value, the users in its computation scope (for
    /// invalidation registration), and whether the result is degraded.
    async fn cached<F, Fut>(&self, key: CacheKey, ttl: Duration, compute: F) -> Result<CachedValue>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<(CachedValue, Vec<UserId>, bool)>>,
    {
        let started = Instant::now();

        match self.cache.get(&key) {
            Ok(Some(value)) => {
                self.metrics.record_hit();
                self.metrics.record_latency(started.elapsed());
                return Ok(value);
            }
            Ok(None) => {}
            Err(e) => {
                // The cache is an optimization, never a correctness
                // dependency: fall back to direct computation.
                warn!(%key, error = %e, "cache unavailable, computing directly");
                let outcome = compute().await;
                return self.finish_miss(started, &key, ttl, outcome);
            }
        }

        match self.flight.join(key.clone()) {
            FlightRole::Leader(guard) => match compute().await {
                Ok((value, scope, degraded)) => {
                    self.store_computed(&key, ttl, &value, &scope, degraded);
                    guard.complete(value.clone());
                    self.metrics.record_miss();
                    self.metrics.record_latency(started.elapsed());
                    Ok(value)
                }
                Err(e) => {
                    guard.fail();
                    self.metrics.record_miss();
                    self.metrics.record_latency(started.elapsed());
                    Err(e)
                }
            },
            FlightRole::Follower(mut outcome_rx) => match outcome_rx.recv().await {
                Ok(FlightOutcome::Completed(value)) => {
                    // Served from the shared in-flight computation without
                    // recomputing: counts as a hit.
                    self.metrics.record_hit();
                    self.metrics.record_latency(started.elapsed());
                    Ok(value)
                }
                Ok(FlightOutcome::Failed) | Err(_) => {
                    debug!(%key, "flight leader failed, recomputing");
                    let outcome = compute().await;
                    self.finish_miss(started, &key, ttl, outcome)
                }
            },
        }
    }

    fn finish_miss(
        &self,
        started: Instant,
        key: &CacheKey,
        ttl: Duration,
        outcome: Result<(CachedValue, Vec<UserId>, bool)>,
    ) -> Result<CachedValue> {
        self.metrics.record_miss();
        self.metrics.record_latency(started.elapsed());
        match outcome {
            Ok((value, scope, degraded)) => {
                self.store_computed(key, ttl, &value, &scope, degraded);
                Ok(value)
            }
            Err(e) => Err(e),
        }
    }

    fn store_computed(
        &self,
        key: &CacheKey,
        ttl: Duration,
        value: &CachedValue,
        scope: &[UserId],
        degraded: bool,
    ) {
        if degraded {
            // A degraded result must never be replayed as fresh.
            debug!(%key, "degraded result bypasses the cache");
            return;
        }
        match self.cache.insert(key.clone(), value.clone(), ttl) {
            Ok(()) => self.invalidation.register(scope, key),
            Err(e) => warn!(%key, error = %e, "cache insert failed"),
        }
    }

    async fn compute_circles(&self, user: UserId) -> Result<(CachedValue, Vec<UserId>, bool)> {
        let deadline = self.config.upstream_timeout;
        let backoff = self.config.retry_backoff;

        let friends = with_retry(deadline, backoff, "graph store", || {
            self.graph.neighbors(user)
        })
        .await?;
        let mut ordered_friends: Vec<UserId> = friends.iter().copied().collect();
        ordered_friends.sort_unstable();

        let mut degraded = false;
        let mut scored = Vec::with_capacity(ordered_friends.len());
        for friend in ordered_friends {
            let friend_neighbors = with_retry(deadline, backoff, "graph store", || {
                self.graph.neighbors(friend)
            })
            .await?;
            let common = RelationshipScorer::common_friends(&friends, &friend_neighbors);

            let interactions = match with_retry(deadline, backoff, "interaction signal", || {
                self.interactions.count(user, friend)
            })
            .await
            {
                Ok(count) => count,
                Err(SocialGraphError::UpstreamTimeout { .. }) => {
                    // Classify with partial data rather than failing the
                    // whole request; the result is labeled degraded.
                    degraded = true;
                    0
                }
                Err(e) => return Err(e),
            };

            let strength = self.scorer.score(common, interactions);
            scored.push((friend, strength.strength));
        }

        let circles = self.classifier.classify(&scored);
        let mut scope = vec![user];
        scope.extend(friends.iter().copied());
        Ok((
            CachedValue::Circles(CirclesResult { circles, degraded }),
            scope,
            degraded,
        ))
    }

    async fn compute_influence(
        &self,
        user: UserId,
        max_distance: u32,
    ) -> Result<(CachedValue, Vec<UserId>, bool)> {
        let calculator = InfluenceCalculator::new(Arc::clone(&self.graph));
        let influence = with_retry(
            self.config.upstream_timeout,
            self.config.retry_backoff,
            "graph store",
            || calculator.compute_influence(user, max_distance),
        )
        .await?;

        let mut scope = vec![user];
        scope.extend(self.graph.neighbors(user).await?);
        Ok((CachedValue::Influence(influence), scope, false))
    }

    async fn compute_relationship(
        &self,
        viewer: UserId,
        target: UserId,
    ) -> Result<(CachedValue, Vec<UserId>, bool)> {
        let deadline = self.config.upstream_timeout;
        let backoff = self.config.retry_backoff;

        let viewer_neighbors = with_retry(deadline, backoff, "graph store", || {
            self.graph.neighbors(viewer)
        })
        .await?;
        let target_neighbors = with_retry(deadline, backoff, "graph store", || {
            self.graph.neighbors(target)
        })
        .await?;

        let common = RelationshipScorer::common_friends(&viewer_neighbors, &target_neighbors);
        let interactions = with_retry(deadline, backoff, "interaction signal", || {
            self.interactions.count(viewer, target)
        })
        .await?;

        let strength = self.scorer.score(common, interactions);
        Ok((
            CachedValue::Relationship(strength),
            vec![viewer, target],
            false,
        ))
    }

    async fn compute_recommendations(
        &self,
        user: UserId,
    ) -> Result<(CachedValue, Vec<UserId>, bool)> {
        let recommendations = self.recommender.recommend(user).await?;

        let mut scope = vec![user];
        scope.extend(self.graph.neighbors(user).await?);
        Ok((
            CachedValue::Recommendations(recommendations),
            scope,
            false,
        ))
    }
}
