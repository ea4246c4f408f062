use crate::graph::{FriendshipGraph, GraphEvent};
use async_trait::async_trait;
use dashmap::DashMap;
use socialgraph_core::{
    ActivityRanker, FriendRequestState, InteractionSignal, PrivacyCheck, RequestStatus, Result,
    UserId,
};
use std::sync::Arc;
use tokio::sync::broadcast;

/// Interaction counts are keyed by the unordered user pair.
fn pair_key(a: UserId, b: UserId) -> (UserId, UserId) {
    if a <= b {
        (a, b)
    } else {
        (b, a)
    }
}

/// In-memory interaction counter standing in for the external post/message
/// stores. Optionally publishes into the graph's event stream so interaction
/// changes drive cache invalidation like edge changes do.
pub struct MemoryInteractionStore {
    counts: DashMap<(UserId, UserId), u64>,
    events: Option<broadcast::Sender<GraphEvent>>,
}

impl MemoryInteractionStore {
    pub fn new() -> Self {
        Self {
            counts: DashMap::new(),
            events: None,
        }
    }

    pub fn with_events(events: broadcast::Sender<GraphEvent>) -> Self {
        Self {
            counts: DashMap::new(),
            events: Some(events),
        }
    }

    pub fn set_count(&self, a: UserId, b: UserId, count: u64) {
        self.counts.insert(pair_key(a, b), count);
        self.publish(a, b);
    }

    pub fn record_interaction(&self, a: UserId, b: UserId) {
        *self.counts.entry(pair_key(a, b)).or_insert(0) += 1;
        self.publish(a, b);
    }

    fn publish(&self, a: UserId, b: UserId) {
        if let Some(events) = &self.events {
            let _ = events.send(GraphEvent::InteractionRecorded { a, b });
        }
    }
}

impl Default for MemoryInteractionStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl InteractionSignal for MemoryInteractionStore {
    async fn count(&self, a: UserId, b: UserId) -> Result<u64> {
        Ok(self.counts.get(&pair_key(a, b)).map(|c| *c).unwrap_or(0))
    }
}

/// Permissive privacy collaborator: everyone is discoverable.
pub struct AllowAllPrivacy;

#[async_trait]
impl PrivacyCheck for AllowAllPrivacy {
    async fn is_discoverable(&self, _viewer: UserId, _target: UserId) -> Result<bool> {
        Ok(true)
    }
}

/// Request-state collaborator derived from the friendship graph: existing
/// edges report `Friends`, everything else `None`.
pub struct GraphBackedRequestState {
    graph: Arc<FriendshipGraph>,
}

impl GraphBackedRequestState {
    pub fn new(graph: Arc<FriendshipGraph>) -> Self {
        Self { graph }
    }
}

#[async_trait]
impl FriendRequestState for GraphBackedRequestState {
    async fn status(&self, viewer: UserId, target: UserId) -> Result<RequestStatus> {
        if self.graph.are_friends(viewer, target) {
            Ok(RequestStatus::Friends)
        } else {
            Ok(RequestStatus::None)
        }
    }
}

/// Activity ranker fed with precomputed per-user candidate lists.
pub struct StaticActivityRanker {
    rankings: DashMap<UserId, Vec<UserId>>,
}

impl StaticActivityRanker {
    pub fn new() -> Self {
        Self {
            rankings: DashMap::new(),
        }
    }

    pub fn set_ranking(&self, user: UserId, ranked: Vec<UserId>) {
        self.rankings.insert(user, ranked);
    }
}

impl Default for StaticActivityRanker {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ActivityRanker for StaticActivityRanker {
    async fn ranked_candidates(&self, user: UserId, limit: usize) -> Result<Vec<UserId>> {
        let mut ranked = self
            .rankings
            .get(&user)
            .map(|r| r.clone())
            .unwrap_or_default();
        ranked.truncate(limit);
        Ok(ranked)
    }
}
