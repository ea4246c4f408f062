use crate::upstream::with_retry;
use rustc_hash::FxHashSet;
use socialgraph_core::{
    ActivityRanker, EngineConfig, FriendRequestState, GraphStore, PrivacyCheck, Recommendation,
    RecommendReason, RequestStatus, Result, UserId,
};
use socialgraph_graph::InfluenceCalculator;
use std::sync::Arc;
use tracing::debug;

/// Merges friends-of-friends proximity candidates with externally ranked
/// activity candidates into one deduplicated suggestion list.
///
/// Activity candidates keep their given order and take priority; remaining
/// proximity-only candidates follow in BFS discovery order. Users with a
/// pending request or blocking privacy settings are excluded via the
/// external collaborators.
pub struct RecommendationEngine {
    graph: Arc<dyn GraphStore>,
    activity: Arc<dyn ActivityRanker>,
    privacy: Arc<dyn PrivacyCheck>,
    requests: Arc<dyn FriendRequestState>,
    config: EngineConfig,
}

impl RecommendationEngine {
    pub fn new(
        graph: Arc<dyn GraphStore>,
        activity: Arc<dyn ActivityRanker>,
        privacy: Arc<dyn PrivacyCheck>,
        requests: Arc<dyn FriendRequestState>,
        config: EngineConfig,
    ) -> Self {
        Self {
            graph,
            activity,
            privacy,
            requests,
            config,
        }
    }

    pub async fn recommend(&self, user: UserId) -> Result<Vec<Recommendation>> {
        let deadline = self.config.upstream_timeout;
        let backoff = self.config.retry_backoff;

        let friends = with_retry(deadline, backoff, "graph store", || {
            self.graph.neighbors(user)
        })
        .await?;

        // Friends-of-friends: the distance-2 slice of the BFS frontier.
        // Direct friends and the user itself can never appear there because
        // their shortest distance is smaller.
        let calculator = InfluenceCalculator::new(Arc::clone(&self.graph));
        let reach = with_retry(deadline, backoff, "graph store", || {
            calculator.reach_by_distance(user, 2)
        })
        .await?;
        let proximity: Vec<UserId> = reach
            .into_iter()
            .filter(|(_, distance)| *distance == 2)
            .map(|(candidate, _)| candidate)
            .collect();
        let proximity_set: FxHashSet<UserId> = proximity.iter().copied().collect();

        let activity = with_retry(deadline, backoff, "activity ranker", || {
            self.activity
                .ranked_candidates(user, self.config.activity_candidate_limit)
        })
        .await?;

        // Union by user ID, first occurrence wins: activity candidates in
        // their given order, then proximity-only candidates in BFS order.
        let mut seen: FxHashSet<UserId> = FxHashSet::default();
        let mut merged: Vec<Recommendation> = Vec::new();

        for candidate in activity {
            if candidate == user || friends.contains(&candidate) || !seen.insert(candidate) {
                continue;
            }
            let reason = if proximity_set.contains(&candidate) {
                RecommendReason::Both
            } else {
                RecommendReason::Activity
            };
            merged.push(Recommendation {
                user_id: candidate,
                reason,
            });
        }
        for candidate in proximity {
            if seen.insert(candidate) {
                merged.push(Recommendation {
                    user_id: candidate,
                    reason: RecommendReason::Proximity,
                });
            }
        }

        let mut recommendations = Vec::new();
        for recommendation in merged {
            if recommendations.len() >= self.config.recommendation_limit {
                break;
            }
            let candidate = recommendation.user_id;
            let status = with_retry(deadline, backoff, "friend request state", || {
                self.requests.status(user, candidate)
            })
            .await?;
            if status != RequestStatus::None {
                continue;
            }
            let discoverable = with_retry(deadline, backoff, "privacy check", || {
                self.privacy.is_discoverable(user, candidate)
            })
            .await?;
            if !discoverable {
                continue;
            }
            recommendations.push(recommendation);
        }

        debug!(%user, count = recommendations.len(), "recommendations assembled");
        Ok(recommendations)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use socialgraph_graph::{
        AllowAllPrivacy, FriendshipGraph, GraphBackedRequestState, StaticActivityRanker,
    };

    struct Fixture {
        graph: Arc<FriendshipGraph>,
        ranker: Arc<StaticActivityRanker>,
        engine: RecommendationEngine,
    }

    fn fixture() -> Fixture {
        let graph = Arc::new(FriendshipGraph::new());
        let ranker = Arc::new(StaticActivityRanker::new());
        let engine = RecommendationEngine::new(
            graph.clone(),
            ranker.clone(),
            Arc::new(AllowAllPrivacy),
            Arc::new(GraphBackedRequestState::new(graph.clone())),
            EngineConfig::default(),
        );
        Fixture {
            graph,
            ranker,
            engine,
        }
    }

    #[tokio::test]
    async fn test_dual_source_candidate_appears_once_as_both() {
        let f = fixture();
        let (user, friend, shared, activity_only) = (
            UserId::new_v4(),
            UserId::new_v4(),
            UserId::new_v4(),
            UserId::new_v4(),
        );
        for u in [user, friend, shared, activity_only] {
            f.graph.add_user(u);
        }
        f.graph.add_friendship(user, friend).unwrap();
        f.graph.add_friendship(friend, shared).unwrap();
        f.ranker.set_ranking(user, vec![shared, activity_only]);

        let recommendations = f.engine.recommend(user).await.unwrap();

        let occurrences = recommendations
            .iter()
            .filter(|r| r.user_id == shared)
            .count();
        assert_eq!(occurrences, 1);
        assert_eq!(recommendations[0].user_id, shared);
        assert_eq!(recommendations[0].reason, RecommendReason::Both);
        assert_eq!(recommendations[1].user_id, activity_only);
        assert_eq!(recommendations[1].reason, RecommendReason::Activity);
    }

    #[tokio::test]
    async fn test_activity_priority_then_proximity_order() {
        let f = fixture();
        let user = UserId::new_v4();
        let friend = UserId::new_v4();
        let fof = UserId::new_v4();
        let trending = UserId::new_v4();
        for u in [user, friend, fof, trending] {
            f.graph.add_user(u);
        }
        f.graph.add_friendship(user, friend).unwrap();
        f.graph.add_friendship(friend, fof).unwrap();
        f.ranker.set_ranking(user, vec![trending]);

        let recommendations = f.engine.recommend(user).await.unwrap();
        let ids: Vec<UserId> = recommendations.iter().map(|r| r.user_id).collect();
        assert_eq!(ids, vec![trending, fof]);
        assert_eq!(recommendations[1].reason, RecommendReason::Proximity);
    }

    #[tokio::test]
    async fn test_friends_and_self_are_excluded() {
        let f = fixture();
        let user = UserId::new_v4();
        let friend = UserId::new_v4();
        f.graph.add_user(user);
        f.graph.add_user(friend);
        f.graph.add_friendship(user, friend).unwrap();
        // An activity list polluted with the user and an existing friend.
        f.ranker.set_ranking(user, vec![user, friend]);

        let recommendations = f.engine.recommend(user).await.unwrap();
        assert!(recommendations.is_empty());
    }

    #[tokio::test]
    async fn test_no_candidates_yields_empty_list() {
        let f = fixture();
        let loner = UserId::new_v4();
        f.graph.add_user(loner);

        assert!(f.engine.recommend(loner).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_limit_is_honored() {
        let f = fixture();
        let user = UserId::new_v4();
        f.graph.add_user(user);
        let candidates: Vec<UserId> = (0..30).map(|_| UserId::new_v4()).collect();
        for c in &candidates {
            f.graph.add_user(*c);
        }
        f.ranker.set_ranking(user, candidates);

        let recommendations = f.engine.recommend(user).await.unwrap();
        // Bounded by both the activity fetch limit and the final cap.
        assert_eq!(
            recommendations.len(),
            EngineConfig::default()
                .recommendation_limit
                .min(EngineConfig::default().activity_candidate_limit)
        );
    }
}
