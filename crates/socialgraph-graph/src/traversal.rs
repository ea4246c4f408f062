use rustc_hash::FxHashSet;
use socialgraph_core::{
    DistanceBucket, GraphStore, InfluenceDistribution, Result, SocialGraphError, UserId,
    MAX_HOP_DEPTH,
};
use std::collections::{BTreeMap, VecDeque};
use std::sync::Arc;

/// Breadth-first reachability over the friendship graph.
///
/// Standard visited-set discipline: the first distance assigned to a user is
/// the shortest, and a user is never re-counted at a larger distance.
pub struct InfluenceCalculator {
    store: Arc<dyn GraphStore>,
}

impl InfluenceCalculator {
    pub fn new(store: Arc<dyn GraphStore>) -> Self {
        Self { store }
    }

    /// Users reachable within `max_distance` hops of `start`, in discovery
    /// order, each paired with its shortest hop distance. The starting user
    /// is excluded.
    pub async fn reach_by_distance(
        &self,
        start: UserId,
        max_distance: u32,
    ) -> Result<Vec<(UserId, u32)>> {
        if !(1..=MAX_HOP_DEPTH).contains(&max_distance) {
            return Err(SocialGraphError::InvalidParameter(format!(
                "max_distance must be in 1..={}, got {}",
                MAX_HOP_DEPTH, max_distance
            )));
        }

        let mut visited = FxHashSet::default();
        visited.insert(start);
        let mut queue: VecDeque<(UserId, u32)> = VecDeque::new();
        queue.push_back((start, 0));
        let mut discovered: Vec<(UserId, u32)> = Vec::new();

        while let Some((current, depth)) = queue.pop_front() {
            if depth == max_distance {
                continue;
            }
            // Neighbor sets are unordered; sort the frontier batch so the
            // discovery order is stable across runs.
            let mut neighbors: Vec<UserId> =
                self.store.neighbors(current).await?.into_iter().collect();
            neighbors.sort_unstable();

            for neighbor in neighbors {
                if visited.insert(neighbor) {
                    discovered.push((neighbor, depth + 1));
                    queue.push_back((neighbor, depth + 1));
                }
            }
        }

        Ok(discovered)
    }

    /// Reach counts bucketed by hop distance. A user with zero friends
    /// yields an empty distribution, not an error.
    pub async fn compute_influence(
        &self,
        start: UserId,
        max_distance: u32,
    ) -> Result<InfluenceDistribution> {
        let discovered = self.reach_by_distance(start, max_distance).await?;

        let mut buckets: BTreeMap<u32, usize> = BTreeMap::new();
        for (_, distance) in &discovered {
            *buckets.entry(*distance).or_insert(0) += 1;
        }

        Ok(InfluenceDistribution {
            total_reach: discovered.len(),
            distribution: buckets
                .into_iter()
                .map(|(distance, count)| DistanceBucket { distance, count })
                .collect(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::FriendshipGraph;

    fn chain(n: usize) -> (Arc<FriendshipGraph>, Vec<UserId>) {
        let graph = Arc::new(FriendshipGraph::new());
        let users: Vec<UserId> = (0..n).map(|_| UserId::new_v4()).collect();
        for u in &users {
            graph.add_user(*u);
        }
        for pair in users.windows(2) {
            graph.add_friendship(pair[0], pair[1]).unwrap();
        }
        (graph, users)
    }

    #[tokio::test]
    async fn test_chain_distribution() {
        let (graph, users) = chain(4);
        let calc = InfluenceCalculator::new(graph);

        let influence = calc.compute_influence(users[0], 3).await.unwrap();
        assert_eq!(influence.total_reach, 3);
        let expected = vec![
            DistanceBucket { distance: 1, count: 1 },
            DistanceBucket { distance: 2, count: 1 },
            DistanceBucket { distance: 3, count: 1 },
        ];
        assert_eq!(influence.distribution, expected);
    }

    #[tokio::test]
    async fn test_depth_capping() {
        let (graph, users) = chain(4);
        let calc = InfluenceCalculator::new(graph);

        let influence = calc.compute_influence(users[0], 1).await.unwrap();
        assert_eq!(influence.total_reach, 1);
        assert_eq!(
            influence.distribution,
            vec![DistanceBucket { distance: 1, count: 1 }]
        );
    }

    #[tokio::test]
    async fn test_shortest_distance_wins_in_diamond() {
        // a - b, a - c, b - d, c - d: d is reachable twice at distance 2.
        let graph = Arc::new(FriendshipGraph::new());
        let (a, b, c, d) = (
            UserId::new_v4(),
            UserId::new_v4(),
            UserId::new_v4(),
            UserId::new_v4(),
        );
        for u in [a, b, c, d] {
            graph.add_user(u);
        }
        graph.add_friendship(a, b).unwrap();
        graph.add_friendship(a, c).unwrap();
        graph.add_friendship(b, d).unwrap();
        graph.add_friendship(c, d).unwrap();

        let calc = InfluenceCalculator::new(graph);
        let influence = calc.compute_influence(a, 3).await.unwrap();

        assert_eq!(influence.total_reach, 3);
        let expected = vec![
            DistanceBucket { distance: 1, count: 2 },
            DistanceBucket { distance: 2, count: 1 },
        ];
        assert_eq!(influence.distribution, expected);
    }

    #[tokio::test]
    async fn test_source_never_included() {
        let (graph, users) = chain(3);
        let calc = InfluenceCalculator::new(graph);

        let discovered = calc.reach_by_distance(users[0], 3).await.unwrap();
        assert!(discovered.iter().all(|(u, _)| *u != users[0]));
    }

    #[tokio::test]
    async fn test_zero_friends_yields_empty_distribution() {
        let graph = Arc::new(FriendshipGraph::new());
        let loner = UserId::new_v4();
        graph.add_user(loner);

        let calc = InfluenceCalculator::new(graph);
        let influence = calc.compute_influence(loner, 3).await.unwrap();
        assert_eq!(influence.total_reach, 0);
        assert!(influence.distribution.is_empty());
    }

    #[tokio::test]
    async fn test_unknown_user_surfaces_not_found() {
        let graph = Arc::new(FriendshipGraph::new());
        let calc = InfluenceCalculator::new(graph);

        let err = calc.compute_influence(UserId::new_v4(), 3).await.unwrap_err();
        assert!(matches!(err, SocialGraphError::UserNotFound(_)));
    }

    #[tokio::test]
    async fn test_out_of_range_depth_rejected() {
        let (graph, users) = chain(2);
        let calc = InfluenceCalculator::new(graph);

        for depth in [0, MAX_HOP_DEPTH + 1] {
            let err = calc.compute_influence(users[0], depth).await.unwrap_err();
            assert!(matches!(err, SocialGraphError::InvalidParameter(_)));
        }
    }
}
