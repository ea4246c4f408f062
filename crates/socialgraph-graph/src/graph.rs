use async_trait::async_trait;
use dashmap::DashMap;
use socialgraph_core::{GraphStore, Result, SocialGraphError, UserId};
use std::collections::HashSet;
use tokio::sync::broadcast;
use tracing::debug;

const EVENT_CHANNEL_CAPACITY: usize = 256;

/// Mutation events emitted by [`FriendshipGraph`] and consumed by the cache
/// invalidation watcher.
#[derive(Debug, Clone)]
pub enum GraphEvent {
    UserAdded(UserId),
    UserRemoved(UserId),
    FriendshipAdded { a: UserId, b: UserId },
    FriendshipRemoved { a: UserId, b: UserId },
    InteractionRecorded { a: UserId, b: UserId },
}

/// In-memory friendship graph: undirected, unweighted adjacency over user
/// IDs. Edge weight is derived at query time from interaction signals, never
/// stored on the edge.
pub struct FriendshipGraph {
    adjacency: DashMap<UserId, HashSet<UserId>>,
    events: broadcast::Sender<GraphEvent>,
}

impl FriendshipGraph {
    pub fn new() -> Self {
        let (events, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
        Self {
            adjacency: DashMap::new(),
            events,
        }
    }

    /// Register a user with no friends. Returns false if already present.
    pub fn add_user(&self, user: UserId) -> bool {
        let added = match self.adjacency.entry(user) {
            dashmap::mapref::entry::Entry::Occupied(_) => false,
            dashmap::mapref::entry::Entry::Vacant(e) => {
                e.insert(HashSet::new());
                true
            }
        };
        if added {
            let _ = self.events.send(GraphEvent::UserAdded(user));
        }
        added
    }

    /// Add an undirected friendship edge. Both users must exist.
    pub fn add_friendship(&self, a: UserId, b: UserId) -> Result<()> {
        if a == b {
            return Err(SocialGraphError::InvalidParameter(
                "cannot create a self-friendship".to_string(),
            ));
        }
        if !self.adjacency.contains_key(&a) {
            return Err(SocialGraphError::UserNotFound(a));
        }
        if !self.adjacency.contains_key(&b) {
            return Err(SocialGraphError::UserNotFound(b));
        }

        let inserted = {
            let mut set_a = self
                .adjacency
                .get_mut(&a)
                .ok_or(SocialGraphError::UserNotFound(a))?;
            set_a.insert(b)
        };
        {
            let mut set_b = self
                .adjacency
                .get_mut(&b)
                .ok_or(SocialGraphError::UserNotFound(b))?;
            set_b.insert(a);
        }

        if inserted {
            debug!(%a, %b, "friendship added");
            let _ = self.events.send(GraphEvent::FriendshipAdded { a, b });
        }
        Ok(())
    }

    /// Remove a friendship edge. Removing an absent edge is a no-op.
    pub fn remove_friendship(&self, a: UserId, b: UserId) -> Result<()> {
        if !self.adjacency.contains_key(&a) {
            return Err(SocialGraphError::UserNotFound(a));
        }
        if !self.adjacency.contains_key(&b) {
            return Err(SocialGraphError::UserNotFound(b));
        }

        let removed = {
            let mut set_a = self
                .adjacency
                .get_mut(&a)
                .ok_or(SocialGraphError::UserNotFound(a))?;
            set_a.remove(&b)
        };
        {
            let mut set_b = self
                .adjacency
                .get_mut(&b)
                .ok_or(SocialGraphError::UserNotFound(b))?;
            set_b.remove(&a);
        }

        if removed {
            debug!(%a, %b, "friendship removed");
            let _ = self.events.send(GraphEvent::FriendshipRemoved { a, b });
        }
        Ok(())
    }

    /// Remove a user and every edge incident to it.
    pub fn remove_user(&self, user: UserId) -> Result<()> {
        let (_, neighbors) = self
            .adjacency
            .remove(&user)
            .ok_or(SocialGraphError::UserNotFound(user))?;

        for neighbor in neighbors {
            if let Some(mut set) = self.adjacency.get_mut(&neighbor) {
                set.remove(&user);
            }
        }
        let _ = self.events.send(GraphEvent::UserRemoved(user));
        Ok(())
    }

    pub fn are_friends(&self, a: UserId, b: UserId) -> bool {
        self.adjacency
            .get(&a)
            .map(|set| set.contains(&b))
            .unwrap_or(false)
    }

    pub fn user_count(&self) -> usize {
        self.adjacency.len()
    }

    pub fn friendship_count(&self) -> usize {
        let degree_sum: usize = self.adjacency.iter().map(|e| e.value().len()).sum();
        degree_sum / 2
    }

    /// Subscribe to mutation events.
    pub fn subscribe(&self) -> broadcast::Receiver<GraphEvent> {
        self.events.subscribe()
    }

    /// Handle for collaborators (interaction stores) that publish events
    /// into the same stream.
    pub fn event_sender(&self) -> broadcast::Sender<GraphEvent> {
        self.events.clone()
    }
}

impl Default for FriendshipGraph {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl GraphStore for FriendshipGraph {
    async fn neighbors(&self, user: UserId) -> Result<HashSet<UserId>> {
        self.adjacency
            .get(&user)
            .map(|set| set.clone())
            .ok_or(SocialGraphError::UserNotFound(user))
    }

    async fn exists(&self, user: UserId) -> Result<bool> {
        Ok(self.adjacency.contains_key(&user))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_add_and_query_friendship() {
        let graph = FriendshipGraph::new();
        let alice = UserId::new_v4();
        let bob = UserId::new_v4();
        graph.add_user(alice);
        graph.add_user(bob);

        graph.add_friendship(alice, bob).unwrap();
        assert!(graph.are_friends(alice, bob));
        assert!(graph.are_friends(bob, alice));
        assert_eq!(graph.friendship_count(), 1);

        let neighbors = graph.neighbors(alice).await.unwrap();
        assert_eq!(neighbors.len(), 1);
        assert!(neighbors.contains(&bob));
    }

    #[tokio::test]
    async fn test_unknown_user_is_not_found() {
        let graph = FriendshipGraph::new();
        let ghost = UserId::new_v4();

        let err = graph.neighbors(ghost).await.unwrap_err();
        assert!(matches!(err, SocialGraphError::UserNotFound(id) if id == ghost));
        assert!(!graph.exists(ghost).await.unwrap());
    }

    #[tokio::test]
    async fn test_zero_friends_is_empty_set_not_error() {
        let graph = FriendshipGraph::new();
        let loner = UserId::new_v4();
        graph.add_user(loner);

        let neighbors = graph.neighbors(loner).await.unwrap();
        assert!(neighbors.is_empty());
    }

    #[tokio::test]
    async fn test_remove_friendship_and_user() {
        let graph = FriendshipGraph::new();
        let a = UserId::new_v4();
        let b = UserId::new_v4();
        let c = UserId::new_v4();
        for u in [a, b, c] {
            graph.add_user(u);
        }
        graph.add_friendship(a, b).unwrap();
        graph.add_friendship(a, c).unwrap();

        graph.remove_friendship(a, b).unwrap();
        assert!(!graph.are_friends(a, b));
        assert!(graph.are_friends(a, c));

        graph.remove_user(c).unwrap();
        assert!(graph.neighbors(a).await.unwrap().is_empty());
        assert!(graph.neighbors(c).await.is_err());
    }

    #[tokio::test]
    async fn test_self_friendship_rejected() {
        let graph = FriendshipGraph::new();
        let a = UserId::new_v4();
        graph.add_user(a);

        let err = graph.add_friendship(a, a).unwrap_err();
        assert!(matches!(err, SocialGraphError::InvalidParameter(_)));
    }

    #[tokio::test]
    async fn test_mutation_events_are_broadcast() {
        let graph = FriendshipGraph::new();
        let mut rx = graph.subscribe();
        let a = UserId::new_v4();
        let b = UserId::new_v4();
        graph.add_user(a);
        graph.add_user(b);
        graph.add_friendship(a, b).unwrap();

        assert!(matches!(rx.recv().await.unwrap(), GraphEvent::UserAdded(u) if u == a));
        assert!(matches!(rx.recv().await.unwrap(), GraphEvent::UserAdded(u) if u == b));
        match rx.recv().await.unwrap() {
            GraphEvent::FriendshipAdded { a: ea, b: eb } => {
                assert_eq!((ea, eb), (a, b));
            }
            other => panic!("unexpected event: {:?}", other),
        }
    }
}
