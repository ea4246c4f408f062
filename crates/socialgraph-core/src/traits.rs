use crate::{RequestStatus, Result, UserId};
use async_trait::async_trait;
use std::collections::HashSet;

/// Read-only adjacency access over the friendship graph.
///
/// An unknown user surfaces as `UserNotFound`, never as a silent empty set,
/// so callers can distinguish "no friends" from "no such user".
#[async_trait]
pub trait GraphStore: Send + Sync {
    async fn neighbors(&self, user: UserId) -> Result<HashSet<UserId>>;
    async fn exists(&self, user: UserId) -> Result<bool>;
}

/// Count of qualifying interactions (comments, likes, messages) between two
/// users over the lookback window. Owned by the external post/message stores.
#[async_trait]
pub trait InteractionSignal: Send + Sync {
    async fn count(&self, a: UserId, b: UserId) -> Result<u64>;
}

/// Whether `target` may be surfaced to `viewer` in discovery contexts.
#[async_trait]
pub trait PrivacyCheck: Send + Sync {
    async fn is_discoverable(&self, viewer: UserId, target: UserId) -> Result<bool>;
}

/// Friend request state between two users.
#[async_trait]
pub trait FriendRequestState: Send + Sync {
    async fn status(&self, viewer: UserId, target: UserId) -> Result<RequestStatus>;
}

/// Opaque, externally ranked activity/affinity candidates for a user.
/// The ordering of the returned list is meaningful and preserved.
#[async_trait]
pub trait ActivityRanker: Send + Sync {
    async fn ranked_candidates(&self, user: UserId, limit: usize) -> Result<Vec<UserId>>;
}
