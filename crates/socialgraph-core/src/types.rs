use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

pub type UserId = Uuid;

/// Profile visibility levels controlling discovery.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Visibility {
    Public,
    FriendsOnly,
    Private,
}

impl Default for Visibility {
    fn default() -> Self {
        Visibility::Public
    }
}

impl fmt::Display for Visibility {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Visibility::Public => "public",
            Visibility::FriendsOnly => "friends",
            Visibility::Private => "private",
        };
        write!(f, "{}", s)
    }
}

impl FromStr for Visibility {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "public" => Ok(Visibility::Public),
            "friends" => Ok(Visibility::FriendsOnly),
            "private" => Ok(Visibility::Private),
            other => Err(format!("unknown visibility level: {}", other)),
        }
    }
}

/// Aggregate activity counters attached to a profile.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserStats {
    pub friends_count: u64,
    pub posts_count: u64,
    pub likes_count: u64,
}

/// Strength tier a direct friend is classified into.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CircleKind {
    Close,
    Distant,
    Other,
}

impl fmt::Display for CircleKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            CircleKind::Close => "close",
            CircleKind::Distant => "distant",
            CircleKind::Other => "other",
        };
        write!(f, "{}", s)
    }
}

/// A bucket of direct friends grouped by relationship-strength tier.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Circle {
    pub kind: CircleKind,
    pub members: Vec<UserId>,
    pub size: usize,
}

/// Circle classification result. `degraded` is set when interaction data
/// for one or more pairs was unavailable and substituted with zero.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CirclesResult {
    pub circles: Vec<Circle>,
    pub degraded: bool,
}

/// Count of users first reached at a given hop distance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DistanceBucket {
    pub distance: u32,
    pub count: usize,
}

/// Reachability by hop distance from a source user. Buckets are ordered by
/// ascending distance and empty buckets are omitted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InfluenceDistribution {
    pub total_reach: usize,
    pub distribution: Vec<DistanceBucket>,
}

/// Normalized pairwise relationship score and its raw inputs.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RelationshipStrength {
    pub strength: f64,
    pub common_friends: usize,
    pub interactions: u64,
}

/// Friend request state between two users, as reported by the external
/// friend-request collaborator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RequestStatus {
    None,
    Pending,
    Friends,
}

/// Which candidate generator produced a recommendation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RecommendReason {
    Proximity,
    Activity,
    Both,
}

impl fmt::Display for RecommendReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            RecommendReason::Proximity => "proximity",
            RecommendReason::Activity => "activity",
            RecommendReason::Both => "both",
        };
        write!(f, "{}", s)
    }
}

/// A single friend suggestion with its provenance tag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Recommendation {
    pub user_id: UserId,
    pub reason: RecommendReason,
}
