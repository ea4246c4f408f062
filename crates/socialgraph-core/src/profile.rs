use crate::{UserId, UserStats, Visibility};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProfileMetadata {
    pub created_at: chrono::DateTime<chrono::Utc>,
    pub updated_at: chrono::DateTime<chrono::Utc>,
}

/// Read-only view of a user profile as consumed from the external
/// user-management collaborator. Treated as immutable for the duration of
/// a computation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserProfile {
    pub id: UserId,
    pub username: String,
    pub avatar_ref: Option<String>,
    pub bio: Option<String>,
    pub stats: UserStats,
    pub visibility: Visibility,
    pub metadata: ProfileMetadata,
}

impl UserProfile {
    pub fn new(username: String) -> Self {
        let now = chrono::Utc::now();
        Self {
            id: UserId::new_v4(),
            username,
            avatar_ref: None,
            bio: None,
            stats: UserStats::default(),
            visibility: Visibility::default(),
            metadata: ProfileMetadata {
                created_at: now,
                updated_at: now,
            },
        }
    }

    pub fn with_bio(mut self, bio: String) -> Self {
        self.bio = Some(bio);
        self
    }

    pub fn with_avatar_ref(mut self, avatar_ref: String) -> Self {
        self.avatar_ref = Some(avatar_ref);
        self
    }

    pub fn with_visibility(mut self, visibility: Visibility) -> Self {
        self.visibility = visibility;
        self
    }

    pub fn with_stats(mut self, stats: UserStats) -> Self {
        self.stats = stats;
        self
    }
}
