use crate::UserId;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum SocialGraphError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("User not found: {0}")]
    UserNotFound(UserId),

    #[error("{upstream} call exceeded its deadline")]
    UpstreamTimeout { upstream: &'static str },

    #[error("Cache unavailable: {0}")]
    CacheUnavailable(String),

    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),

    #[error("Graph error: {0}")]
    Graph(String),
}

impl SocialGraphError {
    /// Whether the calling component may retry the failed operation.
    pub fn is_retryable(&self) -> bool {
        matches!(self, SocialGraphError::UpstreamTimeout { .. })
    }
}

pub type Result<T> = std::result::Result<T, SocialGraphError>;
