pub mod analytics_cache;
pub mod cache;
pub mod invalidation;
pub mod metrics;
pub mod singleflight;

pub use analytics_cache::*;
pub use cache::*;
pub use invalidation::*;
pub use metrics::*;
pub use singleflight::*;

// Re-export common types for convenience
pub use socialgraph_core::{Result, SocialGraphError, UserId};
