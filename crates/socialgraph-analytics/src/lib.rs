pub mod circles;
pub mod engine;
pub mod recommend;
pub mod scoring;

mod upstream;

pub use circles::*;
pub use engine::*;
pub use recommend::*;
pub use scoring::*;

// Re-export common types for convenience
pub use socialgraph_core::{Result, SocialGraphError, UserId};
