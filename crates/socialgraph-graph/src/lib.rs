pub mod collaborators;
pub mod graph;
pub mod traversal;

pub use collaborators::*;
pub use graph::*;
pub use traversal::*;

// Re-export common types for convenience
pub use socialgraph_core::{Result, SocialGraphError, UserId};
