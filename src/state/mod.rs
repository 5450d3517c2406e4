//! State module for tracking crawl progress
//!
//! # Components
//!
//! - `VisitedRegistry`: the set of claimed canonical URLs, gating at-most-once processing
//! - `NodeState`: the lifecycle of a single crawl node, from claim to join

mod node_state;
mod registry;

// Re-export main types
pub use node_state::NodeState;
pub use registry::VisitedRegistry;
