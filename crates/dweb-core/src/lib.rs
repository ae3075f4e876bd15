//! dweb-core: shared types, node identity, and configuration.
//! All other dweb crates depend on this one.

pub mod config;
pub mod identity;
pub mod node;

pub use identity::NodeId;
pub use node::{NodeInfo, NodeStatus};
