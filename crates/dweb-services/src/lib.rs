//! dweb-services: the provider topology, breadth-first selection, the
//! event log sink and the mDNS responder.

pub mod error;
pub mod event_log;
pub mod mdns;
pub mod strategy;
pub mod topology;
pub mod traversal;

pub use error::{SelectError, TopologyError};
pub use event_log::EventLog;
pub use strategy::{Strategy, StrategyError, StrategyKind};
pub use topology::{ServiceNode, Topology};
pub use traversal::{NodeSource, Outcome, SearchControl, Selection};
