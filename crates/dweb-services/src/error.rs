//! Selection and registry errors.

use dweb_core::NodeId;
use thiserror::Error;

use crate::strategy::StrategyError;

/// Why a selection produced no node.
///
/// `NotFound`, `NoMatch` and `Cancelled` are distinct outcomes: a cancelled
/// search says nothing about whether a match exists.
#[derive(Debug, Error)]
pub enum SelectError {
    /// No topology is registered for the service.
    #[error("no provider of service type {0:?} exists")]
    NotFound(String),

    /// Providers exist but none satisfied the strategy.
    #[error("no provider of {0:?} satisfied the strategy")]
    NoMatch(String),

    /// The search hit its deadline or was cancelled before finishing.
    #[error("selection for {0:?} was cancelled")]
    Cancelled(String),

    /// The strategy itself failed; the search was aborted.
    #[error("strategy fault: {0}")]
    Strategy(#[from] StrategyError),
}

/// Errors from registration and monitoring writes.
#[derive(Debug, Error)]
pub enum TopologyError {
    #[error("service {0:?} already has a root")]
    RootExists(String),

    #[error("unknown service {0:?}")]
    UnknownService(String),

    #[error("unknown node {0}")]
    UnknownNode(NodeId),

    #[error("node id {0} was already admitted")]
    DuplicateId(NodeId),

    #[error("node {node} has unusable fee {fee}; fees must be finite and non-negative")]
    InvalidFee { node: NodeId, fee: f32 },

    #[error("node {node} provides {found:?}, expected {expected:?}")]
    ServiceMismatch {
        node: NodeId,
        expected: String,
        found: String,
    },
}
