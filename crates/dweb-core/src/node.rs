//! Node status record and the serializable node view shared by the API
//! and the CLI.

use serde::{Deserialize, Serialize};

use crate::identity::NodeId;

/// Weighting metrics used by selection strategies.
///
/// Written by the monitoring side, read whole by strategies. The record is
/// `Copy` so a reader always takes a complete snapshot.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NodeStatus {
    /// Network latency score. Lower is better.
    pub latency_score: u8,
    /// Observed disconnection events.
    pub disconnect_count: u8,
    /// Service price. Set by the market or by the operator.
    pub fee: f32,
    /// Stake. Higher means more trusted.
    pub pledge: u16,
}

impl NodeStatus {
    pub fn new(latency_score: u8, disconnect_count: u8, fee: f32, pledge: u16) -> Self {
        Self {
            latency_score,
            disconnect_count,
            fee,
            pledge,
        }
    }

    /// Count one more disconnection. Saturates at `u8::MAX`.
    pub fn record_disconnect(&mut self) {
        self.disconnect_count = self.disconnect_count.saturating_add(1);
    }

    /// A fee is usable for ranking when it is finite and non-negative.
    pub fn fee_is_valid(&self) -> bool {
        self.fee.is_finite() && self.fee >= 0.0
    }
}

/// Point-in-time view of a registered node.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NodeInfo {
    pub id: NodeId,
    pub owner_key: String,
    pub name: String,
    pub service: String,
    pub endpoint: String,
    pub status: NodeStatus,
    pub children: Vec<NodeId>,
}
