//! Selection strategies.
//!
//! A strategy is asked about one node at a time, in breadth-first order, and
//! answers whether that node should replace the current candidate. The
//! search keeps the last node accepted, so every built-in strategy keeps a
//! running best and accepts only strict improvements on it. Ties keep the
//! node seen first.
//!
//! Strategies are single-use: build a fresh one per search.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use dweb_core::config::CompositeWeights;
use dweb_core::{NodeId, NodeStatus};

use crate::topology::ServiceNode;

#[derive(Debug, Error)]
pub enum StrategyError {
    #[error("node {node} has unusable fee {fee}")]
    InvalidFee { node: NodeId, fee: f32 },

    #[error("{0}")]
    Failed(String),
}

/// Decides whether a node becomes the new candidate.
pub trait Strategy {
    /// Short name used in logs and responses.
    fn name(&self) -> &str;

    fn evaluate(&mut self, node: &ServiceNode) -> Result<bool, StrategyError>;
}

// ── Closures ──────────────────────────────────────────────────────────────────

/// Strategy backed by a closure. See [`from_fn`] and [`predicate`].
pub struct FnStrategy<F> {
    name: String,
    f: F,
}

impl<F> Strategy for FnStrategy<F>
where
    F: FnMut(&ServiceNode) -> Result<bool, StrategyError>,
{
    fn name(&self) -> &str {
        &self.name
    }

    fn evaluate(&mut self, node: &ServiceNode) -> Result<bool, StrategyError> {
        (self.f)(node)
    }
}

/// Wrap a fallible closure as a strategy.
pub fn from_fn<F>(name: impl Into<String>, f: F) -> FnStrategy<F>
where
    F: FnMut(&ServiceNode) -> Result<bool, StrategyError>,
{
    FnStrategy {
        name: name.into(),
        f,
    }
}

/// Wrap an infallible closure as a strategy.
pub fn predicate<F>(
    name: impl Into<String>,
    mut f: F,
) -> FnStrategy<impl FnMut(&ServiceNode) -> Result<bool, StrategyError>>
where
    F: FnMut(&ServiceNode) -> bool,
{
    from_fn(name, move |node: &ServiceNode| Ok(f(node)))
}

// ── Built-ins ─────────────────────────────────────────────────────────────────

fn checked_status(node: &ServiceNode) -> Result<NodeStatus, StrategyError> {
    let status = node.status();
    if !status.fee_is_valid() {
        return Err(StrategyError::InvalidFee {
            node: node.id().clone(),
            fee: status.fee,
        });
    }
    Ok(status)
}

/// Lowest fee seen so far.
#[derive(Debug, Default)]
pub struct Cheapest {
    best: Option<f32>,
}

impl Cheapest {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Strategy for Cheapest {
    fn name(&self) -> &str {
        "cheapest"
    }

    fn evaluate(&mut self, node: &ServiceNode) -> Result<bool, StrategyError> {
        let fee = checked_status(node)?.fee;
        if self.best.is_some_and(|best| fee >= best) {
            return Ok(false);
        }
        self.best = Some(fee);
        Ok(true)
    }
}

/// Lowest latency score seen so far.
#[derive(Debug, Default)]
pub struct LowestLatency {
    best: Option<u8>,
}

impl LowestLatency {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Strategy for LowestLatency {
    fn name(&self) -> &str {
        "lowest-latency"
    }

    fn evaluate(&mut self, node: &ServiceNode) -> Result<bool, StrategyError> {
        let latency = node.status().latency_score;
        if self.best.is_some_and(|best| latency >= best) {
            return Ok(false);
        }
        self.best = Some(latency);
        Ok(true)
    }
}

/// Fewest disconnects seen so far.
#[derive(Debug, Default)]
pub struct MostReliable {
    best: Option<u8>,
}

impl MostReliable {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Strategy for MostReliable {
    fn name(&self) -> &str {
        "most-reliable"
    }

    fn evaluate(&mut self, node: &ServiceNode) -> Result<bool, StrategyError> {
        let disconnects = node.status().disconnect_count;
        if self.best.is_some_and(|best| disconnects >= best) {
            return Ok(false);
        }
        self.best = Some(disconnects);
        Ok(true)
    }
}

/// Highest pledge seen so far.
#[derive(Debug, Default)]
pub struct HighestPledge {
    best: Option<u16>,
}

impl HighestPledge {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Strategy for HighestPledge {
    fn name(&self) -> &str {
        "highest-pledge"
    }

    fn evaluate(&mut self, node: &ServiceNode) -> Result<bool, StrategyError> {
        let pledge = node.status().pledge;
        if self.best.is_some_and(|best| pledge <= best) {
            return Ok(false);
        }
        self.best = Some(pledge);
        Ok(true)
    }
}

/// Lowest weighted score seen so far. Pledge lowers the score.
#[derive(Debug)]
pub struct Composite {
    weights: CompositeWeights,
    best: Option<f64>,
}

impl Composite {
    pub fn new(weights: CompositeWeights) -> Self {
        Self {
            weights,
            best: None,
        }
    }

    pub fn score(&self, status: &NodeStatus) -> f64 {
        let w = &self.weights;
        f64::from(status.latency_score) * w.latency
            + f64::from(status.disconnect_count) * w.disconnects
            + f64::from(status.fee) * w.fee
            - f64::from(status.pledge) * w.pledge
    }
}

impl Strategy for Composite {
    fn name(&self) -> &str {
        "composite"
    }

    fn evaluate(&mut self, node: &ServiceNode) -> Result<bool, StrategyError> {
        let score = self.score(&checked_status(node)?);
        if self.best.is_some_and(|best| score >= best) {
            return Ok(false);
        }
        self.best = Some(score);
        Ok(true)
    }
}

// ── Named strategies ──────────────────────────────────────────────────────────

/// Built-in strategies, addressable by name over the API and CLI.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum StrategyKind {
    Cheapest,
    LowestLatency,
    MostReliable,
    HighestPledge,
    Composite,
}

impl StrategyKind {
    pub const ALL: [StrategyKind; 5] = [
        StrategyKind::Cheapest,
        StrategyKind::LowestLatency,
        StrategyKind::MostReliable,
        StrategyKind::HighestPledge,
        StrategyKind::Composite,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            StrategyKind::Cheapest => "cheapest",
            StrategyKind::LowestLatency => "lowest-latency",
            StrategyKind::MostReliable => "most-reliable",
            StrategyKind::HighestPledge => "highest-pledge",
            StrategyKind::Composite => "composite",
        }
    }

    /// A fresh strategy with empty running state.
    pub fn build(&self, weights: CompositeWeights) -> Box<dyn Strategy + Send> {
        match self {
            StrategyKind::Cheapest => Box::new(Cheapest::new()),
            StrategyKind::LowestLatency => Box::new(LowestLatency::new()),
            StrategyKind::MostReliable => Box::new(MostReliable::new()),
            StrategyKind::HighestPledge => Box::new(HighestPledge::new()),
            StrategyKind::Composite => Box::new(Composite::new(weights)),
        }
    }
}

impl fmt::Display for StrategyKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Error)]
#[error("unknown strategy {0:?}")]
pub struct UnknownStrategy(pub String);

impl FromStr for StrategyKind {
    type Err = UnknownStrategy;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        StrategyKind::ALL
            .into_iter()
            .find(|k| k.as_str() == s)
            .ok_or_else(|| UnknownStrategy(s.to_string()))
    }
}
