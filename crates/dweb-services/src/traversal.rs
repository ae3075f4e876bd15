//! Breadth-first provider search.
//!
//! The search starts from a list of entry ids (the children of a service
//! root) and walks the discovery DAG level by level:
//!
//!   - a visited id is skipped without evaluating the strategy;
//!   - a node the strategy accepts becomes the current candidate. It is NOT
//!     marked visited and its children are NOT enqueued;
//!   - a node the strategy rejects is marked visited and all of its children
//!     are enqueued, visited or not. Visited is only checked at dequeue.
//!
//! The last accepted node wins. Strategies that want "the cheapest" carry
//! their own running best and only accept strict improvements.
//!
//! The search is synchronous and holds no lock across its run. Node locks
//! are taken only to copy a status record or a child list.

use std::collections::{HashSet, VecDeque};
use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio_util::sync::CancellationToken;

use dweb_core::NodeId;

use crate::strategy::{Strategy, StrategyError};
use crate::topology::ServiceNode;

/// Resolves ids to live nodes. A removed node resolves to `None`.
pub trait NodeSource {
    fn resolve(&self, id: &NodeId) -> Option<Arc<ServiceNode>>;
}

/// Cancellation signal and deadline, checked before every dequeue.
#[derive(Debug, Clone, Default)]
pub struct SearchControl {
    cancel: Option<CancellationToken>,
    deadline: Option<Instant>,
}

impl SearchControl {
    /// Never interrupted.
    pub fn unbounded() -> Self {
        Self::default()
    }

    pub fn with_cancel(mut self, token: CancellationToken) -> Self {
        self.cancel = Some(token);
        self
    }

    pub fn with_deadline(mut self, deadline: Instant) -> Self {
        self.deadline = Some(deadline);
        self
    }

    /// Deadline relative to now. A zero timeout means no deadline.
    pub fn with_timeout(self, timeout: Duration) -> Self {
        if timeout.is_zero() {
            return self;
        }
        self.with_deadline(Instant::now() + timeout)
    }

    pub fn is_interrupted(&self) -> bool {
        self.cancel.as_ref().is_some_and(|t| t.is_cancelled())
            || self.deadline.is_some_and(|d| Instant::now() >= d)
    }
}

/// A matched provider.
#[derive(Debug, Clone)]
pub struct Selection {
    pub node: Arc<ServiceNode>,
    /// Strategy calls made during the search.
    pub evaluations: usize,
}

/// How a search ended.
#[derive(Debug)]
pub enum Outcome {
    Matched(Selection),
    /// Queue drained without any match.
    NoMatch { evaluations: usize },
    /// Interrupted before the queue drained. Says nothing about matches.
    Cancelled { evaluations: usize },
}

impl Outcome {
    pub fn evaluations(&self) -> usize {
        match self {
            Outcome::Matched(s) => s.evaluations,
            Outcome::NoMatch { evaluations } | Outcome::Cancelled { evaluations } => *evaluations,
        }
    }
}

/// Breadth-first search from `start`, returning the last node `strategy`
/// accepted.
///
/// A strategy error aborts the search and is returned as-is; no partial
/// candidate is reported.
pub fn search<S, P>(
    source: &S,
    start: impl IntoIterator<Item = NodeId>,
    strategy: &mut P,
    control: &SearchControl,
) -> Result<Outcome, StrategyError>
where
    S: NodeSource + ?Sized,
    P: Strategy + ?Sized,
{
    let mut queue: VecDeque<NodeId> = start.into_iter().collect();
    let mut visited: HashSet<NodeId> = HashSet::new();
    let mut candidate: Option<Arc<ServiceNode>> = None;
    let mut evaluations = 0usize;

    while let Some(id) = queue.pop_front() {
        if control.is_interrupted() {
            return Ok(Outcome::Cancelled { evaluations });
        }
        if visited.contains(&id) {
            continue;
        }
        // Deregistered after it was enqueued.
        let Some(node) = source.resolve(&id) else {
            visited.insert(id);
            continue;
        };

        evaluations += 1;
        if strategy.evaluate(&node)? {
            tracing::trace!(node = id.short(), "candidate");
            candidate = Some(node);
        } else {
            queue.extend(node.children());
            visited.insert(id);
        }
    }

    Ok(match candidate {
        Some(node) => Outcome::Matched(Selection { node, evaluations }),
        None => Outcome::NoMatch { evaluations },
    })
}
