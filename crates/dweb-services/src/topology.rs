//! Topology registry: per-service discovery DAGs.
//!
//! Nodes live in an arena keyed by id. A node's children are an ordered list
//! of ids, so a node can sit under several parents (diamonds) and an edge can
//! point back at an ancestor (cycles) without any ownership cycle.
//!
//! Each service has a root node. The root is never a selection candidate;
//! its children are the entry points the traversal starts from.
//!
//! Every provider stays reachable from its service root. Removing a node
//! also removes whatever could only be reached through it, so a service's
//! node count is always its reachable provider count.
//!
//! Locking: the service and node maps are `DashMap`s. Each node guards its
//! status, endpoint and children with its own lock, held only for the copy
//! in or out. Structural writes (roots, admissions, edges, removals) are
//! serialized by one registry-wide mutex; readers and the traversal never
//! take it.

use std::collections::{HashSet, VecDeque};
use std::sync::Arc;

use dashmap::{DashMap, DashSet};
use parking_lot::{Mutex, RwLock};

use dweb_core::identity::node_id_now;
use dweb_core::{NodeId, NodeInfo, NodeStatus};

use crate::error::{SelectError, TopologyError};
use crate::strategy::Strategy;
use crate::traversal::{self, NodeSource, Outcome, SearchControl, Selection};

/// One provider of a service.
#[derive(Debug)]
pub struct ServiceNode {
    id: NodeId,
    owner_key: String,
    name: String,
    service: String,
    endpoint: RwLock<String>,
    status: RwLock<NodeStatus>,
    children: RwLock<Vec<NodeId>>,
}

impl ServiceNode {
    pub fn new(
        id: NodeId,
        owner_key: impl Into<String>,
        name: impl Into<String>,
        service: impl Into<String>,
        endpoint: impl Into<String>,
    ) -> Self {
        Self {
            id,
            owner_key: owner_key.into(),
            name: name.into(),
            service: service.into(),
            endpoint: RwLock::new(endpoint.into()),
            status: RwLock::new(NodeStatus::default()),
            children: RwLock::new(Vec::new()),
        }
    }

    /// Create a node with a freshly derived id.
    pub fn register(
        name: &str,
        owner_key: impl Into<String>,
        service: impl Into<String>,
        endpoint: impl Into<String>,
    ) -> Self {
        Self::new(node_id_now(name), owner_key, name, service, endpoint)
    }

    pub fn with_status(self, status: NodeStatus) -> Self {
        *self.status.write() = status;
        self
    }

    pub fn id(&self) -> &NodeId {
        &self.id
    }

    pub fn owner_key(&self) -> &str {
        &self.owner_key
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn service(&self) -> &str {
        &self.service
    }

    pub fn endpoint(&self) -> String {
        self.endpoint.read().clone()
    }

    /// Whole-record copy of the current status.
    pub fn status(&self) -> NodeStatus {
        *self.status.read()
    }

    /// Snapshot of the child list.
    pub fn children(&self) -> Vec<NodeId> {
        self.children.read().clone()
    }

    pub fn info(&self) -> NodeInfo {
        NodeInfo {
            id: self.id.clone(),
            owner_key: self.owner_key.clone(),
            name: self.name.clone(),
            service: self.service.clone(),
            endpoint: self.endpoint(),
            status: self.status(),
            children: self.children(),
        }
    }

    fn set_status(&self, status: NodeStatus) {
        *self.status.write() = status;
    }

    fn set_endpoint(&self, endpoint: String) {
        *self.endpoint.write() = endpoint;
    }

    /// Append a child edge. Returns false if the edge already exists.
    fn add_child(&self, child: NodeId) -> bool {
        let mut children = self.children.write();
        if children.contains(&child) {
            return false;
        }
        children.push(child);
        true
    }

    fn drop_child(&self, child: &NodeId) {
        self.children.write().retain(|c| c != child);
    }
}

/// Service name → root, plus the node arena.
///
/// Cloning is cheap: clones share the same maps.
#[derive(Clone, Default)]
pub struct Topology {
    roots: Arc<DashMap<String, NodeId>>,
    nodes: Arc<DashMap<NodeId, Arc<ServiceNode>>>,
    /// Every id ever admitted. Ids are never reused, even after removal.
    admitted: Arc<DashSet<NodeId>>,
    structure: Arc<Mutex<()>>,
}

impl Topology {
    pub fn new() -> Self {
        Self::default()
    }

    /// Root node for a service.
    pub fn lookup(&self, service: &str) -> Result<Arc<ServiceNode>, SelectError> {
        self.roots
            .get(service)
            .and_then(|root| self.get(root.value()))
            .ok_or_else(|| SelectError::NotFound(service.to_string()))
    }

    pub fn get(&self, id: &NodeId) -> Option<Arc<ServiceNode>> {
        self.nodes.get(id).map(|n| n.value().clone())
    }

    /// Register a new service type with an empty root.
    pub fn create_root(&self, service: &str) -> Result<Arc<ServiceNode>, TopologyError> {
        let _guard = self.structure.lock();
        match self.roots.entry(service.to_string()) {
            dashmap::mapref::entry::Entry::Occupied(_) => {
                Err(TopologyError::RootExists(service.to_string()))
            }
            dashmap::mapref::entry::Entry::Vacant(slot) => {
                let root = self.admit(ServiceNode::register(service, "", service, ""))?;
                slot.insert(root.id().clone());
                tracing::info!(service, root = root.id().short(), "service root created");
                Ok(root)
            }
        }
    }

    /// Admit a node and hang it under `parent`.
    pub fn insert_child(
        &self,
        parent: &NodeId,
        node: ServiceNode,
    ) -> Result<Arc<ServiceNode>, TopologyError> {
        let parent_node = self
            .get(parent)
            .ok_or_else(|| TopologyError::UnknownNode(parent.clone()))?;
        check_same_service(&parent_node, &node)?;
        check_fee(node.id(), &node.status())?;

        let _guard = self.structure.lock();
        // The parent may have been swept while we were checking.
        if self.get(parent).is_none() {
            return Err(TopologyError::UnknownNode(parent.clone()));
        }
        let node = self.admit(node)?;
        parent_node.add_child(node.id().clone());
        tracing::debug!(
            service = node.service(),
            parent = parent.short(),
            node = node.id().short(),
            "node joined"
        );
        Ok(node)
    }

    /// Admit a node directly under its service root.
    pub fn insert(&self, node: ServiceNode) -> Result<Arc<ServiceNode>, TopologyError> {
        let root = self.root_id(node.service())?;
        self.insert_child(&root, node)
    }

    /// Add another parent edge for an already-admitted node.
    ///
    /// Edges may close cycles; the traversal guards against them.
    pub fn link(&self, parent: &NodeId, child: &NodeId) -> Result<(), TopologyError> {
        let parent_node = self
            .get(parent)
            .ok_or_else(|| TopologyError::UnknownNode(parent.clone()))?;
        let child_node = self
            .get(child)
            .ok_or_else(|| TopologyError::UnknownNode(child.clone()))?;
        check_same_service(&parent_node, &child_node)?;

        let _guard = self.structure.lock();
        for id in [parent, child] {
            if self.get(id).is_none() {
                return Err(TopologyError::UnknownNode(id.clone()));
            }
        }
        if parent_node.add_child(child.clone()) {
            tracing::debug!(parent = parent.short(), child = child.short(), "edge added");
        }
        Ok(())
    }

    /// Deregister a node.
    ///
    /// Edges pointing at it are pruned. Descendants still reachable from the
    /// root through another parent stay; the rest are removed with it.
    /// Removing a root removes the whole service.
    pub fn remove(&self, id: &NodeId) -> Result<Arc<ServiceNode>, TopologyError> {
        let _guard = self.structure.lock();
        let (_, node) = self
            .nodes
            .remove(id)
            .ok_or_else(|| TopologyError::UnknownNode(id.clone()))?;

        self.roots.remove_if(node.service(), |_, root| root == id);
        for entry in self.nodes.iter() {
            if entry.value().service() == node.service() {
                entry.value().drop_child(id);
            }
        }
        let swept = self.sweep_unreachable(node.service());

        tracing::info!(
            service = node.service(),
            node = id.short(),
            swept,
            "node removed"
        );
        Ok(node)
    }

    /// Drop every node of `service` the root can no longer reach. Caller
    /// holds the structure lock.
    fn sweep_unreachable(&self, service: &str) -> usize {
        let mut reachable: HashSet<NodeId> = HashSet::new();
        if let Some(root) = self.roots.get(service).map(|r| r.value().clone()) {
            let mut queue = VecDeque::from([root]);
            while let Some(id) = queue.pop_front() {
                if !reachable.insert(id.clone()) {
                    continue;
                }
                if let Some(node) = self.get(&id) {
                    queue.extend(node.children());
                }
            }
        }

        let unreachable: Vec<NodeId> = self
            .nodes
            .iter()
            .filter(|n| n.value().service() == service && !reachable.contains(n.key()))
            .map(|n| n.key().clone())
            .collect();
        for id in &unreachable {
            self.nodes.remove(id);
            tracing::debug!(service, node = id.short(), "unreachable node removed");
        }
        unreachable.len()
    }

    /// Replace a node's status record. Called by monitoring.
    pub fn update_status(&self, id: &NodeId, status: NodeStatus) -> Result<(), TopologyError> {
        check_fee(id, &status)?;
        let node = self
            .get(id)
            .ok_or_else(|| TopologyError::UnknownNode(id.clone()))?;
        node.set_status(status);
        tracing::trace!(node = id.short(), ?status, "status updated");
        Ok(())
    }

    pub fn update_endpoint(&self, id: &NodeId, endpoint: &str) -> Result<(), TopologyError> {
        let node = self
            .get(id)
            .ok_or_else(|| TopologyError::UnknownNode(id.clone()))?;
        node.set_endpoint(endpoint.to_string());
        tracing::info!(node = id.short(), endpoint, "endpoint updated");
        Ok(())
    }

    /// Registered services with their provider counts (roots excluded).
    pub fn services(&self) -> Vec<(String, usize)> {
        let mut services: Vec<(String, usize)> = self
            .roots
            .iter()
            .map(|entry| {
                let root = entry.value();
                let providers = self
                    .nodes
                    .iter()
                    .filter(|n| n.value().service() == entry.key() && n.key() != root)
                    .count();
                (entry.key().clone(), providers)
            })
            .collect();
        services.sort();
        services
    }

    /// Total nodes in the arena, roots included.
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Pick a provider of `service`: breadth-first from the root's children,
    /// last strategy match wins.
    pub fn select<P>(
        &self,
        service: &str,
        strategy: &mut P,
        control: &SearchControl,
    ) -> Result<Selection, SelectError>
    where
        P: Strategy + ?Sized,
    {
        let root = self.lookup(service)?;
        let outcome = traversal::search(self, root.children(), strategy, control)?;

        match outcome {
            Outcome::Matched(selection) => {
                tracing::debug!(
                    service,
                    strategy = strategy.name(),
                    node = selection.node.id().short(),
                    evaluations = selection.evaluations,
                    "provider selected"
                );
                Ok(selection)
            }
            Outcome::NoMatch { evaluations } => {
                tracing::debug!(service, strategy = strategy.name(), evaluations, "no match");
                Err(SelectError::NoMatch(service.to_string()))
            }
            Outcome::Cancelled { evaluations } => {
                tracing::warn!(service, strategy = strategy.name(), evaluations, "selection cancelled");
                Err(SelectError::Cancelled(service.to_string()))
            }
        }
    }

    fn root_id(&self, service: &str) -> Result<NodeId, TopologyError> {
        self.roots
            .get(service)
            .map(|r| r.value().clone())
            .ok_or_else(|| TopologyError::UnknownService(service.to_string()))
    }

    fn admit(&self, node: ServiceNode) -> Result<Arc<ServiceNode>, TopologyError> {
        if !self.admitted.insert(node.id().clone()) {
            return Err(TopologyError::DuplicateId(node.id().clone()));
        }
        let node = Arc::new(node);
        self.nodes.insert(node.id().clone(), node.clone());
        Ok(node)
    }
}

impl NodeSource for Topology {
    fn resolve(&self, id: &NodeId) -> Option<Arc<ServiceNode>> {
        self.get(id)
    }
}

/// Strategies rank on fee, so an unusable one is refused at the door.
fn check_fee(id: &NodeId, status: &NodeStatus) -> Result<(), TopologyError> {
    if !status.fee_is_valid() {
        return Err(TopologyError::InvalidFee {
            node: id.clone(),
            fee: status.fee,
        });
    }
    Ok(())
}

fn check_same_service(parent: &ServiceNode, child: &ServiceNode) -> Result<(), TopologyError> {
    if parent.service() != child.service() {
        return Err(TopologyError::ServiceMismatch {
            node: child.id().clone(),
            expected: parent.service().to_string(),
            found: child.service().to_string(),
        });
    }
    Ok(())
}
