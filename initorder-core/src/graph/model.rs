//! Dependency Model
//!
//! The model owns every node and computes the order in which their
//! participants can be initialized.
//!
//! # Algorithm
//!
//! Ordering simulates initialization one node at a time:
//!
//! 1. Scan pending nodes in insertion order and initialize the first one
//!    that is initializable. Its dependents recompute their state.
//! 2. If none is initializable and cycles are not accepted, fail with
//!    [`DependencyError::CyclicDependency`] naming every pending node.
//! 3. Otherwise force one pending node (chosen by [`ForceStrategy`]) and
//!    go back to step 1.
//!
//! Every pass initializes exactly one node or fails, so ordering finishes
//! in at most N passes of N-node scans.

use std::fmt;

use indexmap::IndexMap;
use smallvec::SmallVec;
use tracing::{debug, trace, warn};

use super::node::{Edge, Node, NodeId, NodeState};
use crate::config::{ForceStrategy, ResolverConfig};
use crate::error::{DependencyError, DependencyResult};
use crate::participant::Participant;

/// One entry of a computed order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResolutionStep {
    pub node: NodeId,

    /// The node was initialized before all its required providers to
    /// break a cycle.
    pub forced: bool,
}

/// A set of participants and the dependency edges between them.
///
/// ```
/// use initorder_core::{Declaration, DependencyModel};
///
/// let mut model = DependencyModel::new();
/// model.add(Declaration::new("web").requires("db")).unwrap();
/// model.add(Declaration::new("db")).unwrap();
///
/// let order: Vec<_> = model
///     .dependency_ordered_objects(false)
///     .unwrap()
///     .into_iter()
///     .map(|d| *d.id())
///     .collect();
/// assert_eq!(order, ["db", "web"]);
/// ```
pub struct DependencyModel<P: Participant> {
    /// Nodes by key. A node's position is its [`NodeId`].
    nodes: IndexMap<P::Key, Node<P>>,

    /// Edges reflect the current node set.
    linked: bool,
}

impl<P: Participant> DependencyModel<P> {
    /// Create an empty model.
    pub fn new() -> Self {
        Self {
            nodes: IndexMap::new(),
            linked: false,
        }
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            nodes: IndexMap::with_capacity(capacity),
            linked: false,
        }
    }

    /// Build and link a model from participants in the given order.
    ///
    /// Fails on duplicate keys or providers that are not among the
    /// participants.
    pub fn from_participants<I>(participants: I) -> DependencyResult<Self>
    where
        I: IntoIterator<Item = P>,
    {
        let participants = participants.into_iter();
        let mut model = Self::with_capacity(participants.size_hint().0);
        for participant in participants {
            model.add(participant)?;
        }
        model.link()?;
        Ok(model)
    }

    /// Register a node.
    ///
    /// Nodes are keyed by their participant; adding a second node with the
    /// same key fails with [`DependencyError::DuplicateNode`]. A node that
    /// is already initialized would never be ordered and fails with
    /// [`DependencyError::AlreadyInitialized`].
    ///
    /// The node is reclassified against the providers registered so far,
    /// so its state is current without waiting for [`link`](Self::link).
    pub fn add_node(&mut self, mut node: Node<P>) -> DependencyResult<NodeId> {
        let key = node.participant().key();
        if self.nodes.contains_key(&key) {
            return Err(DependencyError::duplicate_node(key.to_string()));
        }
        if node.is_initialized() {
            return Err(DependencyError::already_initialized(key.to_string()));
        }
        let satisfied = node
            .declared_required()
            .iter()
            .filter(|provider| self.nodes.get(*provider).is_some_and(Node::is_initialized))
            .count();
        node.refresh(satisfied);
        trace!(node = %key, "adding node");
        let (index, _) = self.nodes.insert_full(key, node);
        self.linked = false;
        Ok(NodeId::from(index))
    }

    /// Wrap a participant in a node and register it.
    pub fn add(&mut self, participant: P) -> DependencyResult<NodeId> {
        self.add_node(Node::new(participant))
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn node(&self, id: NodeId) -> Option<&Node<P>> {
        self.nodes.get_index(id.index()).map(|(_, node)| node)
    }

    /// Look up the id of a participant by key.
    pub fn node_id(&self, key: &P::Key) -> Option<NodeId> {
        self.nodes.get_index_of(key).map(NodeId::from)
    }

    /// All nodes in insertion order.
    pub fn nodes(&self) -> impl Iterator<Item = (NodeId, &Node<P>)> {
        self.nodes
            .values()
            .enumerate()
            .map(|(index, node)| (NodeId::from(index), node))
    }

    pub fn state(&self, id: NodeId) -> Option<NodeState> {
        self.node(id).map(Node::state)
    }

    /// Ids of nodes that are not yet initialized, in insertion order.
    pub fn pending(&self) -> impl Iterator<Item = NodeId> + '_ {
        self.nodes()
            .filter(|(_, node)| !node.is_initialized())
            .map(|(id, _)| id)
    }

    pub fn is_linked(&self) -> bool {
        self.linked
    }

    /// Fail unless the node is in `expected`.
    pub fn assert_state(&self, id: NodeId, expected: NodeState) -> DependencyResult<()> {
        self.node_checked(id)?.assert_state(expected)
    }

    /// Derive edges from every participant's declarations.
    ///
    /// Existing edges are discarded and every pending node is reclassified.
    /// Initialized nodes stay initialized.
    pub fn link(&mut self) -> DependencyResult<()> {
        debug!(nodes = self.nodes.len(), "linking dependency model");

        let mut declared: Vec<SmallVec<[Edge; 4]>> = Vec::with_capacity(self.nodes.len());
        for node in self.nodes.values() {
            let participant = node.participant();
            let mut edges = SmallVec::new();
            for key in participant.required_providers() {
                edges.push(Edge::required(self.resolve_provider(node, &key)?));
            }
            for key in participant.optional_providers() {
                edges.push(Edge::optional(self.resolve_provider(node, &key)?));
            }
            declared.push(edges);
        }

        for node in self.nodes.values_mut() {
            node.clear_edges();
        }
        for (index, edges) in declared.into_iter().enumerate() {
            let id = NodeId::from(index);
            for edge in edges {
                self.nodes[index].add_edge(edge);
                self.nodes[edge.provider.index()].add_dependent(id);
            }
        }
        for index in 0..self.nodes.len() {
            self.recompute(NodeId::from(index));
        }

        self.linked = true;
        Ok(())
    }

    /// Initialize a ready node and update its dependents.
    pub fn initialize(&mut self, id: NodeId) -> DependencyResult<()> {
        self.ensure_linked()?;
        self.node_checked_mut(id)?.initialize()?;
        self.propagate(id);
        Ok(())
    }

    /// Initialize a node regardless of its providers and update its
    /// dependents.
    pub fn force_initialize(&mut self, id: NodeId) -> DependencyResult<()> {
        self.ensure_linked()?;
        self.node_checked_mut(id)?.force_initialize()?;
        self.propagate(id);
        Ok(())
    }

    /// Run the ordering simulation and report each node as it is
    /// initialized.
    ///
    /// Nodes that were already initialized before the call are not
    /// reported. On failure the nodes initialized so far keep their state.
    pub fn resolve(&mut self, config: &ResolverConfig) -> DependencyResult<Vec<ResolutionStep>> {
        self.ensure_linked()?;

        let remaining = self.pending().count();
        debug!(
            pending = remaining,
            accept_cycles = config.accept_cycles,
            "computing dependency order"
        );
        if remaining < self.nodes.len() {
            debug!(
                initialized = self.nodes.len() - remaining,
                "skipping nodes initialized by an earlier run"
            );
        }

        let mut steps = Vec::with_capacity(remaining);
        loop {
            if let Some(id) = self.first_initializable() {
                self.initialize(id)?;
                steps.push(ResolutionStep {
                    node: id,
                    forced: false,
                });
                continue;
            }

            let pending: Vec<NodeId> = self.pending().collect();
            if pending.is_empty() {
                break;
            }

            if !config.accept_cycles {
                let err = DependencyError::cyclic(pending.iter().map(|id| self.name(*id)));
                debug!(%err, "dependency order failed");
                return Err(err);
            }

            let id = self.pick_forced(&pending, config.force_strategy);
            warn!(
                node = %self.name(id),
                state = %self.nodes[id.index()].state(),
                "forcing initialization to break a dependency cycle"
            );
            self.force_initialize(id)?;
            steps.push(ResolutionStep {
                node: id,
                forced: true,
            });
        }

        debug!(
            ordered = steps.len(),
            forced = steps.iter().filter(|step| step.forced).count(),
            "dependency order computed"
        );
        Ok(steps)
    }

    /// Node ids in initialization order.
    pub fn dependency_order(&mut self, accepting_cycles: bool) -> DependencyResult<Vec<NodeId>> {
        let steps = self.resolve(&ResolverConfig::accepting_cycles(accepting_cycles))?;
        Ok(steps.into_iter().map(|step| step.node).collect())
    }

    /// Participants in initialization order.
    ///
    /// Every participant comes after its required providers, except a node
    /// forced to break a cycle, which may precede some of them. Optional
    /// providers impose no order.
    pub fn dependency_ordered_objects(&mut self, accepting_cycles: bool) -> DependencyResult<Vec<&P>> {
        let order = self.dependency_order(accepting_cycles)?;
        let nodes = &self.nodes;
        Ok(order
            .into_iter()
            .map(|id| nodes[id.index()].participant())
            .collect())
    }

    /// Consume the model and return its participants in initialization
    /// order.
    pub fn into_dependency_ordered(mut self, accepting_cycles: bool) -> DependencyResult<Vec<P>> {
        let order = self.dependency_order(accepting_cycles)?;
        let mut slots: Vec<Option<P>> = self
            .nodes
            .into_values()
            .map(|node| Some(node.into_participant()))
            .collect();
        Ok(order
            .into_iter()
            .filter_map(|id| slots[id.index()].take())
            .collect())
    }

    fn ensure_linked(&mut self) -> DependencyResult<()> {
        if self.linked {
            Ok(())
        } else {
            self.link()
        }
    }

    fn resolve_provider(&self, node: &Node<P>, key: &P::Key) -> DependencyResult<NodeId> {
        self.node_id(key)
            .ok_or_else(|| DependencyError::unknown_provider(node.name(), key.to_string()))
    }

    fn node_checked(&self, id: NodeId) -> DependencyResult<&Node<P>> {
        self.node(id).ok_or(DependencyError::node_not_found(id))
    }

    fn node_checked_mut(&mut self, id: NodeId) -> DependencyResult<&mut Node<P>> {
        self.nodes
            .get_index_mut(id.index())
            .map(|(_, node)| node)
            .ok_or(DependencyError::node_not_found(id))
    }

    fn name(&self, id: NodeId) -> String {
        self.nodes[id.index()].name()
    }

    /// Number of the node's required providers that are initialized.
    fn satisfied(&self, id: NodeId) -> usize {
        self.nodes[id.index()]
            .required_providers()
            .filter(|provider| self.nodes[provider.index()].is_initialized())
            .count()
    }

    fn recompute(&mut self, id: NodeId) {
        let satisfied = self.satisfied(id);
        let node = &mut self.nodes[id.index()];
        if let Some(previous) = node.refresh(satisfied) {
            trace!(node = %node.name(), from = %previous, to = %node.state(), "state changed");
        }
    }

    fn propagate(&mut self, id: NodeId) {
        let dependents: SmallVec<[NodeId; 4]> =
            self.nodes[id.index()].dependents().iter().copied().collect();
        for dependent in dependents {
            self.recompute(dependent);
        }
    }

    fn first_initializable(&self) -> Option<NodeId> {
        self.nodes()
            .find(|(_, node)| node.state() == NodeState::Initializable)
            .map(|(id, _)| id)
    }

    /// `pending` is non-empty and in insertion order.
    fn pick_forced(&self, pending: &[NodeId], strategy: ForceStrategy) -> NodeId {
        let chosen = match strategy {
            ForceStrategy::FirstInsertion => pending
                .iter()
                .copied()
                .find(|id| self.nodes[id.index()].state() == NodeState::Forceable),
            ForceStrategy::MostProgressed => pending
                .iter()
                .map(|id| (*id, self.satisfied(*id)))
                .filter(|(_, satisfied)| *satisfied > 0)
                .max_by(|a, b| a.1.cmp(&b.1).then(b.0.cmp(&a.0)))
                .map(|(id, _)| id),
        };
        chosen.unwrap_or(pending[0])
    }
}

impl<P> fmt::Debug for DependencyModel<P>
where
    P: Participant + fmt::Debug,
    P::Key: fmt::Debug,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DependencyModel")
            .field("nodes", &self.nodes)
            .field("linked", &self.linked)
            .finish()
    }
}

impl<P: Participant> Default for DependencyModel<P> {
    fn default() -> Self {
        Self::new()
    }
}
