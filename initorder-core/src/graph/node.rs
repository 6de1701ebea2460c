//! Graph Nodes
//!
//! This module defines the node that wraps one participant in the
//! dependency model, together with its initialization state machine.

use std::collections::HashSet;
use std::fmt;

use smallvec::SmallVec;

use crate::error::{DependencyError, DependencyResult};
use crate::participant::Participant;

/// Identifier for a node inside its [`DependencyModel`](super::DependencyModel).
///
/// Ids are positions in the model's insertion order, so they are only
/// meaningful for the model that issued them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct NodeId(usize);

impl NodeId {
    /// Get the raw index.
    pub fn index(&self) -> usize {
        self.0
    }
}

impl From<usize> for NodeId {
    fn from(index: usize) -> Self {
        Self(index)
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Initialization state of a node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NodeState {
    /// Has required providers and none of them is initialized.
    Inactive,

    /// Every required provider is initialized (trivially true with none).
    Initializable,

    /// Some, but not all, required providers are initialized. The node is
    /// a candidate for forcing when a cycle has to be broken.
    Forceable,

    /// Terminal.
    Initialized,
}

impl NodeState {
    /// Classify a node from its required provider count and how many of
    /// those providers are initialized.
    pub fn classify(required: usize, satisfied: usize) -> Self {
        if satisfied >= required {
            NodeState::Initializable
        } else if satisfied == 0 {
            NodeState::Inactive
        } else {
            NodeState::Forceable
        }
    }

    pub fn is_terminal(&self) -> bool {
        *self == NodeState::Initialized
    }
}

impl fmt::Display for NodeState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            NodeState::Inactive => "inactive",
            NodeState::Initializable => "initializable",
            NodeState::Forceable => "forceable",
            NodeState::Initialized => "initialized",
        };
        f.write_str(name)
    }
}

/// An incoming edge: the node it belongs to depends on `provider`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Edge {
    pub provider: NodeId,
    pub required: bool,
}

impl Edge {
    pub fn required(provider: NodeId) -> Self {
        Self {
            provider,
            required: true,
        }
    }

    pub fn optional(provider: NodeId) -> Self {
        Self {
            provider,
            required: false,
        }
    }
}

/// A participant in the dependency model.
///
/// A node starts classified from its participant's declared required
/// providers, none of which count as initialized yet. The model wires its
/// edges when it links the graph, then keeps its state in step with its
/// providers as they are initialized.
#[derive(Debug)]
pub struct Node<P> {
    participant: P,

    state: NodeState,

    /// Distinct required providers: declared ones until edges are linked,
    /// required edges afterwards.
    required: usize,

    /// Providers this node depends on, in declaration order.
    incoming: SmallVec<[Edge; 4]>,

    /// Nodes listing this node as a provider. Only used to know whose
    /// state must be recomputed after this node is initialized.
    dependents: SmallVec<[NodeId; 4]>,
}

impl<P> Node<P> {
    pub fn participant(&self) -> &P {
        &self.participant
    }

    pub fn into_participant(self) -> P {
        self.participant
    }

    pub fn state(&self) -> NodeState {
        self.state
    }

    pub fn is_initialized(&self) -> bool {
        self.state.is_terminal()
    }

    /// All incoming edges, required and optional.
    pub fn incoming(&self) -> &[Edge] {
        &self.incoming
    }

    pub fn required_providers(&self) -> impl Iterator<Item = NodeId> + '_ {
        self.incoming
            .iter()
            .filter(|edge| edge.required)
            .map(|edge| edge.provider)
    }

    pub fn optional_providers(&self) -> impl Iterator<Item = NodeId> + '_ {
        self.incoming
            .iter()
            .filter(|edge| !edge.required)
            .map(|edge| edge.provider)
    }

    pub fn required_count(&self) -> usize {
        self.required
    }

    pub fn dependents(&self) -> &[NodeId] {
        &self.dependents
    }

    /// Record an incoming edge.
    ///
    /// Repeated providers collapse into one edge, and a required edge
    /// replaces an optional one to the same provider. Call [`Node::refresh`]
    /// afterwards so the state accounts for the new edge.
    pub(crate) fn add_edge(&mut self, edge: Edge) {
        match self
            .incoming
            .iter_mut()
            .find(|existing| existing.provider == edge.provider)
        {
            Some(existing) => {
                if edge.required && !existing.required {
                    existing.required = true;
                    self.required += 1;
                }
            }
            None => {
                self.required += usize::from(edge.required);
                self.incoming.push(edge);
            }
        }
    }

    pub(crate) fn add_dependent(&mut self, dependent: NodeId) {
        if !self.dependents.contains(&dependent) {
            self.dependents.push(dependent);
        }
    }

    pub(crate) fn clear_edges(&mut self) {
        self.incoming.clear();
        self.dependents.clear();
        self.required = 0;
    }

    /// Reclassify from the number of required providers currently
    /// initialized. An initialized node never changes.
    ///
    /// Returns the previous state when it changed.
    pub(crate) fn refresh(&mut self, satisfied: usize) -> Option<NodeState> {
        if self.is_initialized() {
            return None;
        }
        let next = NodeState::classify(self.required_count(), satisfied);
        if next == self.state {
            return None;
        }
        Some(std::mem::replace(&mut self.state, next))
    }
}

impl<P: Participant> Node<P> {
    /// Wrap a participant.
    ///
    /// The state reflects its declared required providers with none of
    /// them initialized: initializable without any, inactive otherwise.
    pub fn new(participant: P) -> Self {
        let required = participant
            .required_providers()
            .into_iter()
            .collect::<HashSet<_>>()
            .len();
        Self {
            participant,
            state: NodeState::classify(required, 0),
            required,
            incoming: SmallVec::new(),
            dependents: SmallVec::new(),
        }
    }

    /// Distinct keys of the declared required providers.
    pub(crate) fn declared_required(&self) -> HashSet<P::Key> {
        self.participant.required_providers().into_iter().collect()
    }

    /// Name used in errors and logs.
    pub fn name(&self) -> String {
        self.participant.key().to_string()
    }

    /// Mark a ready node as initialized.
    ///
    /// Fails unless the node is [`NodeState::Initializable`]. Dependents are
    /// not touched here; the owning model propagates.
    pub fn initialize(&mut self) -> DependencyResult<()> {
        if self.state != NodeState::Initializable {
            return Err(DependencyError::invalid_transition(
                self.name(),
                self.state,
                NodeState::Initialized,
            ));
        }
        self.state = NodeState::Initialized;
        tracing::trace!(node = %self.name(), "initialized");
        Ok(())
    }

    /// Mark the node initialized regardless of its providers.
    ///
    /// Only an already initialized node is rejected.
    pub fn force_initialize(&mut self) -> DependencyResult<NodeState> {
        if self.is_initialized() {
            return Err(DependencyError::invalid_transition(
                self.name(),
                self.state,
                NodeState::Initialized,
            ));
        }
        let previous = std::mem::replace(&mut self.state, NodeState::Initialized);
        tracing::trace!(node = %self.name(), from = %previous, "force initialized");
        Ok(previous)
    }

    /// Fail with [`DependencyError::StateMismatch`] unless the node is in
    /// `expected`.
    pub fn assert_state(&self, expected: NodeState) -> DependencyResult<()> {
        if self.state == expected {
            Ok(())
        } else {
            Err(DependencyError::state_mismatch(
                self.name(),
                expected,
                self.state,
            ))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::participant::Declaration;

    fn node(key: &'static str) -> Node<Declaration<&'static str>> {
        Node::new(Declaration::new(key))
    }

    fn with_required(count: usize) -> Node<Declaration<&'static str>> {
        let mut n = node("n");
        for i in 0..count {
            n.add_edge(Edge::required(NodeId::from(i + 1)));
        }
        n.refresh(0);
        n
    }

    #[test]
    fn node_without_providers_starts_initializable() {
        let n = node("a");
        assert!(n.assert_state(NodeState::Initializable).is_ok());
        assert_eq!(n.required_count(), 0);
    }

    #[test]
    fn declared_requirements_start_inactive() {
        let n = Node::new(Declaration::new("b").requires("a"));
        n.assert_state(NodeState::Inactive).unwrap();
        assert_eq!(n.required_count(), 1);

        let repeated = Node::new(Declaration::new("c").requires("a").requires("a"));
        assert_eq!(repeated.required_count(), 1);

        let optional_only = Node::new(Declaration::new("d").optionally("a"));
        optional_only.assert_state(NodeState::Initializable).unwrap();
    }

    #[test]
    fn self_requirement_starts_inactive() {
        let n = Node::new(Declaration::new("a").requires("a"));
        n.assert_state(NodeState::Inactive).unwrap();
    }

    #[test]
    fn state_follows_initialized_provider_count() {
        let mut n = with_required(3);
        n.assert_state(NodeState::Inactive).unwrap();

        n.refresh(1);
        n.assert_state(NodeState::Forceable).unwrap();

        n.refresh(2);
        n.assert_state(NodeState::Forceable).unwrap();

        assert_eq!(n.refresh(3), Some(NodeState::Forceable));
        n.assert_state(NodeState::Initializable).unwrap();
    }

    #[test]
    fn optional_providers_never_gate() {
        let mut n = node("b");
        n.add_edge(Edge::optional(NodeId::from(0)));
        n.refresh(0);

        assert_eq!(n.optional_providers().count(), 1);
        n.assert_state(NodeState::Initializable).unwrap();
    }

    #[test]
    fn duplicate_edges_collapse_and_required_wins() {
        let mut n = node("c");
        let p = NodeId::from(4);
        n.add_edge(Edge::optional(p));
        n.add_edge(Edge::required(p));
        n.add_edge(Edge::required(p));

        assert_eq!(n.incoming(), &[Edge::required(p)]);
        assert_eq!(n.required_count(), 1);
    }

    #[test]
    fn initialize_requires_initializable() {
        let mut n = with_required(2);
        let err = n.initialize().unwrap_err();
        assert!(matches!(
            err,
            DependencyError::InvalidStateTransition {
                from: NodeState::Inactive,
                ..
            }
        ));

        n.refresh(1);
        assert!(n.initialize().is_err());

        n.refresh(2);
        n.initialize().unwrap();
        n.assert_state(NodeState::Initialized).unwrap();
    }

    #[test]
    fn second_initialize_fails() {
        let mut n = node("a");
        n.initialize().unwrap();
        assert!(n.initialize().is_err());
        assert!(n.force_initialize().is_err());
    }

    #[test]
    fn force_initialize_from_any_pending_state() {
        let mut n = with_required(2);
        assert_eq!(n.force_initialize().unwrap(), NodeState::Inactive);
        assert!(n.is_initialized());

        let mut m = with_required(2);
        m.refresh(1);
        assert_eq!(m.force_initialize().unwrap(), NodeState::Forceable);
    }

    #[test]
    fn initialized_is_terminal() {
        let mut n = node("a");
        n.initialize().unwrap();
        n.add_edge(Edge::required(NodeId::from(9)));

        assert_eq!(n.refresh(0), None);
        n.assert_state(NodeState::Initialized).unwrap();
    }

    #[test]
    fn assert_state_reports_mismatch() {
        let n = with_required(1);
        let err = n.assert_state(NodeState::Initializable).unwrap_err();
        assert_eq!(
            err,
            DependencyError::state_mismatch("n", NodeState::Initializable, NodeState::Inactive)
        );
    }
}
