//! Error types for dependency ordering.

use thiserror::Error;

use crate::graph::{NodeId, NodeState};

/// Result type for dependency model operations.
pub type DependencyResult<T> = Result<T, DependencyError>;

/// Errors that can occur while building or ordering a dependency model.
///
/// Nodes are named by their participant's key.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum DependencyError {
    /// Required dependencies form a cycle and forcing was not allowed.
    ///
    /// `nodes` lists every node that never became initializable, in
    /// insertion order.
    #[error("cyclic dependency between: {}", .nodes.join(", "))]
    CyclicDependency { nodes: Vec<String> },

    /// A participant declared a provider that was never added to the model.
    #[error("'{node}' depends on '{provider}', which is not registered")]
    UnknownProvider { node: String, provider: String },

    /// A participant with the same key is already registered.
    #[error("duplicate node: {node}")]
    DuplicateNode { node: String },

    /// The node was initialized before it was registered, so it could
    /// never take a place in the order.
    #[error("node '{node}' is already initialized")]
    AlreadyInitialized { node: String },

    /// The id does not belong to this model.
    #[error("node not found: {id}")]
    NodeNotFound { id: NodeId },

    /// A node was driven through a transition its state does not allow.
    #[error("invalid state transition for '{node}': {from} -> {to}")]
    InvalidStateTransition {
        node: String,
        from: NodeState,
        to: NodeState,
    },

    /// `assert_state` found a node in an unexpected state.
    #[error("node '{node}' is {actual}, expected {expected}")]
    StateMismatch {
        node: String,
        expected: NodeState,
        actual: NodeState,
    },
}

impl DependencyError {
    pub fn cyclic<I, S>(nodes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::CyclicDependency {
            nodes: nodes.into_iter().map(Into::into).collect(),
        }
    }

    pub fn unknown_provider(node: impl Into<String>, provider: impl Into<String>) -> Self {
        Self::UnknownProvider {
            node: node.into(),
            provider: provider.into(),
        }
    }

    pub fn duplicate_node(node: impl Into<String>) -> Self {
        Self::DuplicateNode { node: node.into() }
    }

    pub fn already_initialized(node: impl Into<String>) -> Self {
        Self::AlreadyInitialized { node: node.into() }
    }

    pub fn node_not_found(id: NodeId) -> Self {
        Self::NodeNotFound { id }
    }

    pub fn invalid_transition(node: impl Into<String>, from: NodeState, to: NodeState) -> Self {
        Self::InvalidStateTransition {
            node: node.into(),
            from,
            to,
        }
    }

    pub fn state_mismatch(node: impl Into<String>, expected: NodeState, actual: NodeState) -> Self {
        Self::StateMismatch {
            node: node.into(),
            expected,
            actual,
        }
    }

    /// True for the one failure a caller can legitimately trigger by
    /// declaring contradictory dependencies.
    pub fn is_cycle(&self) -> bool {
        matches!(self, Self::CyclicDependency { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cycle_message_lists_nodes() {
        let err = DependencyError::cyclic(["a", "b"]);
        assert_eq!(err.to_string(), "cyclic dependency between: a, b");
        assert!(err.is_cycle());
    }

    #[test]
    fn transition_message_names_states() {
        let err = DependencyError::invalid_transition(
            "db",
            NodeState::Inactive,
            NodeState::Initialized,
        );
        assert_eq!(
            err.to_string(),
            "invalid state transition for 'db': inactive -> initialized"
        );
        assert!(!err.is_cycle());
    }
}
