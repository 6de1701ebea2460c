//! Dependency Graph
//!
//! This module implements the graph used to order participants for
//! initialization.
//!
//! # Overview
//!
//! - A [`Node`] wraps one participant and tracks where it is in its
//!   initialization lifecycle.
//! - Incoming edges point from a node to its providers. Required edges gate
//!   initialization; optional edges are recorded but never gate it.
//! - The [`DependencyModel`] owns all nodes and runs the ordering.
//!
//! # Design Decisions
//!
//! 1. Nodes live in a single insertion-ordered map and refer to each other
//!    by [`NodeId`]. Back-references to dependents are plain ids, so there
//!    is no shared ownership between nodes.
//!
//! 2. Insertion order is the tie-break whenever more than one node could go
//!    next, which keeps every ordering deterministic.
//!
//! 3. A node only knows how to classify itself from a count. The model does
//!    the counting, because only the model can see the providers.

mod model;
mod node;

pub use model::{DependencyModel, ResolutionStep};
pub use node::{Edge, Node, NodeId, NodeState};
