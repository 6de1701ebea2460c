//! Initorder Core
//!
//! This crate computes a safe initialization order for components that
//! depend on each other. Each component declares the components it
//! requires and, optionally, the ones it merely uses. The resolver places
//! every component after its required providers and, when asked to, breaks
//! cycles among required dependencies by forcing one member of the cycle.
//!
//! # Architecture
//!
//! - `participant`: the capability a domain type implements to take part
//! - `graph`: nodes, their state machine, and the dependency model
//! - `config`: resolver options
//! - `error`: the error type shared by all of the above
//!
//! # Example
//!
//! ```rust
//! use initorder_core::{Declaration, DependencyModel, DependencyError};
//!
//! let mut model = DependencyModel::new();
//! model.add(Declaration::new("a").requires("b")).unwrap();
//! model.add(Declaration::new("b").requires("a")).unwrap();
//!
//! let err = model.dependency_ordered_objects(false).unwrap_err();
//! assert!(matches!(err, DependencyError::CyclicDependency { .. }));
//!
//! // Forcing breaks the cycle.
//! let order = model.dependency_ordered_objects(true).unwrap();
//! assert_eq!(order.len(), 2);
//! ```

pub mod config;
pub mod error;
pub mod graph;
pub mod participant;

pub use config::{ForceStrategy, ResolverConfig};
pub use error::{DependencyError, DependencyResult};
pub use graph::{DependencyModel, Edge, Node, NodeId, NodeState, ResolutionStep};
pub use participant::{Declaration, Participant};
