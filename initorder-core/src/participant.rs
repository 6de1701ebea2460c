//! Participants
//!
//! A participant is whatever domain object needs a place in the
//! initialization order: a module, a service, a plugin. The model only
//! asks it for its identity and for the keys of the participants it
//! depends on.

use std::fmt;
use std::hash::Hash;

/// The "has dependencies" capability consumed by the dependency model.
///
/// The key is the participant's identity. Two participants reporting the
/// same key are treated as the same node.
pub trait Participant {
    type Key: Clone + Eq + Hash + fmt::Display;

    /// This participant's identity.
    fn key(&self) -> Self::Key;

    /// Participants that must be initialized before this one.
    fn required_providers(&self) -> Vec<Self::Key>;

    /// Participants this one uses if present. Never gates initialization.
    fn optional_providers(&self) -> Vec<Self::Key> {
        Vec::new()
    }
}

/// A plain participant that carries its own dependency lists.
///
/// Useful when the domain type does not want to implement [`Participant`]
/// itself, and in tests.
///
/// ```
/// use initorder_core::Declaration;
///
/// let web = Declaration::new("web").requires("db").optionally("cache");
/// assert_eq!(web.required(), &["db"]);
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Declaration<K> {
    key: K,
    required: Vec<K>,
    optional: Vec<K>,
}

impl<K> Declaration<K> {
    /// Create a declaration with no dependencies.
    pub fn new(key: K) -> Self {
        Self {
            key,
            required: Vec::new(),
            optional: Vec::new(),
        }
    }

    /// Add a required provider.
    pub fn requires(mut self, provider: K) -> Self {
        self.required.push(provider);
        self
    }

    /// Add an optional provider.
    pub fn optionally(mut self, provider: K) -> Self {
        self.optional.push(provider);
        self
    }

    pub fn id(&self) -> &K {
        &self.key
    }

    pub fn required(&self) -> &[K] {
        &self.required
    }

    pub fn optional(&self) -> &[K] {
        &self.optional
    }
}

impl<K> Participant for Declaration<K>
where
    K: Clone + Eq + Hash + fmt::Display,
{
    type Key = K;

    fn key(&self) -> K {
        self.key.clone()
    }

    fn required_providers(&self) -> Vec<K> {
        self.required.clone()
    }

    fn optional_providers(&self) -> Vec<K> {
        self.optional.clone()
    }
}
