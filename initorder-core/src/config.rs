//! Resolver configuration.

use serde::{Deserialize, Serialize};

/// How the resolver picks a node to force when nothing is initializable.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ForceStrategy {
    /// The first forceable node in insertion order, else the first pending
    /// node.
    #[default]
    FirstInsertion,

    /// The pending node with the most initialized required providers. Ties
    /// go to insertion order.
    MostProgressed,
}

/// Options for [`DependencyModel::resolve`](crate::DependencyModel::resolve).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ResolverConfig {
    /// Break cycles by forcing nodes instead of failing.
    pub accept_cycles: bool,

    pub force_strategy: ForceStrategy,
}

impl ResolverConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Shorthand for the only knob most callers touch.
    pub fn accepting_cycles(accept: bool) -> Self {
        Self {
            accept_cycles: accept,
            ..Self::default()
        }
    }

    pub fn with_accept_cycles(mut self, accept: bool) -> Self {
        self.accept_cycles = accept;
        self
    }

    pub fn with_force_strategy(mut self, strategy: ForceStrategy) -> Self {
        self.force_strategy = strategy;
        self
    }

    /// Parse from JSON. Missing fields take their defaults.
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_reject_cycles() {
        let config = ResolverConfig::default();
        assert!(!config.accept_cycles);
        assert_eq!(config.force_strategy, ForceStrategy::FirstInsertion);
    }

    #[test]
    fn parses_partial_json() {
        let config = ResolverConfig::from_json(r#"{"accept_cycles": true}"#).unwrap();
        assert_eq!(config, ResolverConfig::accepting_cycles(true));

        let config =
            ResolverConfig::from_json(r#"{"force_strategy": "most_progressed"}"#).unwrap();
        assert_eq!(
            config,
            ResolverConfig::new().with_force_strategy(ForceStrategy::MostProgressed)
        );
    }

    #[test]
    fn rejects_unknown_strategy() {
        assert!(ResolverConfig::from_json(r#"{"force_strategy": "random"}"#).is_err());
    }
}
