//! Query strategy registry: strategy name → handler factory.

use std::collections::HashMap;
use std::sync::Arc;

use crate::channel::Peer;
use crate::query::round_robin::RoundRobinQueryHandler;
use crate::query::single::SingleQueryHandler;
use crate::query::QueryHandler;

pub const MSPID_SCOPE_SINGLE: &str = "MSPID_SCOPE_SINGLE";
pub const MSPID_SCOPE_ROUND_ROBIN: &str = "MSPID_SCOPE_ROUND_ROBIN";

/// Names accepted by configuration.
pub const QUERY_STRATEGY_NAMES: &[&str] = &[MSPID_SCOPE_SINGLE, MSPID_SCOPE_ROUND_ROBIN];

/// Builds a query handler over the client organization's peers.
pub trait QueryHandlerFactory: Send + Sync {
    fn create(&self, peers: Vec<Peer>) -> Arc<dyn QueryHandler>;
}

impl<F> QueryHandlerFactory for F
where
    F: Fn(Vec<Peer>) -> Arc<dyn QueryHandler> + Send + Sync,
{
    fn create(&self, peers: Vec<Peer>) -> Arc<dyn QueryHandler> {
        self(peers)
    }
}

#[derive(Clone)]
pub struct QueryStrategyRegistry {
    factories: HashMap<String, Arc<dyn QueryHandlerFactory>>,
}

impl QueryStrategyRegistry {
    pub fn with_defaults() -> Self {
        let mut registry = Self {
            factories: HashMap::new(),
        };
        registry.register(
            MSPID_SCOPE_SINGLE,
            Arc::new(|peers: Vec<Peer>| Arc::new(SingleQueryHandler::new(peers)) as Arc<dyn QueryHandler>),
        );
        registry.register(
            MSPID_SCOPE_ROUND_ROBIN,
            Arc::new(|peers: Vec<Peer>| Arc::new(RoundRobinQueryHandler::new(peers)) as Arc<dyn QueryHandler>),
        );
        registry
    }

    /// Add or replace a factory.
    pub fn register(&mut self, name: &str, factory: Arc<dyn QueryHandlerFactory>) {
        self.factories.insert(name.to_string(), factory);
    }

    pub fn get(&self, name: &str) -> Option<Arc<dyn QueryHandlerFactory>> {
        self.factories.get(name).cloned()
    }
}

impl Default for QueryStrategyRegistry {
    fn default() -> Self {
        Self::with_defaults()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_every_listed_name_resolves() {
        let registry = QueryStrategyRegistry::with_defaults();
        for name in QUERY_STRATEGY_NAMES {
            assert!(registry.get(name).is_some(), "{} missing", name);
        }
        assert!(registry.get("PREFER_MSPID_SCOPE_ROUND_ROBIN").is_none());
    }
}
