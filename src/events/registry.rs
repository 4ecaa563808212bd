//! Commit strategy registry: strategy name → handler factory.

use std::collections::HashMap;
use std::sync::Arc;

use crate::events::strategy::{NoopFactory, Policy, Scope, StrategyFactory, TxEventHandlerFactory};

pub const MSPID_SCOPE_ALLFORTX: &str = "MSPID_SCOPE_ALLFORTX";
pub const MSPID_SCOPE_ANYFORTX: &str = "MSPID_SCOPE_ANYFORTX";
pub const NETWORK_SCOPE_ALLFORTX: &str = "NETWORK_SCOPE_ALLFORTX";
pub const NETWORK_SCOPE_ANYFORTX: &str = "NETWORK_SCOPE_ANYFORTX";
pub const NONE: &str = "NONE";

/// Names accepted by configuration.
pub const EVENT_STRATEGY_NAMES: &[&str] = &[
    MSPID_SCOPE_ALLFORTX,
    MSPID_SCOPE_ANYFORTX,
    NETWORK_SCOPE_ALLFORTX,
    NETWORK_SCOPE_ANYFORTX,
    NONE,
];

#[derive(Clone)]
pub struct EventStrategyRegistry {
    factories: HashMap<String, Arc<dyn TxEventHandlerFactory>>,
}

impl EventStrategyRegistry {
    /// Registry holding the built-in strategies.
    pub fn with_defaults() -> Self {
        let mut registry = Self {
            factories: HashMap::new(),
        };
        let builtin = [
            (MSPID_SCOPE_ALLFORTX, Scope::Msp, Policy::AllForTx),
            (MSPID_SCOPE_ANYFORTX, Scope::Msp, Policy::AnyForTx),
            (NETWORK_SCOPE_ALLFORTX, Scope::Network, Policy::AllForTx),
            (NETWORK_SCOPE_ANYFORTX, Scope::Network, Policy::AnyForTx),
        ];
        for (name, scope, policy) in builtin {
            registry.register(name, Arc::new(StrategyFactory { scope, policy }));
        }
        registry.register(NONE, Arc::new(NoopFactory));
        registry
    }

    /// Add or replace a factory.
    pub fn register(&mut self, name: &str, factory: Arc<dyn TxEventHandlerFactory>) {
        self.factories.insert(name.to_string(), factory);
    }

    pub fn get(&self, name: &str) -> Option<Arc<dyn TxEventHandlerFactory>> {
        self.factories.get(name).cloned()
    }
}

impl Default for EventStrategyRegistry {
    fn default() -> Self {
        Self::with_defaults()
    }
}
