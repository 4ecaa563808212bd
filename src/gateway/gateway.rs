//! Gateway: the client's connection to a network topology.

use dashmap::DashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use crate::channel::{DiscoveryHandler, StaticTopology, Topology};
use crate::config::{ConfigError, GatewayConfig, GatewayOptions};
use crate::events::{EventStrategyRegistry, TxEventHandlerFactory};
use crate::gateway::network::{Network, NetworkContext};
use crate::gateway::types::{GatewayError, GatewayResult};
use crate::identity::{IdentityContext, Secp256k1Verifier, Verifier};
use crate::query::{QueryHandlerFactory, QueryStrategyRegistry};

/// Everything `Gateway::connect` needs besides the topology.
#[derive(Clone)]
pub struct ConnectOptions {
    pub options: GatewayOptions,
    pub identity: IdentityContext,
    pub discovery: Option<Arc<dyn DiscoveryHandler>>,
    pub verifier: Arc<dyn Verifier>,
    pub query_strategies: QueryStrategyRegistry,
    pub event_strategies: EventStrategyRegistry,
}

impl ConnectOptions {
    pub fn new(identity: IdentityContext) -> Self {
        Self {
            options: GatewayOptions::default(),
            identity,
            discovery: None,
            verifier: Arc::new(Secp256k1Verifier),
            query_strategies: QueryStrategyRegistry::with_defaults(),
            event_strategies: EventStrategyRegistry::with_defaults(),
        }
    }

    pub fn with_options(mut self, options: GatewayOptions) -> Self {
        self.options = options;
        self
    }

    pub fn with_discovery(mut self, discovery: Arc<dyn DiscoveryHandler>) -> Self {
        self.discovery = Some(discovery);
        self
    }

    pub fn with_verifier(mut self, verifier: Arc<dyn Verifier>) -> Self {
        self.verifier = verifier;
        self
    }

    /// Register (or replace) a query strategy under `name`.
    pub fn with_query_strategy(mut self, name: &str, factory: Arc<dyn QueryHandlerFactory>) -> Self {
        self.query_strategies.register(name, factory);
        self
    }

    /// Register (or replace) a commit strategy under `name`.
    pub fn with_event_strategy(mut self, name: &str, factory: Arc<dyn TxEventHandlerFactory>) -> Self {
        self.event_strategies.register(name, factory);
        self
    }
}

pub struct Gateway {
    topology: Arc<dyn Topology>,
    context: NetworkContext,
    networks: DashMap<String, Arc<Network>>,
    connected: AtomicBool,
}

impl Gateway {
    /// Resolve strategies and connect to `topology`.
    pub fn connect(topology: Arc<dyn Topology>, connect: ConnectOptions) -> GatewayResult<Self> {
        let query_factory = connect
            .query_strategies
            .get(&connect.options.query.strategy)
            .ok_or_else(|| ConfigError::UnknownStrategy(connect.options.query.strategy.clone()))?;
        let event_strategy = connect
            .event_strategies
            .get(&connect.options.transaction.strategy)
            .ok_or_else(|| ConfigError::UnknownStrategy(connect.options.transaction.strategy.clone()))?;

        tracing::info!(
            msp_id = %connect.identity.msp_id(),
            query_strategy = %connect.options.query.strategy,
            commit_strategy = %connect.options.transaction.strategy,
            discovery = connect.discovery.is_some(),
            "Gateway connected"
        );

        Ok(Self {
            topology,
            context: NetworkContext {
                identity: connect.identity,
                options: Arc::new(connect.options),
                query_factory,
                event_strategy,
                discovery: connect.discovery,
                verifier: connect.verifier,
            },
            networks: DashMap::new(),
            connected: AtomicBool::new(true),
        })
    }

    /// Connect with HTTP/WebSocket transports built from a configuration file's topology.
    pub fn from_config(config: &GatewayConfig, connect: ConnectOptions) -> GatewayResult<Self> {
        let topology = StaticTopology::from_config(config)?;
        let connect = connect.with_options(config.options.clone());
        Self::connect(Arc::new(topology), connect)
    }

    pub fn identity(&self) -> &IdentityContext {
        &self.context.identity
    }

    pub fn options(&self) -> &GatewayOptions {
        &self.context.options
    }

    /// Network for a channel; one instance per channel name.
    pub fn get_network(&self, name: &str) -> GatewayResult<Arc<Network>> {
        if !self.connected.load(Ordering::Acquire) {
            return Err(GatewayError::Disconnected);
        }
        if let Some(network) = self.networks.get(name) {
            return Ok(network.clone());
        }

        let channel = self
            .topology
            .channel(name)
            .ok_or_else(|| GatewayError::UnknownChannel(name.to_string()))?;
        let network = self
            .networks
            .entry(name.to_string())
            .or_insert_with(|| {
                tracing::debug!(channel = %name, "Creating network");
                Arc::new(Network::new(channel, self.context.clone()))
            })
            .clone();
        Ok(network)
    }

    /// Close every network's listeners and event services.
    pub async fn disconnect(&self) {
        if !self.connected.swap(false, Ordering::AcqRel) {
            return;
        }
        let networks: Vec<Arc<Network>> = self.networks.iter().map(|e| e.value().clone()).collect();
        self.networks.clear();
        for network in networks {
            network.close().await;
        }
        tracing::info!("Gateway disconnected");
    }
}

impl std::fmt::Debug for Gateway {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Gateway")
            .field("msp_id", &self.context.identity.msp_id())
            .field("networks", &self.networks.len())
            .field("connected", &self.connected.load(Ordering::Acquire))
            .finish()
    }
}
