//! Channel topology capability.
//!
//! # Responsibilities
//! - Answer "which peers endorse for this organization" and "which
//!   orderers serve this channel"
//! - Provide a static, configuration-driven implementation

use std::collections::HashMap;
use std::sync::Arc;

use crate::channel::peer::{Orderer, Peer};
use crate::config::GatewayConfig;
use crate::transport::http::{HttpOrdererClient, HttpPeerClient};
use crate::transport::TransportError;

/// Peers and orderers of one channel.
pub trait Channel: Send + Sync {
    fn name(&self) -> &str;

    /// Endorsing peers, optionally restricted to one organization.
    fn endorsers(&self, msp_id: Option<&str>) -> Vec<Peer>;

    /// Ordering service nodes.
    fn committers(&self) -> Vec<Orderer>;
}

/// Source of channels for a gateway.
pub trait Topology: Send + Sync {
    fn channel(&self, name: &str) -> Option<Arc<dyn Channel>>;
}

/// Channel with a fixed membership.
#[derive(Debug, Clone)]
pub struct StaticChannel {
    name: String,
    peers: Vec<Peer>,
    orderers: Vec<Orderer>,
}

impl StaticChannel {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            peers: Vec::new(),
            orderers: Vec::new(),
        }
    }

    pub fn with_peer(mut self, peer: Peer) -> Self {
        self.peers.push(peer);
        self
    }

    pub fn with_orderer(mut self, orderer: Orderer) -> Self {
        self.orderers.push(orderer);
        self
    }
}

impl Channel for StaticChannel {
    fn name(&self) -> &str {
        &self.name
    }

    fn endorsers(&self, msp_id: Option<&str>) -> Vec<Peer> {
        self.peers
            .iter()
            .filter(|p| msp_id.map_or(true, |id| p.msp_id() == id))
            .cloned()
            .collect()
    }

    fn committers(&self) -> Vec<Orderer> {
        self.orderers.clone()
    }
}

/// Topology made of static channels.
#[derive(Default)]
pub struct StaticTopology {
    channels: HashMap<String, Arc<StaticChannel>>,
}

impl StaticTopology {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_channel(mut self, channel: StaticChannel) -> Self {
        self.channels.insert(channel.name.clone(), Arc::new(channel));
        self
    }

    /// Build HTTP/WebSocket backed channels from configuration.
    ///
    /// The configuration is expected to have passed validation; unknown
    /// node names are skipped with a warning.
    pub fn from_config(config: &GatewayConfig) -> Result<Self, TransportError> {
        let mut peers = HashMap::new();
        for peer in &config.peers {
            let client = HttpPeerClient::new(&peer.name, &peer.url, &peer.event_url)?;
            peers.insert(peer.name.as_str(), Peer::new(&peer.name, &peer.msp_id, Arc::new(client)));
        }

        let mut orderers = HashMap::new();
        for orderer in &config.orderers {
            let client = HttpOrdererClient::new(&orderer.name, &orderer.url)?;
            orderers.insert(
                orderer.name.as_str(),
                Orderer::new(&orderer.name, &orderer.msp_id, Arc::new(client)),
            );
        }

        let mut topology = Self::new();
        for channel_config in &config.channels {
            let mut channel = StaticChannel::new(&channel_config.name);
            for name in &channel_config.peers {
                match peers.get(name.as_str()) {
                    Some(peer) => channel = channel.with_peer(peer.clone()),
                    None => tracing::warn!(channel = %channel_config.name, peer = %name, "Ignoring unknown peer"),
                }
            }
            for name in &channel_config.orderers {
                match orderers.get(name.as_str()) {
                    Some(orderer) => channel = channel.with_orderer(orderer.clone()),
                    None => tracing::warn!(channel = %channel_config.name, orderer = %name, "Ignoring unknown orderer"),
                }
            }
            topology = topology.with_channel(channel);
        }

        Ok(topology)
    }
}

impl Topology for StaticTopology {
    fn channel(&self, name: &str) -> Option<Arc<dyn Channel>> {
        self.channels.get(name).map(|c| c.clone() as Arc<dyn Channel>)
    }
}
