//! Configuration schema definitions.
//!
//! This module defines the gateway options and the static network topology.
//! All types derive Serde traits for deserialization from config files.

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Root configuration: gateway options plus a static topology.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct GatewayConfig {
    /// Client identity settings.
    pub client: ClientConfig,

    /// Behavioural options for queries, transactions and logging.
    #[serde(flatten)]
    pub options: GatewayOptions,

    /// Peer definitions.
    pub peers: Vec<PeerConfig>,

    /// Ordering service node definitions.
    pub orderers: Vec<OrdererConfig>,

    /// Channels and the nodes joined to them.
    pub channels: Vec<ChannelConfig>,
}

/// Options that drive the transaction and query pipelines.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct GatewayOptions {
    /// Query settings.
    pub query: QueryOptions,

    /// Transaction settings.
    pub transaction: TransactionOptions,

    /// Observability settings.
    pub observability: ObservabilityConfig,
}

/// Client identity configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ClientConfig {
    /// MSP the client identity belongs to.
    pub msp_id: String,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            msp_id: "Org1MSP".to_string(),
        }
    }
}

/// Query configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct QueryOptions {
    /// Per-request query timeout in seconds.
    pub timeout_secs: u64,

    /// Query handler strategy name.
    pub strategy: String,
}

impl QueryOptions {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

impl Default for QueryOptions {
    fn default() -> Self {
        Self {
            timeout_secs: 3,
            strategy: "MSPID_SCOPE_SINGLE".to_string(),
        }
    }
}

/// Transaction configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct TransactionOptions {
    /// Time to wait for commit events, in seconds.
    pub commit_timeout_secs: u64,

    /// Endorsement request timeout in seconds.
    pub endorse_timeout_secs: u64,

    /// Commit event handling strategy name.
    pub strategy: String,

    /// Check endorsement signatures before submitting to the orderer.
    pub verify_endorsements: bool,
}

impl TransactionOptions {
    pub fn commit_timeout(&self) -> Duration {
        Duration::from_secs(self.commit_timeout_secs)
    }

    /// Timeout applied to endorsement and ordering requests.
    ///
    /// The larger of the commit and endorse timeouts.
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.commit_timeout_secs.max(self.endorse_timeout_secs))
    }
}

impl Default for TransactionOptions {
    fn default() -> Self {
        Self {
            commit_timeout_secs: 300,
            endorse_timeout_secs: 30,
            strategy: "MSPID_SCOPE_ALLFORTX".to_string(),
            verify_endorsements: false,
        }
    }
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
        }
    }
}

/// Peer node configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct PeerConfig {
    /// Unique peer name (e.g., "peer0.org1.example.com").
    pub name: String,

    /// Organization MSP the peer belongs to.
    pub msp_id: String,

    /// Endorsement endpoint (e.g., "http://127.0.0.1:7051").
    pub url: String,

    /// Block delivery endpoint (e.g., "ws://127.0.0.1:7053").
    pub event_url: String,
}

/// Ordering service node configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct OrdererConfig {
    /// Unique orderer name.
    pub name: String,

    /// Organization MSP the orderer belongs to.
    #[serde(default)]
    pub msp_id: String,

    /// Broadcast endpoint.
    pub url: String,
}

/// Channel membership configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ChannelConfig {
    /// Channel name.
    pub name: String,

    /// Names of peers joined to the channel.
    #[serde(default)]
    pub peers: Vec<String>,

    /// Names of orderers serving the channel.
    #[serde(default)]
    pub orderers: Vec<String>,
}
