//! Peer and orderer handles.
//!
//! # Responsibilities
//! - Name a network node and the organization it belongs to
//! - Hide the transport behind [`PeerClient`] / [`OrdererClient`]
//! - Enforce a deadline on every request

use async_trait::async_trait;
use futures_util::stream::BoxStream;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::timeout;

use crate::channel::proposal::{SignedEnvelope, SignedProposal};
use crate::channel::types::{BroadcastResponse, PeerError, ProposalResponse};
use crate::events::service::SignedEventRequest;
use crate::events::types::DeliverResponse;

/// Stream of block deliveries from one peer.
pub type DeliverStream = BoxStream<'static, Result<DeliverResponse, PeerError>>;

/// Transport to a peer's endorser and deliver services.
#[async_trait]
pub trait PeerClient: Send + Sync {
    /// Send a signed proposal for simulation and endorsement.
    async fn process_proposal(&self, proposal: &SignedProposal) -> Result<ProposalResponse, PeerError>;

    /// Open a block deliver stream.
    async fn deliver(&self, request: &SignedEventRequest) -> Result<DeliverStream, PeerError>;
}

/// Transport to an ordering service node.
#[async_trait]
pub trait OrdererClient: Send + Sync {
    /// Broadcast a signed transaction envelope.
    async fn broadcast(&self, envelope: &SignedEnvelope) -> Result<BroadcastResponse, PeerError>;
}

/// A peer joined to a channel.
#[derive(Clone)]
pub struct Peer {
    name: String,
    msp_id: String,
    client: Arc<dyn PeerClient>,
}

impl Peer {
    pub fn new(name: impl Into<String>, msp_id: impl Into<String>, client: Arc<dyn PeerClient>) -> Self {
        Self {
            name: name.into(),
            msp_id: msp_id.into(),
            client,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn msp_id(&self) -> &str {
        &self.msp_id
    }

    /// Send a proposal, failing with [`PeerError::Timeout`] after `deadline`.
    pub async fn process_proposal(
        &self,
        proposal: &SignedProposal,
        deadline: Duration,
    ) -> Result<ProposalResponse, PeerError> {
        match timeout(deadline, self.client.process_proposal(proposal)).await {
            Ok(result) => result,
            Err(_) => Err(PeerError::Timeout {
                peer: self.name.clone(),
                timeout_ms: deadline.as_millis() as u64,
            }),
        }
    }

    /// Open the deliver stream.
    pub async fn deliver(&self, request: &SignedEventRequest) -> Result<DeliverStream, PeerError> {
        self.client.deliver(request).await
    }
}

impl fmt::Debug for Peer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Peer")
            .field("name", &self.name)
            .field("msp_id", &self.msp_id)
            .finish()
    }
}

/// An ordering service node.
#[derive(Clone)]
pub struct Orderer {
    name: String,
    msp_id: String,
    client: Arc<dyn OrdererClient>,
}

impl Orderer {
    pub fn new(name: impl Into<String>, msp_id: impl Into<String>, client: Arc<dyn OrdererClient>) -> Self {
        Self {
            name: name.into(),
            msp_id: msp_id.into(),
            client,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn msp_id(&self) -> &str {
        &self.msp_id
    }

    /// Broadcast an envelope, failing with [`PeerError::Timeout`] after `deadline`.
    pub async fn broadcast(
        &self,
        envelope: &SignedEnvelope,
        deadline: Duration,
    ) -> Result<BroadcastResponse, PeerError> {
        match timeout(deadline, self.client.broadcast(envelope)).await {
            Ok(result) => result,
            Err(_) => Err(PeerError::Timeout {
                peer: self.name.clone(),
                timeout_ms: deadline.as_millis() as u64,
            }),
        }
    }
}

impl fmt::Debug for Orderer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Orderer")
            .field("name", &self.name)
            .field("msp_id", &self.msp_id)
            .finish()
    }
}
