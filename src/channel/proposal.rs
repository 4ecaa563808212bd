//! Proposal and commit envelope construction.
//!
//! # Lifecycle
//! ```text
//! ProposalBuilder::endorsement / ::query
//!     → build (identity, tx id, function, args, transient) → Proposal
//!     → sign → SignedProposal (immutable)
//!     → send to peers | discovery handler → Vec<EndorsementResponse>
//!
//! CommitEnvelope::build (signed proposal + valid responses)
//!     → sign → SignedEnvelope
//!     → send to orderers (first to accept wins) | discovery handler
//! ```

use futures_util::future::join_all;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use crate::channel::discovery::{DiscoveryHandler, DiscoveryRequest};
use crate::channel::peer::{Orderer, Peer};
use crate::channel::types::{
    BroadcastResponse, Endorsement, EndorsementResponse, ProposalError, ProposalResponse,
    ProposalResult,
};
use crate::identity::{IdentityContext, TransactionId};

/// Whether a proposal is headed for the orderer or is read-only.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProposalKind {
    Endorsement,
    Query,
}

/// Function call carried by a proposal.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProposalRequest {
    pub function: String,
    pub args: Vec<String>,
    pub transient: HashMap<String, Vec<u8>>,
}

/// Unsigned proposal.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Proposal {
    pub kind: ProposalKind,
    pub channel_id: String,
    pub chaincode_id: String,
    pub transaction_id: String,
    pub nonce: Vec<u8>,
    pub creator: Vec<u8>,
    pub msp_id: String,
    pub timestamp: u64,
    pub function: String,
    pub args: Vec<String>,
    #[serde(default)]
    pub transient: HashMap<String, Vec<u8>>,
}

/// Builds proposals for one chaincode on one channel.
#[derive(Debug, Clone)]
pub struct ProposalBuilder {
    kind: ProposalKind,
    channel_id: String,
    chaincode_id: String,
}

impl ProposalBuilder {
    /// Builder for proposals that will be submitted to the orderer.
    pub fn endorsement(channel_id: impl Into<String>, chaincode_id: impl Into<String>) -> Self {
        Self {
            kind: ProposalKind::Endorsement,
            channel_id: channel_id.into(),
            chaincode_id: chaincode_id.into(),
        }
    }

    /// Builder for read-only proposals.
    pub fn query(channel_id: impl Into<String>, chaincode_id: impl Into<String>) -> Self {
        Self {
            kind: ProposalKind::Query,
            ..Self::endorsement(channel_id, chaincode_id)
        }
    }

    pub fn build(
        &self,
        identity: &IdentityContext,
        transaction_id: &TransactionId,
        request: ProposalRequest,
    ) -> Proposal {
        let timestamp = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or_default()
            .as_secs();

        Proposal {
            kind: self.kind,
            channel_id: self.channel_id.clone(),
            chaincode_id: self.chaincode_id.clone(),
            transaction_id: transaction_id.id.clone(),
            nonce: transaction_id.nonce.clone(),
            creator: identity.creator(),
            msp_id: identity.msp_id().to_string(),
            timestamp,
            function: request.function,
            args: request.args,
            transient: request.transient,
        }
    }
}

impl Proposal {
    /// Serialize and sign. The result is immutable.
    pub fn sign(self, identity: &IdentityContext) -> ProposalResult<SignedProposal> {
        let bytes = serde_json::to_vec(&self).map_err(|e| ProposalError::Encoding(e.to_string()))?;
        let signature = identity.sign(&bytes)?;
        Ok(SignedProposal {
            proposal: self,
            bytes,
            signature,
        })
    }
}

/// Signed proposal as sent to peers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SignedProposal {
    proposal: Proposal,
    bytes: Vec<u8>,
    signature: Vec<u8>,
}

impl SignedProposal {
    pub fn proposal(&self) -> &Proposal {
        &self.proposal
    }

    pub fn transaction_id(&self) -> &str {
        &self.proposal.transaction_id
    }

    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn signature(&self) -> &[u8] {
        &self.signature
    }

    /// Fan the proposal out to every target concurrently.
    ///
    /// Returns one entry per target, in target order.
    pub async fn send(&self, targets: &[Peer], deadline: Duration) -> ProposalResult<Vec<EndorsementResponse>> {
        if targets.is_empty() {
            return Err(ProposalError::NoTargets);
        }

        tracing::debug!(
            transaction_id = %self.transaction_id(),
            targets = targets.len(),
            timeout_ms = deadline.as_millis() as u64,
            "Sending proposal"
        );

        let requests = targets.iter().map(|peer| async move {
            let result = peer.process_proposal(self, deadline).await;
            if let Err(e) = &result {
                tracing::warn!(peer = %peer.name(), error = %e, "Proposal request failed");
            }
            EndorsementResponse {
                peer: peer.name().to_string(),
                result,
            }
        });

        Ok(join_all(requests).await)
    }

    /// Delegate target selection to a discovery handler.
    pub async fn send_to_handler(
        &self,
        handler: &dyn DiscoveryHandler,
        request: &DiscoveryRequest,
    ) -> ProposalResult<Vec<EndorsementResponse>> {
        tracing::debug!(
            transaction_id = %self.transaction_id(),
            required_orgs = ?request.required_orgs,
            "Sending proposal through discovery handler"
        );
        handler.endorse(self, request).await
    }
}

/// Endorsed transaction ready for ordering.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommitEnvelope {
    pub channel_id: String,
    pub transaction_id: String,
    /// Proposal without its transient data, which never reaches the ledger.
    pub proposal: Proposal,
    pub response_payload: Vec<u8>,
    pub endorsements: Vec<Endorsement>,
}

impl CommitEnvelope {
    /// Package a signed proposal with its valid endorsement responses.
    pub fn build(proposal: &SignedProposal, responses: &[ProposalResponse]) -> Self {
        let mut header = proposal.proposal().clone();
        header.transient.clear();

        let response_payload = responses
            .first()
            .map(|r| r.payload.clone())
            .unwrap_or_default();

        Self {
            channel_id: header.channel_id.clone(),
            transaction_id: header.transaction_id.clone(),
            proposal: header,
            response_payload,
            endorsements: responses.iter().filter_map(|r| r.endorsement.clone()).collect(),
        }
    }

    pub fn sign(self, identity: &IdentityContext) -> ProposalResult<SignedEnvelope> {
        let bytes = serde_json::to_vec(&self).map_err(|e| ProposalError::Encoding(e.to_string()))?;
        let signature = identity.sign(&bytes)?;
        Ok(SignedEnvelope {
            envelope: self,
            bytes,
            signature,
        })
    }
}

/// Signed commit envelope.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SignedEnvelope {
    envelope: CommitEnvelope,
    bytes: Vec<u8>,
    signature: Vec<u8>,
}

impl SignedEnvelope {
    pub fn envelope(&self) -> &CommitEnvelope {
        &self.envelope
    }

    pub fn transaction_id(&self) -> &str {
        &self.envelope.transaction_id
    }

    pub fn signature(&self) -> &[u8] {
        &self.signature
    }

    /// Broadcast to the first orderer that accepts the envelope.
    ///
    /// A reply with a non-success status still counts as accepted; the caller
    /// decides what the status means.
    pub async fn send(&self, orderers: &[Orderer], deadline: Duration) -> ProposalResult<BroadcastResponse> {
        if orderers.is_empty() {
            return Err(ProposalError::NoCommitters);
        }

        let mut errors = Vec::new();
        for orderer in orderers {
            match orderer.broadcast(self, deadline).await {
                Ok(response) => {
                    tracing::debug!(
                        orderer = %orderer.name(),
                        transaction_id = %self.transaction_id(),
                        status = %response.status,
                        "Orderer replied"
                    );
                    return Ok(response);
                }
                Err(e) => {
                    tracing::warn!(orderer = %orderer.name(), error = %e, "Broadcast failed, trying next orderer");
                    errors.push(e.to_string());
                }
            }
        }
        Err(ProposalError::Broadcast(errors.join("; ")))
    }

    pub async fn send_to_handler(
        &self,
        handler: &dyn DiscoveryHandler,
        deadline: Duration,
    ) -> ProposalResult<BroadcastResponse> {
        handler.commit(self, deadline).await
    }
}
