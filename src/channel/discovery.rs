//! Discovery capability.
//!
//! A discovery handler chooses endorsement targets itself (for instance from
//! a peer's discovery service) and can stand in for an explicit target list on
//! both the endorsement and the commit path.

use async_trait::async_trait;
use std::time::Duration;

use crate::channel::proposal::{SignedEnvelope, SignedProposal};
use crate::channel::types::{BroadcastResponse, EndorsementResponse, ProposalResult};

/// Options passed to a discovery handler with each endorsement.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DiscoveryRequest {
    /// Organizations that must endorse, when restricted by the caller.
    pub required_orgs: Option<Vec<String>>,
    pub timeout: Duration,
}

#[async_trait]
pub trait DiscoveryHandler: Send + Sync {
    /// Endorse a proposal with peers satisfying the endorsement policy.
    async fn endorse(
        &self,
        proposal: &SignedProposal,
        request: &DiscoveryRequest,
    ) -> ProposalResult<Vec<EndorsementResponse>>;

    /// Submit a commit envelope to the ordering service.
    async fn commit(&self, envelope: &SignedEnvelope, timeout: Duration) -> ProposalResult<BroadcastResponse>;
}
