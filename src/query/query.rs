//! A single read-only chaincode invocation.

use std::collections::HashMap;
use std::time::Duration;

use crate::channel::{EndorsementResponse, Peer, PeerError, ProposalResult, SignedProposal};
use crate::query::types::{QueryResponse, QueryResults};

/// Signed query proposal plus the deadline for each peer round trip.
#[derive(Debug, Clone)]
pub struct Query {
    proposal: SignedProposal,
    timeout: Duration,
}

impl Query {
    pub fn new(proposal: SignedProposal, timeout: Duration) -> Self {
        Self { proposal, timeout }
    }

    pub fn transaction_id(&self) -> &str {
        self.proposal.transaction_id()
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Send to `peers` and normalize the outcome. No retries.
    pub async fn evaluate(&self, peers: &[Peer]) -> QueryResults {
        let sent = self.proposal.send(peers, self.timeout).await;
        self.normalize(peers, sent)
    }

    /// One entry per targeted peer, whatever the transport returned.
    ///
    /// A peer the transport left out gets `MissingResponse`; a failed send
    /// gives every peer the same error.
    fn normalize(&self, peers: &[Peer], sent: ProposalResult<Vec<EndorsementResponse>>) -> QueryResults {
        let mut results = QueryResults::new();

        match sent {
            Ok(responses) => {
                let mut by_peer: HashMap<String, _> = responses.into_iter().map(|r| (r.peer, r.result)).collect();
                for peer in peers {
                    let result = match by_peer.remove(peer.name()) {
                        Some(result) => result.map(QueryResponse::from),
                        None => Err(PeerError::MissingResponse {
                            peer: peer.name().to_string(),
                        }),
                    };
                    results.insert(peer.name().to_string(), result);
                }
            }
            Err(e) => {
                tracing::warn!(transaction_id = %self.transaction_id(), error = %e, "Query send failed");
                let message = e.to_string();
                for peer in peers {
                    results.insert(
                        peer.name().to_string(),
                        Err(PeerError::Request {
                            peer: peer.name().to_string(),
                            message: message.clone(),
                        }),
                    );
                }
            }
        }

        results
    }
}
