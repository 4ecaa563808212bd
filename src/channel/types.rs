//! Channel-level message types and error definitions.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::identity::IdentityError;

/// Status codes at or above this value are error responses.
pub const ERROR_STATUS_THRESHOLD: i32 = 400;

/// Broadcast status reported by an orderer that accepted an envelope.
pub const BROADCAST_SUCCESS: &str = "SUCCESS";

/// Per-peer transport failure: the request never completed a round trip.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum PeerError {
    /// Connection could not be established or was dropped.
    #[error("Connection to {peer} failed: {message}")]
    Connection { peer: String, message: String },

    /// Request did not complete within the deadline.
    #[error("Request to {peer} timed out after {timeout_ms} ms")]
    Timeout { peer: String, timeout_ms: u64 },

    /// The transport returned no entry for the peer.
    #[error("Missing response from peer {peer}")]
    MissingResponse { peer: String },

    /// The request was sent but failed for another reason.
    #[error("Request to {peer} failed: {message}")]
    Request { peer: String, message: String },
}

impl PeerError {
    /// Name of the peer the failure belongs to.
    pub fn peer(&self) -> &str {
        match self {
            PeerError::Connection { peer, .. }
            | PeerError::Timeout { peer, .. }
            | PeerError::MissingResponse { peer }
            | PeerError::Request { peer, .. } => peer,
        }
    }
}

/// Errors raised while building, signing or sending requests.
#[derive(Debug, Error)]
pub enum ProposalError {
    /// The identity could not sign the request.
    #[error("Failed to sign request: {0}")]
    Signing(#[from] IdentityError),

    /// The request could not be serialized.
    #[error("Failed to encode request: {0}")]
    Encoding(String),

    /// No targets were supplied.
    #[error("No targets were provided for the request")]
    NoTargets,

    /// The channel has no ordering service nodes.
    #[error("No committers assigned to the channel")]
    NoCommitters,

    /// Every orderer failed to accept the envelope.
    #[error("Failed to send transaction to the orderer: {0}")]
    Broadcast(String),

    /// Discovery handler failure.
    #[error("Discovery handler failed: {0}")]
    Discovery(String),
}

/// Result type for proposal operations.
pub type ProposalResult<T> = Result<T, ProposalError>;

/// A peer's signature over its proposal response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Endorsement {
    /// Serialized endorser identity (public key material).
    pub endorser: Vec<u8>,
    /// Signature over `payload || endorser`.
    pub signature: Vec<u8>,
}

impl Endorsement {
    /// The message an endorser signs for a given response payload.
    pub fn signed_message(&self, payload: &[u8]) -> Vec<u8> {
        let mut message = payload.to_vec();
        message.extend_from_slice(&self.endorser);
        message
    }
}

/// Structured response returned by a peer after simulating a proposal.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProposalResponse {
    pub status: i32,
    #[serde(default)]
    pub message: String,
    #[serde(default)]
    pub payload: Vec<u8>,
    #[serde(default)]
    pub endorsement: Option<Endorsement>,
}

impl ProposalResponse {
    /// Well-formed and signed by the peer.
    pub fn is_endorsed(&self) -> bool {
        self.status < ERROR_STATUS_THRESHOLD && self.endorsement.is_some()
    }
}

/// One peer's outcome for a proposal sent to it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EndorsementResponse {
    /// Peer name.
    pub peer: String,
    /// Response, or the transport error that prevented one.
    pub result: Result<ProposalResponse, PeerError>,
}

impl EndorsementResponse {
    pub fn ok(peer: impl Into<String>, response: ProposalResponse) -> Self {
        Self {
            peer: peer.into(),
            result: Ok(response),
        }
    }

    pub fn err(error: PeerError) -> Self {
        Self {
            peer: error.peer().to_string(),
            result: Err(error),
        }
    }
}

/// Orderer reply to a broadcast.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BroadcastResponse {
    pub status: String,
    #[serde(default)]
    pub info: String,
}

impl BroadcastResponse {
    pub fn is_success(&self) -> bool {
        self.status == BROADCAST_SUCCESS
    }
}
