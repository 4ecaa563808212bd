//! Query results and error definitions.

use std::collections::HashMap;
use thiserror::Error;

use crate::channel::{PeerError, ProposalError, ProposalResponse};

/// Normalized response from one peer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueryResponse {
    pub is_endorsed: bool,
    pub payload: Vec<u8>,
    pub status: i32,
    pub message: String,
}

impl From<ProposalResponse> for QueryResponse {
    fn from(response: ProposalResponse) -> Self {
        Self {
            is_endorsed: response.is_endorsed(),
            payload: response.payload,
            status: response.status,
            message: response.message,
        }
    }
}

/// Outcome per peer name; every targeted peer has exactly one entry.
pub type QueryResults = HashMap<String, Result<QueryResponse, PeerError>>;

#[derive(Debug, Error)]
pub enum QueryError {
    /// The handler has no peers to ask.
    #[error("No peers available to query")]
    NoPeers,

    /// Every peer failed; one message per peer.
    #[error("Query failed. Errors: {}", format_errors(.errors))]
    Failed { errors: Vec<String> },

    /// A peer answered but did not endorse.
    #[error("{message}")]
    Rejected { peer: String, status: i32, message: String },

    /// The query could not be built or signed.
    #[error(transparent)]
    Proposal(#[from] ProposalError),
}

fn format_errors(errors: &[String]) -> String {
    serde_json::to_string(errors).unwrap_or_else(|_| errors.join(", "))
}

pub type QueryResult<T> = Result<T, QueryError>;
