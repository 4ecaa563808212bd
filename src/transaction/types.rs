//! Transaction error definitions.

use thiserror::Error;

use crate::channel::{EndorsementResponse, ProposalError};
use crate::events::CommitError;
use crate::query::QueryError;

#[derive(Debug, Error)]
pub enum TransactionError {
    /// submit/evaluate was called a second time on the same instance.
    #[error("Transaction {name} has already been invoked")]
    AlreadyInvoked { name: String },

    /// Non-string arguments; lists every offender.
    #[error("Transaction parameters must be strings: {0}")]
    InvalidArguments(String),

    /// The endorsement step produced no responses at all.
    #[error("No results were returned from the request")]
    NoResults,

    /// Every endorsement response was an error.
    #[error("{message}")]
    NoValidResponses {
        message: String,
        responses: Vec<EndorsementResponse>,
    },

    /// The ordering service replied with a non-success status.
    #[error("Failed to send transaction successfully to the orderer status:{status} for transaction {transaction_id}")]
    OrdererRejected {
        transaction_id: String,
        status: String,
        responses: Vec<EndorsementResponse>,
    },

    /// The proposal or envelope could not be built, signed or sent.
    #[error("{source}")]
    Proposal {
        #[source]
        source: ProposalError,
        responses: Vec<EndorsementResponse>,
    },

    /// Commit confirmation failed or timed out.
    #[error("{source}")]
    Commit {
        #[source]
        source: CommitError,
        responses: Vec<EndorsementResponse>,
    },

    /// Evaluation failed.
    #[error(transparent)]
    Query(#[from] QueryError),
}

impl TransactionError {
    /// Per-peer endorsement outcomes gathered before the failure.
    pub fn responses(&self) -> &[EndorsementResponse] {
        match self {
            TransactionError::NoValidResponses { responses, .. }
            | TransactionError::OrdererRejected { responses, .. }
            | TransactionError::Proposal { responses, .. }
            | TransactionError::Commit { responses, .. } => responses,
            _ => &[],
        }
    }

    /// True when the commit wait ran out of time.
    pub fn is_timeout(&self) -> bool {
        matches!(self, TransactionError::Commit { source, .. } if source.is_timeout())
    }
}

impl From<ProposalError> for TransactionError {
    fn from(source: ProposalError) -> Self {
        TransactionError::Proposal {
            source,
            responses: Vec::new(),
        }
    }
}

pub type TransactionResult<T> = Result<T, TransactionError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_timeout_kind() {
        let err = TransactionError::Commit {
            source: CommitError::Timeout {
                transaction_id: "tx1".into(),
                timeout_secs: 1,
                peers: vec!["peer0".into()],
            },
            responses: Vec::new(),
        };
        assert!(err.is_timeout());
        assert!(!TransactionError::NoResults.is_timeout());
        assert!(TransactionError::NoResults.responses().is_empty());
    }
}
