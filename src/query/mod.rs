//! Query subsystem.
//!
//! # Data Flow
//! ```text
//! Transaction::evaluate
//!     → query.rs (Query: signed proposal + timeout)
//!     → QueryHandler (strategy from registry.rs)
//!         - single.rs (sticky current peer)
//!         - round_robin.rs (start index advances every call)
//!     → one peer at a time until an endorsed answer
//!     → payload | QueryError
//! ```
//!
//! # Design Decisions
//! - Retries across peers happen here and nowhere else
//! - Transport failures try the next peer; a non-endorsed answer does not
//! - When every peer fails, the error lists each peer's reason

pub mod query;
pub mod registry;
pub mod round_robin;
pub mod single;
pub mod types;

use async_trait::async_trait;

use crate::channel::Peer;

pub use query::Query;
pub use registry::{QueryHandlerFactory, QueryStrategyRegistry};
pub use round_robin::RoundRobinQueryHandler;
pub use single::SingleQueryHandler;
pub use types::{QueryError, QueryResponse, QueryResult, QueryResults};

/// Peer selection policy for read-only invocations.
#[async_trait]
pub trait QueryHandler: Send + Sync {
    /// Payload of the first endorsed response.
    async fn evaluate(&self, query: &Query) -> QueryResult<Vec<u8>>;
}

pub(crate) enum Attempt {
    /// The peer answered without endorsing; the call fails.
    Rejected(QueryError),
    /// The peer could not be reached; try the next one.
    Failed(String),
}

/// Ask a single peer.
pub(crate) async fn ask(query: &Query, peer: &Peer) -> Result<Vec<u8>, Attempt> {
    let mut results = query.evaluate(std::slice::from_ref(peer)).await;
    match results.remove(peer.name()) {
        Some(Ok(response)) if response.is_endorsed => Ok(response.payload),
        Some(Ok(response)) => Err(Attempt::Rejected(QueryError::Rejected {
            peer: peer.name().to_string(),
            status: response.status,
            message: response.message,
        })),
        Some(Err(e)) => Err(Attempt::Failed(e.to_string())),
        None => Err(Attempt::Failed(format!("Missing response from peer {}", peer.name()))),
    }
}
