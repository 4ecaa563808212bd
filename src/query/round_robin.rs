//! Round-robin query handler.

use async_trait::async_trait;
use std::sync::atomic::{AtomicUsize, Ordering};

use crate::channel::Peer;
use crate::observability::metrics;
use crate::query::query::Query;
use crate::query::types::{QueryError, QueryResult};
use crate::query::QueryHandler;

/// Starts every call one peer later than the previous call did.
#[derive(Debug)]
pub struct RoundRobinQueryHandler {
    peers: Vec<Peer>,
    counter: AtomicUsize,
}

impl RoundRobinQueryHandler {
    pub fn new(peers: Vec<Peer>) -> Self {
        Self {
            peers,
            counter: AtomicUsize::new(0),
        }
    }
}

#[async_trait]
impl QueryHandler for RoundRobinQueryHandler {
    async fn evaluate(&self, query: &Query) -> QueryResult<Vec<u8>> {
        let len = self.peers.len();
        if len == 0 {
            return Err(QueryError::NoPeers);
        }

        let start = self.counter.fetch_add(1, Ordering::Relaxed);
        let mut errors = Vec::new();

        for i in 0..len {
            let peer = &self.peers[(start + i) % len];
            match super::ask(query, peer).await {
                Ok(payload) => {
                    metrics::record_query("round_robin", "success");
                    return Ok(payload);
                }
                Err(super::Attempt::Rejected(e)) => {
                    metrics::record_query("round_robin", "rejected");
                    return Err(e);
                }
                Err(super::Attempt::Failed(message)) => {
                    tracing::warn!(peer = %peer.name(), error = %message, "Query peer failed, trying next");
                    errors.push(message);
                }
            }
        }

        metrics::record_query("round_robin", "failed");
        Err(QueryError::Failed { errors })
    }
}
