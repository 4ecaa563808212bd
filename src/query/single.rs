//! Sticky single-peer query handler.

use async_trait::async_trait;
use std::sync::atomic::{AtomicUsize, Ordering};

use crate::channel::Peer;
use crate::observability::metrics;
use crate::query::query::Query;
use crate::query::types::{QueryError, QueryResult};
use crate::query::QueryHandler;

/// Sends each query to one peer, starting with the last one that answered.
///
/// Transport failures move on to the next peer. A response that arrives but
/// is not endorsed fails the call straight away.
#[derive(Debug)]
pub struct SingleQueryHandler {
    peers: Vec<Peer>,
    current: AtomicUsize,
}

impl SingleQueryHandler {
    pub fn new(peers: Vec<Peer>) -> Self {
        Self {
            peers,
            current: AtomicUsize::new(0),
        }
    }
}

#[async_trait]
impl QueryHandler for SingleQueryHandler {
    async fn evaluate(&self, query: &Query) -> QueryResult<Vec<u8>> {
        let len = self.peers.len();
        if len == 0 {
            return Err(QueryError::NoPeers);
        }

        let start = self.current.load(Ordering::Acquire);
        let mut errors = Vec::new();

        for i in 0..len {
            let index = (start + i) % len;
            let peer = &self.peers[index];
            match super::ask(query, peer).await {
                Ok(payload) => {
                    self.current.store(index, Ordering::Release);
                    metrics::record_query("single", "success");
                    return Ok(payload);
                }
                Err(super::Attempt::Rejected(e)) => {
                    metrics::record_query("single", "rejected");
                    return Err(e);
                }
                Err(super::Attempt::Failed(message)) => {
                    tracing::warn!(peer = %peer.name(), error = %message, "Query peer failed, trying next");
                    errors.push(message);
                }
            }
        }

        metrics::record_query("single", "failed");
        Err(QueryError::Failed { errors })
    }
}
