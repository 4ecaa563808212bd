//! Round-robin peer pool for event services.

use std::sync::atomic::{AtomicUsize, Ordering};

use crate::channel::Peer;
use crate::events::types::{EventError, EventResult};

/// Rotates through a fixed, non-empty list of peers.
#[derive(Debug)]
pub struct RoundRobinPeerPool {
    peers: Vec<Peer>,
    counter: AtomicUsize,
}

impl RoundRobinPeerPool {
    pub fn new(peers: Vec<Peer>) -> EventResult<Self> {
        if peers.is_empty() {
            return Err(EventError::NoPeers);
        }
        Ok(Self {
            peers,
            counter: AtomicUsize::new(0),
        })
    }

    pub fn peers(&self) -> &[Peer] {
        &self.peers
    }

    /// The next single peer.
    pub fn get_next_peer(&self) -> Peer {
        let index = self.counter.fetch_add(1, Ordering::Relaxed) % self.peers.len();
        self.peers[index].clone()
    }

    /// A full rotation starting at the next peer.
    ///
    /// The cursor moves one step past the returned window, so the following
    /// call starts one peer later.
    pub fn get_next_peers(&self) -> Vec<Peer> {
        let len = self.peers.len();
        let start = self.counter.fetch_add(len + 1, Ordering::Relaxed);
        (0..len)
            .map(|i| self.peers[(start + i) % len].clone())
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::channel::{DeliverStream, PeerClient, PeerError, ProposalResponse, SignedProposal};
    use crate::events::service::SignedEventRequest;
    use async_trait::async_trait;
    use std::sync::Arc;

    struct Unreachable;

    #[async_trait]
    impl PeerClient for Unreachable {
        async fn process_proposal(&self, _proposal: &SignedProposal) -> Result<ProposalResponse, PeerError> {
            Err(PeerError::MissingResponse { peer: "none".into() })
        }

        async fn deliver(&self, _request: &SignedEventRequest) -> Result<DeliverStream, PeerError> {
            Err(PeerError::MissingResponse { peer: "none".into() })
        }
    }

    fn pool(n: usize) -> RoundRobinPeerPool {
        let peers = (1..=n)
            .map(|i| Peer::new(format!("p{}", i), "Org1MSP", Arc::new(Unreachable)))
            .collect();
        RoundRobinPeerPool::new(peers).unwrap()
    }

    fn names(peers: &[Peer]) -> Vec<&str> {
        peers.iter().map(|p| p.name()).collect()
    }

    #[test]
    fn test_empty_pool_rejected() {
        assert_eq!(RoundRobinPeerPool::new(Vec::new()).unwrap_err(), EventError::NoPeers);
    }

    #[test]
    fn test_get_next_peer_wraps() {
        let pool = pool(2);
        assert_eq!(pool.get_next_peer().name(), "p1");
        assert_eq!(pool.get_next_peer().name(), "p2");
        assert_eq!(pool.get_next_peer().name(), "p1");
    }

    #[test]
    fn test_get_next_peers_advances_past_window() {
        let pool = pool(3);
        assert_eq!(names(&pool.get_next_peers()), vec!["p1", "p2", "p3"]);
        assert_eq!(names(&pool.get_next_peers()), vec!["p2", "p3", "p1"]);
        assert_eq!(names(&pool.get_next_peers()), vec!["p3", "p1", "p2"]);
        assert_eq!(names(&pool.get_next_peers()), vec!["p1", "p2", "p3"]);
    }
}
