//! Event service manager: pools event services per channel.
//!
//! # Responsibilities
//! - Lazily build the round-robin peer pool from the client's own organization
//! - Cache live services per block type and replay services separately
//! - Start services idempotently and close everything on dispose

use dashmap::DashMap;
use std::sync::{Arc, Mutex};

use crate::channel::{Channel, Peer};
use crate::events::peer_pool::RoundRobinPeerPool;
use crate::events::service::{EventRequest, EventService};
use crate::events::types::{BlockType, EventError, EventResult, StartOptions};
use crate::identity::IdentityContext;
use crate::observability::metrics;

type ServicePool = DashMap<String, Arc<EventService>>;

pub struct EventServiceManager {
    channel: Arc<dyn Channel>,
    identity: IdentityContext,
    peer_pool: Mutex<Option<Arc<RoundRobinPeerPool>>>,
    filtered: ServicePool,
    full: ServicePool,
    private: ServicePool,
    replay: ServicePool,
}

impl EventServiceManager {
    pub fn new(channel: Arc<dyn Channel>, identity: IdentityContext) -> Self {
        Self {
            channel,
            identity,
            peer_pool: Mutex::new(None),
            filtered: DashMap::new(),
            full: DashMap::new(),
            private: DashMap::new(),
            replay: DashMap::new(),
        }
    }

    pub fn channel_name(&self) -> &str {
        self.channel.name()
    }

    fn peer_pool(&self) -> EventResult<Arc<RoundRobinPeerPool>> {
        let mut guard = self.peer_pool.lock().unwrap_or_else(|e| e.into_inner());
        if let Some(pool) = guard.as_ref() {
            return Ok(pool.clone());
        }

        let peers = self.channel.endorsers(Some(self.identity.msp_id()));
        let pool = Arc::new(RoundRobinPeerPool::new(peers)?);
        tracing::debug!(
            channel = %self.channel.name(),
            msp_id = %self.identity.msp_id(),
            peers = pool.peers().len(),
            "Built event peer pool"
        );
        *guard = Some(pool.clone());
        Ok(pool)
    }

    fn live_pool(&self, block_type: BlockType) -> (&ServicePool, &'static str) {
        match block_type {
            BlockType::Filtered => (&self.filtered, "filtered"),
            BlockType::Full => (&self.full, "full"),
            BlockType::Private => (&self.private, "private"),
        }
    }

    /// Live event service for the next rotation of pool peers.
    pub fn get_event_service(&self, block_type: BlockType) -> EventResult<Arc<EventService>> {
        let peers = self.peer_pool()?.get_next_peers();
        let (pool, label) = self.live_pool(block_type);
        Ok(cached(pool, label, peers))
    }

    /// One filtered service per peer; all pool peers when `peers` is `None`.
    pub fn get_event_services(&self, peers: Option<&[Peer]>) -> EventResult<Vec<Arc<EventService>>> {
        let peers = match peers {
            Some(peers) => peers.to_vec(),
            None => self.peer_pool()?.peers().to_vec(),
        };
        if peers.is_empty() {
            return Err(EventError::NoPeers);
        }

        Ok(peers
            .into_iter()
            .map(|peer| cached(&self.filtered, "filtered", vec![peer]))
            .collect())
    }

    /// Replay service; never shared with the live pools.
    pub fn get_replay_event_service(&self, peer: Option<&Peer>) -> EventResult<Arc<EventService>> {
        let peers = match peer {
            Some(peer) => vec![peer.clone()],
            None => self.peer_pool()?.get_next_peers(),
        };
        Ok(cached(&self.replay, "replay", peers))
    }

    /// Start a service with the given options unless it is already running.
    pub async fn start_event_service(&self, service: &EventService, options: StartOptions) -> EventResult<()> {
        if let Some(started) = service.started_options() {
            if options.start_block.is_some() {
                return Err(EventError::ReplayOnStarted {
                    service: service.name().to_string(),
                });
            }
            if started.block_type != options.block_type {
                return Err(EventError::BlockTypeMismatch {
                    service: service.name().to_string(),
                    started: started.block_type,
                    requested: options.block_type,
                });
            }
            return Ok(());
        }

        let request = EventRequest::build(&self.identity, self.channel.name(), &options).sign(&self.identity)?;
        service.start(&request, options).await
    }

    /// Close and forget every pooled service.
    pub async fn dispose(&self) {
        let pools = [
            (&self.filtered, "filtered"),
            (&self.full, "full"),
            (&self.private, "private"),
            (&self.replay, "replay"),
        ];

        for (pool, label) in pools {
            let services: Vec<Arc<EventService>> = pool.iter().map(|e| e.value().clone()).collect();
            pool.clear();
            metrics::record_event_services(label, 0);
            for service in services {
                service.close().await;
            }
        }
        tracing::info!(channel = %self.channel.name(), "Event services disposed");
    }
}

fn cached(pool: &ServicePool, label: &'static str, peers: Vec<Peer>) -> Arc<EventService> {
    let key = peers.iter().map(|p| p.name()).collect::<Vec<_>>().join(",");
    let service = pool
        .entry(key.clone())
        .or_insert_with(|| {
            tracing::debug!(pool = label, service = %key, "Creating event service");
            Arc::new(EventService::new(key.clone(), peers))
        })
        .clone();
    metrics::record_event_services(label, pool.len());
    service
}
