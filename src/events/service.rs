//! Event service: one deliver stream fanned out to registrations.
//!
//! # Responsibilities
//! - Hold block, transaction and chaincode registrations
//! - Connect to the first reachable target peer and read its deliver stream
//! - Route each delivered block to the registrations whose filter matches
//! - Report stream failures and local shutdown to every registration

use async_trait::async_trait;
use futures_util::StreamExt;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::{SystemTime, UNIX_EPOCH};
use tokio::task::JoinHandle;

use crate::channel::peer::{DeliverStream, Peer};
use crate::channel::types::BROADCAST_SUCCESS;
use crate::events::types::{
    BlockType, ChaincodeEvent, DeliverResponse, EventError, EventInfo, EventResult, StartOptions,
    VALID_CODE,
};
use crate::identity::IdentityContext;
use crate::observability::metrics;

/// Identifier of one registration on one event service.
pub type RegistrationId = u64;

/// Receiver of routed events.
///
/// Implementations must not fail: whatever goes wrong inside is handled
/// and logged there.
#[async_trait]
pub trait EventHandler: Send + Sync {
    async fn on_event(&self, event: Result<EventInfo, EventError>);
}

/// Unsigned deliver request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventRequest {
    pub channel_id: String,
    pub block_type: BlockType,
    pub start_block: Option<u64>,
    pub end_block: Option<u64>,
    pub creator: Vec<u8>,
    pub msp_id: String,
    pub timestamp: u64,
}

impl EventRequest {
    pub fn build(identity: &IdentityContext, channel_id: &str, options: &StartOptions) -> Self {
        let timestamp = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or_default()
            .as_secs();

        Self {
            channel_id: channel_id.to_string(),
            block_type: options.block_type,
            start_block: options.start_block,
            end_block: options.end_block,
            creator: identity.creator(),
            msp_id: identity.msp_id().to_string(),
            timestamp,
        }
    }

    pub fn sign(self, identity: &IdentityContext) -> EventResult<SignedEventRequest> {
        let bytes = serde_json::to_vec(&self).map_err(|e| EventError::Request(e.to_string()))?;
        let signature = identity
            .sign(&bytes)
            .map_err(|e| EventError::Request(e.to_string()))?;
        Ok(SignedEventRequest {
            request: self,
            bytes,
            signature,
        })
    }
}

/// Signed deliver request as sent to peers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SignedEventRequest {
    request: EventRequest,
    bytes: Vec<u8>,
    signature: Vec<u8>,
}

impl SignedEventRequest {
    pub fn request(&self) -> &EventRequest {
        &self.request
    }

    pub fn signature(&self) -> &[u8] {
        &self.signature
    }
}

#[derive(Clone)]
enum Filter {
    Block,
    Transaction(Option<String>),
    Chaincode { chaincode_id: String, event_name: Regex },
}

impl Filter {
    fn kind(&self) -> &'static str {
        match self {
            Filter::Block => "block",
            Filter::Transaction(_) => "commit",
            Filter::Chaincode { .. } => "contract",
        }
    }
}

struct Registration {
    filter: Filter,
    handler: Arc<dyn EventHandler>,
}

type Registrations = Arc<Mutex<HashMap<RegistrationId, Registration>>>;

#[derive(Default)]
struct ServiceState {
    started: Option<StartOptions>,
    task: Option<JoinHandle<()>>,
}

/// A logical subscription to a set of peers.
pub struct EventService {
    name: String,
    peers: Vec<Peer>,
    registrations: Registrations,
    next_id: AtomicU64,
    state: Arc<Mutex<ServiceState>>,
    start_lock: tokio::sync::Mutex<()>,
}

impl EventService {
    pub fn new(name: impl Into<String>, peers: Vec<Peer>) -> Self {
        Self {
            name: name.into(),
            peers,
            registrations: Arc::new(Mutex::new(HashMap::new())),
            next_id: AtomicU64::new(1),
            state: Arc::new(Mutex::new(ServiceState::default())),
            start_lock: tokio::sync::Mutex::new(()),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn peers(&self) -> &[Peer] {
        &self.peers
    }

    pub fn is_started(&self) -> bool {
        self.started_options().is_some()
    }

    /// Options the running stream was started with.
    pub fn started_options(&self) -> Option<StartOptions> {
        self.state.lock().ok().and_then(|s| s.started)
    }

    pub fn registration_count(&self) -> usize {
        self.registrations.lock().map(|r| r.len()).unwrap_or(0)
    }

    pub fn register_block_listener(&self, handler: Arc<dyn EventHandler>) -> RegistrationId {
        self.register(Filter::Block, handler)
    }

    /// Register for commit notifications of one transaction, or of all when `None`.
    pub fn register_transaction_listener(
        &self,
        transaction_id: Option<String>,
        handler: Arc<dyn EventHandler>,
    ) -> RegistrationId {
        self.register(Filter::Transaction(transaction_id), handler)
    }

    /// Register for chaincode events whose name matches `event_name` (a regex).
    pub fn register_chaincode_listener(
        &self,
        chaincode_id: &str,
        event_name: &str,
        handler: Arc<dyn EventHandler>,
    ) -> EventResult<RegistrationId> {
        let event_name = Regex::new(event_name).map_err(|e| EventError::InvalidPattern(e.to_string()))?;
        Ok(self.register(
            Filter::Chaincode {
                chaincode_id: chaincode_id.to_string(),
                event_name,
            },
            handler,
        ))
    }

    /// Remove a registration. Returns false when it was already gone.
    pub fn unregister(&self, id: RegistrationId) -> bool {
        match self.registrations.lock() {
            Ok(mut registrations) => registrations.remove(&id).is_some(),
            Err(_) => false,
        }
    }

    fn register(&self, filter: Filter, handler: Arc<dyn EventHandler>) -> RegistrationId {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        tracing::debug!(service = %self.name, id, kind = filter.kind(), "Registering listener");
        if let Ok(mut registrations) = self.registrations.lock() {
            registrations.insert(id, Registration { filter, handler });
        }
        id
    }

    /// Connect to the first target that accepts the request and start routing.
    ///
    /// A no-op when the service is already started.
    pub async fn start(&self, request: &SignedEventRequest, options: StartOptions) -> EventResult<()> {
        let _guard = self.start_lock.lock().await;
        if self.is_started() {
            return Ok(());
        }

        let mut errors = Vec::new();
        for peer in &self.peers {
            match peer.deliver(request).await {
                Ok(stream) => {
                    tracing::info!(
                        service = %self.name,
                        peer = %peer.name(),
                        block_type = %options.block_type,
                        start_block = ?options.start_block,
                        "Event service started"
                    );
                    let task = tokio::spawn(run_delivery(
                        self.name.clone(),
                        stream,
                        self.registrations.clone(),
                        self.state.clone(),
                        options,
                    ));
                    if let Ok(mut state) = self.state.lock() {
                        state.started = Some(options);
                        state.task = Some(task);
                    }
                    return Ok(());
                }
                Err(e) => {
                    tracing::warn!(service = %self.name, peer = %peer.name(), error = %e, "Deliver connection failed");
                    errors.push(e.to_string());
                }
            }
        }

        Err(EventError::ConnectFailed {
            service: self.name.clone(),
            message: if errors.is_empty() {
                "no target peers".to_string()
            } else {
                errors.join("; ")
            },
        })
    }

    /// Stop the stream and tell every registration the service is gone.
    pub async fn close(&self) {
        let task = match self.state.lock() {
            Ok(mut state) => {
                state.started = None;
                state.task.take()
            }
            Err(_) => None,
        };
        if let Some(task) = task {
            task.abort();
        }

        let handlers: Vec<Arc<dyn EventHandler>> = match self.registrations.lock() {
            Ok(mut registrations) => registrations.drain().map(|(_, r)| r.handler).collect(),
            Err(_) => Vec::new(),
        };
        for handler in handlers {
            handler
                .on_event(Err(EventError::Shutdown {
                    service: self.name.clone(),
                }))
                .await;
        }
        tracing::info!(service = %self.name, "Event service closed");
    }
}

impl fmt::Debug for EventService {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventService")
            .field("name", &self.name)
            .field("peers", &self.peers)
            .field("started", &self.started_options())
            .finish()
    }
}

async fn run_delivery(
    name: String,
    mut stream: DeliverStream,
    registrations: Registrations,
    state: Arc<Mutex<ServiceState>>,
    options: StartOptions,
) {
    let mut failure = Some("deliver stream ended".to_string());

    while let Some(item) = stream.next().await {
        match item {
            Ok(DeliverResponse::Status { status }) => {
                failure = if status == BROADCAST_SUCCESS {
                    None
                } else {
                    Some(format!("received status {}", status))
                };
                break;
            }
            Ok(response) => {
                dispatch(&name, &registrations, &response).await;
                let number = response.block_number().unwrap_or_default();
                if options.end_block.map_or(false, |end| number >= end) {
                    tracing::debug!(service = %name, block = number, "Replay reached end block");
                    failure = None;
                    break;
                }
            }
            Err(e) => {
                failure = Some(e.to_string());
                break;
            }
        }
    }

    if let Ok(mut state) = state.lock() {
        state.started = None;
        state.task = None;
    }

    if let Some(message) = failure {
        tracing::warn!(service = %name, error = %message, "Event service disconnected");
        let handlers: Vec<Arc<dyn EventHandler>> = match registrations.lock() {
            Ok(registrations) => registrations.values().map(|r| r.handler.clone()).collect(),
            Err(_) => Vec::new(),
        };
        for handler in handlers {
            handler
                .on_event(Err(EventError::Disconnected {
                    service: name.clone(),
                    message: message.clone(),
                }))
                .await;
        }
    }
}

/// Route one delivered block to every matching registration, in order.
async fn dispatch(name: &str, registrations: &Registrations, response: &DeliverResponse) {
    let deliveries: Vec<(Arc<dyn EventHandler>, &'static str, EventInfo)> = match registrations.lock() {
        Ok(registrations) => {
            let mut ids: Vec<_> = registrations.keys().copied().collect();
            ids.sort_unstable();
            ids.into_iter()
                .filter_map(|id| registrations.get(&id))
                .flat_map(|r| {
                    route(name, &r.filter, response)
                        .into_iter()
                        .map(|info| (r.handler.clone(), r.filter.kind(), info))
                        .collect::<Vec<_>>()
                })
                .collect()
        }
        Err(_) => Vec::new(),
    };

    for (handler, kind, info) in deliveries {
        metrics::record_event_dispatched(kind);
        handler.on_event(Ok(info)).await;
    }
}

/// Transaction view shared by filtered and full blocks.
struct TxView<'a> {
    transaction_id: &'a str,
    validation_code: &'a str,
    chaincode_events: &'a [ChaincodeEvent],
}

fn transactions(response: &DeliverResponse) -> Vec<TxView<'_>> {
    match response {
        DeliverResponse::FilteredBlock { block } => block
            .transactions
            .iter()
            .map(|tx| TxView {
                transaction_id: &tx.transaction_id,
                validation_code: &tx.validation_code,
                chaincode_events: &tx.chaincode_events,
            })
            .collect(),
        DeliverResponse::Block { block, .. } => block
            .transactions
            .iter()
            .map(|tx| TxView {
                transaction_id: &tx.transaction_id,
                validation_code: &tx.validation_code,
                chaincode_events: &tx.chaincode_events,
            })
            .collect(),
        DeliverResponse::Status { .. } => Vec::new(),
    }
}

fn route(name: &str, filter: &Filter, response: &DeliverResponse) -> Vec<EventInfo> {
    let block_number = match response.block_number() {
        Some(number) => number,
        None => return Vec::new(),
    };
    let base = EventInfo {
        event_service: name.to_string(),
        block_number,
        ..EventInfo::default()
    };

    match filter {
        Filter::Block => {
            let mut info = base;
            match response {
                DeliverResponse::FilteredBlock { block } => info.filtered_block = Some(block.clone()),
                DeliverResponse::Block { block, private_data } => {
                    info.block = Some(block.clone());
                    info.private_data = private_data.clone();
                }
                DeliverResponse::Status { .. } => {}
            }
            vec![info]
        }
        Filter::Transaction(wanted) => transactions(response)
            .into_iter()
            .filter(|tx| wanted.as_deref().map_or(true, |id| id == tx.transaction_id))
            .map(|tx| EventInfo {
                transaction_id: Some(tx.transaction_id.to_string()),
                status: Some(tx.validation_code.to_string()),
                ..base.clone()
            })
            .collect(),
        Filter::Chaincode {
            chaincode_id,
            event_name,
        } => {
            let events: Vec<ChaincodeEvent> = transactions(response)
                .into_iter()
                .filter(|tx| tx.validation_code == VALID_CODE)
                .flat_map(|tx| tx.chaincode_events.iter())
                .filter(|ev| &ev.chaincode_id == chaincode_id && event_name.is_match(&ev.event_name))
                .cloned()
                .collect();
            if events.is_empty() {
                Vec::new()
            } else {
                vec![EventInfo {
                    chaincode_events: events,
                    ..base
                }]
            }
        }
    }
}
