//! Network: one channel as seen through the gateway.

use dashmap::DashMap;
use std::sync::Arc;
use uuid::Uuid;

use crate::channel::{Channel, DiscoveryHandler, Peer};
use crate::config::GatewayOptions;
use crate::events::block::BlockListener;
use crate::events::commit::CommitListener;
use crate::events::contract::ContractListener;
use crate::events::listener::Registered;
use crate::events::{
    BlockEvent, CommitEvent, ContractEvent, EventCallback, EventResult, EventService,
    EventServiceManager, ListenerHandle, ListenerKind, ListenerOptions, StartOptions, TxEventHandlerFactory,
};
use crate::gateway::contract::Contract;
use crate::identity::{IdentityContext, Verifier};
use crate::query::{QueryHandler, QueryHandlerFactory};
use crate::transaction::TransactionContext;

/// Shared by every network of a gateway.
#[derive(Clone)]
pub(crate) struct NetworkContext {
    pub(crate) identity: IdentityContext,
    pub(crate) options: Arc<GatewayOptions>,
    pub(crate) query_factory: Arc<dyn QueryHandlerFactory>,
    pub(crate) event_strategy: Arc<dyn TxEventHandlerFactory>,
    pub(crate) discovery: Option<Arc<dyn DiscoveryHandler>>,
    pub(crate) verifier: Arc<dyn Verifier>,
}

pub struct Network {
    channel: Arc<dyn Channel>,
    context: NetworkContext,
    query_handler: Arc<dyn QueryHandler>,
    event_manager: Arc<EventServiceManager>,
    listeners: DashMap<Uuid, Registered>,
}

impl Network {
    pub(crate) fn new(channel: Arc<dyn Channel>, context: NetworkContext) -> Self {
        let peers = channel.endorsers(Some(context.identity.msp_id()));
        let query_handler = context.query_factory.create(peers);
        let event_manager = Arc::new(EventServiceManager::new(channel.clone(), context.identity.clone()));

        Self {
            channel,
            context,
            query_handler,
            event_manager,
            listeners: DashMap::new(),
        }
    }

    pub fn name(&self) -> &str {
        self.channel.name()
    }

    pub fn channel(&self) -> Arc<dyn Channel> {
        self.channel.clone()
    }

    pub fn event_service_manager(&self) -> Arc<EventServiceManager> {
        self.event_manager.clone()
    }

    /// Contract for a chaincode, optionally scoped to a namespace within it.
    pub fn get_contract(self: &Arc<Self>, chaincode_id: &str, namespace: Option<&str>) -> Contract {
        Contract::new(self.clone(), chaincode_id, namespace)
    }

    pub(crate) fn transaction_context(&self, chaincode_id: &str) -> TransactionContext {
        TransactionContext {
            channel: self.channel.clone(),
            chaincode_id: chaincode_id.to_string(),
            identity: self.context.identity.clone(),
            options: self.context.options.clone(),
            query_handler: self.query_handler.clone(),
            event_strategy: self.context.event_strategy.clone(),
            event_manager: self.event_manager.clone(),
            discovery: self.context.discovery.clone(),
            verifier: self.context.verifier.clone(),
        }
    }

    fn listener_service(&self, options: &ListenerOptions) -> EventResult<Arc<EventService>> {
        if options.start_block.is_some() {
            self.event_manager.get_replay_event_service(None)
        } else {
            self.event_manager.get_event_service(options.block_type)
        }
    }

    /// Keep the registration only if the service starts.
    async fn activate(&self, registered: Registered, start: StartOptions) -> EventResult<ListenerHandle> {
        let mut errors = Vec::new();
        let services: Vec<Arc<EventService>> = registered.services().cloned().collect();
        for service in &services {
            if let Err(e) = self.event_manager.start_event_service(service, start).await {
                tracing::warn!(service = %service.name(), error = %e, "Event service did not start");
                errors.push(e);
            }
        }

        if !services.is_empty() && errors.len() == services.len() {
            registered.remove();
            return Err(errors.remove(0));
        }

        let handle = registered.handle.clone();
        tracing::debug!(listener = handle.kind().as_str(), id = %handle.id(), "Listener added");
        self.listeners.insert(handle.id(), registered);
        Ok(handle)
    }

    /// Receive every block; `start_block` replays from history.
    pub async fn add_block_listener<C>(&self, callback: C, options: ListenerOptions) -> EventResult<ListenerHandle>
    where
        C: EventCallback<BlockEvent> + 'static,
    {
        let service = self.listener_service(&options)?;
        let handle = ListenerHandle::new(ListenerKind::Block);
        let listener = Arc::new(BlockListener::new(&handle, Arc::new(callback)));

        let mut registered = Registered::new(handle);
        let id = service.register_block_listener(listener);
        registered.push(service, id);
        self.activate(registered, options.into()).await
    }

    /// Commit notifications from `peers` (all own-organization peers when
    /// `None`) for one transaction, or for all when `transaction_id` is `None`.
    pub async fn add_commit_listener<C>(
        &self,
        callback: C,
        peers: Option<Vec<Peer>>,
        transaction_id: Option<String>,
    ) -> EventResult<ListenerHandle>
    where
        C: EventCallback<CommitEvent> + 'static,
    {
        let services = self.event_manager.get_event_services(peers.as_deref())?;
        let handle = ListenerHandle::new(ListenerKind::Commit);
        let listener = Arc::new(CommitListener::new(&handle, Arc::new(callback)));

        let mut registered = Registered::new(handle);
        for service in services {
            let id = service.register_transaction_listener(transaction_id.clone(), listener.clone());
            registered.push(service, id);
        }
        self.activate(registered, StartOptions::default()).await
    }

    pub(crate) async fn add_contract_listener<C>(
        &self,
        chaincode_id: &str,
        event_name: &str,
        callback: C,
        options: ListenerOptions,
    ) -> EventResult<ListenerHandle>
    where
        C: EventCallback<ContractEvent> + 'static,
    {
        let service = self.listener_service(&options)?;
        let handle = ListenerHandle::new(ListenerKind::Contract);
        let listener = Arc::new(ContractListener::new(&handle, Arc::new(callback)));

        let mut registered = Registered::new(handle);
        let id = service.register_chaincode_listener(chaincode_id, event_name, listener)?;
        registered.push(service, id);
        self.activate(registered, options.into()).await
    }

    /// Stop a listener. Returns false when it was already removed.
    pub fn remove_listener(&self, handle: &ListenerHandle) -> bool {
        match self.listeners.remove(&handle.id()) {
            Some((_, registered)) => {
                tracing::debug!(listener = handle.kind().as_str(), id = %handle.id(), "Listener removed");
                registered.remove()
            }
            None => false,
        }
    }

    pub fn remove_block_listener(&self, handle: &ListenerHandle) -> bool {
        self.remove_listener(handle)
    }

    pub fn remove_commit_listener(&self, handle: &ListenerHandle) -> bool {
        self.remove_listener(handle)
    }

    pub fn listener_count(&self) -> usize {
        self.listeners.len()
    }

    /// Remove every listener and dispose the event services.
    pub(crate) async fn close(&self) {
        let ids: Vec<Uuid> = self.listeners.iter().map(|e| *e.key()).collect();
        for id in ids {
            if let Some((_, registered)) = self.listeners.remove(&id) {
                registered.remove();
            }
        }
        self.event_manager.dispose().await;
        tracing::info!(channel = %self.name(), "Network closed");
    }
}

impl std::fmt::Debug for Network {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Network")
            .field("name", &self.channel.name())
            .field("listeners", &self.listeners.len())
            .finish()
    }
}
