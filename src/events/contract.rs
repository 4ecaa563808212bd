//! Contract (chaincode event) listener.

use async_trait::async_trait;
use std::sync::Arc;

use crate::events::listener::{deliver, EventCallback, ListenerHandle, ListenerKind, ListenerState};
use crate::events::service::EventHandler;
use crate::events::types::{ContractEvent, EventError, EventInfo};

pub(crate) struct ContractListener {
    state: Arc<ListenerState>,
    callback: Arc<dyn EventCallback<ContractEvent>>,
}

impl ContractListener {
    pub(crate) fn new(handle: &ListenerHandle, callback: Arc<dyn EventCallback<ContractEvent>>) -> Self {
        Self {
            state: handle.state(),
            callback,
        }
    }
}

#[async_trait]
impl EventHandler for ContractListener {
    async fn on_event(&self, event: Result<EventInfo, EventError>) {
        let event = event.map(|info| ContractEvent {
            block_number: info.block_number,
            events: info.chaincode_events,
        });
        deliver(ListenerKind::Contract, &self.state, self.callback.as_ref(), event).await;
    }
}
