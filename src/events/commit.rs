//! Commit listener.

use async_trait::async_trait;
use std::sync::Arc;

use crate::events::listener::{deliver, EventCallback, ListenerHandle, ListenerKind, ListenerState};
use crate::events::service::EventHandler;
use crate::events::types::{CommitEvent, EventError, EventInfo};

pub(crate) struct CommitListener {
    state: Arc<ListenerState>,
    callback: Arc<dyn EventCallback<CommitEvent>>,
}

impl CommitListener {
    pub(crate) fn new(handle: &ListenerHandle, callback: Arc<dyn EventCallback<CommitEvent>>) -> Self {
        Self {
            state: handle.state(),
            callback,
        }
    }
}

#[async_trait]
impl EventHandler for CommitListener {
    async fn on_event(&self, event: Result<EventInfo, EventError>) {
        let event = event.map(commit_event);
        deliver(ListenerKind::Commit, &self.state, self.callback.as_ref(), event).await;
    }
}

fn commit_event(info: EventInfo) -> CommitEvent {
    CommitEvent {
        peer: info.event_service,
        transaction_id: info.transaction_id.unwrap_or_default(),
        block_number: info.block_number,
        status: info.status.unwrap_or_default(),
    }
}
