//! Block listener.

use async_trait::async_trait;
use std::sync::Arc;

use crate::events::listener::{deliver, EventCallback, ListenerHandle, ListenerKind, ListenerState};
use crate::events::service::EventHandler;
use crate::events::types::{BlockEvent, EventError, EventInfo};

pub(crate) struct BlockListener {
    state: Arc<ListenerState>,
    callback: Arc<dyn EventCallback<BlockEvent>>,
}

impl BlockListener {
    pub(crate) fn new(handle: &ListenerHandle, callback: Arc<dyn EventCallback<BlockEvent>>) -> Self {
        Self {
            state: handle.state(),
            callback,
        }
    }
}

#[async_trait]
impl EventHandler for BlockListener {
    async fn on_event(&self, event: Result<EventInfo, EventError>) {
        let event = event.and_then(block_event);
        deliver(ListenerKind::Block, &self.state, self.callback.as_ref(), event).await;
    }
}

/// Full block (with private data) if present, else the filtered block.
fn block_event(info: EventInfo) -> Result<BlockEvent, EventError> {
    if let Some(block) = info.block {
        return Ok(BlockEvent::Full {
            block,
            private_data: info.private_data,
        });
    }
    if let Some(block) = info.filtered_block {
        return Ok(BlockEvent::Filtered { block });
    }
    Err(EventError::MissingBlockData {
        service: info.event_service,
        block_number: info.block_number,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::types::{Block, PrivateData};

    #[test]
    fn test_full_block_carries_private_data() {
        let mut private_data = PrivateData::new();
        private_data.insert(0, b"secret".to_vec());
        let info = EventInfo {
            block_number: 4,
            block: Some(Block {
                number: 4,
                previous_hash: Vec::new(),
                transactions: Vec::new(),
            }),
            private_data: Some(private_data),
            ..EventInfo::default()
        };

        match block_event(info).unwrap() {
            BlockEvent::Full { private_data, .. } => assert!(private_data.is_some()),
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_missing_block_data() {
        let info = EventInfo {
            event_service: "peer0".into(),
            block_number: 8,
            ..EventInfo::default()
        };
        assert_eq!(
            block_event(info).unwrap_err(),
            EventError::MissingBlockData {
                service: "peer0".into(),
                block_number: 8
            }
        );
    }
}
