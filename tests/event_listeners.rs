//! Block, commit and contract listeners over in-memory deliver streams.

mod common;

use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::time::timeout;

use common::{connect, filtered_block, MockOrderer, MockPeer, Reply, CHAINCODE, CHANNEL};
use fabric_gateway::events::types::{FilteredBlock, FilteredTransaction};
use fabric_gateway::events::{
    BlockEvent, BlockType, CallbackResult, ChaincodeEvent, CommitEvent, ContractEvent, DeliverResponse, EventCallback,
    EventError,
};
use fabric_gateway::{Gateway, GatewayOptions, ListenerOptions, Network};

const WAIT: Duration = Duration::from_secs(2);

fn collect<E: Send + 'static>() -> (impl EventCallback<E>, mpsc::UnboundedReceiver<Result<E, EventError>>) {
    let (sender, receiver) = mpsc::unbounded_channel();
    let callback = move |event: Result<E, EventError>| {
        let sender = sender.clone();
        async move {
            let _ = sender.send(event);
            let result: CallbackResult = Ok(());
            result
        }
    };
    (callback, receiver)
}

async fn next<E>(receiver: &mut mpsc::UnboundedReceiver<Result<E, EventError>>) -> Result<E, EventError> {
    timeout(WAIT, receiver.recv())
        .await
        .expect("no event within the deadline")
        .expect("callback dropped")
}

/// True when no event arrives. A closed channel counts: the callback was dropped unused.
async fn nothing<E>(receiver: &mut mpsc::UnboundedReceiver<Result<E, EventError>>) -> bool {
    matches!(timeout(Duration::from_millis(100), receiver.recv()).await, Err(_) | Ok(None))
}

fn setup() -> (Arc<MockPeer>, Gateway, Arc<Network>) {
    let peer = MockPeer::new("peer0", Reply::Endorse(b"R".to_vec()));
    let orderer = MockOrderer::new("SUCCESS");
    let gateway = connect(&[peer.clone()], &orderer, GatewayOptions::default());
    let network = gateway.get_network(CHANNEL).unwrap();
    (peer, gateway, network)
}

fn chaincode_event(chaincode_id: &str, transaction_id: &str, event_name: &str) -> ChaincodeEvent {
    ChaincodeEvent {
        chaincode_id: chaincode_id.to_string(),
        transaction_id: transaction_id.to_string(),
        event_name: event_name.to_string(),
        payload: Vec::new(),
    }
}

#[tokio::test]
async fn test_block_listener_receives_blocks() {
    let (peer, gateway, network) = setup();
    let (callback, mut receiver) = collect::<BlockEvent>();

    let handle = network.add_block_listener(callback, ListenerOptions::default()).await.unwrap();
    assert_eq!(peer.open_streams(), 1);
    assert_eq!(peer.deliver_requests()[0].block_type, BlockType::Filtered);

    peer.emit(filtered_block(1, &[("tx1", "VALID")]));
    peer.emit(filtered_block(2, &[]));

    assert_eq!(next(&mut receiver).await.unwrap().block_number(), 1);
    assert_eq!(next(&mut receiver).await.unwrap().block_number(), 2);
    assert_eq!(handle.events_received(), 2);
    assert!(handle.is_active());
    gateway.disconnect().await;
}

#[tokio::test]
async fn test_listeners_share_one_live_service() {
    let (peer, gateway, network) = setup();
    let (first, mut first_events) = collect::<BlockEvent>();
    let (second, mut second_events) = collect::<BlockEvent>();

    network.add_block_listener(first, ListenerOptions::default()).await.unwrap();
    network.add_block_listener(second, ListenerOptions::default()).await.unwrap();
    assert_eq!(peer.open_streams(), 1);
    assert_eq!(network.listener_count(), 2);

    peer.emit(filtered_block(7, &[]));
    assert_eq!(next(&mut first_events).await.unwrap().block_number(), 7);
    assert_eq!(next(&mut second_events).await.unwrap().block_number(), 7);
    gateway.disconnect().await;
}

#[tokio::test]
async fn test_failing_callback_does_not_block_others() {
    let (peer, gateway, network) = setup();

    let failing = |_event: Result<BlockEvent, EventError>| async move {
        let result: CallbackResult = Err("listener bug".into());
        result
    };
    let panicking = |_event: Result<BlockEvent, EventError>| async move {
        if true {
            panic!("listener panic");
        }
        let result: CallbackResult = Ok(());
        result
    };
    let (healthy, mut events) = collect::<BlockEvent>();

    let failing = network.add_block_listener(failing, ListenerOptions::default()).await.unwrap();
    let panicking = network.add_block_listener(panicking, ListenerOptions::default()).await.unwrap();
    network.add_block_listener(healthy, ListenerOptions::default()).await.unwrap();

    peer.emit(filtered_block(1, &[]));
    peer.emit(filtered_block(2, &[]));

    assert_eq!(next(&mut events).await.unwrap().block_number(), 1);
    assert_eq!(next(&mut events).await.unwrap().block_number(), 2);
    assert!(failing.is_active());
    assert!(panicking.is_active());
    assert_eq!(failing.events_received(), 2);
    gateway.disconnect().await;
}

#[tokio::test]
async fn test_full_block_listener() {
    let (peer, gateway, network) = setup();
    let (callback, mut receiver) = collect::<BlockEvent>();
    let options = ListenerOptions {
        block_type: BlockType::Full,
        ..ListenerOptions::default()
    };

    network.add_block_listener(callback, options).await.unwrap();
    assert_eq!(peer.deliver_requests()[0].block_type, BlockType::Full);

    peer.emit(DeliverResponse::Block {
        block: fabric_gateway::events::types::Block {
            number: 3,
            previous_hash: vec![0xab],
            transactions: Vec::new(),
        },
        private_data: None,
    });

    match next(&mut receiver).await.unwrap() {
        BlockEvent::Full { block, .. } => assert_eq!(block.previous_hash, vec![0xab]),
        other => panic!("unexpected event {:?}", other),
    }
    gateway.disconnect().await;
}

#[tokio::test]
async fn test_commit_listener_filters_by_transaction() {
    let (peer, gateway, network) = setup();
    let (callback, mut receiver) = collect::<CommitEvent>();

    network
        .add_commit_listener(callback, None, Some("tx9".to_string()))
        .await
        .unwrap();

    peer.emit(filtered_block(3, &[("tx8", "VALID"), ("tx9", "VALID")]));
    peer.emit(filtered_block(4, &[("tx9", "MVCC_READ_CONFLICT")]));

    let event = next(&mut receiver).await.unwrap();
    assert_eq!(
        event,
        CommitEvent {
            peer: "peer0".into(),
            transaction_id: "tx9".into(),
            block_number: 3,
            status: "VALID".into(),
        }
    );
    assert!(event.is_valid());
    assert!(!next(&mut receiver).await.unwrap().is_valid());
    assert!(nothing(&mut receiver).await);
    gateway.disconnect().await;
}

#[tokio::test]
async fn test_contract_listener_matches_valid_events() {
    let (peer, gateway, network) = setup();
    let contract = network.get_contract(CHAINCODE, None);
    let (callback, mut receiver) = collect::<ContractEvent>();

    contract
        .add_contract_listener("^asset", callback, ListenerOptions::default())
        .await
        .unwrap();

    peer.emit(DeliverResponse::FilteredBlock {
        block: FilteredBlock {
            channel_id: CHANNEL.into(),
            number: 5,
            transactions: vec![
                FilteredTransaction {
                    transaction_id: "tx1".into(),
                    validation_code: "VALID".into(),
                    chaincode_events: vec![
                        chaincode_event(CHAINCODE, "tx1", "assetCreated"),
                        chaincode_event(CHAINCODE, "tx1", "transfer"),
                        chaincode_event("other", "tx1", "assetCreated"),
                    ],
                },
                FilteredTransaction {
                    transaction_id: "tx2".into(),
                    validation_code: "ENDORSEMENT_POLICY_FAILURE".into(),
                    chaincode_events: vec![chaincode_event(CHAINCODE, "tx2", "assetDeleted")],
                },
            ],
        },
    });
    peer.emit(filtered_block(6, &[("tx3", "VALID")]));

    let event = next(&mut receiver).await.unwrap();
    assert_eq!(event.block_number, 5);
    assert_eq!(event.events, vec![chaincode_event(CHAINCODE, "tx1", "assetCreated")]);
    assert!(nothing(&mut receiver).await);
    gateway.disconnect().await;
}

#[tokio::test]
async fn test_contract_listener_rejects_bad_pattern() {
    let (peer, gateway, network) = setup();
    let contract = network.get_contract(CHAINCODE, None);
    let (callback, _receiver) = collect::<ContractEvent>();

    let err = contract
        .add_contract_listener("(unclosed", callback, ListenerOptions::default())
        .await
        .unwrap_err();

    assert!(matches!(err, EventError::InvalidPattern(_)));
    assert_eq!(network.listener_count(), 0);
    assert_eq!(peer.open_streams(), 0);
    gateway.disconnect().await;
}

#[tokio::test]
async fn test_replay_listener_uses_own_service() {
    let (peer, gateway, network) = setup();
    let (live, _live_events) = collect::<BlockEvent>();
    let (replay, mut replay_events) = collect::<BlockEvent>();

    network.add_block_listener(live, ListenerOptions::default()).await.unwrap();
    let options = ListenerOptions {
        start_block: Some(10),
        ..ListenerOptions::default()
    };
    network.add_block_listener(replay, options).await.unwrap();

    assert_eq!(peer.open_streams(), 2);
    let requests = peer.deliver_requests();
    assert_eq!(requests[0].start_block, None);
    assert_eq!(requests[1].start_block, Some(10));

    peer.emit(filtered_block(10, &[]));
    assert_eq!(next(&mut replay_events).await.unwrap().block_number(), 10);

    let (again, _again_events) = collect::<BlockEvent>();
    let err = network.add_block_listener(again, options).await.unwrap_err();
    assert!(matches!(err, EventError::ReplayOnStarted { .. }));
    assert_eq!(network.listener_count(), 2);
    gateway.disconnect().await;
}

#[tokio::test]
async fn test_replay_stops_at_end_block() {
    let (peer, gateway, network) = setup();
    let (callback, mut receiver) = collect::<BlockEvent>();
    let options = ListenerOptions {
        start_block: Some(1),
        end_block: Some(2),
        ..ListenerOptions::default()
    };

    network.add_block_listener(callback, options).await.unwrap();
    assert_eq!(peer.deliver_requests()[0].end_block, Some(2));

    for number in 1..=3 {
        peer.emit(filtered_block(number, &[]));
    }

    assert_eq!(next(&mut receiver).await.unwrap().block_number(), 1);
    assert_eq!(next(&mut receiver).await.unwrap().block_number(), 2);
    assert!(nothing(&mut receiver).await);
    gateway.disconnect().await;
}

#[tokio::test]
async fn test_stream_failure_reaches_listener() {
    let (peer, gateway, network) = setup();
    let (callback, mut receiver) = collect::<BlockEvent>();

    let handle = network.add_block_listener(callback, ListenerOptions::default()).await.unwrap();
    peer.break_streams("connection reset");

    match next(&mut receiver).await {
        Err(EventError::Disconnected { service, message }) => {
            assert_eq!(service, "peer0");
            assert!(message.contains("connection reset"));
        }
        other => panic!("unexpected event {:?}", other),
    }
    assert!(handle.is_active());
    assert_eq!(handle.events_received(), 0);
    gateway.disconnect().await;
}

#[tokio::test]
async fn test_remove_listener_is_idempotent() {
    let (peer, gateway, network) = setup();
    let (callback, mut receiver) = collect::<BlockEvent>();

    let (other, mut other_events) = collect::<BlockEvent>();
    network.add_block_listener(other, ListenerOptions::default()).await.unwrap();

    let handle = network.add_block_listener(callback, ListenerOptions::default()).await.unwrap();
    assert!(network.remove_block_listener(&handle));
    assert!(!network.remove_block_listener(&handle));
    assert!(!handle.is_active());
    assert_eq!(network.listener_count(), 1);

    peer.emit(filtered_block(1, &[]));
    assert_eq!(next(&mut other_events).await.unwrap().block_number(), 1);
    assert!(nothing(&mut receiver).await);
    assert_eq!(handle.events_received(), 0);
    gateway.disconnect().await;
}

#[tokio::test]
async fn test_disconnect_deactivates_listeners() {
    let (peer, gateway, network) = setup();
    let (block, _block_events) = collect::<BlockEvent>();
    let (commit, _commit_events) = collect::<CommitEvent>();

    let block = network.add_block_listener(block, ListenerOptions::default()).await.unwrap();
    let commit = network.add_commit_listener(commit, None, None).await.unwrap();

    gateway.disconnect().await;

    assert!(!block.is_active());
    assert!(!commit.is_active());
    assert_eq!(network.listener_count(), 0);
    assert!(!network.remove_commit_listener(&commit));
    peer.emit(filtered_block(1, &[]));
}
