//! Shared mocks for the integration suites.
#![allow(dead_code)]

use async_trait::async_trait;
use futures_util::{stream, SinkExt, StreamExt};
use std::net::SocketAddr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::mpsc;
use tokio_tungstenite::tungstenite::Message;

use fabric_gateway::channel::{
    BroadcastResponse, DeliverStream, Endorsement, Orderer, OrdererClient, Peer, PeerClient, PeerError,
    ProposalResponse, SignedEnvelope, SignedProposal, StaticChannel, StaticTopology,
};
use fabric_gateway::events::types::{FilteredBlock, FilteredTransaction};
use fabric_gateway::events::{
    CommitContext, CommitError, DeliverResponse, EventRequest, SignedEventRequest, TxEventHandler,
    TxEventHandlerFactory,
};
use fabric_gateway::{ConnectOptions, Gateway, GatewayOptions, IdentityContext, Wallet};

pub const MSP: &str = "Org1MSP";
pub const CHANNEL: &str = "mychannel";
pub const CHAINCODE: &str = "basic";

pub fn identity() -> IdentityContext {
    IdentityContext::new(MSP, Arc::new(Wallet::random()))
}

pub fn endorsed(payload: &[u8]) -> ProposalResponse {
    ProposalResponse {
        status: 200,
        message: String::new(),
        payload: payload.to_vec(),
        endorsement: Some(Endorsement {
            endorser: vec![1],
            signature: vec![2],
        }),
    }
}

/// How a mock peer answers proposals.
#[derive(Debug, Clone)]
pub enum Reply {
    Endorse(Vec<u8>),
    Status(i32, String),
    Fail(String),
}

type DeliverSender = mpsc::UnboundedSender<Result<DeliverResponse, PeerError>>;

/// Peer whose endorsements are scripted and whose deliver streams are fed by the test.
pub struct MockPeer {
    name: String,
    msp_id: String,
    reply: Mutex<Reply>,
    proposals: AtomicUsize,
    streams: Mutex<Vec<DeliverSender>>,
    requests: Mutex<Vec<EventRequest>>,
}

impl MockPeer {
    pub fn new(name: &str, reply: Reply) -> Arc<Self> {
        Self::in_org(name, MSP, reply)
    }

    pub fn in_org(name: &str, msp_id: &str, reply: Reply) -> Arc<Self> {
        Arc::new(Self {
            name: name.to_string(),
            msp_id: msp_id.to_string(),
            reply: Mutex::new(reply),
            proposals: AtomicUsize::new(0),
            streams: Mutex::new(Vec::new()),
            requests: Mutex::new(Vec::new()),
        })
    }

    pub fn peer(self: &Arc<Self>) -> Peer {
        Peer::new(&self.name, &self.msp_id, self.clone())
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn set_reply(&self, reply: Reply) {
        *self.reply.lock().unwrap() = reply;
    }

    pub fn proposals(&self) -> usize {
        self.proposals.load(Ordering::SeqCst)
    }

    pub fn open_streams(&self) -> usize {
        self.streams.lock().unwrap().len()
    }

    pub fn deliver_requests(&self) -> Vec<EventRequest> {
        self.requests.lock().unwrap().clone()
    }

    /// Push a message to every open deliver stream.
    pub fn emit(&self, response: DeliverResponse) {
        self.streams
            .lock()
            .unwrap()
            .retain(|sender| sender.send(Ok(response.clone())).is_ok());
    }

    /// Fail every open deliver stream.
    pub fn break_streams(&self, message: &str) {
        for sender in self.streams.lock().unwrap().drain(..) {
            let _ = sender.send(Err(PeerError::Connection {
                peer: self.name.clone(),
                message: message.to_string(),
            }));
        }
    }

    /// Emit a filtered block holding one transaction.
    pub fn commit(&self, number: u64, transaction_id: &str, code: &str) {
        self.emit(filtered_block(number, &[(transaction_id, code)]));
    }
}

#[async_trait]
impl PeerClient for MockPeer {
    async fn process_proposal(&self, _proposal: &SignedProposal) -> Result<ProposalResponse, PeerError> {
        self.proposals.fetch_add(1, Ordering::SeqCst);
        let reply = self.reply.lock().unwrap().clone();
        match reply {
            Reply::Endorse(payload) => Ok(endorsed(&payload)),
            Reply::Status(status, message) => Ok(ProposalResponse {
                status,
                message,
                payload: Vec::new(),
                endorsement: None,
            }),
            Reply::Fail(message) => Err(PeerError::Connection {
                peer: self.name.clone(),
                message,
            }),
        }
    }

    async fn deliver(&self, request: &SignedEventRequest) -> Result<DeliverStream, PeerError> {
        self.requests.lock().unwrap().push(request.request().clone());
        let (sender, receiver) = mpsc::unbounded_channel();
        self.streams.lock().unwrap().push(sender);
        let stream = stream::unfold(receiver, |mut receiver| async move {
            receiver.recv().await.map(|item| (item, receiver))
        });
        Ok(stream.boxed())
    }
}

pub fn filtered_block(number: u64, transactions: &[(&str, &str)]) -> DeliverResponse {
    DeliverResponse::FilteredBlock {
        block: FilteredBlock {
            channel_id: CHANNEL.to_string(),
            number,
            transactions: transactions
                .iter()
                .map(|(id, code)| FilteredTransaction {
                    transaction_id: id.to_string(),
                    validation_code: code.to_string(),
                    chaincode_events: Vec::new(),
                })
                .collect(),
        },
    }
}

/// Orderer with a fixed reply; on success it asks the committing peers to
/// report the transaction.
pub struct MockOrderer {
    status: String,
    broadcasts: AtomicUsize,
    committers: Mutex<Vec<(Arc<MockPeer>, String)>>,
    next_block: AtomicUsize,
}

impl MockOrderer {
    pub fn new(status: &str) -> Arc<Self> {
        Arc::new(Self {
            status: status.to_string(),
            broadcasts: AtomicUsize::new(0),
            committers: Mutex::new(Vec::new()),
            next_block: AtomicUsize::new(1),
        })
    }

    pub fn orderer(self: &Arc<Self>) -> Orderer {
        Orderer::new("orderer0", "OrdererMSP", self.clone())
    }

    /// `peer` reports every accepted transaction with `code`.
    pub fn commit_on(&self, peer: &Arc<MockPeer>, code: &str) {
        self.committers.lock().unwrap().push((peer.clone(), code.to_string()));
    }

    pub fn broadcasts(&self) -> usize {
        self.broadcasts.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl OrdererClient for MockOrderer {
    async fn broadcast(&self, envelope: &SignedEnvelope) -> Result<BroadcastResponse, PeerError> {
        self.broadcasts.fetch_add(1, Ordering::SeqCst);
        if self.status == "SUCCESS" {
            let number = self.next_block.fetch_add(1, Ordering::SeqCst) as u64;
            for (peer, code) in self.committers.lock().unwrap().iter() {
                peer.commit(number, envelope.transaction_id(), code);
            }
        }
        Ok(BroadcastResponse {
            status: self.status.clone(),
            info: String::new(),
        })
    }
}

pub fn topology(peers: &[Arc<MockPeer>], orderer: &Arc<MockOrderer>) -> Arc<StaticTopology> {
    let mut channel = StaticChannel::new(CHANNEL).with_orderer(orderer.orderer());
    for peer in peers {
        channel = channel.with_peer(peer.peer());
    }
    Arc::new(StaticTopology::new().with_channel(channel))
}

pub fn connect(peers: &[Arc<MockPeer>], orderer: &Arc<MockOrderer>, options: GatewayOptions) -> Gateway {
    let connect = ConnectOptions::new(identity()).with_options(options);
    Gateway::connect(topology(peers, orderer), connect).unwrap()
}

/// Commit handler that only counts calls.
#[derive(Default)]
pub struct CountingHandler {
    pub started: AtomicUsize,
    pub waited: AtomicUsize,
    pub cancelled: AtomicUsize,
}

#[async_trait]
impl TxEventHandler for CountingHandler {
    async fn start_listening(&self) -> Result<(), CommitError> {
        self.started.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    async fn wait_for_events(&self) -> Result<(), CommitError> {
        self.waited.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    fn cancel_listening(&self) {
        self.cancelled.fetch_add(1, Ordering::SeqCst);
    }
}

pub struct CountingFactory(pub Arc<CountingHandler>);

impl TxEventHandlerFactory for CountingFactory {
    fn create(&self, _transaction_id: &str, _context: &CommitContext) -> Arc<dyn TxEventHandler> {
        self.0.clone()
    }
}

/// Request seen by a mock HTTP peer.
#[derive(Debug, Clone)]
pub struct SeenRequest {
    pub path: String,
    pub body: String,
}

/// Raw TCP HTTP server answering every request with `status` and `body`.
pub async fn start_http_peer(status: u16, body: String) -> (SocketAddr, Arc<Mutex<Vec<SeenRequest>>>) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let seen = Arc::new(Mutex::new(Vec::new()));
    let log = seen.clone();

    tokio::spawn(async move {
        while let Ok((socket, _)) = listener.accept().await {
            let body = body.clone();
            let log = log.clone();
            tokio::spawn(async move {
                let _ = serve_once(socket, status, &body, &log).await;
            });
        }
    });

    (addr, seen)
}

async fn serve_once(
    mut socket: TcpStream,
    status: u16,
    body: &str,
    log: &Mutex<Vec<SeenRequest>>,
) -> std::io::Result<()> {
    let mut buf = Vec::new();
    let mut chunk = [0u8; 4096];
    let header_end = loop {
        let n = socket.read(&mut chunk).await?;
        if n == 0 {
            return Ok(());
        }
        buf.extend_from_slice(&chunk[..n]);
        if let Some(pos) = buf.windows(4).position(|w| w == b"\r\n\r\n") {
            break pos + 4;
        }
    };

    let head = String::from_utf8_lossy(&buf[..header_end]).to_string();
    let content_length = head
        .lines()
        .find_map(|line| {
            let (name, value) = line.split_once(':')?;
            name.eq_ignore_ascii_case("content-length")
                .then(|| value.trim().parse::<usize>().ok())
                .flatten()
        })
        .unwrap_or(0);
    while buf.len() < header_end + content_length {
        let n = socket.read(&mut chunk).await?;
        if n == 0 {
            break;
        }
        buf.extend_from_slice(&chunk[..n]);
    }

    let path = head
        .lines()
        .next()
        .and_then(|line| line.split_whitespace().nth(1))
        .unwrap_or_default()
        .to_string();
    log.lock().unwrap().push(SeenRequest {
        path,
        body: String::from_utf8_lossy(&buf[header_end..]).to_string(),
    });

    let reason = if status < 400 { "OK" } else { "Error" };
    let response = format!(
        "HTTP/1.1 {} {}\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
        status,
        reason,
        body.len(),
        body
    );
    socket.write_all(response.as_bytes()).await?;
    socket.shutdown().await
}

/// WebSocket deliver server: records the request frame, then sends `frames`
/// and keeps the socket open.
pub async fn start_ws_peer(frames: Vec<String>) -> (SocketAddr, Arc<Mutex<Option<String>>>) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let seen = Arc::new(Mutex::new(None));
    let log = seen.clone();

    tokio::spawn(async move {
        let Ok((socket, _)) = listener.accept().await else {
            return;
        };
        let Ok(mut ws) = tokio_tungstenite::accept_async(socket).await else {
            return;
        };
        if let Some(Ok(Message::Text(text))) = ws.next().await {
            *log.lock().unwrap() = Some(text.to_string());
        }
        for frame in frames {
            if ws.send(Message::text(frame)).await.is_err() {
                return;
            }
        }
        while let Some(Ok(_)) = ws.next().await {}
    });

    (addr, seen)
}
