//! Block delivery types, listener payloads and error definitions.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use thiserror::Error;

/// Validation code of a transaction the peers committed as valid.
pub const VALID_CODE: &str = "VALID";

/// Block detail level requested from a peer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BlockType {
    /// Transaction validation metadata only.
    #[default]
    Filtered,
    /// Complete blocks.
    Full,
    /// Complete blocks with private data attached.
    Private,
}

impl std::fmt::Display for BlockType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            BlockType::Filtered => "filtered",
            BlockType::Full => "full",
            BlockType::Private => "private",
        };
        f.write_str(name)
    }
}

/// Event emitted by chaincode during a transaction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChaincodeEvent {
    pub chaincode_id: String,
    pub transaction_id: String,
    pub event_name: String,
    /// Empty in filtered blocks.
    #[serde(default)]
    pub payload: Vec<u8>,
}

/// Transaction summary inside a filtered block.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FilteredTransaction {
    pub transaction_id: String,
    pub validation_code: String,
    #[serde(default)]
    pub chaincode_events: Vec<ChaincodeEvent>,
}

/// Block carrying only validation metadata.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FilteredBlock {
    pub channel_id: String,
    pub number: u64,
    pub transactions: Vec<FilteredTransaction>,
}

/// Transaction inside a full block.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlockTransaction {
    pub transaction_id: String,
    pub validation_code: String,
    #[serde(default)]
    pub chaincode_events: Vec<ChaincodeEvent>,
    /// Opaque transaction envelope bytes.
    #[serde(default)]
    pub payload: Vec<u8>,
}

/// Complete block.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Block {
    pub number: u64,
    #[serde(default)]
    pub previous_hash: Vec<u8>,
    pub transactions: Vec<BlockTransaction>,
}

/// Private data keyed by transaction index within the block.
pub type PrivateData = BTreeMap<u64, Vec<u8>>;

/// One message from a peer's deliver stream.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum DeliverResponse {
    FilteredBlock {
        block: FilteredBlock,
    },
    Block {
        block: Block,
        #[serde(default)]
        private_data: Option<PrivateData>,
    },
    /// Terminal status; the stream ends after it.
    Status {
        status: String,
    },
}

impl DeliverResponse {
    pub fn block_number(&self) -> Option<u64> {
        match self {
            DeliverResponse::FilteredBlock { block } => Some(block.number),
            DeliverResponse::Block { block, .. } => Some(block.number),
            DeliverResponse::Status { .. } => None,
        }
    }
}

/// Event as routed by an event service to one registration.
///
/// Which fields are populated depends on the registration type: block
/// registrations get block data, transaction registrations get the id and
/// validation status, chaincode registrations get matching chaincode events.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EventInfo {
    pub event_service: String,
    pub block_number: u64,
    pub transaction_id: Option<String>,
    pub status: Option<String>,
    pub chaincode_events: Vec<ChaincodeEvent>,
    pub block: Option<Block>,
    pub filtered_block: Option<FilteredBlock>,
    pub private_data: Option<PrivateData>,
}

/// Block delivered to a block listener.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BlockEvent {
    Full {
        block: Block,
        private_data: Option<PrivateData>,
    },
    Filtered {
        block: FilteredBlock,
    },
}

impl BlockEvent {
    pub fn block_number(&self) -> u64 {
        match self {
            BlockEvent::Full { block, .. } => block.number,
            BlockEvent::Filtered { block } => block.number,
        }
    }
}

/// Commit notification for one transaction from one peer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommitEvent {
    pub peer: String,
    pub transaction_id: String,
    pub block_number: u64,
    pub status: String,
}

impl CommitEvent {
    pub fn is_valid(&self) -> bool {
        self.status == VALID_CODE
    }
}

/// Chaincode events from one block matching a contract listener.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContractEvent {
    pub block_number: u64,
    pub events: Vec<ChaincodeEvent>,
}

/// Options for block and contract listeners.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ListenerOptions {
    pub block_type: BlockType,
    /// Replay from this block instead of listening live.
    pub start_block: Option<u64>,
    /// Stop replay after this block.
    pub end_block: Option<u64>,
}

/// Options used to start an event service.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StartOptions {
    pub block_type: BlockType,
    pub start_block: Option<u64>,
    pub end_block: Option<u64>,
}

impl From<ListenerOptions> for StartOptions {
    fn from(options: ListenerOptions) -> Self {
        Self {
            block_type: options.block_type,
            start_block: options.start_block,
            end_block: options.end_block,
        }
    }
}

/// Errors from event services and listener sessions.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum EventError {
    /// The channel has no peers for the client's organization.
    #[error("No peers available")]
    NoPeers,

    /// No target accepted the deliver request.
    #[error("Event service {service} failed to connect: {message}")]
    ConnectFailed { service: String, message: String },

    /// The deliver stream ended or failed.
    #[error("Event service {service} disconnected: {message}")]
    Disconnected { service: String, message: String },

    /// The event service was closed locally.
    #[error("EventService {service} has been shutdown")]
    Shutdown { service: String },

    /// A started service cannot be restarted from a historical block.
    #[error("Event service {service} is already started and cannot be used for replay")]
    ReplayOnStarted { service: String },

    /// A started service delivers a different block type.
    #[error("Event service {service} is started for {started} blocks, not {requested}")]
    BlockTypeMismatch {
        service: String,
        started: BlockType,
        requested: BlockType,
    },

    /// A block registration received no block data.
    #[error("Missing block data in event from {service} for block {block_number}")]
    MissingBlockData { service: String, block_number: u64 },

    /// Chaincode event name pattern did not compile.
    #[error("Invalid event name pattern: {0}")]
    InvalidPattern(String),

    /// The start request could not be signed or encoded.
    #[error("Failed to build event request: {0}")]
    Request(String),
}

impl EventError {
    /// Event service the error originated from, when there is one.
    pub fn service(&self) -> Option<&str> {
        match self {
            EventError::ConnectFailed { service, .. }
            | EventError::Disconnected { service, .. }
            | EventError::Shutdown { service }
            | EventError::ReplayOnStarted { service }
            | EventError::BlockTypeMismatch { service, .. }
            | EventError::MissingBlockData { service, .. } => Some(service),
            EventError::NoPeers | EventError::InvalidPattern(_) | EventError::Request(_) => None,
        }
    }
}

/// Result type for event operations.
pub type EventResult<T> = Result<T, EventError>;

/// Failure while waiting for a transaction to commit.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum CommitError {
    /// Commit events were not received in time.
    #[error("Event strategy not satisfied within the timeout period of {timeout_secs} seconds for transaction {transaction_id}. Peers not responding: {}", .peers.join(", "))]
    Timeout {
        transaction_id: String,
        timeout_secs: u64,
        peers: Vec<String>,
    },

    /// A peer committed the transaction as invalid.
    #[error("Commit of transaction {transaction_id} failed on peer {peer} with status {status}")]
    Rejected {
        transaction_id: String,
        peer: String,
        status: String,
    },

    /// Every peer in scope failed to report.
    #[error("No successful events received for transaction {transaction_id}. Errors: {}", .errors.join("; "))]
    NoSuccessfulEvents {
        transaction_id: String,
        errors: Vec<String>,
    },

    /// Listening could not be set up.
    #[error(transparent)]
    Event(#[from] EventError),
}

impl CommitError {
    pub fn is_timeout(&self) -> bool {
        matches!(self, CommitError::Timeout { .. })
    }
}
