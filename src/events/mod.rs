//! Event subsystem: block delivery, listeners and commit strategies.
//!
//! # Data Flow
//! ```text
//! manager.rs (EventServiceManager)
//!     → peer_pool.rs (round-robin peer rotation, own organization)
//!     → service.rs (EventService per peer set: deliver stream → registrations)
//!         → block.rs / commit.rs / contract.rs (listener sessions)
//!             → listener.rs (single dispatch funnel, callback isolation)
//!         → strategy.rs (per-transaction commit tracking)
//!
//! registry.rs: commit strategy name → factory
//! ```
//!
//! # Design Decisions
//! - Services are pooled by the joined names of their peers; replay
//!   services live in their own pool
//! - A service connects to the first of its peers that accepts the
//!   deliver request
//! - Registering happens before starting, so no block is missed

pub mod block;
pub mod commit;
pub mod contract;
pub mod listener;
pub mod manager;
pub mod peer_pool;
pub mod registry;
pub mod service;
pub mod strategy;
pub mod types;

pub use listener::{CallbackResult, EventCallback, ListenerHandle, ListenerKind};
pub use manager::EventServiceManager;
pub use peer_pool::RoundRobinPeerPool;
pub use registry::EventStrategyRegistry;
pub use service::{EventHandler, EventRequest, EventService, RegistrationId, SignedEventRequest};
pub use strategy::{
    CommitContext, NoopEventHandler, Policy, Scope, StrategyFactory, TransactionEventHandler, TxEventHandler,
    TxEventHandlerFactory,
};
pub use types::{
    BlockEvent, BlockType, ChaincodeEvent, CommitError, CommitEvent, ContractEvent, DeliverResponse, EventError,
    EventInfo, EventResult, ListenerOptions, StartOptions,
};
