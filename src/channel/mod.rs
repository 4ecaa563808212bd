//! Channel subsystem: the boundary to peers, orderers and topology.
//!
//! # Data Flow
//! ```text
//! topology.rs (Channel: endorsers(msp), committers())
//!     → peer.rs (Peer / Orderer handles over transport traits)
//!     → proposal.rs (build → sign → send)
//!     → types.rs (ProposalResponse, BroadcastResponse, PeerError)
//!
//! discovery.rs: optional handler replacing explicit targets
//! ```
//!
//! # Design Decisions
//! - Wire encoding lives in the transport; this module only deals in typed messages
//! - Every network call has a deadline enforced here, not in transports

pub mod discovery;
pub mod peer;
pub mod proposal;
pub mod topology;
pub mod types;

pub use discovery::{DiscoveryHandler, DiscoveryRequest};
pub use peer::{DeliverStream, Orderer, OrdererClient, Peer, PeerClient};
pub use proposal::{CommitEnvelope, Proposal, ProposalBuilder, ProposalRequest, SignedEnvelope, SignedProposal};
pub use topology::{Channel, StaticChannel, StaticTopology, Topology};
pub use types::{
    BroadcastResponse, Endorsement, EndorsementResponse, PeerError, ProposalError, ProposalResponse,
    ProposalResult,
};
