//! Reference network transport.
//!
//! # Data Flow
//! ```text
//! Peer::process_proposal → http.rs  POST {url}/proposal   (JSON SignedProposal → ProposalResponse)
//! Orderer::broadcast     → http.rs  POST {url}/broadcast  (JSON SignedEnvelope → BroadcastResponse)
//! Peer::deliver          → websocket.rs  {event_url}      (JSON SignedEventRequest, then DeliverResponse frames)
//! ```
//!
//! # Design Decisions
//! - Transports map every failure onto `PeerError`; callers never see
//!   reqwest or tungstenite errors
//! - Deadlines are applied by the caller, not here

pub mod http;
pub mod websocket;

use thiserror::Error;

/// Errors constructing a transport client.
#[derive(Debug, Error)]
pub enum TransportError {
    #[error("Invalid URL '{url}': {message}")]
    InvalidUrl { url: String, message: String },
}

pub(crate) fn parse_url(url: &str) -> Result<url::Url, TransportError> {
    url.parse().map_err(|e: url::ParseError| TransportError::InvalidUrl {
        url: url.to_string(),
        message: e.to_string(),
    })
}
