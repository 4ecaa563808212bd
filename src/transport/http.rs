//! JSON over HTTP peer and orderer clients.

use async_trait::async_trait;
use reqwest::Client;
use serde::de::DeserializeOwned;
use serde::Serialize;
use url::Url;

use crate::channel::peer::{DeliverStream, OrdererClient, PeerClient};
use crate::channel::proposal::{SignedEnvelope, SignedProposal};
use crate::channel::types::{BroadcastResponse, PeerError, ProposalResponse};
use crate::events::service::SignedEventRequest;
use crate::transport::{parse_url, websocket, TransportError};

/// Peer reachable over HTTP (endorser) and WebSocket (deliver).
#[derive(Debug, Clone)]
pub struct HttpPeerClient {
    name: String,
    client: Client,
    url: Url,
    event_url: Url,
}

impl HttpPeerClient {
    pub fn new(name: &str, url: &str, event_url: &str) -> Result<Self, TransportError> {
        Ok(Self {
            name: name.to_string(),
            client: Client::new(),
            url: parse_url(url)?,
            event_url: parse_url(event_url)?,
        })
    }
}

#[async_trait]
impl PeerClient for HttpPeerClient {
    async fn process_proposal(&self, proposal: &SignedProposal) -> Result<ProposalResponse, PeerError> {
        post_json(&self.client, &self.name, &self.url, "proposal", proposal).await
    }

    async fn deliver(&self, request: &SignedEventRequest) -> Result<DeliverStream, PeerError> {
        websocket::open_deliver_stream(&self.name, &self.event_url, request).await
    }
}

/// Orderer reachable over HTTP.
#[derive(Debug, Clone)]
pub struct HttpOrdererClient {
    name: String,
    client: Client,
    url: Url,
}

impl HttpOrdererClient {
    pub fn new(name: &str, url: &str) -> Result<Self, TransportError> {
        Ok(Self {
            name: name.to_string(),
            client: Client::new(),
            url: parse_url(url)?,
        })
    }
}

#[async_trait]
impl OrdererClient for HttpOrdererClient {
    async fn broadcast(&self, envelope: &SignedEnvelope) -> Result<BroadcastResponse, PeerError> {
        post_json(&self.client, &self.name, &self.url, "broadcast", envelope).await
    }
}

async fn post_json<B, R>(client: &Client, peer: &str, base: &Url, path: &str, body: &B) -> Result<R, PeerError>
where
    B: Serialize + ?Sized,
    R: DeserializeOwned,
{
    let url = base.join(path).map_err(|e| PeerError::Request {
        peer: peer.to_string(),
        message: e.to_string(),
    })?;

    let resp = client.post(url).json(body).send().await.map_err(|e| {
        if e.is_connect() {
            PeerError::Connection {
                peer: peer.to_string(),
                message: e.to_string(),
            }
        } else {
            PeerError::Request {
                peer: peer.to_string(),
                message: e.to_string(),
            }
        }
    })?;

    let status = resp.status();
    let text = resp.text().await.map_err(|e| PeerError::Request {
        peer: peer.to_string(),
        message: e.to_string(),
    })?;

    if !status.is_success() {
        return Err(PeerError::Request {
            peer: peer.to_string(),
            message: format!("HTTP {}: {}", status, text),
        });
    }

    serde_json::from_str(&text).map_err(|e| PeerError::Request {
        peer: peer.to_string(),
        message: format!("Invalid response body: {}", e),
    })
}
