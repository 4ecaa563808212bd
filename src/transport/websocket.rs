//! Block delivery over WebSocket.
//!
//! The client sends one text frame holding the signed event request; the
//! peer answers with one JSON `DeliverResponse` per frame.

use futures_util::{SinkExt, StreamExt};
use tokio_tungstenite::connect_async;
use tokio_tungstenite::tungstenite::Message;
use url::Url;

use crate::channel::peer::DeliverStream;
use crate::channel::types::PeerError;
use crate::events::service::SignedEventRequest;
use crate::events::types::DeliverResponse;

pub async fn open_deliver_stream(
    peer: &str,
    url: &Url,
    request: &SignedEventRequest,
) -> Result<DeliverStream, PeerError> {
    let connection_error = |message: String| PeerError::Connection {
        peer: peer.to_string(),
        message,
    };

    let (mut socket, _) = connect_async(url.as_str())
        .await
        .map_err(|e| connection_error(e.to_string()))?;

    let body = serde_json::to_string(request).map_err(|e| PeerError::Request {
        peer: peer.to_string(),
        message: e.to_string(),
    })?;
    socket
        .send(Message::text(body))
        .await
        .map_err(|e| connection_error(e.to_string()))?;

    tracing::debug!(peer = %peer, url = %url, "Deliver stream opened");

    let peer = peer.to_string();
    let stream = socket.filter_map(move |frame| {
        let peer = peer.clone();
        async move {
            match frame {
                Ok(Message::Text(text)) => Some(decode(&peer, text.as_bytes())),
                Ok(Message::Binary(bytes)) => Some(decode(&peer, &bytes)),
                Ok(_) => None,
                Err(e) => Some(Err(PeerError::Connection {
                    peer,
                    message: e.to_string(),
                })),
            }
        }
    });

    Ok(Box::pin(stream))
}

fn decode(peer: &str, bytes: &[u8]) -> Result<DeliverResponse, PeerError> {
    serde_json::from_slice(bytes).map_err(|e| PeerError::Request {
        peer: peer.to_string(),
        message: format!("Invalid deliver frame: {}", e),
    })
}
