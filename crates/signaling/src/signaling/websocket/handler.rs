//! Per-connection WebSocket handling
//!
//! Each socket becomes a [`WsClientConnection`]. Inbound frames are parsed
//! into [`ClientEvent`]s and handed to the registry one at a time, so the
//! events of one client are processed in arrival order.

use crate::registry::RoomRegistry;
use crate::signaling::{ClientConnection, ClientEvent, ServerEvent};
use crate::{Error, Result};
use async_trait::async_trait;
use futures_util::{SinkExt, StreamExt};
use std::sync::Arc;
use tokio::net::TcpStream;
use tokio::sync::mpsc;
use tokio_tungstenite::accept_hdr_async;
use tokio_tungstenite::tungstenite::handshake::server::{ErrorResponse, Request, Response};
use tokio_tungstenite::tungstenite::Message;
use tracing::{debug, error, info, warn};

/// Outbound queue depth per connection
const OUTBOUND_CAPACITY: usize = 128;

/// A client connected over WebSocket
pub struct WsClientConnection {
    id: String,
    sid: Option<String>,
    tx: mpsc::Sender<Message>,
}

impl WsClientConnection {
    fn new(sid: Option<String>, tx: mpsc::Sender<Message>) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            sid,
            tx,
        }
    }
}

#[async_trait]
impl ClientConnection for WsClientConnection {
    fn id(&self) -> &str {
        &self.id
    }

    fn sid(&self) -> Option<String> {
        self.sid.clone()
    }

    async fn send(&self, event: ServerEvent) -> Result<()> {
        let json = event.to_json()?;
        self.tx
            .send(Message::Text(json))
            .await
            .map_err(|_| Error::TransportError(format!("connection {} is closed", self.id)))
    }
}

/// Extract the `sid` query parameter from an upgrade request
fn session_token(query: Option<&str>) -> Option<String> {
    query?
        .split('&')
        .filter_map(|pair| pair.split_once('='))
        .find(|(key, _)| *key == "sid")
        .map(|(_, value)| value.to_string())
        .filter(|value| !value.is_empty())
}

/// Handle a single WebSocket connection until it closes
pub async fn handle_connection(stream: TcpStream, registry: Arc<RoomRegistry>) -> Result<()> {
    let addr = stream.peer_addr()?;

    let mut sid = None;
    let ws_stream = accept_hdr_async(
        stream,
        |request: &Request, response: Response| -> std::result::Result<Response, ErrorResponse> {
            sid = session_token(request.uri().query());
            Ok(response)
        },
    )
    .await
    .map_err(|e| Error::WebSocketError(format!("Handshake with {} failed: {}", addr, e)))?;

    let (mut ws_tx, mut ws_rx) = ws_stream.split();
    let (tx, mut rx) = mpsc::channel::<Message>(OUTBOUND_CAPACITY);

    let connection = Arc::new(WsClientConnection::new(sid, tx.clone()));
    info!(connection_id = %connection.id(), %addr, "WebSocket client connected");

    let connection_id = connection.id().to_string();
    let forward_task = tokio::spawn(async move {
        while let Some(msg) = rx.recv().await {
            if let Err(e) = ws_tx.send(msg).await {
                error!(connection_id = %connection_id, "Failed to send WebSocket message: {}", e);
                break;
            }
        }
    });

    registry.on_connect(connection.as_ref()).await;

    while let Some(msg) = ws_rx.next().await {
        match msg {
            Ok(Message::Text(text)) => dispatch(&registry, &connection, &text).await,
            Ok(Message::Ping(data)) => {
                let _ = tx.send(Message::Pong(data)).await;
            }
            Ok(Message::Close(_)) => {
                info!(connection_id = %connection.id(), "WebSocket connection closed by client");
                break;
            }
            Ok(_) => {}
            Err(e) => {
                warn!(connection_id = %connection.id(), "WebSocket error: {}", e);
                break;
            }
        }
    }

    // Disconnect counts as leave
    registry.on_leave(connection.as_ref()).await;
    forward_task.abort();

    Ok(())
}

async fn dispatch(registry: &RoomRegistry, connection: &Arc<WsClientConnection>, text: &str) {
    let event = match ClientEvent::from_json(text) {
        Ok(event) => event,
        Err(e) => {
            warn!(connection_id = %connection.id(), error = %e, "Dropping malformed frame");
            return;
        }
    };

    debug!(connection_id = %connection.id(), ?event, "Client event");

    match event {
        ClientEvent::Join(room) => {
            let client: Arc<dyn ClientConnection> = Arc::clone(connection) as _;
            registry.on_join(&room, client).await;
        }
        ClientEvent::Leave => registry.on_leave(connection.as_ref()).await,
        ClientEvent::Message(message) => registry.on_message(connection.as_ref(), message).await,
        ClientEvent::Command(command) => registry.on_command(connection.as_ref(), command).await,
    }
}
