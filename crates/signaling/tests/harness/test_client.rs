//! WebSocket test client
//!
//! Speaks the JSON event protocol against a running signaling server.

use super::{HarnessError, HarnessResult};
use futures_util::stream::{SplitSink, SplitStream};
use futures_util::{SinkExt, StreamExt};
use serde_json::{json, Value};
use std::time::Duration;
use tokio::net::TcpStream;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// Default wait for a server event
pub const RECV_TIMEOUT: Duration = Duration::from_secs(5);

pub struct TestClient {
    tx: SplitSink<WsStream, Message>,
    rx: SplitStream<WsStream>,
}

impl TestClient {
    /// Connect to `ws://{addr}`, with an optional `sid` query parameter
    pub async fn connect(addr: std::net::SocketAddr, sid: Option<&str>) -> HarnessResult<Self> {
        let url = match sid {
            Some(sid) => format!("ws://{}/?sid={}", addr, sid),
            None => format!("ws://{}/", addr),
        };

        let (stream, _) = connect_async(url.as_str())
            .await
            .map_err(|e| HarnessError::ConnectionError(format!("{}: {}", url, e)))?;
        let (tx, rx) = stream.split();

        Ok(Self { tx, rx })
    }

    pub async fn send_raw(&mut self, text: &str) -> HarnessResult<()> {
        self.tx
            .send(Message::Text(text.to_string()))
            .await
            .map_err(|e| HarnessError::ClientError(e.to_string()))
    }

    pub async fn send_event(&mut self, event: Value) -> HarnessResult<()> {
        self.send_raw(&event.to_string()).await
    }

    pub async fn join(&mut self, room: &str) -> HarnessResult<()> {
        self.send_event(json!({"event": "join", "data": room})).await
    }

    pub async fn leave(&mut self) -> HarnessResult<()> {
        self.send_event(json!({"event": "leave"})).await
    }

    pub async fn message(&mut self, message: Value) -> HarnessResult<()> {
        self.send_event(json!({"event": "message", "data": message}))
            .await
    }

    /// Next JSON event from the server
    pub async fn recv_event(&mut self) -> HarnessResult<Value> {
        let deadline = tokio::time::Instant::now() + RECV_TIMEOUT;

        loop {
            let next = tokio::time::timeout_at(deadline, self.rx.next())
                .await
                .map_err(|_| HarnessError::Timeout("waiting for server event".to_string()))?;

            match next {
                Some(Ok(Message::Text(text))) => {
                    return serde_json::from_str(&text)
                        .map_err(|e| HarnessError::ProtocolError(e.to_string()));
                }
                Some(Ok(Message::Close(_))) | None => {
                    return Err(HarnessError::ConnectionError("closed".to_string()));
                }
                Some(Ok(_)) => continue,
                Some(Err(e)) => return Err(HarnessError::ConnectionError(e.to_string())),
            }
        }
    }

    /// Wait for the next event named `event`, skipping others
    pub async fn expect_event(&mut self, event: &str) -> HarnessResult<Value> {
        loop {
            let value = self.recv_event().await?;
            if value["event"] == event {
                return Ok(value);
            }
        }
    }

    pub async fn close(mut self) -> HarnessResult<()> {
        self.tx
            .send(Message::Close(None))
            .await
            .map_err(|e| HarnessError::ClientError(e.to_string()))
    }
}
