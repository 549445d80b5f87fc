//! Client-facing event transport
//!
//! The registry talks to clients only through [`ClientConnection`]. Events
//! travel as `{"event": ..., "data": ...}` objects in both directions.

pub mod protocol;
pub mod websocket;

use crate::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;

pub use protocol::{InboundMessage, SdpEnvelope, SdpPayload, WelcomeMessage};

/// Payload of the `ready` event emitted after a successful join
pub const READY_MESSAGE: &str = "join me";

/// One connected client as seen by the signaling core
#[async_trait]
pub trait ClientConnection: Send + Sync {
    /// Unique connection id, also used as the peer id
    fn id(&self) -> &str;

    /// Session token supplied by the client, if any
    fn sid(&self) -> Option<String>;

    /// Deliver an event to the client
    async fn send(&self, event: ServerEvent) -> Result<()>;
}

/// Server to client events
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "event", content = "data", rename_all = "lowercase")]
pub enum ServerEvent {
    Welcome(WelcomeMessage),
    Ready(String),
    Message(SdpEnvelope),
}

impl ServerEvent {
    pub fn ready() -> Self {
        ServerEvent::Ready(READY_MESSAGE.to_string())
    }

    /// Convert event to JSON string
    pub fn to_json(&self) -> Result<String> {
        serde_json::to_string(self).map_err(|e| {
            crate::Error::SerializationError(format!("Failed to serialize server event: {}", e))
        })
    }
}

/// Client to server events
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "event", content = "data", rename_all = "lowercase")]
pub enum ClientEvent {
    /// Join the named room
    Join(String),
    Leave,
    /// Signaling message for the client's peer
    Message(Value),
    /// Out-of-band command, logged only
    Command(Value),
}

impl ClientEvent {
    /// Parse event from JSON string
    pub fn from_json(json: &str) -> Result<Self> {
        serde_json::from_str(json).map_err(|e| {
            crate::Error::InvalidMessage(format!("Failed to deserialize client event: {}", e))
        })
    }
}
