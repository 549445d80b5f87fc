//! Signaling message types
//!
//! Inbound messages arrive as `{type, payload}` objects and are parsed into
//! the tagged [`InboundMessage`]. Outbound session descriptions are wrapped in
//! an [`SdpEnvelope`].

use crate::media::{SdpType, SessionDescription};
use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Greeting returned to every client on connect
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct WelcomeMessage {
    /// Always "welcome"
    #[serde(rename = "type")]
    pub kind: String,

    /// Human-readable greeting
    pub message: String,
}

impl WelcomeMessage {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            kind: "welcome".to_string(),
            message: message.into(),
        }
    }
}

/// SDP payload carried by inbound offers and answers
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SdpPayload {
    pub sdp: String,
}

/// Message received from a client inside a `message` event
#[derive(Debug, Clone, PartialEq)]
pub enum InboundMessage {
    /// Client SDP offer, used as the peer's capabilities
    Offer(SdpPayload),

    /// Client answer to a server-generated offer
    Answer(SdpPayload),

    /// Client says goodbye
    Bye,

    /// Any message whose type starts with `ice`
    IceCandidate {
        /// Original type string, e.g. "ice" or "icecandidate"
        kind: String,
        payload: Value,
    },

    /// Anything else
    Unknown {
        /// Original type string
        kind: String,
    },
}

#[derive(Deserialize)]
struct RawMessage {
    #[serde(rename = "type")]
    kind: String,
    #[serde(default)]
    payload: Value,
}

impl InboundMessage {
    /// Parse a raw `{type, payload}` object
    ///
    /// Fails when `type` is missing or when an offer/answer carries no usable
    /// SDP payload. Unrecognized types parse to [`InboundMessage::Unknown`].
    pub fn parse(value: Value) -> Result<Self> {
        let raw: RawMessage = serde_json::from_value(value)
            .map_err(|e| Error::InvalidMessage(format!("Malformed signaling message: {}", e)))?;

        let message = match raw.kind.as_str() {
            "offer" => InboundMessage::Offer(Self::sdp_payload("offer", raw.payload)?),
            "answer" => InboundMessage::Answer(Self::sdp_payload("answer", raw.payload)?),
            "bye" => InboundMessage::Bye,
            kind if kind.starts_with("ice") => InboundMessage::IceCandidate {
                kind: raw.kind.clone(),
                payload: raw.payload,
            },
            _ => InboundMessage::Unknown { kind: raw.kind },
        };

        Ok(message)
    }

    fn sdp_payload(kind: &str, payload: Value) -> Result<SdpPayload> {
        serde_json::from_value(payload)
            .map_err(|e| Error::InvalidMessage(format!("Invalid {} payload: {}", kind, e)))
    }

    /// Type string of the message, for logging
    pub fn kind(&self) -> &str {
        match self {
            InboundMessage::Offer(_) => "offer",
            InboundMessage::Answer(_) => "answer",
            InboundMessage::Bye => "bye",
            InboundMessage::IceCandidate { kind, .. } => kind,
            InboundMessage::Unknown { kind } => kind,
        }
    }
}

/// Outbound session description addressed to one client
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SdpEnvelope {
    /// Id of the peer the description belongs to
    pub from: String,

    /// Session token of the client connection
    pub sid: String,

    #[serde(rename = "type")]
    pub sdp_type: SdpType,

    pub payload: SessionDescription,
}

impl SdpEnvelope {
    pub fn new(from: &str, sid: String, description: SessionDescription) -> Self {
        Self {
            from: from.to_string(),
            sid,
            sdp_type: description.sdp_type,
            payload: description,
        }
    }
}
