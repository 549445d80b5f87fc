//! Media-routing collaborator interfaces
//!
//! The signaling core never forwards media itself. It talks to a media
//! backend through these traits: a [`MediaServer`] creates rooms, a
//! [`MediaRoom`] hands out per-peer handles and media connections, and a
//! [`MediaConnection`] performs the SDP work for one peer.
//!
//! [`rtc`] provides a backend built on the `webrtc` crate.

pub mod rtc;

use crate::config::{ConnectionOptions, RoomOptions};
use crate::{Error, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

pub use rtc::RtcMediaServer;

/// Callback fired when a media connection needs a fresh offer/answer round
pub type NegotiationNeededHandler = Box<dyn Fn() + Send + Sync>;

/// SDP description type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SdpType {
    Offer,
    Answer,
    Pranswer,
    Rollback,
}

impl SdpType {
    pub fn as_str(&self) -> &'static str {
        match self {
            SdpType::Offer => "offer",
            SdpType::Answer => "answer",
            SdpType::Pranswer => "pranswer",
            SdpType::Rollback => "rollback",
        }
    }
}

impl std::fmt::Display for SdpType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A session description as exchanged over signaling
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionDescription {
    #[serde(rename = "type")]
    pub sdp_type: SdpType,
    pub sdp: String,
}

impl SessionDescription {
    pub fn offer(sdp: impl Into<String>) -> Self {
        Self {
            sdp_type: SdpType::Offer,
            sdp: sdp.into(),
        }
    }

    pub fn answer(sdp: impl Into<String>) -> Self {
        Self {
            sdp_type: SdpType::Answer,
            sdp: sdp.into(),
        }
    }
}

/// Options for offer creation
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct OfferOptions {
    /// Ask the remote side to send audio
    pub offer_to_receive_audio: bool,
    /// Ask the remote side to send video
    pub offer_to_receive_video: bool,
}

impl OfferOptions {
    /// Receive both audio and video
    pub fn receive_all() -> Self {
        Self {
            offer_to_receive_audio: true,
            offer_to_receive_video: true,
        }
    }
}

/// Media-routing engine: creates rooms
#[async_trait]
pub trait MediaServer: Send + Sync {
    /// Create the media side of a room
    async fn create_room(&self, name: &str, options: &RoomOptions) -> Result<Arc<dyn MediaRoom>>;
}

/// A room inside the media-routing engine
#[async_trait]
pub trait MediaRoom: Send + Sync {
    /// Room name as given at creation
    fn name(&self) -> &str;

    /// Create the media-side handle for a participant
    fn peer(&self, peer_id: &str) -> Result<Arc<dyn MediaPeer>>;

    /// Build a media connection bound to `peer`
    async fn connect(
        &self,
        peer: Arc<dyn MediaPeer>,
        options: &ConnectionOptions,
    ) -> Result<Arc<dyn MediaConnection>>;
}

/// Media-side handle of one participant
#[async_trait]
pub trait MediaPeer: Send + Sync {
    fn id(&self) -> &str;

    /// Apply the participant's capability SDP
    async fn set_capabilities(&self, sdp: &str) -> Result<()>;

    /// Release the participant inside the media engine
    async fn close(&self);
}

/// Per-peer media connection performing SDP work
#[async_trait]
pub trait MediaConnection: Send + Sync {
    /// Apply the participant's capability SDP (delegates to the bound media peer)
    async fn set_capabilities(&self, sdp: &str) -> Result<()>;

    async fn create_offer(&self, options: OfferOptions) -> Result<SessionDescription>;

    async fn set_local_description(&self, description: SessionDescription) -> Result<()>;

    async fn set_remote_description(&self, description: SessionDescription) -> Result<()>;

    async fn local_description(&self) -> Option<SessionDescription>;

    /// Subscribe to renegotiation triggers
    ///
    /// Replaces any previously installed handler.
    fn on_negotiation_needed(&self, handler: NegotiationNeededHandler);

    async fn close(&self) -> Result<()>;
}

/// Convenience conversion for backends that report SDP errors as strings
pub(crate) fn sdp_error(context: &str, err: impl std::fmt::Display) -> Error {
    Error::SdpError(format!("{}: {}", context, err))
}
