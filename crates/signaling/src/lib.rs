//! Room signaling for WebRTC media conferencing
//!
//! Participants connect over a client transport, join named rooms, and
//! negotiate a media connection with the server through an offer/answer
//! handshake.
//!
//! # Architecture
//!
//! ```text
//! ┌───────────────────────────────────────────────────────┐
//! │  Clients (browser/native)                             │
//! │  ↓ JSON events over WebSocket                         │
//! │  SignalingServer (one handler task per socket)        │
//! │  ↓ connect / join / leave / message / command         │
//! │  RoomRegistry                                         │
//! │  ├─ rooms: name → Room (created once per name)        │
//! │  └─ peers: connection id → Peer                       │
//! │       └─ capability / offer / answer state machine    │
//! │          ↓                                            │
//! │  MediaServer / MediaRoom / MediaConnection traits     │
//! │  └─ RtcMediaServer (webrtc crate)                     │
//! └───────────────────────────────────────────────────────┘
//! ```
//!
//! # Example
//!
//! ```
//! use roomrtc_signaling::SignalingConfig;
//!
//! let config = SignalingConfig::default().with_bind_address("127.0.0.1:9000");
//! assert!(config.validate().is_ok());
//! assert!(config.connection.use_plan_b);
//! ```
//!
//! ## Running a server
//!
//! ```no_run
//! use roomrtc_signaling::{RoomRegistry, RtcMediaServer, SignalingConfig, SignalingServer};
//! use std::sync::Arc;
//!
//! # async fn example() -> roomrtc_signaling::Result<()> {
//! let config = Arc::new(SignalingConfig::default());
//! let media = Arc::new(RtcMediaServer::new(&config));
//! let registry = Arc::new(RoomRegistry::new(media, Arc::clone(&config)));
//!
//! let handle = SignalingServer::new(Arc::clone(&registry))?.start().await?;
//! println!("listening on {}", handle.local_addr());
//!
//! handle.shutdown().await;
//! registry.shutdown().await;
//! # Ok(())
//! # }
//! ```

#![warn(clippy::all)]

pub mod config;
pub mod error;
pub mod media;
pub mod peer;
pub mod registry;
pub mod signaling;

pub use config::{
    ConnectionOptions, MediaCodec, MediaKind, RoomOptions, SignalingConfig, TurnServerConfig,
};
pub use error::{Error, Result};
pub use media::{
    MediaConnection, MediaPeer, MediaRoom, MediaServer, OfferOptions, RtcMediaServer, SdpType,
    SessionDescription,
};
pub use peer::{NegotiationState, Peer};
pub use registry::{Room, RoomRegistry};
pub use signaling::websocket::{SignalingServer, SignalingServerHandle};
pub use signaling::{ClientConnection, ClientEvent, InboundMessage, ServerEvent};

/// Get the version of this crate
pub fn version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
