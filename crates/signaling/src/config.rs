//! Configuration types for the signaling service

use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::net::SocketAddr;
use std::path::Path;

/// Default greeting sent to every client on connect
pub const DEFAULT_WELCOME_MESSAGE: &str = "Enjoy video conferencing !";

/// Main configuration for the signaling server
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SignalingConfig {
    /// Address the WebSocket server binds to
    pub bind_address: String,

    /// Message carried by the welcome acknowledgment
    pub welcome_message: String,

    /// STUN server URLs handed to every media connection
    pub stun_servers: Vec<String>,

    /// TURN server configurations (optional)
    pub turn_servers: Vec<TurnServerConfig>,

    /// Options passed to the media-routing collaborator on room creation
    pub room_options: RoomOptions,

    /// Options used when constructing each peer's media connection
    pub connection: ConnectionOptions,
}

/// TURN server configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TurnServerConfig {
    /// TURN server URL (turn: or turns:)
    pub url: String,

    /// Username for TURN authentication
    pub username: String,

    /// Credential for TURN authentication
    pub credential: String,
}

/// Room creation options
///
/// An empty codec list means the media backend registers its default codecs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoomOptions {
    /// Codecs the room's router accepts
    #[serde(default)]
    pub media_codecs: Vec<MediaCodec>,
}

/// Media kind of a codec
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MediaKind {
    /// Audio codec
    Audio,
    /// Video codec
    Video,
}

impl MediaKind {
    /// MIME type prefix for this kind
    pub fn mime_prefix(&self) -> &'static str {
        match self {
            MediaKind::Audio => "audio/",
            MediaKind::Video => "video/",
        }
    }
}

/// A codec entry in the room options
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MediaCodec {
    /// Audio or video
    pub kind: MediaKind,

    /// MIME type, e.g. "audio/opus"
    pub mime_type: String,

    /// RTP clock rate in Hz
    pub clock_rate: u32,

    /// Channel count (audio only, 0 for video)
    #[serde(default)]
    pub channels: u16,

    /// RTP payload type
    pub payload_type: u8,

    /// Optional fmtp line
    #[serde(default)]
    pub sdp_fmtp_line: String,
}

/// Options for constructing a peer's media connection
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConnectionOptions {
    /// Request Plan-B SDP semantics from the media backend
    pub use_plan_b: bool,
}

impl Default for SignalingConfig {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0:8080".to_string(),
            welcome_message: DEFAULT_WELCOME_MESSAGE.to_string(),
            stun_servers: vec!["stun:stun.l.google.com:19302".to_string()],
            turn_servers: Vec::new(),
            room_options: RoomOptions::default(),
            connection: ConnectionOptions::default(),
        }
    }
}

impl Default for RoomOptions {
    fn default() -> Self {
        Self {
            media_codecs: vec![
                MediaCodec {
                    kind: MediaKind::Audio,
                    mime_type: "audio/opus".to_string(),
                    clock_rate: 48000,
                    channels: 2,
                    payload_type: 111,
                    sdp_fmtp_line: "minptime=10;useinbandfec=1".to_string(),
                },
                MediaCodec {
                    kind: MediaKind::Video,
                    mime_type: "video/VP8".to_string(),
                    clock_rate: 90000,
                    channels: 0,
                    payload_type: 96,
                    sdp_fmtp_line: String::new(),
                },
            ],
        }
    }
}

impl Default for ConnectionOptions {
    fn default() -> Self {
        Self { use_plan_b: true }
    }
}

impl RoomOptions {
    /// Validate the codec list
    pub fn validate(&self) -> Result<()> {
        let mut payload_types = HashSet::new();

        for codec in &self.media_codecs {
            if !codec
                .mime_type
                .to_ascii_lowercase()
                .starts_with(codec.kind.mime_prefix())
            {
                return Err(Error::InvalidConfig(format!(
                    "codec {} does not match kind {:?}",
                    codec.mime_type, codec.kind
                )));
            }

            if codec.clock_rate == 0 {
                return Err(Error::InvalidConfig(format!(
                    "codec {} must have a non-zero clock_rate",
                    codec.mime_type
                )));
            }

            if codec.kind == MediaKind::Audio && codec.channels == 0 {
                return Err(Error::InvalidConfig(format!(
                    "audio codec {} must have at least one channel",
                    codec.mime_type
                )));
            }

            if !payload_types.insert(codec.payload_type) {
                return Err(Error::InvalidConfig(format!(
                    "duplicate payload_type {}",
                    codec.payload_type
                )));
            }
        }

        Ok(())
    }
}

impl SignalingConfig {
    /// Load configuration from a `.toml` or `.json` file
    ///
    /// Missing fields fall back to their defaults.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path)?;

        match path.extension().and_then(|ext| ext.to_str()) {
            Some("toml") => toml::from_str(&contents).map_err(|e| {
                Error::InvalidConfig(format!("Failed to parse {}: {}", path.display(), e))
            }),
            Some("json") => serde_json::from_str(&contents).map_err(|e| {
                Error::InvalidConfig(format!("Failed to parse {}: {}", path.display(), e))
            }),
            _ => Err(Error::InvalidConfig(format!(
                "unsupported config format: {} (expected .toml or .json)",
                path.display()
            ))),
        }
    }

    /// Validate configuration parameters
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - `bind_address` is not a socket address
    /// - a STUN or TURN URL has the wrong scheme
    /// - the room codec list is inconsistent
    pub fn validate(&self) -> Result<()> {
        self.bind_address.parse::<SocketAddr>().map_err(|e| {
            Error::InvalidConfig(format!(
                "bind_address must be host:port, got {}: {}",
                self.bind_address, e
            ))
        })?;

        for url in &self.stun_servers {
            if !url.starts_with("stun:") && !url.starts_with("stuns:") {
                return Err(Error::InvalidConfig(format!(
                    "STUN server must start with stun: or stuns:, got {}",
                    url
                )));
            }
        }

        for turn in &self.turn_servers {
            if !turn.url.starts_with("turn:") && !turn.url.starts_with("turns:") {
                return Err(Error::InvalidConfig(format!(
                    "TURN server must start with turn: or turns:, got {}",
                    turn.url
                )));
            }
        }

        self.room_options.validate()
    }

    /// Set the bind address
    pub fn with_bind_address(mut self, bind_address: &str) -> Self {
        self.bind_address = bind_address.to_string();
        self
    }

    /// Replace the STUN server list
    pub fn with_stun_servers(mut self, stun_servers: Vec<String>) -> Self {
        self.stun_servers = stun_servers;
        self
    }

    /// Add TURN servers to this configuration
    pub fn with_turn_servers(mut self, turn_servers: Vec<TurnServerConfig>) -> Self {
        self.turn_servers = turn_servers;
        self
    }

    /// Toggle Plan-B connection semantics
    pub fn with_plan_b(mut self, use_plan_b: bool) -> Self {
        self.connection.use_plan_b = use_plan_b;
        self
    }

    /// Set the welcome message
    pub fn with_welcome_message(mut self, message: &str) -> Self {
        self.welcome_message = message.to_string();
        self
    }
}
