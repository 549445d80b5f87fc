//! Error types for the signaling service

/// Result type alias using the signaling Error
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur in signaling operations
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Invalid configuration parameter
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// Media-routing collaborator refused to create a room
    #[error("Room creation failed: {0}")]
    RoomCreationFailed(String),

    /// Peer not found in the registry
    #[error("Peer not found: {0}")]
    PeerNotFound(String),

    /// Operation on a peer whose media connection was already released
    #[error("Peer closed: {0}")]
    PeerClosed(String),

    /// Capability SDP was rejected
    #[error("Capabilities error: {0}")]
    CapabilitiesError(String),

    /// SDP negotiation error (offer creation, local or remote description)
    #[error("SDP negotiation error: {0}")]
    SdpError(String),

    /// Inbound signaling message could not be interpreted
    #[error("Invalid message: {0}")]
    InvalidMessage(String),

    /// Outbound delivery to a client connection failed
    #[error("Transport error: {0}")]
    TransportError(String),

    /// WebSocket error
    #[error("WebSocket error: {0}")]
    WebSocketError(String),

    /// Serialization/deserialization error
    #[error("Serialization error: {0}")]
    SerializationError(String),

    /// WebRTC library error
    #[error("WebRTC error: {0}")]
    WebRtcError(String),

    /// I/O error
    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),

    /// Any other error
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl Error {
    /// Check if this error is retryable
    ///
    /// A failed room creation leaves no room stored, so a later join for the
    /// same name attempts creation again.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            Error::RoomCreationFailed(_)
                | Error::TransportError(_)
                | Error::WebSocketError(_)
                | Error::IoError(_)
        )
    }

    /// Check if this error is a configuration error
    pub fn is_config_error(&self) -> bool {
        matches!(self, Error::InvalidConfig(_))
    }

    /// Check if this error is a peer-related error
    pub fn is_peer_error(&self) -> bool {
        matches!(
            self,
            Error::PeerNotFound(_)
                | Error::PeerClosed(_)
                | Error::CapabilitiesError(_)
                | Error::SdpError(_)
        )
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Error::SerializationError(err.to_string())
    }
}
