//! Signaling test harness
//!
//! Provides infrastructure for integration testing of the registry and peers:
//! - Mock media collaborators that count calls and inject failures or delays
//! - A recording client connection capturing every outbound event
//! - A WebSocket test client for end-to-end tests
//!
//! Basic usage pattern:
//!
//! 1. Create a `MockMediaServer` (optionally with delays/failures)
//! 2. Build a registry with `registry_with(&media)`
//! 3. Drive it with `RecordingConnection`s
//! 4. Assert on `media.calls()` and recorded events

#![allow(dead_code)]

pub mod mock_media;
pub mod recording;
pub mod test_client;

use roomrtc_signaling::{RoomRegistry, SignalingConfig};
use std::sync::Arc;
use std::time::Duration;

pub use mock_media::{MediaCalls, MockMediaServer};
pub use recording::RecordingConnection;
pub use test_client::TestClient;

/// Result type for test harness operations
pub type HarnessResult<T> = Result<T, HarnessError>;

/// Error type for test harness operations
#[derive(Debug, thiserror::Error)]
pub enum HarnessError {
    #[error("Client error: {0}")]
    ClientError(String),

    #[error("Connection error: {0}")]
    ConnectionError(String),

    #[error("Timeout: {0}")]
    Timeout(String),

    #[error("Protocol error: {0}")]
    ProtocolError(String),
}

/// Initialize test logging (call once per test)
pub fn init_logging() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter("info,roomrtc_signaling=debug")
        .with_test_writer()
        .try_init();
}

/// Config suitable for tests: ephemeral port, no STUN
pub fn test_config() -> SignalingConfig {
    SignalingConfig::default()
        .with_bind_address("127.0.0.1:0")
        .with_stun_servers(Vec::new())
}

/// Registry backed by `media` with the test config
pub fn registry_with(media: &Arc<MockMediaServer>) -> Arc<RoomRegistry> {
    registry_with_config(media, test_config())
}

pub fn registry_with_config(
    media: &Arc<MockMediaServer>,
    config: SignalingConfig,
) -> Arc<RoomRegistry> {
    Arc::new(RoomRegistry::new(
        Arc::clone(media) as Arc<dyn roomrtc_signaling::MediaServer>,
        Arc::new(config),
    ))
}

/// Poll `condition` until it holds or `timeout` elapses
pub async fn eventually<F>(timeout: Duration, mut condition: F) -> bool
where
    F: FnMut() -> bool,
{
    let deadline = tokio::time::Instant::now() + timeout;
    loop {
        if condition() {
            return true;
        }
        if tokio::time::Instant::now() >= deadline {
            return false;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
}

/// A minimal offer SDP with one audio and one video section
pub const CLIENT_OFFER_SDP: &str = "v=0\r\n\
o=- 4611731400430051336 2 IN IP4 127.0.0.1\r\n\
s=-\r\n\
t=0 0\r\n\
m=audio 9 UDP/TLS/RTP/SAVPF 111\r\n\
c=IN IP4 0.0.0.0\r\n\
a=rtpmap:111 opus/48000/2\r\n\
m=video 9 UDP/TLS/RTP/SAVPF 96\r\n\
c=IN IP4 0.0.0.0\r\n\
a=rtpmap:96 VP8/90000\r\n";

/// Signaling message carrying an offer
pub fn offer_message(sdp: &str) -> serde_json::Value {
    serde_json::json!({
        "type": "offer",
        "payload": {"type": "offer", "sdp": sdp}
    })
}

/// Signaling message carrying an answer
pub fn answer_message(sdp: &str) -> serde_json::Value {
    serde_json::json!({
        "type": "answer",
        "payload": {"type": "answer", "sdp": sdp}
    })
}
