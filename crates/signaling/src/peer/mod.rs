//! Per-participant signaling state machine
//!
//! A [`Peer`] is created when a join resolves a room. It owns the media
//! connection for its participant and drives the capability/offer/answer
//! handshake from inbound [`InboundMessage`]s.

mod handshake;
mod state;

pub use state::NegotiationState;

use crate::config::ConnectionOptions;
use crate::media::{MediaConnection, MediaPeer};
use crate::registry::Room;
use crate::signaling::{ClientConnection, InboundMessage};
use crate::Result;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Weak};
use tokio::sync::{Mutex, RwLock};
use tracing::{debug, info, warn};

/// One connected participant inside a room
pub struct Peer {
    /// Peer id, equal to the client connection id
    id: String,

    /// Owning room, not kept alive by the peer
    room: Weak<Room>,

    room_name: String,

    /// Media-side handle of this participant
    media_peer: Arc<dyn MediaPeer>,

    /// Media connection, taken on close
    connection: RwLock<Option<Arc<dyn MediaConnection>>>,

    /// Client connection used for outbound messages
    transport: Arc<dyn ClientConnection>,

    state: RwLock<NegotiationState>,

    /// Set once the client's capability SDP was applied
    ///
    /// Held across `set_capabilities` so concurrent offers apply it at most once.
    has_capabilities: Mutex<bool>,

    /// Negotiation-needed subscription installed
    negotiation_subscribed: AtomicBool,

    /// Serializes offer creation
    offer_lock: Mutex<()>,

    closed: AtomicBool,
}

impl Peer {
    /// Create a peer bound to `room` and `transport`
    ///
    /// The returned peer is not registered anywhere.
    pub async fn new(
        room: &Arc<Room>,
        transport: Arc<dyn ClientConnection>,
        options: &ConnectionOptions,
    ) -> Result<Arc<Self>> {
        let id = transport.id().to_string();

        let media_peer = room.media().peer(&id)?;
        let connection = room
            .media()
            .connect(Arc::clone(&media_peer), options)
            .await?;

        debug!(peer_id = %id, room = %room.name(), "Peer created");

        Ok(Arc::new(Self {
            id,
            room: Arc::downgrade(room),
            room_name: room.name().to_string(),
            media_peer,
            connection: RwLock::new(Some(connection)),
            transport,
            state: RwLock::new(NegotiationState::New),
            has_capabilities: Mutex::new(false),
            negotiation_subscribed: AtomicBool::new(false),
            offer_lock: Mutex::new(()),
            closed: AtomicBool::new(false),
        }))
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn room_name(&self) -> &str {
        &self.room_name
    }

    /// The owning room, if the registry still holds it
    pub fn room(&self) -> Option<Arc<Room>> {
        self.room.upgrade()
    }

    pub async fn state(&self) -> NegotiationState {
        *self.state.read().await
    }

    pub async fn has_capabilities(&self) -> bool {
        *self.has_capabilities.lock().await
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }

    /// Dispatch one inbound signaling message
    ///
    /// Never fails: handshake errors end in a log line.
    pub async fn process_message(self: &Arc<Self>, message: InboundMessage) {
        debug!(peer_id = %self.id, kind = %message.kind(), "Processing message");

        match message {
            InboundMessage::Offer(payload) => self.handle_offer(payload).await,
            InboundMessage::Answer(payload) => self.handle_answer(payload).await,
            InboundMessage::Bye => {
                info!(peer_id = %self.id, "Client said bye");
            }
            InboundMessage::IceCandidate { kind, .. } => {
                debug!(peer_id = %self.id, kind = %kind, "Ignoring ICE candidate");
            }
            InboundMessage::Unknown { kind } => {
                warn!(peer_id = %self.id, kind = %kind, "Unknown message type");
            }
        }
    }

    /// Release the media connection and the media peer
    ///
    /// Safe to call repeatedly; only the first call does any work.
    pub async fn close(&self) {
        if self.closed.swap(true, Ordering::SeqCst) {
            return;
        }

        let connection = self.connection.write().await.take();
        if let Some(connection) = connection {
            if let Err(e) = connection.close().await {
                warn!(peer_id = %self.id, error = %e, "Error closing media connection");
            }
        }

        self.media_peer.close().await;
        *self.state.write().await = NegotiationState::Closed;

        info!(peer_id = %self.id, room = %self.room_name, "Peer closed");
    }

    pub(crate) async fn connection(&self) -> Option<Arc<dyn MediaConnection>> {
        self.connection.read().await.clone()
    }

    pub(crate) async fn set_state(&self, next: NegotiationState) {
        let mut state = self.state.write().await;
        if state.can_transition_to(next) {
            if *state != next {
                debug!(peer_id = %self.id, from = %*state, to = %next, "State change");
            }
            *state = next;
        } else {
            debug!(peer_id = %self.id, from = %*state, to = %next, "Ignoring state change");
        }
    }
}

impl std::fmt::Debug for Peer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Peer")
            .field("id", &self.id)
            .field("room_name", &self.room_name)
            .field("closed", &self.is_closed())
            .finish()
    }
}
