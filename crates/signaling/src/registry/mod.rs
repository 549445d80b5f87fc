//! Room and peer registry
//!
//! [`RoomRegistry`] owns the room-name to [`Room`] and connection-id to
//! [`Peer`] maps and runs the connect/join/leave/message/command workflows
//! for the transport. It is a plain value: construct one per server, or one
//! per test.

mod room;

pub use room::Room;

use crate::config::SignalingConfig;
use crate::media::MediaServer;
use crate::peer::Peer;
use crate::signaling::{ClientConnection, InboundMessage, ServerEvent, WelcomeMessage};
use crate::{Error, Result};
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{Mutex, RwLock};
use tracing::{debug, error, info, instrument, warn};

/// Registry of rooms and peers
pub struct RoomRegistry {
    /// Media-routing collaborator used to create rooms
    media: Arc<dyn MediaServer>,

    config: Arc<SignalingConfig>,

    /// Map of room name to Room
    rooms: RwLock<HashMap<String, Arc<Room>>>,

    /// Map of connection id to Peer
    peers: RwLock<HashMap<String, Arc<Peer>>>,

    /// One creation gate per room name with a creation in flight
    room_gates: Mutex<HashMap<String, Arc<Mutex<()>>>>,
}

impl RoomRegistry {
    pub fn new(media: Arc<dyn MediaServer>, config: Arc<SignalingConfig>) -> Self {
        Self {
            media,
            config,
            rooms: RwLock::new(HashMap::new()),
            peers: RwLock::new(HashMap::new()),
            room_gates: Mutex::new(HashMap::new()),
        }
    }

    pub fn config(&self) -> &SignalingConfig {
        &self.config
    }

    pub async fn get_room(&self, name: &str) -> Option<Arc<Room>> {
        self.rooms.read().await.get(name).cloned()
    }

    /// Store `room` under `name`, replacing any previous value
    pub async fn set_room(&self, name: &str, room: Arc<Room>) -> Arc<Room> {
        self.rooms
            .write()
            .await
            .insert(name.to_string(), Arc::clone(&room));
        room
    }

    pub async fn get_peer(&self, id: &str) -> Option<Arc<Peer>> {
        self.peers.read().await.get(id).cloned()
    }

    /// Store `peer` under `id`, replacing any previous value
    ///
    /// A different peer displaced by this call is closed.
    pub async fn set_peer(&self, id: &str, peer: Arc<Peer>) -> Arc<Peer> {
        let displaced = self
            .peers
            .write()
            .await
            .insert(id.to_string(), Arc::clone(&peer));

        if let Some(displaced) = displaced {
            if !Arc::ptr_eq(&displaced, &peer) {
                warn!(peer_id = %id, "Replacing a registered peer");
                displaced.close().await;
            }
        }

        peer
    }

    /// Build a fresh, unregistered peer for `connection` in `room`
    ///
    /// Any peer already registered under the connection id is closed and
    /// removed first.
    pub async fn create_peer(
        &self,
        room: &Arc<Room>,
        connection: Arc<dyn ClientConnection>,
    ) -> Result<Arc<Peer>> {
        let existing = self.get_peer(connection.id()).await;
        self.clean_peer(existing.as_ref()).await;

        Peer::new(room, connection, &self.config.connection).await
    }

    /// Close `peer` and remove it from the registry
    ///
    /// No-op for `None`. Calling it again for the same peer does nothing.
    pub async fn clean_peer(&self, peer: Option<&Arc<Peer>>) {
        let Some(peer) = peer else {
            return;
        };

        peer.close().await;

        let mut peers = self.peers.write().await;
        if peers
            .get(peer.id())
            .is_some_and(|registered| Arc::ptr_eq(registered, peer))
        {
            peers.remove(peer.id());
            debug!(peer_id = %peer.id(), "Peer removed from registry");
        }
    }

    /// Look up the room, creating it through the media server if absent
    ///
    /// Creation is serialized per name so concurrent joins create the room
    /// once. A failed creation stores nothing. The gate is released on both
    /// outcomes once no other join waits on it.
    pub async fn resolve_room(&self, name: &str) -> Result<Arc<Room>> {
        if let Some(room) = self.get_room(name).await {
            return Ok(room);
        }

        let gate = {
            let mut gates = self.room_gates.lock().await;
            Arc::clone(
                gates
                    .entry(name.to_string())
                    .or_insert_with(|| Arc::new(Mutex::new(()))),
            )
        };
        let created = {
            let _creating = gate.lock().await;
            self.create_room_once(name).await
        };
        self.release_room_gate(name, gate).await;

        created
    }

    async fn create_room_once(&self, name: &str) -> Result<Arc<Room>> {
        if let Some(room) = self.get_room(name).await {
            return Ok(room);
        }

        let media_room = self
            .media
            .create_room(name, &self.config.room_options)
            .await
            .map_err(|e| match e {
                Error::RoomCreationFailed(_) => e,
                other => Error::RoomCreationFailed(format!("{}: {}", name, other)),
            })?;

        let room = self
            .set_room(name, Arc::new(Room::new(name, media_room)))
            .await;

        info!(room = %name, "Room created");
        Ok(room)
    }

    /// Drop the gate entry for `name` unless another join is waiting on it
    async fn release_room_gate(&self, name: &str, gate: Arc<Mutex<()>>) {
        let mut gates = self.room_gates.lock().await;
        let idle = gates
            .get(name)
            .is_some_and(|current| Arc::ptr_eq(current, &gate) && Arc::strong_count(&gate) == 2);
        if idle {
            gates.remove(name);
        }
    }

    /// Room names with a creation gate still registered
    pub async fn pending_room_gates(&self) -> usize {
        self.room_gates.lock().await.len()
    }

    /// Join workflow: resolve room, replace peer, register it, send `ready`
    #[instrument(skip(self, connection), fields(connection_id = %connection.id()))]
    pub async fn join(
        &self,
        room_name: &str,
        connection: Arc<dyn ClientConnection>,
    ) -> Result<Arc<Peer>> {
        let room = self.resolve_room(room_name).await?;

        let peer = self.create_peer(&room, Arc::clone(&connection)).await?;
        let peer = self.set_peer(connection.id(), peer).await;

        connection.send(ServerEvent::ready()).await?;

        info!(peer_id = %peer.id(), room = %room_name, "Peer joined");
        Ok(peer)
    }

    /// Client connected: send the welcome acknowledgment
    pub async fn on_connect(&self, connection: &dyn ClientConnection) {
        debug!(connection_id = %connection.id(), "Client connected");

        let welcome = ServerEvent::Welcome(WelcomeMessage::new(&self.config.welcome_message));
        if let Err(e) = connection.send(welcome).await {
            warn!(connection_id = %connection.id(), error = %e, "Failed to send welcome");
        }
    }

    /// Client asked to join `room_name`; failures are logged
    pub async fn on_join(&self, room_name: &str, connection: Arc<dyn ClientConnection>) {
        let connection_id = connection.id().to_string();

        if let Err(e) = self.join(room_name, connection).await {
            error!(
                connection_id = %connection_id,
                room = %room_name,
                error = %e,
                "Join failed"
            );
        }
    }

    /// Client left or disconnected
    #[instrument(skip(self, connection), fields(connection_id = %connection.id()))]
    pub async fn on_leave(&self, connection: &dyn ClientConnection) {
        let peer = self.get_peer(connection.id()).await;
        if peer.is_none() {
            debug!("Leave without a registered peer");
        }

        self.clean_peer(peer.as_ref()).await;
    }

    /// Forward a signaling message to the client's peer
    pub async fn on_message(&self, connection: &dyn ClientConnection, message: Value) {
        let Some(peer) = self.get_peer(connection.id()).await else {
            warn!(
                connection_id = %connection.id(),
                "Message for unknown peer, client must join first"
            );
            return;
        };

        match InboundMessage::parse(message) {
            Ok(message) => peer.process_message(message).await,
            Err(e) => {
                warn!(peer_id = %peer.id(), error = %e, "Dropping malformed message");
            }
        }
    }

    /// Commands are logged only
    pub async fn on_command(&self, connection: &dyn ClientConnection, command: Value) {
        let kind = command
            .get("type")
            .and_then(Value::as_str)
            .unwrap_or("unknown");

        info!(connection_id = %connection.id(), command = %kind, "Received command");
    }

    pub async fn room_count(&self) -> usize {
        self.rooms.read().await.len()
    }

    pub async fn peer_count(&self) -> usize {
        self.peers.read().await.len()
    }

    pub async fn room_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.rooms.read().await.keys().cloned().collect();
        names.sort();
        names
    }

    /// Close and remove every peer
    pub async fn shutdown(&self) {
        let peers: Vec<Arc<Peer>> = self.peers.write().await.drain().map(|(_, p)| p).collect();

        info!(peers = peers.len(), "Shutting down registry");

        for peer in peers {
            peer.close().await;
        }
    }
}
