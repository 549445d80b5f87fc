//! Mock media-routing collaborators
//!
//! Every trait call is counted in [`MediaCalls`]. Room creation, capability
//! application and offer creation can be delayed or made to fail.

use async_trait::async_trait;
use roomrtc_signaling::media::NegotiationNeededHandler;
use roomrtc_signaling::{
    ConnectionOptions, Error, MediaConnection, MediaPeer, MediaRoom, MediaServer, OfferOptions,
    Result, RoomOptions, SessionDescription,
};
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// Call counters shared by all mock objects of one server
#[derive(Default)]
pub struct MediaCalls {
    pub create_room: AtomicUsize,
    pub connect: AtomicUsize,
    pub set_capabilities: AtomicUsize,
    pub create_offer: AtomicUsize,
    pub set_local_description: AtomicUsize,
    pub set_remote_description: AtomicUsize,
    pub on_negotiation_needed: AtomicUsize,
    pub connection_close: AtomicUsize,
    pub peer_close: AtomicUsize,
}

impl MediaCalls {
    pub fn get(counter: &AtomicUsize) -> usize {
        counter.load(Ordering::SeqCst)
    }
}

#[derive(Default)]
struct MockBehavior {
    room_delay: Duration,
    capability_delay: Duration,
    fail_rooms: AtomicBool,
    fail_capabilities: AtomicBool,
    fail_offers: AtomicBool,
}

struct MockState {
    calls: MediaCalls,
    behavior: MockBehavior,
    /// Negotiation-needed handlers by peer id
    handlers: Mutex<HashMap<String, Arc<NegotiationNeededHandler>>>,
}

/// Mock media server
pub struct MockMediaServer {
    state: Arc<MockState>,
}

impl MockMediaServer {
    pub fn new() -> Self {
        Self::build(MockBehavior::default())
    }

    /// Room creation takes `delay`
    pub fn with_room_delay(delay: Duration) -> Self {
        Self::build(MockBehavior {
            room_delay: delay,
            ..Default::default()
        })
    }

    /// Capability application takes `delay`
    pub fn with_capability_delay(delay: Duration) -> Self {
        Self::build(MockBehavior {
            capability_delay: delay,
            ..Default::default()
        })
    }

    fn build(behavior: MockBehavior) -> Self {
        Self {
            state: Arc::new(MockState {
                calls: MediaCalls::default(),
                behavior,
                handlers: Mutex::new(HashMap::new()),
            }),
        }
    }

    pub fn calls(&self) -> &MediaCalls {
        &self.state.calls
    }

    pub fn fail_rooms(&self, fail: bool) {
        self.state.behavior.fail_rooms.store(fail, Ordering::SeqCst);
    }

    pub fn fail_capabilities(&self, fail: bool) {
        self.state
            .behavior
            .fail_capabilities
            .store(fail, Ordering::SeqCst);
    }

    pub fn fail_offers(&self, fail: bool) {
        self.state.behavior.fail_offers.store(fail, Ordering::SeqCst);
    }

    /// Fire the negotiation-needed handler installed for `peer_id`
    ///
    /// Returns false when no handler is installed.
    pub fn trigger_negotiation_needed(&self, peer_id: &str) -> bool {
        let handler = self.state.handlers.lock().unwrap().get(peer_id).cloned();
        match handler {
            Some(handler) => {
                handler();
                true
            }
            None => false,
        }
    }
}

#[async_trait]
impl MediaServer for MockMediaServer {
    async fn create_room(&self, name: &str, _options: &RoomOptions) -> Result<Arc<dyn MediaRoom>> {
        self.state.calls.create_room.fetch_add(1, Ordering::SeqCst);

        if !self.state.behavior.room_delay.is_zero() {
            tokio::time::sleep(self.state.behavior.room_delay).await;
        }

        if self.state.behavior.fail_rooms.load(Ordering::SeqCst) {
            return Err(Error::RoomCreationFailed(format!(
                "router unavailable for {}",
                name
            )));
        }

        Ok(Arc::new(MockMediaRoom {
            name: name.to_string(),
            state: Arc::clone(&self.state),
        }))
    }
}

struct MockMediaRoom {
    name: String,
    state: Arc<MockState>,
}

#[async_trait]
impl MediaRoom for MockMediaRoom {
    fn name(&self) -> &str {
        &self.name
    }

    fn peer(&self, peer_id: &str) -> Result<Arc<dyn MediaPeer>> {
        Ok(Arc::new(MockMediaPeer {
            id: peer_id.to_string(),
            state: Arc::clone(&self.state),
        }))
    }

    async fn connect(
        &self,
        peer: Arc<dyn MediaPeer>,
        _options: &ConnectionOptions,
    ) -> Result<Arc<dyn MediaConnection>> {
        self.state.calls.connect.fetch_add(1, Ordering::SeqCst);

        Ok(Arc::new(MockConnection {
            peer,
            state: Arc::clone(&self.state),
            local: Mutex::new(None),
        }))
    }
}

struct MockMediaPeer {
    id: String,
    state: Arc<MockState>,
}

#[async_trait]
impl MediaPeer for MockMediaPeer {
    fn id(&self) -> &str {
        &self.id
    }

    async fn set_capabilities(&self, sdp: &str) -> Result<()> {
        self.state
            .calls
            .set_capabilities
            .fetch_add(1, Ordering::SeqCst);

        if !self.state.behavior.capability_delay.is_zero() {
            tokio::time::sleep(self.state.behavior.capability_delay).await;
        }

        if self.state.behavior.fail_capabilities.load(Ordering::SeqCst) || sdp.is_empty() {
            return Err(Error::CapabilitiesError("rejected by mock".to_string()));
        }

        Ok(())
    }

    async fn close(&self) {
        self.state.calls.peer_close.fetch_add(1, Ordering::SeqCst);
    }
}

struct MockConnection {
    peer: Arc<dyn MediaPeer>,
    state: Arc<MockState>,
    local: Mutex<Option<SessionDescription>>,
}

#[async_trait]
impl MediaConnection for MockConnection {
    async fn set_capabilities(&self, sdp: &str) -> Result<()> {
        self.peer.set_capabilities(sdp).await
    }

    async fn create_offer(&self, options: OfferOptions) -> Result<SessionDescription> {
        let n = self.state.calls.create_offer.fetch_add(1, Ordering::SeqCst) + 1;

        if self.state.behavior.fail_offers.load(Ordering::SeqCst) {
            return Err(Error::SdpError("offer creation failed".to_string()));
        }

        let mut sdp = format!("v=0\r\no=mock {} {} IN IP4 127.0.0.1\r\ns=-\r\n", self.peer.id(), n);
        if options.offer_to_receive_audio {
            sdp.push_str("m=audio 9 UDP/TLS/RTP/SAVPF 111\r\na=recvonly\r\n");
        }
        if options.offer_to_receive_video {
            sdp.push_str("m=video 9 UDP/TLS/RTP/SAVPF 96\r\na=recvonly\r\n");
        }

        Ok(SessionDescription::offer(sdp))
    }

    async fn set_local_description(&self, description: SessionDescription) -> Result<()> {
        self.state
            .calls
            .set_local_description
            .fetch_add(1, Ordering::SeqCst);
        *self.local.lock().unwrap() = Some(description);
        Ok(())
    }

    async fn set_remote_description(&self, description: SessionDescription) -> Result<()> {
        self.state
            .calls
            .set_remote_description
            .fetch_add(1, Ordering::SeqCst);

        if description.sdp.is_empty() {
            return Err(Error::SdpError("empty remote description".to_string()));
        }
        Ok(())
    }

    async fn local_description(&self) -> Option<SessionDescription> {
        self.local.lock().unwrap().clone()
    }

    fn on_negotiation_needed(&self, handler: NegotiationNeededHandler) {
        self.state
            .calls
            .on_negotiation_needed
            .fetch_add(1, Ordering::SeqCst);
        self.state
            .handlers
            .lock()
            .unwrap()
            .insert(self.peer.id().to_string(), Arc::new(handler));
    }

    async fn close(&self) -> Result<()> {
        self.state
            .calls
            .connection_close
            .fetch_add(1, Ordering::SeqCst);

        // Dropping the handler ends the peer's renegotiation task
        self.state.handlers.lock().unwrap().remove(self.peer.id());
        Ok(())
    }
}
