//! Client connection that records outbound events

use async_trait::async_trait;
use roomrtc_signaling::signaling::SdpEnvelope;
use roomrtc_signaling::{ClientConnection, Error, Result, ServerEvent};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

pub struct RecordingConnection {
    id: String,
    sid: Option<String>,
    events: Mutex<Vec<ServerEvent>>,
    fail_sends: AtomicBool,
}

impl RecordingConnection {
    pub fn new(id: &str) -> Arc<Self> {
        Arc::new(Self {
            id: id.to_string(),
            sid: None,
            events: Mutex::new(Vec::new()),
            fail_sends: AtomicBool::new(false),
        })
    }

    pub fn with_sid(id: &str, sid: &str) -> Arc<Self> {
        Arc::new(Self {
            id: id.to_string(),
            sid: Some(sid.to_string()),
            events: Mutex::new(Vec::new()),
            fail_sends: AtomicBool::new(false),
        })
    }

    /// Coerce to the trait object the registry expects
    pub fn as_client(self: &Arc<Self>) -> Arc<dyn ClientConnection> {
        Arc::clone(self) as Arc<dyn ClientConnection>
    }

    pub fn fail_sends(&self, fail: bool) {
        self.fail_sends.store(fail, Ordering::SeqCst);
    }

    pub fn events(&self) -> Vec<ServerEvent> {
        self.events.lock().unwrap().clone()
    }

    pub fn ready_count(&self) -> usize {
        self.events()
            .iter()
            .filter(|e| matches!(e, ServerEvent::Ready(_)))
            .count()
    }

    /// Session descriptions sent to this client
    pub fn envelopes(&self) -> Vec<SdpEnvelope> {
        self.events()
            .into_iter()
            .filter_map(|e| match e {
                ServerEvent::Message(envelope) => Some(envelope),
                _ => None,
            })
            .collect()
    }
}

#[async_trait]
impl ClientConnection for RecordingConnection {
    fn id(&self) -> &str {
        &self.id
    }

    fn sid(&self) -> Option<String> {
        self.sid.clone()
    }

    async fn send(&self, event: ServerEvent) -> Result<()> {
        if self.fail_sends.load(Ordering::SeqCst) {
            return Err(Error::TransportError("recording connection closed".to_string()));
        }

        self.events.lock().unwrap().push(event);
        Ok(())
    }
}
