//! Capability, offer and answer handling for a [`Peer`]

use super::{NegotiationState, Peer};
use crate::media::{OfferOptions, SessionDescription};
use crate::signaling::{SdpEnvelope, SdpPayload, ServerEvent};
use crate::{Error, Result};
use std::sync::atomic::Ordering;
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{debug, error, info, warn};

impl Peer {
    /// Inbound offer: apply capabilities once, then send a server offer
    pub(crate) async fn handle_offer(self: &Arc<Self>, payload: SdpPayload) {
        if self.is_closed() {
            warn!(peer_id = %self.id, "Offer received for a closed peer");
            return;
        }

        self.subscribe_negotiation_needed().await;

        match self.apply_capabilities(&payload.sdp).await {
            Ok(true) => self.send_sdp_offer().await,
            Ok(false) => {
                debug!(peer_id = %self.id, "Capabilities already set, no offer owed");
            }
            Err(e) => {
                error!(peer_id = %self.id, error = %e, "Failed to set capabilities");
            }
        }
    }

    /// Returns `true` when this call applied the capabilities
    async fn apply_capabilities(&self, sdp: &str) -> Result<bool> {
        let mut has_capabilities = self.has_capabilities.lock().await;
        if *has_capabilities {
            return Ok(false);
        }

        self.set_state(NegotiationState::AwaitingCapabilities).await;

        let connection = self
            .connection()
            .await
            .ok_or_else(|| Error::PeerClosed(self.id.clone()))?;
        connection.set_capabilities(sdp).await?;

        *has_capabilities = true;
        info!(peer_id = %self.id, "Capabilities set");

        Ok(true)
    }

    /// Install the negotiation-needed subscription, once per peer
    ///
    /// Every trigger is queued to a single task that re-runs
    /// [`Peer::send_sdp_offer`]. The task ends when the peer closes or the
    /// connection drops its handler.
    async fn subscribe_negotiation_needed(self: &Arc<Self>) {
        if self.negotiation_subscribed.swap(true, Ordering::SeqCst) {
            return;
        }

        let Some(connection) = self.connection().await else {
            return;
        };

        let (trigger_tx, mut trigger_rx) = mpsc::unbounded_channel::<()>();
        connection.on_negotiation_needed(Box::new(move || {
            let _ = trigger_tx.send(());
        }));

        let weak = Arc::downgrade(self);
        let peer_id = self.id.clone();
        tokio::spawn(async move {
            while trigger_rx.recv().await.is_some() {
                let Some(peer) = weak.upgrade() else {
                    break;
                };
                if peer.is_closed() {
                    break;
                }

                debug!(peer_id = %peer.id, "Negotiation needed");
                peer.send_sdp_offer().await;
            }

            debug!(peer_id = %peer_id, "Renegotiation task finished");
        });
    }

    /// Create an offer receiving audio and video, apply it locally, send it
    ///
    /// Failures are logged.
    pub async fn send_sdp_offer(&self) {
        let _guard = self.offer_lock.lock().await;

        if let Err(e) = self.try_send_sdp_offer().await {
            error!(peer_id = %self.id, error = %e, "Failed to send SDP offer");
        }
    }

    async fn try_send_sdp_offer(&self) -> Result<()> {
        let connection = self
            .connection()
            .await
            .ok_or_else(|| Error::PeerClosed(self.id.clone()))?;

        let offer = connection.create_offer(OfferOptions::receive_all()).await?;
        connection.set_local_description(offer.clone()).await?;

        let local = connection.local_description().await.unwrap_or(offer);

        self.set_state(NegotiationState::Negotiating).await;
        self.send_sdp_to_peer(local).await
    }

    /// Wrap `description` in an envelope and send it to the client
    ///
    /// The `sid` is the connection's session token, or the current time in
    /// milliseconds when the client supplied none.
    pub async fn send_sdp_to_peer(&self, description: SessionDescription) -> Result<()> {
        let sid = self
            .transport
            .sid()
            .unwrap_or_else(|| chrono::Utc::now().timestamp_millis().to_string());

        debug!(
            peer_id = %self.id,
            sid = %sid,
            sdp_type = %description.sdp_type,
            "Sending session description"
        );

        let envelope = SdpEnvelope::new(&self.id, sid, description);
        self.transport.send(ServerEvent::Message(envelope)).await
    }

    /// Inbound answer: apply it as the remote description
    pub(crate) async fn handle_answer(&self, payload: SdpPayload) {
        let Some(connection) = self.connection().await else {
            warn!(peer_id = %self.id, "Peer connection not found");
            return;
        };

        match connection
            .set_remote_description(SessionDescription::answer(payload.sdp))
            .await
        {
            Ok(()) => {
                self.set_state(NegotiationState::Stable).await;
                info!(peer_id = %self.id, "Remote description applied");
            }
            Err(e) => {
                error!(peer_id = %self.id, error = %e, "Failed to set remote description");
            }
        }
    }
}
