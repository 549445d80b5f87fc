//! Media backend built on the `webrtc` crate
//!
//! Each room owns a webrtc `API` whose `MediaEngine` is configured from the
//! room options. Every participant gets a server-side `RTCPeerConnection`.

use super::{
    sdp_error, MediaConnection, MediaPeer, MediaRoom, MediaServer, NegotiationNeededHandler,
    OfferOptions, SdpType, SessionDescription,
};
use crate::config::{ConnectionOptions, MediaKind, RoomOptions, SignalingConfig};
use crate::{Error, Result};
use async_trait::async_trait;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{debug, info, warn};
use webrtc::api::interceptor_registry::register_default_interceptors;
use webrtc::api::media_engine::MediaEngine;
use webrtc::api::{APIBuilder, API};
use webrtc::ice_transport::ice_server::RTCIceServer;
use webrtc::peer_connection::configuration::RTCConfiguration;
use webrtc::peer_connection::sdp::sdp_type::RTCSdpType;
use webrtc::peer_connection::sdp::session_description::RTCSessionDescription;
use webrtc::peer_connection::RTCPeerConnection;
use webrtc::rtp_transceiver::rtp_codec::{
    RTCRtpCodecCapability, RTCRtpCodecParameters, RTPCodecType,
};
use webrtc::rtp_transceiver::rtp_transceiver_direction::RTCRtpTransceiverDirection;
use webrtc::rtp_transceiver::RTCRtpTransceiverInit;

/// Media server creating one webrtc API per room
pub struct RtcMediaServer {
    ice_servers: Vec<RTCIceServer>,
}

impl RtcMediaServer {
    /// Create a media server using the STUN/TURN servers from `config`
    pub fn new(config: &SignalingConfig) -> Self {
        let ice_servers = config
            .stun_servers
            .iter()
            .map(|url| RTCIceServer {
                urls: vec![url.clone()],
                ..Default::default()
            })
            .chain(config.turn_servers.iter().map(|turn| RTCIceServer {
                urls: vec![turn.url.clone()],
                username: turn.username.clone(),
                credential: turn.credential.clone(),
                ..Default::default()
            }))
            .collect();

        Self { ice_servers }
    }

    fn build_media_engine(options: &RoomOptions) -> Result<MediaEngine> {
        let mut media_engine = MediaEngine::default();

        if options.media_codecs.is_empty() {
            media_engine
                .register_default_codecs()
                .map_err(|e| Error::WebRtcError(format!("Failed to register codecs: {}", e)))?;
            return Ok(media_engine);
        }

        for codec in &options.media_codecs {
            let kind = match codec.kind {
                MediaKind::Audio => RTPCodecType::Audio,
                MediaKind::Video => RTPCodecType::Video,
            };

            media_engine
                .register_codec(
                    RTCRtpCodecParameters {
                        capability: RTCRtpCodecCapability {
                            mime_type: codec.mime_type.clone(),
                            clock_rate: codec.clock_rate,
                            channels: codec.channels,
                            sdp_fmtp_line: codec.sdp_fmtp_line.clone(),
                            rtcp_feedback: vec![],
                        },
                        payload_type: codec.payload_type,
                        ..Default::default()
                    },
                    kind,
                )
                .map_err(|e| {
                    Error::WebRtcError(format!(
                        "Failed to register codec {}: {}",
                        codec.mime_type, e
                    ))
                })?;
        }

        Ok(media_engine)
    }
}

#[async_trait]
impl MediaServer for RtcMediaServer {
    async fn create_room(&self, name: &str, options: &RoomOptions) -> Result<Arc<dyn MediaRoom>> {
        options
            .validate()
            .map_err(|e| Error::RoomCreationFailed(format!("{}: {}", name, e)))?;

        let mut media_engine = Self::build_media_engine(options)?;

        let interceptor_registry =
            register_default_interceptors(Default::default(), &mut media_engine).map_err(|e| {
                Error::WebRtcError(format!("Failed to register interceptors: {}", e))
            })?;

        let api = APIBuilder::new()
            .with_media_engine(media_engine)
            .with_interceptor_registry(interceptor_registry)
            .build();

        info!(room = %name, codecs = options.media_codecs.len(), "A new media room is created");

        Ok(Arc::new(RtcMediaRoom {
            name: name.to_string(),
            api: Arc::new(api),
            ice_servers: self.ice_servers.clone(),
        }))
    }
}

/// A room backed by its own webrtc API instance
pub struct RtcMediaRoom {
    name: String,
    api: Arc<API>,
    ice_servers: Vec<RTCIceServer>,
}

#[async_trait]
impl MediaRoom for RtcMediaRoom {
    fn name(&self) -> &str {
        &self.name
    }

    fn peer(&self, peer_id: &str) -> Result<Arc<dyn MediaPeer>> {
        Ok(Arc::new(RtcMediaPeer::new(peer_id)))
    }

    async fn connect(
        &self,
        peer: Arc<dyn MediaPeer>,
        options: &ConnectionOptions,
    ) -> Result<Arc<dyn MediaConnection>> {
        if options.use_plan_b {
            // webrtc-rs only speaks unified plan
            warn!(
                peer_id = %peer.id(),
                "Plan-B requested but unsupported by the media backend, using unified plan"
            );
        }

        let rtc_config = RTCConfiguration {
            ice_servers: self.ice_servers.clone(),
            ..Default::default()
        };

        let pc = self
            .api
            .new_peer_connection(rtc_config)
            .await
            .map_err(|e| Error::WebRtcError(format!("Failed to create peer connection: {}", e)))?;

        debug!(peer_id = %peer.id(), room = %self.name, "Created media connection");

        Ok(Arc::new(RtcConnection {
            peer,
            pc: Arc::new(pc),
        }))
    }
}

/// Media kinds advertised by a capability SDP
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PeerCapabilities {
    pub media: Vec<String>,
    pub sdp: String,
}

/// Media-side participant handle
pub struct RtcMediaPeer {
    id: String,
    capabilities: RwLock<Option<PeerCapabilities>>,
    closed: AtomicBool,
}

impl RtcMediaPeer {
    pub fn new(id: &str) -> Self {
        Self {
            id: id.to_string(),
            capabilities: RwLock::new(None),
            closed: AtomicBool::new(false),
        }
    }

    /// Capabilities applied so far, if any
    pub async fn capabilities(&self) -> Option<PeerCapabilities> {
        self.capabilities.read().await.clone()
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl MediaPeer for RtcMediaPeer {
    fn id(&self) -> &str {
        &self.id
    }

    async fn set_capabilities(&self, sdp: &str) -> Result<()> {
        if self.is_closed() {
            return Err(Error::PeerClosed(self.id.clone()));
        }

        let description = RTCSessionDescription::offer(sdp.to_string())
            .map_err(|e| Error::CapabilitiesError(format!("Failed to parse SDP: {}", e)))?;
        let parsed = description
            .unmarshal()
            .map_err(|e| Error::CapabilitiesError(format!("Failed to parse SDP: {}", e)))?;

        let media: Vec<String> = parsed
            .media_descriptions
            .iter()
            .map(|m| m.media_name.media.clone())
            .collect();

        if media.is_empty() {
            return Err(Error::CapabilitiesError(
                "capability SDP has no media sections".to_string(),
            ));
        }

        debug!(peer_id = %self.id, media = ?media, "Applied capabilities");

        *self.capabilities.write().await = Some(PeerCapabilities {
            media,
            sdp: sdp.to_string(),
        });

        Ok(())
    }

    async fn close(&self) {
        if !self.closed.swap(true, Ordering::SeqCst) {
            debug!(peer_id = %self.id, "Media peer closed");
        }
    }
}

/// Server-side peer connection for one participant
pub struct RtcConnection {
    peer: Arc<dyn MediaPeer>,
    pc: Arc<RTCPeerConnection>,
}

impl RtcConnection {
    /// Add a receive-only transceiver for `kind` unless one already exists
    async fn ensure_receiver(&self, kind: RTPCodecType) -> Result<()> {
        let exists = self
            .pc
            .get_transceivers()
            .await
            .iter()
            .any(|t| t.kind() == kind);

        if !exists {
            self.pc
                .add_transceiver_from_kind(
                    kind,
                    Some(RTCRtpTransceiverInit {
                        direction: RTCRtpTransceiverDirection::Recvonly,
                        send_encodings: vec![],
                    }),
                )
                .await
                .map_err(|e| sdp_error("Failed to add transceiver", e))?;
        }

        Ok(())
    }

    fn to_rtc(description: SessionDescription) -> Result<RTCSessionDescription> {
        let SessionDescription { sdp_type, sdp } = description;
        let parsed = match sdp_type {
            SdpType::Offer => RTCSessionDescription::offer(sdp),
            SdpType::Answer => RTCSessionDescription::answer(sdp),
            SdpType::Pranswer => RTCSessionDescription::pranswer(sdp),
            SdpType::Rollback => {
                return Err(Error::SdpError(
                    "rollback descriptions are not supported".to_string(),
                ))
            }
        };

        parsed.map_err(|e| sdp_error("Failed to parse SDP", e))
    }

    fn from_rtc(description: RTCSessionDescription) -> Option<SessionDescription> {
        let sdp_type = match description.sdp_type {
            RTCSdpType::Offer => SdpType::Offer,
            RTCSdpType::Answer => SdpType::Answer,
            RTCSdpType::Pranswer => SdpType::Pranswer,
            RTCSdpType::Rollback => SdpType::Rollback,
            _ => return None,
        };

        Some(SessionDescription {
            sdp_type,
            sdp: description.sdp,
        })
    }
}

#[async_trait]
impl MediaConnection for RtcConnection {
    async fn set_capabilities(&self, sdp: &str) -> Result<()> {
        self.peer.set_capabilities(sdp).await
    }

    async fn create_offer(&self, options: OfferOptions) -> Result<SessionDescription> {
        if options.offer_to_receive_audio {
            self.ensure_receiver(RTPCodecType::Audio).await?;
        }
        if options.offer_to_receive_video {
            self.ensure_receiver(RTPCodecType::Video).await?;
        }

        let offer = self
            .pc
            .create_offer(None)
            .await
            .map_err(|e| sdp_error("Failed to create offer", e))?;

        Ok(SessionDescription::offer(offer.sdp))
    }

    async fn set_local_description(&self, description: SessionDescription) -> Result<()> {
        let description = Self::to_rtc(description)?;
        self.pc
            .set_local_description(description)
            .await
            .map_err(|e| sdp_error("Failed to set local description", e))
    }

    async fn set_remote_description(&self, description: SessionDescription) -> Result<()> {
        let description = Self::to_rtc(description)?;
        self.pc
            .set_remote_description(description)
            .await
            .map_err(|e| sdp_error("Failed to set remote description", e))
    }

    async fn local_description(&self) -> Option<SessionDescription> {
        self.pc.local_description().await.and_then(Self::from_rtc)
    }

    fn on_negotiation_needed(&self, handler: NegotiationNeededHandler) {
        let handler = Arc::new(handler);
        self.pc.on_negotiation_needed(Box::new(move || {
            let handler = Arc::clone(&handler);
            Box::pin(async move { handler() })
        }));
    }

    async fn close(&self) -> Result<()> {
        self.pc
            .close()
            .await
            .map_err(|e| Error::WebRtcError(format!("Failed to close peer connection: {}", e)))
    }
}
