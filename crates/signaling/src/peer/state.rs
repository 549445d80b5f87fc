//! Negotiation state of a signaling peer

use std::fmt;

/// Where a peer stands in the capability/offer/answer handshake
///
/// `New -> AwaitingCapabilities -> Negotiating -> Stable`, with `Closed`
/// reachable from any state. A renegotiation moves `Stable` back to
/// `Negotiating`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NegotiationState {
    /// Created, no offer received yet
    New,
    /// Client offer received, capabilities not applied yet
    AwaitingCapabilities,
    /// Server offer sent, waiting for the client's answer
    Negotiating,
    /// Answer applied
    Stable,
    /// Media connection released
    Closed,
}

impl NegotiationState {
    pub fn is_closed(&self) -> bool {
        matches!(self, NegotiationState::Closed)
    }

    /// Whether moving to `next` is a legal step
    pub fn can_transition_to(&self, next: NegotiationState) -> bool {
        use NegotiationState::*;

        match (self, next) {
            (Closed, _) => false,
            (_, Closed) => true,
            (New, AwaitingCapabilities) => true,
            (AwaitingCapabilities, AwaitingCapabilities | Negotiating) => true,
            (Negotiating, Negotiating | Stable) => true,
            (Stable, Negotiating | Stable) => true,
            _ => false,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            NegotiationState::New => "new",
            NegotiationState::AwaitingCapabilities => "awaiting-capabilities",
            NegotiationState::Negotiating => "negotiating",
            NegotiationState::Stable => "stable",
            NegotiationState::Closed => "closed",
        }
    }
}

impl fmt::Display for NegotiationState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
