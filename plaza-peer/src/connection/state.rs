use std::fmt;
use webrtc::data_channel::data_channel_state::RTCDataChannelState;
use webrtc::ice_transport::ice_connection_state::RTCIceConnectionState;

/// Where a connection is in its offer/answer lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NegotiationState {
    New,
    Negotiating,
    Connected,
    Disconnected,
    Failed,
    Closed,
}

impl fmt::Display for NegotiationState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::New => "new",
            Self::Negotiating => "negotiating",
            Self::Connected => "connected",
            Self::Disconnected => "disconnected",
            Self::Failed => "failed",
            Self::Closed => "closed",
        };
        f.write_str(s)
    }
}

/// Ready state of a data channel; `Absent` until the channel exists.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChannelState {
    Absent,
    Connecting,
    Open,
    Closing,
    Closed,
}

impl From<RTCDataChannelState> for ChannelState {
    fn from(state: RTCDataChannelState) -> Self {
        match state {
            RTCDataChannelState::Connecting => Self::Connecting,
            RTCDataChannelState::Open => Self::Open,
            RTCDataChannelState::Closing => Self::Closing,
            RTCDataChannelState::Closed => Self::Closed,
            _ => Self::Absent,
        }
    }
}

impl fmt::Display for ChannelState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Absent => "",
            Self::Connecting => "connecting",
            Self::Open => "open",
            Self::Closing => "closing",
            Self::Closed => "closed",
        };
        f.write_str(s)
    }
}

/// Lower-level connectivity as reported by the ICE agent.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Connectivity {
    Checking,
    Connected,
    Disconnected,
    Failed,
    Closed,
    Other,
}

impl From<RTCIceConnectionState> for Connectivity {
    fn from(state: RTCIceConnectionState) -> Self {
        match state {
            RTCIceConnectionState::Checking => Self::Checking,
            RTCIceConnectionState::Connected | RTCIceConnectionState::Completed => Self::Connected,
            RTCIceConnectionState::Disconnected => Self::Disconnected,
            RTCIceConnectionState::Failed => Self::Failed,
            RTCIceConnectionState::Closed => Self::Closed,
            _ => Self::Other,
        }
    }
}

/// True when the connection must be (re)offered. A connection mid-handshake
/// or healthy never needs one.
pub fn needs_offer(negotiation: NegotiationState, control: ChannelState) -> bool {
    matches!(
        negotiation,
        NegotiationState::New
            | NegotiationState::Disconnected
            | NegotiationState::Failed
            | NegotiationState::Closed
    ) || matches!(control, ChannelState::Closing | ChannelState::Closed)
}

/// Negotiation still claims `Connected` while ICE already lost the path.
///
/// Both inputs come from different state sources updated independently, so
/// this is a best-effort liveness probe.
pub fn should_destroy(negotiation: NegotiationState, connectivity: Connectivity) -> bool {
    negotiation == NegotiationState::Connected && connectivity == Connectivity::Disconnected
}
