use crate::error::Result;
use plaza_core::{ControlMessage, FileChannelFrame, IceCandidateInit, PeerId};
use std::fmt;
use std::sync::Arc;
use webrtc::ice_transport::ice_connection_state::RTCIceConnectionState;
use webrtc::peer_connection::peer_connection_state::RTCPeerConnectionState;
use webrtc::track::track_remote::TrackRemote;

/// Generation of a connection to one peer. Events from a replaced
/// connection carry an old id and are dropped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ConnectionId(pub u64);

impl fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// What a connection reports back to the orchestrator loop.
pub struct ConnectionEvent {
    pub peer_id: PeerId,
    pub connection_id: ConnectionId,
    pub kind: ConnectionEventKind,
}

pub enum ConnectionEventKind {
    PeerStateChanged(RTCPeerConnectionState),
    IceStateChanged(RTCIceConnectionState),

    /// Local ICE candidate to forward through the relay.
    CandidateGenerated(IceCandidateInit),

    ControlChannelOpened,
    FileChannelOpened,

    ControlMessage(ControlMessage),
    FileFrame(FileChannelFrame),

    AudioTrack(Arc<TrackRemote>),

    /// Outbound file stream ended; bytes sent or the failure.
    TransferFinished(Result<u64>),
}

impl ConnectionEventKind {
    pub fn name(&self) -> &'static str {
        match self {
            Self::PeerStateChanged(_) => "peer-state",
            Self::IceStateChanged(_) => "ice-state",
            Self::CandidateGenerated(_) => "candidate",
            Self::ControlChannelOpened => "control-open",
            Self::FileChannelOpened => "file-open",
            Self::ControlMessage(_) => "control-message",
            Self::FileFrame(_) => "file-frame",
            Self::AudioTrack(_) => "audio-track",
            Self::TransferFinished(_) => "transfer-finished",
        }
    }
}
