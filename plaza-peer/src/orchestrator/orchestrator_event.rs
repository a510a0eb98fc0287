use bytes::Bytes;
use plaza_core::{ControlMessage, PeerId};

/// Notifications delivered to the host application.
#[derive(Debug, Clone, PartialEq)]
pub enum OrchestratorEvent {
    ControlChannelOpened {
        peer_id: PeerId,
    },

    FileChannelOpened {
        peer_id: PeerId,
    },

    ControlMessageReceived {
        peer_id: PeerId,
        message: ControlMessage,
    },

    /// A peer announced a file and we accepted it.
    FileTransferAccepted {
        peer_id: PeerId,
        file_size: u64,
        options: serde_json::Value,
    },

    FileTransferProgress {
        peer_id: PeerId,
        progress: f64,
    },

    FileReceived {
        peer_id: PeerId,
        data: Bytes,
        options: serde_json::Value,
    },

    /// The outbound file to this peer could not be read.
    FileTransferFailed {
        peer_id: PeerId,
        reason: String,
    },

    VoiceLevelChanged {
        peer_id: PeerId,
        level: f32,
    },

    /// Connection dropped after losing connectivity; it is re-offered on
    /// the next check.
    PeerDisconnected {
        peer_id: PeerId,
    },
}

impl OrchestratorEvent {
    pub fn peer_id(&self) -> PeerId {
        match self {
            Self::ControlChannelOpened { peer_id }
            | Self::FileChannelOpened { peer_id }
            | Self::ControlMessageReceived { peer_id, .. }
            | Self::FileTransferAccepted { peer_id, .. }
            | Self::FileTransferProgress { peer_id, .. }
            | Self::FileReceived { peer_id, .. }
            | Self::FileTransferFailed { peer_id, .. }
            | Self::VoiceLevelChanged { peer_id, .. }
            | Self::PeerDisconnected { peer_id } => *peer_id,
        }
    }
}
