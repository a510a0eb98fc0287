use crate::audio::PannerState;
use plaza_core::{ControlMessage, ListenerPose, PeerId, SourceTransform};
use tokio::sync::oneshot;

/// Requests from the host application to the orchestrator loop.
#[derive(Debug)]
pub enum OrchestratorCommand {
    Send {
        peer_id: PeerId,
        message: ControlMessage,
    },

    SendAll {
        message: ControlMessage,
    },

    /// Offer the outbound file to one peer.
    StartFileTransfer {
        peer_id: PeerId,
        options: serde_json::Value,
    },

    /// Playback gain for every remote stream, 0..=100.
    ChangeRemoteGain(u8),

    ChangeLocalGain(u8),

    SetPannerState {
        peer_id: PeerId,
        source: SourceTransform,
        listener: ListenerPose,
    },

    SetPannerStateAll {
        sources: Vec<(PeerId, SourceTransform)>,
        listener: ListenerPose,
    },

    /// Current spatial parameters of a peer's remote stream, if any.
    PannerState {
        peer_id: PeerId,
        reply: oneshot::Sender<Option<PannerState>>,
    },

    Status {
        peer_id: PeerId,
        reply: oneshot::Sender<String>,
    },

    IsPeerAvailable {
        peer_id: PeerId,
        reply: oneshot::Sender<bool>,
    },

    Shutdown {
        reply: oneshot::Sender<()>,
    },
}
