use plaza_core::PeerId;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("webrtc error: {0}")]
    WebRtc(#[from] webrtc::Error),

    #[error("signaling relay error: {0}")]
    Signaling(String),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("failed to read outbound file at offset {offset}: {source}")]
    FileRead {
        offset: u64,
        #[source]
        source: std::io::Error,
    },

    #[error("{channel} channel to {peer_id} is not open")]
    ChannelNotOpen {
        peer_id: PeerId,
        channel: &'static str,
    },

    #[error("no outbound file was provided")]
    NoOutboundFile,

    #[error("job '{0}' is already registered")]
    DuplicateJob(&'static str),

    #[error("orchestrator is no longer running")]
    OrchestratorStopped,

    #[error("invalid configuration: {0}")]
    Config(String),
}
