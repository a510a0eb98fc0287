mod control;
mod file_transfer;
mod geometry;
mod peer;
mod signaling;

pub use control::{ControlMessage, Rotation};
pub use file_transfer::{FileChannelFrame, FileTransferControl};
pub use geometry::{ListenerPose, Quat, SourceTransform, Vec3};
pub use peer::PeerId;
pub use signaling::{
    IceCandidateInit, IceServerConfig, SdpType, SessionDescription, SignalPayload,
    SignalingMessage,
};
