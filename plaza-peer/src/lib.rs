//! Peer-to-peer connection management for a shared 3D space: one WebRTC
//! connection per remote participant, carrying a control channel, a file
//! transfer channel and spatialized voice.

pub mod audio;
pub mod config;
pub mod connection;
pub mod error;
pub mod file_transfer;
pub mod orchestrator;
pub mod signaling;

pub use config::{OrchestratorConfig, VoiceActivityConfig};
pub use error::{Error, Result};
pub use file_transfer::OutboundFile;
pub use orchestrator::{Orchestrator, OrchestratorEvent, OrchestratorHandle};
pub use signaling::{PeerRoster, SignalingRelay, StaticRoster};
