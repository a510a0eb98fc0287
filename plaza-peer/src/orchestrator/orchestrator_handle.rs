use super::orchestrator_command::OrchestratorCommand;
use crate::audio::{LocalAudio, PannerState};
use crate::error::{Error, Result};
use plaza_core::{ControlMessage, ListenerPose, PeerId, SourceTransform};
use std::sync::Arc;
use tokio::sync::{mpsc, oneshot};
use tracing::{debug, warn};

/// Cloneable front door to a running orchestrator.
#[derive(Clone)]
pub struct OrchestratorHandle {
    local_id: PeerId,
    command_tx: mpsc::Sender<OrchestratorCommand>,
    local_audio: Arc<LocalAudio>,
}

impl OrchestratorHandle {
    pub(crate) fn new(
        local_id: PeerId,
        command_tx: mpsc::Sender<OrchestratorCommand>,
        local_audio: Arc<LocalAudio>,
    ) -> Self {
        Self {
            local_id,
            command_tx,
            local_audio,
        }
    }

    pub fn local_peer_id(&self) -> PeerId {
        self.local_id
    }

    /// Encoded microphone frames go here.
    pub fn local_audio(&self) -> Arc<LocalAudio> {
        self.local_audio.clone()
    }

    pub fn is_running(&self) -> bool {
        !self.command_tx.is_closed()
    }

    async fn submit(&self, cmd: OrchestratorCommand) -> Result<()> {
        self.command_tx
            .send(cmd)
            .await
            .map_err(|_| Error::OrchestratorStopped)
    }

    async fn request<T>(
        &self,
        build: impl FnOnce(oneshot::Sender<T>) -> OrchestratorCommand,
    ) -> Result<T> {
        let (reply, response) = oneshot::channel();
        self.submit(build(reply)).await?;
        response.await.map_err(|_| Error::OrchestratorStopped)
    }

    /// Dropped silently if the peer's control channel is not open.
    pub async fn send(&self, peer_id: PeerId, message: ControlMessage) -> Result<()> {
        self.submit(OrchestratorCommand::Send { peer_id, message })
            .await
    }

    pub async fn send_all(&self, message: ControlMessage) -> Result<()> {
        self.submit(OrchestratorCommand::SendAll { message }).await
    }

    pub async fn start_file_transfer(
        &self,
        peer_id: PeerId,
        options: serde_json::Value,
    ) -> Result<()> {
        self.submit(OrchestratorCommand::StartFileTransfer { peer_id, options })
            .await
    }

    pub async fn change_remote_gain(&self, gain: u8) -> Result<()> {
        self.submit(OrchestratorCommand::ChangeRemoteGain(gain))
            .await
    }

    pub async fn change_local_gain(&self, gain: u8) -> Result<()> {
        self.submit(OrchestratorCommand::ChangeLocalGain(gain))
            .await
    }

    pub async fn set_panner_state(
        &self,
        peer_id: PeerId,
        source: SourceTransform,
        listener: ListenerPose,
    ) -> Result<()> {
        self.submit(OrchestratorCommand::SetPannerState {
            peer_id,
            source,
            listener,
        })
        .await
    }

    pub async fn set_panner_state_all(
        &self,
        sources: Vec<(PeerId, SourceTransform)>,
        listener: ListenerPose,
    ) -> Result<()> {
        self.submit(OrchestratorCommand::SetPannerStateAll { sources, listener })
            .await
    }

    /// `None` until the peer's audio track has arrived.
    pub async fn panner_state(&self, peer_id: PeerId) -> Result<Option<PannerState>> {
        self.request(|reply| OrchestratorCommand::PannerState { peer_id, reply })
            .await
    }

    pub async fn status(&self, peer_id: PeerId) -> Result<String> {
        self.request(|reply| OrchestratorCommand::Status { peer_id, reply })
            .await
    }

    pub async fn is_peer_available(&self, peer_id: PeerId) -> Result<bool> {
        self.request(|reply| OrchestratorCommand::IsPeerAvailable { peer_id, reply })
            .await
    }

    /// Tears everything down and waits for it. Calling it again, or after
    /// the orchestrator stopped on its own, is a no-op.
    pub async fn shutdown(&self) {
        match self
            .request(|reply| OrchestratorCommand::Shutdown { reply })
            .await
        {
            Ok(()) => debug!("Orchestrator for {} shut down", self.local_id),
            Err(Error::OrchestratorStopped) => {
                debug!("Orchestrator for {} already stopped", self.local_id)
            }
            Err(e) => warn!("Shutdown of {} failed: {}", self.local_id, e),
        }
    }
}
