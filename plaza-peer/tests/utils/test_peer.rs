use anyhow::{Context, Result};
use plaza_core::PeerId;
use plaza_peer::audio::AudioBackend;
use plaza_peer::{
    Orchestrator, OrchestratorConfig, OrchestratorEvent, OrchestratorHandle, OutboundFile,
    StaticRoster,
};
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use super::mock_signaling::MockRelayHub;

/// Configuration for a test peer.
#[derive(Clone)]
pub struct TestPeerConfig {
    pub check_interval_ms: u64,
    pub negotiation_timeout_ms: u64,
    pub chunk_size: usize,
    pub progress_every_chunks: u32,
    /// Remote streams are drained unplayed without one.
    pub audio_backend: Option<Arc<dyn AudioBackend>>,
}

impl Default for TestPeerConfig {
    fn default() -> Self {
        Self {
            check_interval_ms: 200,
            negotiation_timeout_ms: 10_000,
            chunk_size: 16_384,
            progress_every_chunks: 1,
            audio_backend: None,
        }
    }
}

impl TestPeerConfig {
    pub fn orchestrator_config(&self) -> OrchestratorConfig {
        OrchestratorConfig {
            // Host candidates only; everything runs on this machine.
            ice_servers: vec![],
            connection_check_interval_ms: self.check_interval_ms,
            negotiation_timeout_ms: self.negotiation_timeout_ms,
            chunk_size: self.chunk_size,
            progress_every_chunks: self.progress_every_chunks,
            ..OrchestratorConfig::default()
        }
    }
}

/// A running orchestrator wired to the in-memory relay.
pub struct TestPeer {
    pub peer_id: PeerId,
    pub handle: OrchestratorHandle,
    pub events: mpsc::UnboundedReceiver<OrchestratorEvent>,
    pub roster: Arc<StaticRoster>,
    task: JoinHandle<()>,
}

impl TestPeer {
    pub async fn spawn(
        hub: &MockRelayHub,
        peer_id: PeerId,
        others: Vec<PeerId>,
        config: TestPeerConfig,
        outbound_file: Option<OutboundFile>,
    ) -> Result<Self> {
        let roster = Arc::new(StaticRoster::new(peer_id, others));
        let signal_rx = hub.register(peer_id).await;

        let (orchestrator, handle, events) = Orchestrator::new(
            config.orchestrator_config(),
            roster.clone(),
            Arc::new(hub.clone()),
            signal_rx,
        )
        .context("Failed to create orchestrator")?;

        let orchestrator = match outbound_file {
            Some(file) => orchestrator.with_outbound_file(file),
            None => orchestrator,
        };
        let orchestrator = match config.audio_backend {
            Some(backend) => orchestrator.with_audio_backend(backend),
            None => orchestrator,
        };

        tracing::debug!("[TestPeer] spawned {}", peer_id);

        Ok(Self {
            peer_id,
            handle,
            events,
            roster,
            task: orchestrator.spawn(),
        })
    }

    /// Shuts down and waits for the orchestrator task to finish.
    pub async fn close(self) -> Result<()> {
        self.handle.shutdown().await;
        self.task.await.context("Orchestrator task panicked")?;
        Ok(())
    }
}
