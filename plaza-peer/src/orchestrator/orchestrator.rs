use super::orchestrator_command::OrchestratorCommand;
use super::orchestrator_event::OrchestratorEvent;
use super::orchestrator_handle::OrchestratorHandle;
use super::scheduler::Scheduler;
use crate::audio::{AudioBackend, LocalAudio};
use crate::config::OrchestratorConfig;
use crate::connection::{
    Connection, ConnectionContext, ConnectionEvent, ConnectionEventKind, ConnectionId, build_api,
};
use crate::error::{Error, Result};
use crate::file_transfer::{OutboundFile, ReceiveEvent};
use crate::signaling::{PeerRoster, SignalingRelay};
use plaza_core::{
    FileChannelFrame, FileTransferControl, PeerId, SessionDescription, SignalPayload,
    SignalingMessage,
};
use std::collections::HashMap;
use std::collections::hash_map::Entry;
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, trace, warn};

pub const CONNECTION_CHECK_JOB: &str = "RTCConnectionCheck";

/// Owns every connection of the local peer and keeps one live connection
/// per roster member.
///
/// All state lives on a single task; webrtc callbacks, the scheduler, the
/// relay and the host application reach it through channels.
pub struct Orchestrator {
    local_id: PeerId,
    ctx: ConnectionContext,
    roster: Arc<dyn PeerRoster>,
    connections: HashMap<PeerId, Connection>,
    next_connection_id: u64,
    remote_gain: u8,
    outbound_file: Option<OutboundFile>,
    audio_backend: Option<Arc<dyn AudioBackend>>,
    scheduler: Scheduler,
    tick_rx: mpsc::Receiver<&'static str>,
    command_rx: mpsc::Receiver<OrchestratorCommand>,
    signal_rx: Option<mpsc::Receiver<SignalingMessage>>,
    conn_event_rx: mpsc::UnboundedReceiver<ConnectionEvent>,
    event_tx: mpsc::UnboundedSender<OrchestratorEvent>,
}

impl Orchestrator {
    pub fn new(
        config: OrchestratorConfig,
        roster: Arc<dyn PeerRoster>,
        relay: Arc<dyn SignalingRelay>,
        signal_rx: mpsc::Receiver<SignalingMessage>,
    ) -> Result<(
        Self,
        OrchestratorHandle,
        mpsc::UnboundedReceiver<OrchestratorEvent>,
    )> {
        config.validate()?;

        let local_id = roster.local_peer_id();
        let (command_tx, command_rx) = mpsc::channel(100);
        let (event_tx, event_rx) = mpsc::unbounded_channel();
        let (conn_event_tx, conn_event_rx) = mpsc::unbounded_channel();
        let (scheduler, tick_rx) = Scheduler::new(1);
        let local_audio = Arc::new(LocalAudio::new(config.local_gain));

        let ctx = ConnectionContext {
            api: Arc::new(build_api()?),
            local_id,
            relay,
            events: conn_event_tx,
            local_audio: local_audio.clone(),
            config: Arc::new(config),
        };

        let orchestrator = Self {
            local_id,
            remote_gain: ctx.config.remote_gain,
            ctx,
            roster,
            connections: HashMap::new(),
            next_connection_id: 0,
            outbound_file: None,
            audio_backend: None,
            scheduler,
            tick_rx,
            command_rx,
            signal_rx: Some(signal_rx),
            conn_event_rx,
            event_tx,
        };
        let handle = OrchestratorHandle::new(local_id, command_tx, local_audio);

        Ok((orchestrator, handle, event_rx))
    }

    /// The file offered by `start_file_transfer`.
    pub fn with_outbound_file(mut self, file: OutboundFile) -> Self {
        self.outbound_file = Some(file);
        self
    }

    pub fn with_audio_backend(mut self, backend: Arc<dyn AudioBackend>) -> Self {
        self.audio_backend = Some(backend);
        self
    }

    pub fn spawn(self) -> JoinHandle<()> {
        tokio::spawn(self.run())
    }

    pub async fn run(mut self) {
        info!("Orchestrator for {} started", self.local_id);

        let interval = self.ctx.config.connection_check_interval();
        if let Err(e) = self.scheduler.register(CONNECTION_CHECK_JOB, interval) {
            error!("Failed to schedule connection checks: {}", e);
        }

        loop {
            tokio::select! {
                cmd = self.command_rx.recv() => {
                    match cmd {
                        Some(OrchestratorCommand::Shutdown { reply }) => {
                            self.shutdown().await;
                            let _ = reply.send(());
                            break;
                        }
                        Some(c) => self.handle_command(c).await,
                        None => {
                            info!("Command channel closed. Shutting down orchestrator.");
                            self.shutdown().await;
                            break;
                        }
                    }
                }

                Some(job) = self.tick_rx.recv() => self.run_job(job).await,

                msg = recv_signal(&mut self.signal_rx) => {
                    match msg {
                        Some(m) => self.handle_signal(m).await,
                        None => {
                            warn!("Signaling relay closed; no further negotiation possible");
                            self.signal_rx = None;
                        }
                    }
                }

                Some(evt) = self.conn_event_rx.recv() => self.handle_connection_event(evt).await,
            }
        }

        info!("Orchestrator for {} finished", self.local_id);
    }

    async fn run_job(&mut self, job: &'static str) {
        match job {
            CONNECTION_CHECK_JOB => self.check_connections().await,
            other => warn!("Unknown job '{}'", other),
        }
    }

    /// Makes sure every roster member has a healthy connection, offering to
    /// those that need one.
    async fn check_connections(&mut self) {
        let peers = self.roster.other_peer_ids();
        self.prune_departed(&peers).await;

        for peer_id in peers {
            if self
                .connections
                .get(&peer_id)
                .is_some_and(Connection::should_destroy)
            {
                info!("Lost connectivity to {}, dropping connection", peer_id);
                self.drop_connection(peer_id).await;
            }
            let conn = match self.get_or_create(peer_id).await {
                Ok(conn) => conn,
                Err(e) => {
                    error!("Failed to create connection to {}: {}", peer_id, e);
                    continue;
                }
            };
            if !conn.needs_offer() {
                continue;
            }
            if let Err(e) = conn.create_offer().await {
                warn!("Offer to {} failed: {}", peer_id, e);
            }
        }
    }

    async fn prune_departed(&mut self, peers: &[PeerId]) {
        let departed: Vec<PeerId> = self
            .connections
            .keys()
            .filter(|id| !peers.contains(id))
            .copied()
            .collect();
        for peer_id in departed {
            info!("{} left the roster", peer_id);
            self.drop_connection(peer_id).await;
        }
    }

    /// Returns the existing connection unless it needs an offer, in which
    /// case it is destroyed and replaced.
    async fn get_or_create(&mut self, peer_id: PeerId) -> Result<&mut Connection> {
        let gain = self.remote_gain;
        match self.connections.entry(peer_id) {
            Entry::Occupied(entry) if !entry.get().needs_offer() => Ok(entry.into_mut()),
            Entry::Occupied(mut entry) => {
                debug!(
                    "Replacing connection to {} ({})",
                    peer_id,
                    entry.get().status()
                );
                entry.get_mut().destroy().await;
                match create_connection(&self.ctx, &mut self.next_connection_id, peer_id, gain)
                    .await
                {
                    Ok(fresh) => {
                        entry.insert(fresh);
                        Ok(entry.into_mut())
                    }
                    Err(e) => {
                        entry.remove();
                        Err(e)
                    }
                }
            }
            Entry::Vacant(entry) => {
                let fresh =
                    create_connection(&self.ctx, &mut self.next_connection_id, peer_id, gain)
                        .await?;
                Ok(entry.insert(fresh))
            }
        }
    }

    async fn replace_connection(&mut self, peer_id: PeerId) -> Result<&mut Connection> {
        if let Some(mut old) = self.connections.remove(&peer_id) {
            old.destroy().await;
        }
        let fresh = create_connection(
            &self.ctx,
            &mut self.next_connection_id,
            peer_id,
            self.remote_gain,
        )
        .await?;
        Ok(self.connections.entry(peer_id).or_insert(fresh))
    }

    async fn drop_connection(&mut self, peer_id: PeerId) {
        let Some(mut conn) = self.connections.remove(&peer_id) else {
            return;
        };
        conn.destroy().await;
        emit(&self.event_tx, OrchestratorEvent::PeerDisconnected { peer_id });
    }

    async fn handle_signal(&mut self, msg: SignalingMessage) {
        if msg.to != self.local_id {
            debug!("Signaling message addressed to {} ignored", msg.to);
            return;
        }
        let peer_id = msg.from;
        trace!("Received {} from {}", msg.kind(), peer_id);

        match msg.payload {
            SignalPayload::Offer { offer } => self.handle_offer(peer_id, offer).await,

            SignalPayload::Answer { answer } => {
                let Some(conn) = self.connections.get_mut(&peer_id) else {
                    debug!("Answer from {} without a connection, dropped", peer_id);
                    return;
                };
                if let Err(e) = conn.handle_answer(answer).await {
                    warn!("Failed to apply answer from {}: {}", peer_id, e);
                }
            }

            SignalPayload::IceCandidate { candidate } => {
                let Some(conn) = self.connections.get_mut(&peer_id) else {
                    debug!("ICE candidate from {} without a connection, dropped", peer_id);
                    return;
                };
                if let Err(e) = conn.handle_ice_candidate(candidate).await {
                    warn!("Failed to add ICE candidate for {}: {}", peer_id, e);
                }
            }
        }
    }

    /// Answers on a fresh connection. When both sides offered at once, the
    /// peer with the smaller id keeps its own offer.
    async fn handle_offer(&mut self, peer_id: PeerId, offer: SessionDescription) {
        if !self.roster.other_peer_ids().contains(&peer_id) {
            warn!("Offer from {} who is not in the roster, dropped", peer_id);
            return;
        }

        let offering = self
            .connections
            .get(&peer_id)
            .is_some_and(Connection::is_offering);
        if offering && self.local_id < peer_id {
            debug!("Offer collision with {}, keeping ours", peer_id);
            return;
        }

        let conn = match self.replace_connection(peer_id).await {
            Ok(conn) => conn,
            Err(e) => {
                error!("Failed to create connection to {}: {}", peer_id, e);
                return;
            }
        };
        if let Err(e) = conn.create_answer(offer).await {
            warn!("Failed to answer {}: {}", peer_id, e);
        }
    }

    async fn handle_connection_event(&mut self, event: ConnectionEvent) {
        let ConnectionEvent {
            peer_id,
            connection_id,
            kind,
        } = event;

        let Some(conn) = self
            .connections
            .get_mut(&peer_id)
            .filter(|conn| conn.id() == connection_id)
        else {
            trace!(
                "Dropping {} event from stale connection {} to {}",
                kind.name(),
                connection_id,
                peer_id
            );
            return;
        };

        match kind {
            ConnectionEventKind::PeerStateChanged(state) => conn.set_peer_state(state),

            ConnectionEventKind::IceStateChanged(state) => {
                conn.set_ice_state(state);
                if conn.should_destroy() {
                    info!("Lost connectivity to {}, dropping connection", peer_id);
                    self.drop_connection(peer_id).await;
                }
            }

            ConnectionEventKind::CandidateGenerated(candidate) => {
                let msg = SignalingMessage::ice_candidate(self.local_id, peer_id, candidate);
                if let Err(e) = self.ctx.relay.send_signaling_message(msg).await {
                    warn!("Failed to relay ICE candidate to {}: {}", peer_id, e);
                }
            }

            ConnectionEventKind::ControlChannelOpened => {
                info!("Control channel to {} is open", peer_id);
                emit(
                    &self.event_tx,
                    OrchestratorEvent::ControlChannelOpened { peer_id },
                );
            }

            ConnectionEventKind::FileChannelOpened => {
                debug!("File-transfer channel to {} is open", peer_id);
                emit(
                    &self.event_tx,
                    OrchestratorEvent::FileChannelOpened { peer_id },
                );
            }

            ConnectionEventKind::ControlMessage(message) => emit(
                &self.event_tx,
                OrchestratorEvent::ControlMessageReceived { peer_id, message },
            ),

            ConnectionEventKind::FileFrame(frame) => self.handle_file_frame(peer_id, frame).await,

            ConnectionEventKind::AudioTrack(track) => {
                let events = self.event_tx.clone();
                conn.attach_remote_audio(track, self.audio_backend.clone(), move |level| {
                    emit(
                        &events,
                        OrchestratorEvent::VoiceLevelChanged { peer_id, level },
                    );
                });
            }

            ConnectionEventKind::TransferFinished(result) => match result {
                Ok(sent) => info!("Sent {} bytes to {}", sent, peer_id),
                Err(e @ Error::FileRead { .. }) => {
                    error!("File transfer to {} failed: {}", peer_id, e);
                    emit(
                        &self.event_tx,
                        OrchestratorEvent::FileTransferFailed {
                            peer_id,
                            reason: e.to_string(),
                        },
                    );
                }
                Err(e) => warn!("File transfer to {} aborted: {}", peer_id, e),
            },
        }
    }

    async fn handle_file_frame(&mut self, peer_id: PeerId, frame: FileChannelFrame) {
        let Some(conn) = self.connections.get_mut(&peer_id) else {
            return;
        };

        match frame {
            FileChannelFrame::Control(FileTransferControl::Start { file_size, options }) => {
                let completed = conn.on_start_requested(file_size, options.clone());
                if let Err(e) = conn.accept_file_transfer().await {
                    warn!("Failed to accept file from {}: {}", peer_id, e);
                    return;
                }
                emit(
                    &self.event_tx,
                    OrchestratorEvent::FileTransferAccepted {
                        peer_id,
                        file_size,
                        options,
                    },
                );
                if let Some(event) = completed {
                    emit_receive(&self.event_tx, peer_id, event);
                }
            }

            FileChannelFrame::Control(FileTransferControl::Accept) => {
                let Some(file) = self.outbound_file.clone() else {
                    warn!("{} accepted a file transfer: {}", peer_id, Error::NoOutboundFile);
                    return;
                };
                conn.spawn_file_transfer(file, self.ctx.config.chunk_size);
            }

            FileChannelFrame::Chunk(data) => {
                for event in conn.on_receive_chunk(data) {
                    emit_receive(&self.event_tx, peer_id, event);
                }
            }
        }
    }

    async fn handle_command(&mut self, cmd: OrchestratorCommand) {
        match cmd {
            OrchestratorCommand::Send { peer_id, message } => {
                match self.connections.get(&peer_id) {
                    Some(conn) => conn.send_message(&message).await,
                    None => debug!("No connection to {}, dropping message", peer_id),
                }
            }

            OrchestratorCommand::SendAll { message } => {
                for conn in self.connections.values() {
                    conn.send_message(&message).await;
                }
            }

            OrchestratorCommand::StartFileTransfer { peer_id, options } => {
                self.start_file_transfer(peer_id, options).await
            }

            OrchestratorCommand::ChangeRemoteGain(gain) => {
                self.remote_gain = gain.min(100);
                for conn in self.connections.values_mut() {
                    conn.change_gain(self.remote_gain);
                }
            }

            OrchestratorCommand::ChangeLocalGain(gain) => self.ctx.local_audio.set_gain(gain),

            OrchestratorCommand::SetPannerState {
                peer_id,
                source,
                listener,
            } => {
                if let Some(conn) = self.connections.get(&peer_id) {
                    conn.set_panner_state(&source, &listener);
                }
            }

            OrchestratorCommand::SetPannerStateAll { sources, listener } => {
                for (peer_id, source) in sources {
                    if let Some(conn) = self.connections.get(&peer_id) {
                        conn.set_panner_state(&source, &listener);
                    }
                }
            }

            OrchestratorCommand::PannerState { peer_id, reply } => {
                let state = self
                    .connections
                    .get(&peer_id)
                    .and_then(Connection::panner_state);
                let _ = reply.send(state);
            }

            OrchestratorCommand::Status { peer_id, reply } => {
                let _ = reply.send(self.status(peer_id));
            }

            OrchestratorCommand::IsPeerAvailable { peer_id, reply } => {
                let _ = reply.send(self.is_peer_available(peer_id));
            }

            OrchestratorCommand::Shutdown { reply } => {
                self.shutdown().await;
                let _ = reply.send(());
            }
        }
    }

    async fn start_file_transfer(&mut self, peer_id: PeerId, options: serde_json::Value) {
        let Some(conn) = self.connections.get(&peer_id) else {
            debug!("No connection to {}, cannot start file transfer", peer_id);
            return;
        };
        let Some(file) = &self.outbound_file else {
            warn!("Cannot offer a file to {}: {}", peer_id, Error::NoOutboundFile);
            return;
        };

        let file_size = match file.size().await {
            Ok(size) => size,
            Err(e) => {
                error!("Cannot offer a file to {}: {}", peer_id, e);
                emit(
                    &self.event_tx,
                    OrchestratorEvent::FileTransferFailed {
                        peer_id,
                        reason: e.to_string(),
                    },
                );
                return;
            }
        };

        if let Err(e) = conn.start_file_transfer(file_size, options).await {
            warn!("Failed to start file transfer to {}: {}", peer_id, e);
        }
    }

    /// `"<negotiation>/<control channel>"`, empty when there is no connection.
    fn status(&self, peer_id: PeerId) -> String {
        self.connections
            .get(&peer_id)
            .map(Connection::status)
            .unwrap_or_default()
    }

    fn is_peer_available(&self, peer_id: PeerId) -> bool {
        self.connections
            .get(&peer_id)
            .is_some_and(|conn| !conn.needs_offer())
    }

    async fn shutdown(&mut self) {
        self.scheduler.stop_all();
        self.signal_rx = None;
        for (_, mut conn) in self.connections.drain() {
            conn.destroy().await;
        }
        self.ctx.local_audio.release();
        info!("Orchestrator for {} shut down", self.local_id);
    }
}

async fn create_connection(
    ctx: &ConnectionContext,
    next_id: &mut u64,
    peer_id: PeerId,
    gain: u8,
) -> Result<Connection> {
    *next_id += 1;
    let id = ConnectionId(*next_id);
    let conn = Connection::new(ctx.clone(), peer_id, id, gain).await?;

    let control_tx = ctx.events.clone();
    conn.on_control_message(Arc::new(move |peer_id, message| {
        let _ = control_tx.send(ConnectionEvent {
            peer_id,
            connection_id: id,
            kind: ConnectionEventKind::ControlMessage(message),
        });
    }));

    let file_tx = ctx.events.clone();
    conn.on_file_frame(Arc::new(move |peer_id, frame| {
        let _ = file_tx.send(ConnectionEvent {
            peer_id,
            connection_id: id,
            kind: ConnectionEventKind::FileFrame(frame),
        });
    }));

    Ok(conn)
}

async fn recv_signal(
    rx: &mut Option<mpsc::Receiver<SignalingMessage>>,
) -> Option<SignalingMessage> {
    match rx {
        Some(rx) => rx.recv().await,
        None => std::future::pending().await,
    }
}

fn emit(tx: &mpsc::UnboundedSender<OrchestratorEvent>, event: OrchestratorEvent) {
    if tx.send(event).is_err() {
        trace!("Event receiver dropped");
    }
}

fn emit_receive(tx: &mpsc::UnboundedSender<OrchestratorEvent>, peer_id: PeerId, event: ReceiveEvent) {
    let event = match event {
        ReceiveEvent::Progress(progress) => {
            OrchestratorEvent::FileTransferProgress { peer_id, progress }
        }
        ReceiveEvent::Completed(file) => OrchestratorEvent::FileReceived {
            peer_id,
            data: file.data,
            options: file.options,
        },
    };
    emit(tx, event);
}
