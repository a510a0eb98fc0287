use super::connection_event::{ConnectionEvent, ConnectionEventKind, ConnectionId};
use super::state::{self, ChannelState, Connectivity, NegotiationState};
use super::subscription::{ChannelSubscription, MessageHandler};
use crate::audio::{AudioBackend, LocalAudio, PannerCalculator, PannerState, RemoteAudio};
use crate::config::OrchestratorConfig;
use crate::error::{Error, Result};
use crate::file_transfer::{
    ChunkSink, FileReceiver, FileTransferer, OutboundFile, ReceiveEvent,
};
use crate::signaling::SignalingRelay;
use async_trait::async_trait;
use bytes::Bytes;
use plaza_core::utils::{CONTROL_CHANNEL_LABEL, FILE_TRANSFER_CHANNEL_LABEL};
use plaza_core::{
    ControlMessage, FileChannelFrame, FileTransferControl, IceCandidateInit, ListenerPose, PeerId,
    SessionDescription, SignalingMessage, SourceTransform,
};
use std::sync::{Arc, Mutex, MutexGuard};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tracing::{debug, info, warn};
use webrtc::api::interceptor_registry::register_default_interceptors;
use webrtc::api::media_engine::MediaEngine;
use webrtc::api::{API, APIBuilder};
use webrtc::data_channel::RTCDataChannel;
use webrtc::data_channel::data_channel_init::RTCDataChannelInit;
use webrtc::data_channel::data_channel_message::DataChannelMessage;
use webrtc::ice_transport::ice_candidate::{RTCIceCandidate, RTCIceCandidateInit};
use webrtc::ice_transport::ice_connection_state::RTCIceConnectionState;
use webrtc::ice_transport::ice_server::RTCIceServer;
use webrtc::interceptor::registry::Registry;
use webrtc::peer_connection::RTCPeerConnection;
use webrtc::peer_connection::configuration::RTCConfiguration;
use webrtc::peer_connection::peer_connection_state::RTCPeerConnectionState;
use webrtc::peer_connection::sdp::session_description::RTCSessionDescription;
use webrtc::rtp_transceiver::rtp_codec::RTPCodecType;
use webrtc::track::track_remote::TrackRemote;

/// One media engine and interceptor registry shared by every connection.
pub fn build_api() -> Result<API> {
    let mut media = MediaEngine::default();
    media.register_default_codecs()?;
    let registry = register_default_interceptors(Registry::new(), &mut media)?;

    Ok(APIBuilder::new()
        .with_media_engine(media)
        .with_interceptor_registry(registry)
        .build())
}

/// Everything a connection borrows from its orchestrator.
#[derive(Clone)]
pub struct ConnectionContext {
    pub api: Arc<API>,
    pub config: Arc<OrchestratorConfig>,
    pub local_id: PeerId,
    pub relay: Arc<dyn SignalingRelay>,
    pub events: mpsc::UnboundedSender<ConnectionEvent>,
    pub local_audio: Arc<LocalAudio>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NegotiationRole {
    Offerer,
    Answerer,
}

/// Tags events with the connection they came from.
#[derive(Clone)]
struct EventSink {
    peer_id: PeerId,
    connection_id: ConnectionId,
    tx: mpsc::UnboundedSender<ConnectionEvent>,
}

impl EventSink {
    fn send(&self, kind: ConnectionEventKind) {
        let _ = self.tx.send(ConnectionEvent {
            peer_id: self.peer_id,
            connection_id: self.connection_id,
            kind,
        });
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|e| e.into_inner())
}

/// A data channel that may not exist yet, plus its handler subscription.
struct ChannelSlot<T> {
    channel: Mutex<Option<Arc<RTCDataChannel>>>,
    subscription: Mutex<ChannelSubscription<T>>,
}

impl<T: Clone + Send + 'static> ChannelSlot<T> {
    fn new(peer_id: PeerId) -> Arc<Self> {
        Arc::new(Self {
            channel: Mutex::new(None),
            subscription: Mutex::new(ChannelSubscription::new(peer_id)),
        })
    }

    fn channel(&self) -> Option<Arc<RTCDataChannel>> {
        lock(&self.channel).clone()
    }

    fn open_channel(&self) -> Option<Arc<RTCDataChannel>> {
        self.channel()
            .filter(|dc| ChannelState::from(dc.ready_state()) == ChannelState::Open)
    }

    fn state(&self) -> ChannelState {
        self.channel()
            .map(|dc| dc.ready_state().into())
            .unwrap_or(ChannelState::Absent)
    }

    fn subscribe(&self, handler: MessageHandler<T>) {
        lock(&self.subscription).subscribe(handler);
    }

    fn bind<D, O>(&self, dc: Arc<RTCDataChannel>, decode: D, on_open: O)
    where
        D: Fn(DataChannelMessage) -> Option<T> + Send + Sync + 'static,
        O: FnOnce() + Send + Sync + 'static,
    {
        *lock(&self.channel) = Some(dc.clone());

        match lock(&self.subscription).attach() {
            Some(dispatcher) => dc.on_message(Box::new(move |msg: DataChannelMessage| {
                if let Some(decoded) = decode(msg) {
                    dispatcher.dispatch(decoded);
                }
                Box::pin(async {})
            })),
            None => warn!("Channel '{}' bound twice, keeping first handlers", dc.label()),
        }

        dc.on_open(Box::new(move || {
            on_open();
            Box::pin(async {})
        }));
    }
}

fn decode_control(peer_id: PeerId, msg: DataChannelMessage) -> Option<ControlMessage> {
    if !msg.is_string {
        warn!("Binary frame on control channel from {}, dropped", peer_id);
        return None;
    }
    match serde_json::from_slice::<ControlMessage>(&msg.data) {
        Ok(message) => Some(message),
        Err(e) => {
            warn!("Unrecognized control message from {}: {}", peer_id, e);
            None
        }
    }
}

fn decode_file_frame(peer_id: PeerId, msg: DataChannelMessage) -> Option<FileChannelFrame> {
    match FileChannelFrame::decode(msg.is_string, msg.data) {
        Ok(frame) => Some(frame),
        Err(e) => {
            warn!("Unrecognized file-transfer frame from {}: {}", peer_id, e);
            None
        }
    }
}

fn to_rtc_candidate(candidate: IceCandidateInit) -> RTCIceCandidateInit {
    RTCIceCandidateInit {
        candidate: candidate.candidate,
        sdp_mid: candidate.sdp_mid,
        sdp_mline_index: candidate.sdp_m_line_index,
        username_fragment: candidate.username_fragment,
    }
}

fn from_rtc_candidate(candidate: RTCIceCandidateInit) -> IceCandidateInit {
    IceCandidateInit {
        candidate: candidate.candidate,
        sdp_mid: candidate.sdp_mid,
        sdp_m_line_index: candidate.sdp_mline_index,
        username_fragment: candidate.username_fragment,
    }
}

/// Writes outbound file chunks as binary frames.
struct FileChannelSink {
    peer_id: PeerId,
    channel: Arc<RTCDataChannel>,
}

#[async_trait]
impl ChunkSink for FileChannelSink {
    async fn send_chunk(&self, chunk: Bytes) -> Result<()> {
        if ChannelState::from(self.channel.ready_state()) != ChannelState::Open {
            return Err(Error::ChannelNotOpen {
                peer_id: self.peer_id,
                channel: "file-transfer",
            });
        }
        self.channel.send(&chunk).await?;
        Ok(())
    }
}

/// One negotiated link to a remote peer: the peer connection, its control
/// and file-transfer channels, and the remote audio chain.
pub struct Connection {
    id: ConnectionId,
    peer_id: PeerId,
    ctx: ConnectionContext,
    sink: EventSink,
    peer_connection: Arc<RTCPeerConnection>,
    control: Arc<ChannelSlot<ControlMessage>>,
    file: Arc<ChannelSlot<FileChannelFrame>>,

    peer_state: RTCPeerConnectionState,
    ice_state: RTCIceConnectionState,
    role: Option<NegotiationRole>,
    negotiation_started: Option<Instant>,
    failed: bool,
    destroyed: bool,
    remote_description_set: bool,
    pending_candidates: Vec<RTCIceCandidateInit>,

    gain: u8,
    panner: PannerCalculator,
    remote_audio: Option<RemoteAudio>,
    receiver: FileReceiver,
    outbound: Option<JoinHandle<()>>,
}

impl Connection {
    pub async fn new(
        ctx: ConnectionContext,
        peer_id: PeerId,
        id: ConnectionId,
        gain: u8,
    ) -> Result<Self> {
        let rtc_config = RTCConfiguration {
            ice_servers: ctx
                .config
                .ice_servers
                .iter()
                .map(|server| RTCIceServer {
                    urls: server.urls.clone(),
                    username: server.username.clone().unwrap_or_default(),
                    credential: server.credential.clone().unwrap_or_default(),
                })
                .collect(),
            ..Default::default()
        };
        let peer_connection = Arc::new(ctx.api.new_peer_connection(rtc_config).await?);

        let sink = EventSink {
            peer_id,
            connection_id: id,
            tx: ctx.events.clone(),
        };
        let control = ChannelSlot::new(peer_id);
        let file = ChannelSlot::new(peer_id);

        // 1. Negotiation and connectivity state
        let state_sink = sink.clone();
        peer_connection.on_peer_connection_state_change(Box::new(
            move |s: RTCPeerConnectionState| {
                state_sink.send(ConnectionEventKind::PeerStateChanged(s));
                Box::pin(async {})
            },
        ));

        let ice_state_sink = sink.clone();
        peer_connection.on_ice_connection_state_change(Box::new(
            move |s: RTCIceConnectionState| {
                ice_state_sink.send(ConnectionEventKind::IceStateChanged(s));
                Box::pin(async {})
            },
        ));

        // 2. Trickle ICE towards the relay
        let ice_sink = sink.clone();
        peer_connection.on_ice_candidate(Box::new(move |c: Option<RTCIceCandidate>| {
            let sink = ice_sink.clone();
            Box::pin(async move {
                let Some(candidate) = c else { return };
                let Ok(init) = candidate.to_json() else {
                    return;
                };
                sink.send(ConnectionEventKind::CandidateGenerated(
                    from_rtc_candidate(init),
                ));
            })
        }));

        // 3. Control channel announced by the offering side
        let dc_sink = sink.clone();
        let dc_slot = control.clone();
        peer_connection.on_data_channel(Box::new(move |dc: Arc<RTCDataChannel>| {
            if dc.label() == CONTROL_CHANNEL_LABEL {
                debug!("Control channel received from {}", dc_sink.peer_id);
                bind_control(&dc_slot, dc, dc_sink.clone());
            } else {
                debug!("Ignoring unexpected data channel '{}'", dc.label());
            }
            Box::pin(async {})
        }));

        // 4. Remote audio
        let track_sink = sink.clone();
        peer_connection.on_track(Box::new(move |track: Arc<TrackRemote>, _, _| {
            if track.kind() == RTPCodecType::Audio {
                track_sink.send(ConnectionEventKind::AudioTrack(track));
            }
            Box::pin(async {})
        }));

        // 5. Local microphone, shared by all connections
        add_local_track(&peer_connection, &ctx.local_audio).await?;

        debug!("Connection {} to {} created", id, peer_id);

        Ok(Self {
            id,
            peer_id,
            panner: PannerCalculator::new(ctx.config.panner_sensitivity),
            receiver: FileReceiver::new(peer_id, ctx.config.progress_every_chunks),
            ctx,
            sink,
            peer_connection,
            control,
            file,
            peer_state: RTCPeerConnectionState::New,
            ice_state: RTCIceConnectionState::New,
            role: None,
            negotiation_started: None,
            failed: false,
            destroyed: false,
            remote_description_set: false,
            pending_candidates: Vec::new(),
            gain: gain.min(100),
            remote_audio: None,
            outbound: None,
        })
    }

    pub fn id(&self) -> ConnectionId {
        self.id
    }

    pub fn peer_id(&self) -> PeerId {
        self.peer_id
    }

    pub fn role(&self) -> Option<NegotiationRole> {
        self.role
    }

    pub fn is_destroyed(&self) -> bool {
        self.destroyed
    }

    pub fn on_control_message(&self, handler: MessageHandler<ControlMessage>) {
        self.control.subscribe(handler);
    }

    pub fn on_file_frame(&self, handler: MessageHandler<FileChannelFrame>) {
        self.file.subscribe(handler);
    }

    pub(crate) fn set_peer_state(&mut self, state: RTCPeerConnectionState) {
        info!("Peer connection to {} is now {}", self.peer_id, state);
        self.peer_state = state;
    }

    pub(crate) fn set_ice_state(&mut self, state: RTCIceConnectionState) {
        debug!("ICE connection to {} is now {}", self.peer_id, state);
        self.ice_state = state;
    }

    pub fn negotiation_state(&self) -> NegotiationState {
        if self.destroyed {
            return NegotiationState::Closed;
        }
        if self.failed {
            return NegotiationState::Failed;
        }
        match self.peer_state {
            RTCPeerConnectionState::Connected => NegotiationState::Connected,
            RTCPeerConnectionState::Disconnected => NegotiationState::Disconnected,
            RTCPeerConnectionState::Failed => NegotiationState::Failed,
            RTCPeerConnectionState::Closed => NegotiationState::Closed,
            _ => match self.negotiation_started {
                None => NegotiationState::New,
                Some(started) if started.elapsed() >= self.ctx.config.negotiation_timeout() => {
                    NegotiationState::Failed
                }
                Some(_) => NegotiationState::Negotiating,
            },
        }
    }

    pub fn connectivity(&self) -> Connectivity {
        self.ice_state.into()
    }

    pub fn control_channel_state(&self) -> ChannelState {
        self.control.state()
    }

    pub fn file_channel_state(&self) -> ChannelState {
        self.file.state()
    }

    pub fn needs_offer(&self) -> bool {
        state::needs_offer(self.negotiation_state(), self.control_channel_state())
    }

    pub fn should_destroy(&self) -> bool {
        state::should_destroy(self.negotiation_state(), self.connectivity())
    }

    /// Our own offer is still waiting for an answer.
    pub fn is_offering(&self) -> bool {
        self.role == Some(NegotiationRole::Offerer)
            && self.negotiation_state() == NegotiationState::Negotiating
    }

    pub fn status(&self) -> String {
        format!(
            "{}/{}",
            self.negotiation_state(),
            self.control_channel_state()
        )
    }

    fn begin_negotiation(&mut self, role: NegotiationRole) {
        self.role = Some(role);
        self.negotiation_started = Some(Instant::now());
        self.failed = false;
    }

    /// Creates both channels, then sends an offer through the relay. Any
    /// failure marks the negotiation failed so the next check retries.
    pub async fn create_offer(&mut self) -> Result<()> {
        self.begin_negotiation(NegotiationRole::Offerer);
        let result = self.send_offer().await;
        if result.is_err() {
            self.failed = true;
        }
        result
    }

    async fn send_offer(&mut self) -> Result<()> {
        let dc = self
            .peer_connection
            .create_data_channel(CONTROL_CHANNEL_LABEL, None)
            .await?;
        bind_control(&self.control, dc, self.sink.clone());
        self.open_file_channel().await?;

        let offer = self.peer_connection.create_offer(None).await?;
        self.peer_connection
            .set_local_description(offer.clone())
            .await?;

        info!("Sending offer to {}", self.peer_id);
        self.ctx
            .relay
            .send_signaling_message(SignalingMessage::offer(
                self.ctx.local_id,
                self.peer_id,
                offer.sdp,
            ))
            .await
    }

    pub async fn create_answer(&mut self, offer: SessionDescription) -> Result<()> {
        self.begin_negotiation(NegotiationRole::Answerer);
        let result = self.send_answer(offer).await;
        if result.is_err() {
            self.failed = true;
        }
        result
    }

    async fn send_answer(&mut self, offer: SessionDescription) -> Result<()> {
        self.open_file_channel().await?;

        let desc = RTCSessionDescription::offer(offer.sdp)?;
        self.peer_connection.set_remote_description(desc).await?;
        self.remote_description_set = true;
        self.flush_candidates().await;

        let answer = self.peer_connection.create_answer(None).await?;
        self.peer_connection
            .set_local_description(answer.clone())
            .await?;

        info!("Sending answer to {}", self.peer_id);
        self.ctx
            .relay
            .send_signaling_message(SignalingMessage::answer(
                self.ctx.local_id,
                self.peer_id,
                answer.sdp,
            ))
            .await
    }

    pub async fn handle_answer(&mut self, answer: SessionDescription) -> Result<()> {
        if self.destroyed {
            return Ok(());
        }
        match self.apply_answer(answer).await {
            Ok(()) => {
                self.remote_description_set = true;
                self.flush_candidates().await;
                Ok(())
            }
            Err(e) => {
                self.failed = true;
                Err(e)
            }
        }
    }

    async fn apply_answer(&self, answer: SessionDescription) -> Result<()> {
        let desc = RTCSessionDescription::answer(answer.sdp)?;
        self.peer_connection.set_remote_description(desc).await?;
        Ok(())
    }

    /// Candidates that arrive before the remote description are held back.
    pub async fn handle_ice_candidate(&mut self, candidate: IceCandidateInit) -> Result<()> {
        if self.destroyed {
            return Ok(());
        }
        let candidate = to_rtc_candidate(candidate);
        if !self.remote_description_set {
            debug!("Buffering early ICE candidate from {}", self.peer_id);
            self.pending_candidates.push(candidate);
            return Ok(());
        }
        self.peer_connection.add_ice_candidate(candidate).await?;
        Ok(())
    }

    pub fn pending_candidates(&self) -> usize {
        self.pending_candidates.len()
    }

    async fn flush_candidates(&mut self) {
        for candidate in std::mem::take(&mut self.pending_candidates) {
            if let Err(e) = self.peer_connection.add_ice_candidate(candidate).await {
                warn!("Failed to add buffered ICE candidate for {}: {}", self.peer_id, e);
            }
        }
    }

    async fn open_file_channel(&mut self) -> Result<()> {
        if self.file.channel().is_some() {
            return Ok(());
        }
        let init = RTCDataChannelInit {
            negotiated: Some(self.ctx.config.file_transfer_channel_id),
            ..Default::default()
        };
        let dc = self
            .peer_connection
            .create_data_channel(FILE_TRANSFER_CHANNEL_LABEL, Some(init))
            .await?;

        let peer_id = self.peer_id;
        let sink = self.sink.clone();
        self.file.bind(
            dc,
            move |msg| decode_file_frame(peer_id, msg),
            move || sink.send(ConnectionEventKind::FileChannelOpened),
        );
        Ok(())
    }

    /// Messages to a channel that is not open are dropped.
    pub async fn send_message(&self, message: &ControlMessage) {
        let Some(dc) = self.control.open_channel() else {
            debug!(
                "Control channel to {} is not open, dropping message",
                self.peer_id
            );
            return;
        };
        let text = match message.to_json() {
            Ok(text) => text,
            Err(e) => {
                warn!("Failed to encode control message: {}", e);
                return;
            }
        };
        if let Err(e) = dc.send_text(text).await {
            warn!("Failed to send control message to {}: {}", self.peer_id, e);
        }
    }

    async fn send_file_control(&self, frame: &FileTransferControl) -> Result<()> {
        let dc = self.file.open_channel().ok_or(Error::ChannelNotOpen {
            peer_id: self.peer_id,
            channel: "file-transfer",
        })?;
        dc.send_text(serde_json::to_string(frame)?).await?;
        Ok(())
    }

    /// Announces an outbound file; chunks follow once the peer accepts.
    pub async fn start_file_transfer(
        &self,
        file_size: u64,
        options: serde_json::Value,
    ) -> Result<()> {
        info!("Offering {} byte file to {}", file_size, self.peer_id);
        self.send_file_control(&FileTransferControl::Start { file_size, options })
            .await
    }

    pub async fn accept_file_transfer(&self) -> Result<()> {
        self.send_file_control(&FileTransferControl::Accept).await
    }

    pub fn on_start_requested(
        &mut self,
        file_size: u64,
        options: serde_json::Value,
    ) -> Option<ReceiveEvent> {
        self.receiver.on_start_requested(file_size, options)
    }

    pub fn on_receive_chunk(&mut self, chunk: Bytes) -> Vec<ReceiveEvent> {
        self.receiver.on_receive_chunk(chunk)
    }

    /// Streams `file` in the background; the outcome comes back as
    /// [`ConnectionEventKind::TransferFinished`].
    pub fn spawn_file_transfer(&mut self, file: OutboundFile, chunk_size: usize) {
        if self.outbound.as_ref().is_some_and(|task| !task.is_finished()) {
            warn!("A file transfer to {} is already running", self.peer_id);
            return;
        }
        let Some(channel) = self.file.channel() else {
            warn!("No file-transfer channel to {}", self.peer_id);
            return;
        };

        let sink = self.sink.clone();
        let chunk_sink = FileChannelSink {
            peer_id: self.peer_id,
            channel,
        };
        self.outbound = Some(tokio::spawn(async move {
            let result = stream_file(file, chunk_size, &chunk_sink).await;
            sink.send(ConnectionEventKind::TransferFinished(result));
        }));
    }

    pub fn attach_remote_audio<F>(
        &mut self,
        track: Arc<TrackRemote>,
        backend: Option<Arc<dyn AudioBackend>>,
        on_level: F,
    ) where
        F: Fn(f32) + Send + 'static,
    {
        if let Some(mut old) = self.remote_audio.take() {
            old.destroy();
        }
        self.remote_audio = Some(RemoteAudio::attach(
            self.peer_id,
            track,
            self.gain,
            backend,
            &self.ctx.config.voice,
            on_level,
        ));
    }

    pub fn has_remote_audio(&self) -> bool {
        self.remote_audio.is_some()
    }

    pub fn gain(&self) -> u8 {
        self.gain
    }

    pub fn change_gain(&mut self, percent: u8) {
        self.gain = percent.min(100);
        if let Some(audio) = &self.remote_audio {
            audio.set_gain(self.gain);
        }
    }

    /// No-op until remote audio is attached.
    pub fn set_panner_state(&self, source: &SourceTransform, listener: &ListenerPose) {
        if let Some(audio) = &self.remote_audio {
            audio.set_panner_state(self.panner.calculate(source, listener));
        }
    }

    /// `None` until remote audio is attached.
    pub fn panner_state(&self) -> Option<PannerState> {
        self.remote_audio.as_ref().map(RemoteAudio::panner_state)
    }

    /// Idempotent. Stops the outbound transfer and voice sampling, then
    /// closes the peer connection.
    pub async fn destroy(&mut self) {
        if self.destroyed {
            return;
        }
        self.destroyed = true;

        if let Some(task) = self.outbound.take() {
            task.abort();
        }
        if let Some(mut audio) = self.remote_audio.take() {
            audio.destroy();
        }
        self.pending_candidates.clear();

        if let Err(e) = self.peer_connection.close().await {
            warn!("Error closing connection to {}: {}", self.peer_id, e);
        }
        info!("Connection {} to {} destroyed", self.id, self.peer_id);
    }
}

impl Drop for Connection {
    fn drop(&mut self) {
        if self.destroyed {
            return;
        }
        let pc = self.peer_connection.clone();
        if let Ok(handle) = tokio::runtime::Handle::try_current() {
            handle.spawn(async move {
                let _ = pc.close().await;
            });
        }
    }
}

async fn stream_file(file: OutboundFile, chunk_size: usize, sink: &FileChannelSink) -> Result<u64> {
    let source = file.open().await?;
    FileTransferer::new(source, chunk_size)
        .start_transfer(sink)
        .await
}

/// Closes the peer connection when the track cannot be added.
async fn add_local_track(pc: &RTCPeerConnection, local_audio: &LocalAudio) -> Result<()> {
    let sender = match pc.add_track(local_audio.track()).await {
        Ok(sender) => sender,
        Err(e) => {
            if let Err(close_err) = pc.close().await {
                debug!("Closing after failed add_track: {}", close_err);
            }
            return Err(e.into());
        }
    };
    tokio::spawn(async move {
        let mut rtcp = vec![0u8; 1500];
        while sender.read(&mut rtcp).await.is_ok() {}
    });
    Ok(())
}

fn bind_control(slot: &ChannelSlot<ControlMessage>, dc: Arc<RTCDataChannel>, sink: EventSink) {
    let peer_id = sink.peer_id;
    slot.bind(
        dc,
        move |msg| decode_control(peer_id, msg),
        move || sink.send(ConnectionEventKind::ControlChannelOpened),
    );
}
