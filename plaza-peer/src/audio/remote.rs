use super::panner::PannerState;
use super::spatial::{GainStage, SpatialNode, StereoFrame};
use super::voice_activity::{Analyser, VoiceActivityEmitter};
use crate::config::VoiceActivityConfig;
use plaza_core::PeerId;
use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::{Arc, Mutex};
use tokio::task::JoinHandle;
use tracing::{debug, info};
use webrtc::track::track_remote::TrackRemote;

/// Turns RTP payloads of one remote stream into mono PCM in `-1.0..=1.0`.
pub trait AudioDecoder: Send {
    fn decode(&mut self, payload: &[u8]) -> Vec<f32>;
}

/// Host audio output. Without one, remote streams are drained but not played.
pub trait AudioBackend: Send + Sync {
    fn decoder(&self, peer_id: PeerId) -> Box<dyn AudioDecoder>;
    fn play(&self, peer_id: PeerId, frame: StereoFrame);
}

/// Playback chain of one remote stream: analyser tap, spatial node, gain.
pub struct RemoteAudio {
    peer_id: PeerId,
    gain: Arc<AtomicU8>,
    spatial: Arc<Mutex<SpatialNode>>,
    emitter: VoiceActivityEmitter,
    reader: Option<JoinHandle<()>>,
}

impl RemoteAudio {
    pub fn attach<F>(
        peer_id: PeerId,
        track: Arc<TrackRemote>,
        gain: u8,
        backend: Option<Arc<dyn AudioBackend>>,
        voice: &VoiceActivityConfig,
        on_level: F,
    ) -> Self
    where
        F: Fn(f32) + Send + 'static,
    {
        info!(
            "Remote audio from {} attached ({})",
            peer_id,
            track.codec().capability.mime_type
        );

        let gain = Arc::new(AtomicU8::new(gain.min(100)));
        let spatial = Arc::new(Mutex::new(SpatialNode::default()));
        let analyser = Analyser::new(voice.window);
        let emitter = VoiceActivityEmitter::start(peer_id, analyser.clone(), voice, on_level);

        let reader = tokio::spawn(read_track(
            peer_id,
            track,
            backend,
            analyser,
            spatial.clone(),
            gain.clone(),
        ));

        Self {
            peer_id,
            gain,
            spatial,
            emitter,
            reader: Some(reader),
        }
    }

    pub fn gain(&self) -> u8 {
        self.gain.load(Ordering::Relaxed)
    }

    pub fn set_gain(&self, percent: u8) {
        self.gain.store(percent.min(100), Ordering::Relaxed);
    }

    pub fn set_panner_state(&self, state: PannerState) {
        self.spatial
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .set_state(state);
    }

    pub fn panner_state(&self) -> PannerState {
        self.spatial.lock().unwrap_or_else(|e| e.into_inner()).state()
    }

    pub fn destroy(&mut self) {
        self.emitter.destroy();
        if let Some(reader) = self.reader.take() {
            reader.abort();
            debug!("Remote audio from {} detached", self.peer_id);
        }
    }
}

impl Drop for RemoteAudio {
    fn drop(&mut self) {
        self.destroy();
    }
}

async fn read_track(
    peer_id: PeerId,
    track: Arc<TrackRemote>,
    backend: Option<Arc<dyn AudioBackend>>,
    analyser: Analyser,
    spatial: Arc<Mutex<SpatialNode>>,
    gain: Arc<AtomicU8>,
) {
    let mut decoder = backend.as_ref().map(|b| b.decoder(peer_id));

    loop {
        let packet = match track.read_rtp().await {
            Ok((packet, _)) => packet,
            Err(e) => {
                debug!("Audio track of {} ended: {}", peer_id, e);
                break;
            }
        };

        let (Some(backend), Some(decoder)) = (backend.as_ref(), decoder.as_mut()) else {
            continue;
        };
        if packet.payload.is_empty() {
            continue;
        }

        let pcm = decoder.decode(&packet.payload);
        analyser.write_samples(&pcm);
        let frame = spatial
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .render(&pcm, GainStage::new(gain.load(Ordering::Relaxed)));
        backend.play(peer_id, frame);
    }
}
