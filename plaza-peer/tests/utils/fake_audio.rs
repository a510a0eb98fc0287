use plaza_core::PeerId;
use plaza_peer::audio::{AudioBackend, AudioDecoder, StereoFrame};
use std::collections::HashMap;
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};

/// Samples per decoded packet: 20 ms at 48 kHz.
const FRAME_LEN: usize = 960;

/// Ignores the payload and yields a constant signal.
struct ConstantDecoder {
    value: f32,
}

impl AudioDecoder for ConstantDecoder {
    fn decode(&mut self, _payload: &[u8]) -> Vec<f32> {
        vec![self.value; FRAME_LEN]
    }
}

/// Host audio output that decodes every packet to the same PCM value and
/// keeps the last rendered frame per peer.
pub struct FakeAudioBackend {
    value: f32,
    decoders: AtomicUsize,
    played: AtomicUsize,
    last: Mutex<HashMap<PeerId, StereoFrame>>,
}

impl FakeAudioBackend {
    pub fn new(value: f32) -> Self {
        Self {
            value,
            decoders: AtomicUsize::new(0),
            played: AtomicUsize::new(0),
            last: Mutex::new(HashMap::new()),
        }
    }

    pub fn decoders_created(&self) -> usize {
        self.decoders.load(Ordering::SeqCst)
    }

    pub fn frames_played(&self) -> usize {
        self.played.load(Ordering::SeqCst)
    }

    /// First sample of each channel of the most recent frame from `peer_id`.
    pub fn last_gains(&self, peer_id: PeerId) -> Option<(f32, f32)> {
        let last = self.last.lock().unwrap();
        let frame = last.get(&peer_id)?;
        Some((*frame.left.first()?, *frame.right.first()?))
    }
}

impl AudioBackend for FakeAudioBackend {
    fn decoder(&self, peer_id: PeerId) -> Box<dyn AudioDecoder> {
        tracing::debug!("[FakeAudio] decoder for {}", peer_id);
        self.decoders.fetch_add(1, Ordering::SeqCst);
        Box::new(ConstantDecoder { value: self.value })
    }

    fn play(&self, peer_id: PeerId, frame: StereoFrame) {
        self.played.fetch_add(1, Ordering::SeqCst);
        self.last.lock().unwrap().insert(peer_id, frame);
    }
}
