use crate::error::Result;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU8, Ordering};
use tracing::debug;
use webrtc::api::media_engine::MIME_TYPE_OPUS;
use webrtc::media::Sample;
use webrtc::rtp_transceiver::rtp_codec::RTCRtpCodecCapability;
use webrtc::track::track_local::TrackLocal;
use webrtc::track::track_local::track_local_static_sample::TrackLocalStaticSample;

/// The local microphone as one Opus track shared by every connection.
///
/// Capture and encoding happen outside this crate; encoded frames are pushed
/// with [`write_sample`](Self::write_sample). Gain 0 mutes the track.
pub struct LocalAudio {
    track: Arc<TrackLocalStaticSample>,
    gain: AtomicU8,
    released: AtomicBool,
}

impl LocalAudio {
    pub fn new(gain: u8) -> Self {
        let track = TrackLocalStaticSample::new(
            RTCRtpCodecCapability {
                mime_type: MIME_TYPE_OPUS.to_owned(),
                clock_rate: 48_000,
                channels: 2,
                ..Default::default()
            },
            "audio".to_owned(),
            "plaza-local-audio".to_owned(),
        );
        Self {
            track: Arc::new(track),
            gain: AtomicU8::new(gain.min(100)),
            released: AtomicBool::new(false),
        }
    }

    pub fn track(&self) -> Arc<dyn TrackLocal + Send + Sync> {
        self.track.clone()
    }

    pub fn gain(&self) -> u8 {
        self.gain.load(Ordering::Relaxed)
    }

    pub fn set_gain(&self, percent: u8) {
        let percent = percent.min(100);
        debug!("Local gain set to {}", percent);
        self.gain.store(percent, Ordering::Relaxed);
    }

    pub fn is_muted(&self) -> bool {
        self.gain() == 0 || self.is_released()
    }

    /// Returns whether the sample was sent; muted or released input is dropped.
    pub async fn write_sample(&self, sample: &Sample) -> Result<bool> {
        if self.is_muted() {
            return Ok(false);
        }
        self.track.write_sample(sample).await?;
        Ok(true)
    }

    pub fn is_released(&self) -> bool {
        self.released.load(Ordering::Acquire)
    }

    /// Stops accepting samples for good.
    pub fn release(&self) {
        if !self.released.swap(true, Ordering::AcqRel) {
            debug!("Local audio released");
        }
    }
}
