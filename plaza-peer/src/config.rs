use crate::error::{Error, Result};
use plaza_core::IceServerConfig;
use plaza_core::utils::{
    DEFAULT_STUN_ADDR, DEFAULT_STUN_ADDR_2, DEFAULT_STUN_ADDR_3, DEFAULT_STUN_ADDR_4,
    FILE_TRANSFER_CHANNEL_ID,
};
use serde::Deserialize;
use std::time::Duration;

/// Settings for the orchestrator and every connection it creates.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct OrchestratorConfig {
    /// STUN/TURN servers. An empty list means host candidates only.
    pub ice_servers: Vec<IceServerConfig>,
    pub connection_check_interval_ms: u64,
    /// How long a connection may stay mid-handshake before it counts as failed.
    pub negotiation_timeout_ms: u64,
    pub chunk_size: usize,
    /// Progress is reported once per this many received chunks.
    pub progress_every_chunks: u32,
    pub file_transfer_channel_id: u16,
    pub panner_sensitivity: f32,
    /// Remote playback gain, 0..=100.
    pub remote_gain: u8,
    /// Outbound microphone gain, 0..=100. Starts muted.
    pub local_gain: u8,
    pub voice: VoiceActivityConfig,
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        Self {
            ice_servers: vec![IceServerConfig {
                urls: vec![
                    DEFAULT_STUN_ADDR.to_owned(),
                    DEFAULT_STUN_ADDR_2.to_owned(),
                    DEFAULT_STUN_ADDR_3.to_owned(),
                    DEFAULT_STUN_ADDR_4.to_owned(),
                ],
                username: None,
                credential: None,
            }],
            connection_check_interval_ms: 3000,
            negotiation_timeout_ms: 15_000,
            chunk_size: 16_384,
            progress_every_chunks: 30,
            file_transfer_channel_id: FILE_TRANSFER_CHANNEL_ID,
            panner_sensitivity: 20.0,
            remote_gain: 100,
            local_gain: 0,
            voice: VoiceActivityConfig::default(),
        }
    }
}

impl OrchestratorConfig {
    pub fn from_json(text: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.chunk_size == 0 {
            return Err(Error::Config("chunk_size must be positive".into()));
        }
        if self.progress_every_chunks == 0 {
            return Err(Error::Config("progress_every_chunks must be positive".into()));
        }
        if self.connection_check_interval_ms == 0 {
            return Err(Error::Config(
                "connection_check_interval_ms must be positive".into(),
            ));
        }
        if !(self.panner_sensitivity.is_finite() && self.panner_sensitivity > 0.0) {
            return Err(Error::Config("panner_sensitivity must be positive".into()));
        }
        if self.remote_gain > 100 || self.local_gain > 100 {
            return Err(Error::Config("gains are percentages (0..=100)".into()));
        }
        self.voice.validate()
    }

    pub fn connection_check_interval(&self) -> Duration {
        Duration::from_millis(self.connection_check_interval_ms)
    }

    pub fn negotiation_timeout(&self) -> Duration {
        Duration::from_millis(self.negotiation_timeout_ms)
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct VoiceActivityConfig {
    pub frame_interval_ms: u64,
    /// Number of most recent samples inspected per frame.
    pub window: usize,
    /// Deviations from the midpoint below this (0..=128) are treated as silence.
    pub noise_floor: u8,
    pub quantization_step: f32,
}

impl Default for VoiceActivityConfig {
    fn default() -> Self {
        Self {
            frame_interval_ms: 16,
            window: 1024,
            noise_floor: 4,
            quantization_step: 0.01,
        }
    }
}

impl VoiceActivityConfig {
    pub fn validate(&self) -> Result<()> {
        if self.window == 0 || self.frame_interval_ms == 0 {
            return Err(Error::Config(
                "voice window and frame interval must be positive".into(),
            ));
        }
        if !(self.quantization_step > 0.0 && self.quantization_step <= 1.0) {
            return Err(Error::Config(
                "voice quantization_step must be in (0, 1]".into(),
            ));
        }
        Ok(())
    }

    pub fn frame_interval(&self) -> Duration {
        Duration::from_millis(self.frame_interval_ms)
    }
}
