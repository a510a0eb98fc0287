use crate::config::VoiceActivityConfig;
use plaza_core::PeerId;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, trace};

/// Midpoint of unsigned 8-bit time-domain data.
const SILENCE: u8 = 128;

/// Rolling window of the most recent samples of one stream, stored as
/// unsigned 8-bit time-domain data.
#[derive(Clone)]
pub struct Analyser {
    window: usize,
    samples: Arc<Mutex<VecDeque<u8>>>,
}

impl Analyser {
    pub fn new(window: usize) -> Self {
        Self {
            window,
            samples: Arc::new(Mutex::new(VecDeque::with_capacity(window))),
        }
    }

    /// Feeds PCM in `-1.0..=1.0`.
    pub fn write_samples(&self, pcm: &[f32]) {
        let mut samples = self.samples.lock().unwrap_or_else(|e| e.into_inner());
        for s in pcm {
            if samples.len() == self.window {
                samples.pop_front();
            }
            samples.push_back(to_byte(*s));
        }
    }

    /// Copies the window into `out`, left-padded with silence.
    pub fn snapshot(&self, out: &mut Vec<u8>) {
        out.clear();
        let samples = self.samples.lock().unwrap_or_else(|e| e.into_inner());
        out.resize(self.window - samples.len(), SILENCE);
        out.extend(samples.iter().copied());
    }
}

fn to_byte(sample: f32) -> u8 {
    (f32::from(SILENCE) * (1.0 + sample.clamp(-1.0, 1.0))).clamp(0.0, 255.0) as u8
}

/// Mean absolute deviation from silence, ignoring deviations under the noise
/// floor, normalized to `0.0..=1.0`.
pub fn measure_level(data: &[u8], noise_floor: u8) -> f32 {
    if data.is_empty() {
        return 0.0;
    }
    let sum: u32 = data
        .iter()
        .map(|d| u32::from(d.abs_diff(SILENCE)))
        .filter(|dev| *dev >= u32::from(noise_floor))
        .sum();
    (sum as f32 / data.len() as f32 / f32::from(SILENCE)).min(1.0)
}

/// Quantizes readings and reports only changes.
#[derive(Debug)]
pub struct VoiceLevelTracker {
    step: f32,
    last_steps: i64,
}

impl VoiceLevelTracker {
    pub fn new(step: f32) -> Self {
        Self {
            step,
            last_steps: 0,
        }
    }

    pub fn observe(&mut self, level: f32) -> Option<f32> {
        let steps = (level / self.step).round() as i64;
        if steps == self.last_steps {
            return None;
        }
        self.last_steps = steps;
        Some((steps as f32 * self.step).clamp(0.0, 1.0))
    }
}

/// Periodic voice level sampler for one remote stream.
///
/// The loop reads the stop flag before each frame, so no level is reported
/// after [`destroy`](Self::destroy) returns and the current frame finishes.
pub struct VoiceActivityEmitter {
    stopped: Arc<AtomicBool>,
    task: Option<JoinHandle<()>>,
}

impl VoiceActivityEmitter {
    pub fn start<F>(peer_id: PeerId, analyser: Analyser, config: &VoiceActivityConfig, on_level: F) -> Self
    where
        F: Fn(f32) + Send + 'static,
    {
        let stopped = Arc::new(AtomicBool::new(false));
        let flag = stopped.clone();
        let interval = config.frame_interval();
        let noise_floor = config.noise_floor;
        let step = config.quantization_step;

        let task = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
            let mut tracker = VoiceLevelTracker::new(step);
            let mut buf = Vec::new();

            loop {
                if flag.load(Ordering::Acquire) {
                    break;
                }
                analyser.snapshot(&mut buf);
                if let Some(level) = tracker.observe(measure_level(&buf, noise_floor)) {
                    trace!("Voice level of {} changed to {:.2}", peer_id, level);
                    on_level(level);
                }
                ticker.tick().await;
            }
            debug!("Voice activity loop for {} stopped", peer_id);
        });

        Self {
            stopped,
            task: Some(task),
        }
    }

    pub fn is_stopped(&self) -> bool {
        self.stopped.load(Ordering::Acquire)
    }

    pub fn destroy(&mut self) {
        self.stopped.store(true, Ordering::Release);
        self.task.take();
    }
}

impl Drop for VoiceActivityEmitter {
    fn drop(&mut self) {
        self.destroy();
    }
}
