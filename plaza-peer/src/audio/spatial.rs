use super::panner::PannerState;
use plaza_core::Vec3;
use std::f32::consts::FRAC_PI_2;

/// Playback gain as a percentage, clamped to 0..=100.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GainStage {
    percent: u8,
}

impl GainStage {
    pub fn new(percent: u8) -> Self {
        Self {
            percent: percent.min(100),
        }
    }

    pub fn percent(&self) -> u8 {
        self.percent
    }

    pub fn linear(&self) -> f32 {
        f32::from(self.percent) / 100.0
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SoundCone {
    pub inner_angle: f32,
    pub outer_angle: f32,
    pub outer_gain: f32,
}

impl Default for SoundCone {
    fn default() -> Self {
        Self {
            inner_angle: 60.0,
            outer_angle: 120.0,
            outer_gain: 0.6,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct StereoFrame {
    pub left: Vec<f32>,
    pub right: Vec<f32>,
}

/// Equal-power panner with inverse distance attenuation and a directional
/// cone, listener fixed at the origin looking down `-z`.
#[derive(Debug, Clone)]
pub struct SpatialNode {
    state: PannerState,
    cone: SoundCone,
    ref_distance: f32,
    rolloff_factor: f32,
}

impl Default for SpatialNode {
    fn default() -> Self {
        Self {
            state: PannerState {
                position: Vec3::ZERO,
                orientation: Vec3::FORWARD,
            },
            cone: SoundCone::default(),
            ref_distance: 1.0,
            rolloff_factor: 1.0,
        }
    }
}

impl SpatialNode {
    pub fn set_state(&mut self, state: PannerState) {
        self.state = state;
    }

    pub fn state(&self) -> PannerState {
        self.state
    }

    /// `(left, right)` multipliers for the current state.
    pub fn channel_gains(&self) -> (f32, f32) {
        let (left, right) = equal_power(azimuth(self.state.position));
        let attenuation = self.distance_gain() * self.cone_gain();
        (left * attenuation, right * attenuation)
    }

    pub fn render(&self, mono: &[f32], gain: GainStage) -> StereoFrame {
        let (left, right) = self.channel_gains();
        let g = gain.linear();
        StereoFrame {
            left: mono.iter().map(|s| s * left * g).collect(),
            right: mono.iter().map(|s| s * right * g).collect(),
        }
    }

    fn distance_gain(&self) -> f32 {
        let distance = self.state.position.length().max(self.ref_distance);
        self.ref_distance / (self.ref_distance + self.rolloff_factor * (distance - self.ref_distance))
    }

    fn cone_gain(&self) -> f32 {
        let facing = self.state.orientation.normalize_or_zero();
        let to_listener = (-self.state.position).normalize_or_zero();
        if facing == Vec3::ZERO || to_listener == Vec3::ZERO {
            return 1.0;
        }

        let angle = facing.dot(to_listener).clamp(-1.0, 1.0).acos().to_degrees();
        let inner = self.cone.inner_angle / 2.0;
        let outer = self.cone.outer_angle / 2.0;
        if angle <= inner {
            1.0
        } else if angle >= outer {
            self.cone.outer_gain
        } else {
            let x = (angle - inner) / (outer - inner);
            (1.0 - x) + self.cone.outer_gain * x
        }
    }
}

/// Degrees, 0 ahead, positive to the right, in `-180..=180`.
fn azimuth(position: Vec3) -> f32 {
    let flat = Vec3::new(position.x, 0.0, position.z).normalize_or_zero();
    if flat == Vec3::ZERO {
        return 0.0;
    }
    flat.x.atan2(-flat.z).to_degrees()
}

fn equal_power(azimuth: f32) -> (f32, f32) {
    // Sources behind the listener mirror onto the front half-plane.
    let folded = if azimuth < -90.0 {
        -180.0 - azimuth
    } else if azimuth > 90.0 {
        180.0 - azimuth
    } else {
        azimuth
    };
    let x = (folded + 90.0) / 180.0;
    ((x * FRAC_PI_2).cos(), (x * FRAC_PI_2).sin())
}
