use plaza_core::{ListenerPose, SourceTransform, Vec3};

/// Source position and facing in listener space: forward is `-z`, right is `+x`.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct PannerState {
    pub position: Vec3,
    pub orientation: Vec3,
}

/// Maps world transforms into listener-relative panner parameters.
#[derive(Debug, Clone, Copy)]
pub struct PannerCalculator {
    sensitivity: f32,
}

impl PannerCalculator {
    pub fn new(sensitivity: f32) -> Self {
        Self { sensitivity }
    }

    pub fn sensitivity(&self) -> f32 {
        self.sensitivity
    }

    /// Pure; does not touch any audio node.
    pub fn calculate(&self, source: &SourceTransform, listener: &ListenerPose) -> PannerState {
        let (lx, lz) = horizontal_look(listener.look_at);
        // Rotates the horizontal plane so the look vector lands on -z.
        let to_listener_space =
            |v: Vec3| Vec3::new(-lz * v.x + lx * v.z, 0.0, -lx * v.x - lz * v.z);

        let relative = source.position - listener.position;
        let position = to_listener_space(relative);
        let position = Vec3::new(
            apply_falloff(position.x, self.sensitivity),
            apply_falloff(position.y, self.sensitivity),
            apply_falloff(position.z, self.sensitivity),
        );

        let facing = source.rotation.rotate(Vec3::FORWARD);
        PannerState {
            position,
            orientation: to_listener_space(facing),
        }
    }
}

/// Unit look direction on the horizontal plane; straight up or down falls
/// back to the canonical forward.
fn horizontal_look(look_at: Vec3) -> (f32, f32) {
    let flat = Vec3::new(look_at.x, 0.0, look_at.z).normalize_or_zero();
    if flat == Vec3::ZERO {
        (Vec3::FORWARD.x, Vec3::FORWARD.z)
    } else {
        (flat.x, flat.z)
    }
}

/// `(value / sensitivity)^2`: 1 at the sensitivity distance, growing with
/// distance on both sides of zero.
pub fn falloff_multiplier(value: f32, sensitivity: f32) -> f32 {
    let ratio = value / sensitivity;
    ratio * ratio
}

pub fn apply_falloff(value: f32, sensitivity: f32) -> f32 {
    value * falloff_multiplier(value, sensitivity)
}
