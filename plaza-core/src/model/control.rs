use crate::model::geometry::Vec3;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Rotation {
    pub y: f32,
}

/// Application intent carried over the control channel as JSON text.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "cmd", rename_all = "camelCase")]
pub enum ControlMessage {
    Move {
        position: Vec3,
    },
    Rotate {
        rotation: Rotation,
    },
    StopMoving,
    ShowAvatar {
        #[serde(rename = "type")]
        kind: String,
        position: Vec3,
    },
}

impl ControlMessage {
    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }

    pub fn from_json(text: &str) -> serde_json::Result<Self> {
        serde_json::from_str(text)
    }
}
