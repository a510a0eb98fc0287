use crate::model::peer::PeerId;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IceServerConfig {
    pub urls: Vec<String>,
    pub username: Option<String>,
    pub credential: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SdpType {
    Offer,
    Answer,
    Pranswer,
    Rollback,
}

/// Session description in the shape browsers produce with `toJSON()`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionDescription {
    #[serde(rename = "type")]
    pub sdp_type: SdpType,
    pub sdp: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IceCandidateInit {
    pub candidate: String,
    #[serde(default)]
    pub sdp_mid: Option<String>,
    #[serde(default, rename = "sdpMLineIndex")]
    pub sdp_m_line_index: Option<u16>,
    #[serde(default)]
    pub username_fragment: Option<String>,
}

/// Negotiation message exchanged through the signaling relay.
///
/// Wire shape: `{"messageType": "offer" | "answer" | "icecandidate", "from": .., "to": .., <payload>}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SignalingMessage {
    pub from: PeerId,
    pub to: PeerId,
    #[serde(flatten)]
    pub payload: SignalPayload,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "messageType", rename_all = "lowercase")]
pub enum SignalPayload {
    Offer {
        offer: SessionDescription,
    },
    Answer {
        answer: SessionDescription,
    },
    IceCandidate {
        #[serde(rename = "rtcIceCandidateInit")]
        candidate: IceCandidateInit,
    },
}

impl SignalingMessage {
    pub fn offer(from: PeerId, to: PeerId, sdp: String) -> Self {
        Self {
            from,
            to,
            payload: SignalPayload::Offer {
                offer: SessionDescription {
                    sdp_type: SdpType::Offer,
                    sdp,
                },
            },
        }
    }

    pub fn answer(from: PeerId, to: PeerId, sdp: String) -> Self {
        Self {
            from,
            to,
            payload: SignalPayload::Answer {
                answer: SessionDescription {
                    sdp_type: SdpType::Answer,
                    sdp,
                },
            },
        }
    }

    pub fn ice_candidate(from: PeerId, to: PeerId, candidate: IceCandidateInit) -> Self {
        Self {
            from,
            to,
            payload: SignalPayload::IceCandidate { candidate },
        }
    }

    pub fn kind(&self) -> &'static str {
        match self.payload {
            SignalPayload::Offer { .. } => "offer",
            SignalPayload::Answer { .. } => "answer",
            SignalPayload::IceCandidate { .. } => "icecandidate",
        }
    }
}
