use plaza_core::PeerId;
use std::sync::RwLock;

/// Source of truth for who else is in the space.
///
/// Membership is managed elsewhere; the orchestrator only reads it on every
/// connection check.
pub trait PeerRoster: Send + Sync {
    fn local_peer_id(&self) -> PeerId;

    /// Every known participant except the local one.
    fn other_peer_ids(&self) -> Vec<PeerId>;
}

/// Roster backed by a plain list that callers update in place.
pub struct StaticRoster {
    local: PeerId,
    others: RwLock<Vec<PeerId>>,
}

impl StaticRoster {
    pub fn new(local: PeerId, others: Vec<PeerId>) -> Self {
        Self {
            local,
            others: RwLock::new(others),
        }
    }

    pub fn set_peers(&self, peers: Vec<PeerId>) {
        let mut others = self.others.write().unwrap_or_else(|e| e.into_inner());
        *others = peers;
    }
}

impl PeerRoster for StaticRoster {
    fn local_peer_id(&self) -> PeerId {
        self.local
    }

    fn other_peer_ids(&self) -> Vec<PeerId> {
        let others = self.others.read().unwrap_or_else(|e| e.into_inner());
        others
            .iter()
            .copied()
            .filter(|id| *id != self.local)
            .collect()
    }
}
