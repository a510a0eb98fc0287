use axum::extract::ws::Message;
use dashmap::DashMap;
use plaza_core::{PeerId, SignalingMessage};
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{debug, warn};

#[derive(Debug, thiserror::Error)]
pub enum RouteError {
    #[error("malformed signaling message: {0}")]
    Malformed(#[from] serde_json::Error),

    #[error("socket of {socket} sent a message claiming to be from {claimed}")]
    SpoofedSender { socket: PeerId, claimed: PeerId },

    #[error("{0} is not connected")]
    UnknownRecipient(PeerId),
}

struct RelayInner {
    peers: DashMap<PeerId, mpsc::UnboundedSender<Message>>,
}

/// Registry of connected sockets, keyed by peer id.
#[derive(Clone)]
pub struct RelayService {
    inner: Arc<RelayInner>,
}

impl Default for RelayService {
    fn default() -> Self {
        Self::new()
    }
}

impl RelayService {
    pub fn new() -> Self {
        Self {
            inner: Arc::new(RelayInner {
                peers: DashMap::new(),
            }),
        }
    }

    /// A second socket with the same id takes over from the first.
    pub fn add_peer(&self, peer_id: PeerId, tx: mpsc::UnboundedSender<Message>) {
        if self.inner.peers.insert(peer_id, tx).is_some() {
            debug!("{} reconnected, replacing its previous socket", peer_id);
        }
    }

    /// Removes `peer_id` only if it is still registered with `tx`.
    pub fn remove_peer(&self, peer_id: &PeerId, tx: &mpsc::UnboundedSender<Message>) {
        self.inner
            .peers
            .remove_if(peer_id, |_, current| current.same_channel(tx));
    }

    pub fn is_connected(&self, peer_id: &PeerId) -> bool {
        self.inner.peers.contains_key(peer_id)
    }

    pub fn peer_count(&self) -> usize {
        self.inner.peers.len()
    }

    /// Forwards one text frame from the socket of `sender` to its `to` peer.
    ///
    /// The frame is relayed verbatim so fields this relay does not model
    /// survive the hop.
    pub fn route(&self, sender: PeerId, text: &str) -> Result<PeerId, RouteError> {
        let msg: SignalingMessage = serde_json::from_str(text)?;

        if msg.from != sender {
            return Err(RouteError::SpoofedSender {
                socket: sender,
                claimed: msg.from,
            });
        }

        let Some(peer) = self.inner.peers.get(&msg.to) else {
            return Err(RouteError::UnknownRecipient(msg.to));
        };

        if peer.send(Message::Text(text.to_owned().into())).is_err() {
            warn!("Socket of {} is closing, dropping {}", msg.to, msg.kind());
            return Err(RouteError::UnknownRecipient(msg.to));
        }

        debug!("Relayed {} from {} to {}", msg.kind(), sender, msg.to);
        Ok(msg.to)
    }
}
