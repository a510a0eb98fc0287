use async_trait::async_trait;
use plaza_core::{PeerId, SignalingMessage};
use plaza_peer::SignalingRelay;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{Mutex, mpsc};

/// In-memory relay that routes every message to the inbox of `msg.to`.
///
/// Every routed message is also stored so tests can count what was sent.
#[derive(Clone, Default)]
pub struct MockRelayHub {
    inboxes: Arc<Mutex<HashMap<PeerId, mpsc::Sender<SignalingMessage>>>>,
    signals: Arc<Mutex<Vec<SignalingMessage>>>,
}

impl MockRelayHub {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a peer and returns the receiver its orchestrator reads from.
    pub async fn register(&self, peer_id: PeerId) -> mpsc::Receiver<SignalingMessage> {
        let (tx, rx) = mpsc::channel(256);
        self.inboxes.lock().await.insert(peer_id, tx);
        rx
    }

    /// Injects a message as if some peer had sent it.
    pub async fn inject(&self, msg: SignalingMessage) {
        let _ = self.send_signaling_message(msg).await;
    }

    pub async fn count(&self, kind: &str, from: PeerId, to: PeerId) -> usize {
        self.signals
            .lock()
            .await
            .iter()
            .filter(|s| s.kind() == kind && s.from == from && s.to == to)
            .count()
    }
}

#[async_trait]
impl SignalingRelay for MockRelayHub {
    async fn send_signaling_message(&self, msg: SignalingMessage) -> plaza_peer::Result<()> {
        tracing::debug!("[MockRelay] {} {} -> {}", msg.kind(), msg.from, msg.to);

        self.signals.lock().await.push(msg.clone());

        let inbox = self.inboxes.lock().await.get(&msg.to).cloned();
        if let Some(inbox) = inbox {
            let _ = inbox.send(msg).await;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_routes_to_recipient_only() {
        let hub = MockRelayHub::new();
        let (a, b, c) = (PeerId::new(), PeerId::new(), PeerId::new());
        let mut b_rx = hub.register(b).await;
        let mut c_rx = hub.register(c).await;

        hub.inject(SignalingMessage::offer(a, b, "v=0".into())).await;

        let msg = b_rx.recv().await.unwrap();
        assert_eq!(msg.from, a);
        assert!(c_rx.try_recv().is_err());
        assert_eq!(hub.count("offer", a, b).await, 1);
    }

    #[tokio::test]
    async fn test_unknown_recipient_is_recorded_but_dropped() {
        let hub = MockRelayHub::new();
        let (a, b) = (PeerId::new(), PeerId::new());

        hub.inject(SignalingMessage::answer(a, b, "v=0".into())).await;

        assert_eq!(hub.count("answer", a, b).await, 1);
    }
}
