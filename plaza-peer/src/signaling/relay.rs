use crate::error::Result;
use async_trait::async_trait;
use plaza_core::SignalingMessage;

/// Outbound half of the external signaling relay.
///
/// The inbound half is an `mpsc::Receiver<SignalingMessage>` handed to the
/// orchestrator at start; dropping that receiver detaches from the relay.
#[async_trait]
pub trait SignalingRelay: Send + Sync {
    /// Deliver a negotiation message to `msg.to`.
    async fn send_signaling_message(&self, msg: SignalingMessage) -> Result<()>;
}
