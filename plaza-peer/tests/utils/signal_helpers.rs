use anyhow::{Context, Result, bail};
use plaza_core::PeerId;
use plaza_peer::OrchestratorEvent;
use std::collections::HashSet;
use std::time::Duration;

use super::test_peer::TestPeer;

/// Timeout for both sides to finish offer/answer and open the control channel (ms).
pub const CONNECTION_TIMEOUT_MS: u64 = 15000;

/// Timeout for a single message to arrive over an open channel (ms).
pub const MESSAGE_TIMEOUT_MS: u64 = 5000;

/// Timeout for a whole file transfer (ms).
pub const TRANSFER_TIMEOUT_MS: u64 = 10000;

/// Waits for the first event matching `pred`, skipping the rest.
pub async fn wait_for_event<F>(
    peer: &mut TestPeer,
    timeout_ms: u64,
    mut pred: F,
) -> Result<OrchestratorEvent>
where
    F: FnMut(&OrchestratorEvent) -> bool,
{
    let deadline = tokio::time::Instant::now() + Duration::from_millis(timeout_ms);

    loop {
        let event = tokio::time::timeout_at(deadline, peer.events.recv())
            .await
            .with_context(|| format!("Timed out waiting for event on {}", peer.peer_id))?
            .context("Event channel closed")?;

        if pred(&event) {
            return Ok(event);
        }
        tracing::trace!("[SignalHelper] skipping {:?}", event);
    }
}

/// Waits until `peer` reports both channels to every peer in `remotes` as
/// open, in any order.
pub async fn wait_for_channels(peer: &mut TestPeer, remotes: &[PeerId]) -> Result<()> {
    let mut pending: HashSet<(PeerId, bool)> = remotes
        .iter()
        .flat_map(|id| [(*id, true), (*id, false)])
        .collect();

    while !pending.is_empty() {
        let event = wait_for_event(peer, CONNECTION_TIMEOUT_MS, |e| {
            matches!(
                e,
                OrchestratorEvent::ControlChannelOpened { .. }
                    | OrchestratorEvent::FileChannelOpened { .. }
            )
        })
        .await?;

        let is_control = matches!(event, OrchestratorEvent::ControlChannelOpened { .. });
        pending.remove(&(event.peer_id(), is_control));
    }
    Ok(())
}

/// Polls until `peer` considers `remote` available.
pub async fn wait_for_available(peer: &TestPeer, remote: PeerId) -> Result<()> {
    let deadline = tokio::time::Instant::now() + Duration::from_millis(CONNECTION_TIMEOUT_MS);

    while tokio::time::Instant::now() < deadline {
        if peer.handle.is_peer_available(remote).await? {
            return Ok(());
        }
        tokio::time::sleep(Duration::from_millis(100)).await;
    }
    bail!("{} never became available to {}", remote, peer.peer_id)
}

/// Asserts that no event matching `pred` arrives within `window_ms`.
pub async fn expect_no_event<F>(peer: &mut TestPeer, window_ms: u64, pred: F) -> Result<()>
where
    F: FnMut(&OrchestratorEvent) -> bool,
{
    match wait_for_event(peer, window_ms, pred).await {
        Ok(event) => bail!("Unexpected event on {}: {:?}", peer.peer_id, event),
        Err(_) => Ok(()),
    }
}
