pub mod audio_tests;
pub mod file_transfer_tests;
pub mod messaging_tests;
pub mod multi_peer_tests;

use anyhow::Result;
use plaza_core::PeerId;
use plaza_peer::OutboundFile;
use tracing::Level;

use crate::utils::{MockRelayHub, TestPeer, TestPeerConfig, wait_for_channels};

pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_max_level(Level::DEBUG)
        .with_test_writer()
        .try_init();
}

/// Spawns one peer per id, each with every other id in its roster.
pub async fn spawn_mesh(
    hub: &MockRelayHub,
    count: usize,
    config: TestPeerConfig,
) -> Result<Vec<TestPeer>> {
    let ids: Vec<PeerId> = (0..count).map(|_| PeerId::new()).collect();
    let mut peers = Vec::with_capacity(count);

    for id in &ids {
        let others = ids.iter().copied().filter(|other| other != id).collect();
        peers.push(TestPeer::spawn(hub, *id, others, config.clone(), None).await?);
    }
    Ok(peers)
}

/// Spawns two peers that know each other and waits until both sides have
/// their control and file channels open.
///
/// `first_file` becomes the first peer's outbound file.
pub async fn connect_pair(
    hub: &MockRelayHub,
    config: TestPeerConfig,
    first_file: Option<OutboundFile>,
) -> Result<(TestPeer, TestPeer)> {
    let (a_id, b_id) = (PeerId::new(), PeerId::new());

    let mut a = TestPeer::spawn(hub, a_id, vec![b_id], config.clone(), first_file).await?;
    let mut b = TestPeer::spawn(hub, b_id, vec![a_id], config, None).await?;

    wait_for_channels(&mut a, &[b_id]).await?;
    wait_for_channels(&mut b, &[a_id]).await?;

    Ok((a, b))
}
