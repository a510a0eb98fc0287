use crate::integration::{init_tracing, spawn_mesh};
use crate::utils::{MockRelayHub, TestPeerConfig, wait_for_available, wait_for_channels};

#[tokio::test]
async fn test_three_peers_connect() {
    init_tracing();

    let hub = MockRelayHub::new();
    let mut peers = spawn_mesh(&hub, 3, TestPeerConfig::default())
        .await
        .expect("Failed to spawn peers");
    let ids: Vec<_> = peers.iter().map(|p| p.peer_id).collect();

    for peer in peers.iter_mut() {
        let remotes: Vec<_> = ids.iter().copied().filter(|id| *id != peer.peer_id).collect();
        wait_for_channels(peer, &remotes)
            .await
            .expect("Channels never opened");
    }

    for peer in &peers {
        for remote in ids.iter().copied().filter(|id| *id != peer.peer_id) {
            wait_for_available(peer, remote)
                .await
                .expect("Remote never became available");
        }
    }

    for peer in peers {
        peer.close().await.expect("Failed to close peer");
    }
}
