use plaza_peer::OrchestratorEvent;

use crate::integration::{connect_pair, init_tracing};
use crate::utils::{CONNECTION_TIMEOUT_MS, MockRelayHub, TestPeerConfig, wait_for_event};

#[tokio::test]
async fn test_peer_leaves_roster() {
    init_tracing();

    let hub = MockRelayHub::new();
    let (mut a, b) = connect_pair(&hub, TestPeerConfig::default(), None)
        .await
        .expect("Peers failed to connect");

    a.roster.set_peers(vec![]);

    let remote = b.peer_id;
    wait_for_event(&mut a, CONNECTION_TIMEOUT_MS, |e| {
        matches!(e, OrchestratorEvent::PeerDisconnected { peer_id } if *peer_id == remote)
    })
    .await
    .expect("Departed peer was never dropped");

    assert_eq!(a.handle.status(remote).await.expect("status failed"), "");

    a.close().await.expect("Failed to close peer");
    b.close().await.expect("Failed to close peer");
}
