use std::time::Duration;

use plaza_core::PeerId;

use crate::integration::init_tracing;
use crate::utils::{MockRelayHub, TestPeer, TestPeerConfig};

#[tokio::test]
async fn test_stranger_offers_ignored() {
    init_tracing();

    let hub = MockRelayHub::new();
    let (host_id, stranger_id) = (PeerId::new(), PeerId::new());

    // The host knows nobody; the stranger keeps offering to it.
    let host = TestPeer::spawn(&hub, host_id, vec![], TestPeerConfig::default(), None)
        .await
        .expect("Failed to spawn host");
    let stranger = TestPeer::spawn(
        &hub,
        stranger_id,
        vec![host_id],
        TestPeerConfig::default(),
        None,
    )
    .await
    .expect("Failed to spawn stranger");

    tokio::time::sleep(Duration::from_millis(1000)).await;

    assert!(hub.count("offer", stranger_id, host_id).await >= 1);
    assert_eq!(hub.count("answer", host_id, stranger_id).await, 0);
    assert_eq!(
        host.handle.status(stranger_id).await.expect("status failed"),
        ""
    );
    assert!(
        !host
            .handle
            .is_peer_available(stranger_id)
            .await
            .expect("availability failed")
    );

    host.close().await.expect("Failed to close host");
    stranger.close().await.expect("Failed to close stranger");
}
