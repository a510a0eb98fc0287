use std::time::Duration;

use crate::integration::{connect_pair, init_tracing};
use crate::utils::{MockRelayHub, TestPeerConfig, wait_for_available};

#[tokio::test]
async fn test_two_peers_connect() {
    init_tracing();

    let hub = MockRelayHub::new();
    let (a, b) = connect_pair(&hub, TestPeerConfig::default(), None)
        .await
        .expect("Peers failed to connect");

    wait_for_available(&a, b.peer_id)
        .await
        .expect("Remote never became available");
    wait_for_available(&b, a.peer_id)
        .await
        .expect("Remote never became available");

    assert_eq!(
        a.handle.status(b.peer_id).await.expect("status failed"),
        "connected/open"
    );

    // Several more checks run; a connected pair is never offered again.
    let offers_a = hub.count("offer", a.peer_id, b.peer_id).await;
    let offers_b = hub.count("offer", b.peer_id, a.peer_id).await;
    tokio::time::sleep(Duration::from_millis(1000)).await;

    assert_eq!(hub.count("offer", a.peer_id, b.peer_id).await, offers_a);
    assert_eq!(hub.count("offer", b.peer_id, a.peer_id).await, offers_b);
    assert!(
        offers_a + offers_b >= 1,
        "At least one side should have offered"
    );

    a.close().await.expect("Failed to close peer");
    b.close().await.expect("Failed to close peer");
}
