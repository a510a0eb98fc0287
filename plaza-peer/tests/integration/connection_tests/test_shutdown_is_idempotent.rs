use plaza_core::{ControlMessage, PeerId};

use crate::integration::{connect_pair, init_tracing};
use crate::utils::{MockRelayHub, TestPeerConfig};

#[tokio::test]
async fn test_shutdown_is_idempotent() {
    init_tracing();

    let hub = MockRelayHub::new();
    let (a, b) = connect_pair(&hub, TestPeerConfig::default(), None)
        .await
        .expect("Peers failed to connect");

    let handle = a.handle.clone();
    handle.shutdown().await;
    handle.shutdown().await;

    // Waits for the task itself; a third shutdown on the way is harmless.
    a.close().await.expect("Failed to close peer");

    assert!(!handle.is_running());
    assert!(handle.local_audio().is_released());
    assert!(handle.status(PeerId::new()).await.is_err());
    assert!(handle.send_all(ControlMessage::StopMoving).await.is_err());

    b.close().await.expect("Failed to close peer");
}
