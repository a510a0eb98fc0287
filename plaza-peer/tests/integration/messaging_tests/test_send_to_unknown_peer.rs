use plaza_core::{ControlMessage, PeerId};

use crate::integration::init_tracing;
use crate::utils::{MockRelayHub, TestPeer, TestPeerConfig};

#[tokio::test]
async fn test_send_to_unknown_peer() {
    init_tracing();

    let hub = MockRelayHub::new();
    let peer = TestPeer::spawn(&hub, PeerId::new(), vec![], TestPeerConfig::default(), None)
        .await
        .expect("Failed to spawn peer");

    // No connection: the message is dropped, not an error.
    peer.handle
        .send(PeerId::new(), ControlMessage::StopMoving)
        .await
        .expect("Send should be accepted");
    peer.handle
        .send_all(ControlMessage::StopMoving)
        .await
        .expect("Broadcast should be accepted");

    assert!(peer.handle.is_running());

    peer.close().await.expect("Failed to close peer");
}
