use plaza_core::ControlMessage;
use plaza_peer::OrchestratorEvent;

use crate::integration::{init_tracing, spawn_mesh};
use crate::utils::{
    MESSAGE_TIMEOUT_MS, MockRelayHub, TestPeerConfig, wait_for_channels, wait_for_event,
};

#[tokio::test]
async fn test_broadcast_reaches_everyone() {
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

    let sender = ids[0];
    peers[0]
        .handle
        .send_all(ControlMessage::StopMoving)
        .await
        .expect("Failed to broadcast");

    for peer in peers.iter_mut().skip(1) {
        let event = wait_for_event(peer, MESSAGE_TIMEOUT_MS, |e| {
            matches!(e, OrchestratorEvent::ControlMessageReceived { .. })
        })
        .await
        .expect("Broadcast never arrived");

        assert_eq!(
            event,
            OrchestratorEvent::ControlMessageReceived {
                peer_id: sender,
                message: ControlMessage::StopMoving,
            }
        );
    }

    for peer in peers {
        peer.close().await.expect("Failed to close peer");
    }
}
