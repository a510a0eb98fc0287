use plaza_core::{ControlMessage, Rotation, Vec3};
use plaza_peer::OrchestratorEvent;

use crate::integration::{connect_pair, init_tracing};
use crate::utils::{MESSAGE_TIMEOUT_MS, MockRelayHub, TestPeerConfig, wait_for_event};

#[tokio::test]
async fn test_peer_sends_message() {
    init_tracing();

    let hub = MockRelayHub::new();
    let (mut a, mut b) = connect_pair(&hub, TestPeerConfig::default(), None)
        .await
        .expect("Peers failed to connect");

    let message = ControlMessage::Move {
        position: Vec3::new(1.5, 0.0, -3.0),
    };
    a.handle
        .send(b.peer_id, message.clone())
        .await
        .expect("Failed to send message");

    let sender = a.peer_id;
    let event = wait_for_event(&mut b, MESSAGE_TIMEOUT_MS, |e| {
        matches!(e, OrchestratorEvent::ControlMessageReceived { .. })
    })
    .await
    .expect("Message never arrived");

    assert_eq!(
        event,
        OrchestratorEvent::ControlMessageReceived {
            peer_id: sender,
            message,
        }
    );

    // And back the other way.
    b.handle
        .send(
            sender,
            ControlMessage::Rotate {
                rotation: Rotation { y: 1.25 },
            },
        )
        .await
        .expect("Failed to send reply");

    let reply = wait_for_event(&mut a, MESSAGE_TIMEOUT_MS, |e| {
        matches!(e, OrchestratorEvent::ControlMessageReceived { .. })
    })
    .await
    .expect("Reply never arrived");

    let OrchestratorEvent::ControlMessageReceived { message, .. } = reply else {
        unreachable!();
    };
    assert_eq!(
        message,
        ControlMessage::Rotate {
            rotation: Rotation { y: 1.25 }
        }
    );

    a.close().await.expect("Failed to close peer");
    b.close().await.expect("Failed to close peer");
}
