use bytes::Bytes;
use plaza_peer::{OrchestratorEvent, OutboundFile};
use serde_json::json;

use crate::integration::{connect_pair, init_tracing};
use crate::utils::{MockRelayHub, TRANSFER_TIMEOUT_MS, TestPeerConfig, wait_for_event};

#[tokio::test]
async fn test_peer_sends_file() {
    init_tracing();

    let payload: Bytes = (0..40_000u32).map(|i| (i % 251) as u8).collect();
    let config = TestPeerConfig {
        chunk_size: 16_384,
        progress_every_chunks: 1,
        ..TestPeerConfig::default()
    };

    let hub = MockRelayHub::new();
    let (a, mut b) = connect_pair(&hub, config, Some(OutboundFile::Memory(payload.clone())))
        .await
        .expect("Peers failed to connect");

    let options = json!({"name": "avatar.vrm", "kind": "avatar"});
    a.handle
        .start_file_transfer(b.peer_id, options.clone())
        .await
        .expect("Failed to start transfer");

    let accepted = wait_for_event(&mut b, TRANSFER_TIMEOUT_MS, |e| {
        matches!(e, OrchestratorEvent::FileTransferAccepted { .. })
    })
    .await
    .expect("Transfer was never accepted");
    assert_eq!(
        accepted,
        OrchestratorEvent::FileTransferAccepted {
            peer_id: a.peer_id,
            file_size: 40_000,
            options: options.clone(),
        }
    );

    let mut last_progress = 0.0;
    let received = loop {
        let event = wait_for_event(&mut b, TRANSFER_TIMEOUT_MS, |e| {
            matches!(
                e,
                OrchestratorEvent::FileTransferProgress { .. }
                    | OrchestratorEvent::FileReceived { .. }
            )
        })
        .await
        .expect("Transfer stalled");

        match event {
            OrchestratorEvent::FileTransferProgress { progress, .. } => {
                assert!(progress >= last_progress, "Progress went backwards");
                assert!(progress <= 1.0);
                last_progress = progress;
            }
            other => break other,
        }
    };

    assert!(last_progress > 0.0, "Expected progress before completion");
    let OrchestratorEvent::FileReceived {
        peer_id,
        data,
        options: received_options,
    } = received
    else {
        unreachable!();
    };
    assert_eq!(peer_id, a.peer_id);
    assert_eq!(received_options, options);
    assert_eq!(data.len(), payload.len());
    assert_eq!(data, payload, "Received bytes should match");

    a.close().await.expect("Failed to close peer");
    b.close().await.expect("Failed to close peer");
}
