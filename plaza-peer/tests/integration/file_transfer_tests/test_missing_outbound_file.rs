use plaza_peer::{OrchestratorEvent, OutboundFile};
use serde_json::json;

use crate::integration::{connect_pair, init_tracing};
use crate::utils::{
    MockRelayHub, TRANSFER_TIMEOUT_MS, TestPeerConfig, expect_no_event, wait_for_event,
};

#[tokio::test]
async fn test_missing_outbound_file() {
    init_tracing();

    let missing = std::env::temp_dir().join(format!("plaza-missing-{}.bin", uuid_suffix()));
    let hub = MockRelayHub::new();
    let (mut a, mut b) = connect_pair(
        &hub,
        TestPeerConfig::default(),
        Some(OutboundFile::Path(missing)),
    )
    .await
    .expect("Peers failed to connect");

    let remote = b.peer_id;
    a.handle
        .start_file_transfer(remote, json!({}))
        .await
        .expect("Failed to submit transfer");

    let failed = wait_for_event(&mut a, TRANSFER_TIMEOUT_MS, |e| {
        matches!(e, OrchestratorEvent::FileTransferFailed { .. })
    })
    .await
    .expect("Failure was never reported");
    assert_eq!(failed.peer_id(), remote);

    // Nothing was announced to the other side.
    expect_no_event(&mut b, 500, |e| {
        matches!(e, OrchestratorEvent::FileTransferAccepted { .. })
    })
    .await
    .expect("Receiver should not have seen a transfer");

    a.close().await.expect("Failed to close peer");
    b.close().await.expect("Failed to close peer");
}

fn uuid_suffix() -> String {
    plaza_core::PeerId::new().to_string()
}
