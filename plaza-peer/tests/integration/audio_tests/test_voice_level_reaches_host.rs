use bytes::Bytes;
use plaza_core::{ListenerPose, PeerId, Quat, SourceTransform, Vec3};
use plaza_peer::OrchestratorEvent;
use std::sync::Arc;
use std::time::Duration;
use webrtc::media::Sample;

use crate::integration::init_tracing;
use crate::utils::{
    CONNECTION_TIMEOUT_MS, FakeAudioBackend, MESSAGE_TIMEOUT_MS, MockRelayHub, TestPeer,
    TestPeerConfig, wait_for_channels, wait_for_event,
};

#[tokio::test]
async fn test_voice_level_reaches_host() {
    init_tracing();

    let hub = MockRelayHub::new();
    let backend = Arc::new(FakeAudioBackend::new(0.5));
    let (a_id, b_id) = (PeerId::new(), PeerId::new());

    let listening = TestPeerConfig {
        audio_backend: Some(backend.clone()),
        ..TestPeerConfig::default()
    };
    let mut a = TestPeer::spawn(&hub, a_id, vec![b_id], listening, None)
        .await
        .expect("Failed to spawn listener");
    let mut b = TestPeer::spawn(&hub, b_id, vec![a_id], TestPeerConfig::default(), None)
        .await
        .expect("Failed to spawn speaker");

    wait_for_channels(&mut a, &[b_id])
        .await
        .expect("Listener channels never opened");
    wait_for_channels(&mut b, &[a_id])
        .await
        .expect("Speaker channels never opened");

    // The microphone starts muted.
    b.handle.change_local_gain(100).await.expect("gain failed");
    let mic = b.handle.local_audio();
    let speaker = tokio::spawn(async move {
        let sample = Sample {
            data: Bytes::from_static(&[0xf8, 0xff, 0xfe]),
            duration: Duration::from_millis(20),
            ..Default::default()
        };
        let mut ticker = tokio::time::interval(Duration::from_millis(20));
        loop {
            ticker.tick().await;
            if let Err(e) = mic.write_sample(&sample).await {
                tracing::warn!("Sample write failed: {}", e);
            }
        }
    });

    let event = wait_for_event(&mut a, CONNECTION_TIMEOUT_MS, |e| {
        matches!(e, OrchestratorEvent::VoiceLevelChanged { peer_id, level }
            if *peer_id == b_id && *level > 0.0)
    })
    .await
    .expect("Voice level never reached the host");
    tracing::info!("Got {:?}", event);

    assert!(backend.decoders_created() >= 1);
    assert!(backend.frames_played() > 0);

    // Centered until a panner update arrives.
    let before = a
        .handle
        .panner_state(b_id)
        .await
        .expect("panner_state failed")
        .expect("Remote audio not attached");
    assert_eq!(before.position, Vec3::ZERO);

    let source = SourceTransform {
        position: Vec3::new(10.0, 0.0, 0.0),
        rotation: Quat::IDENTITY,
    };
    a.handle
        .set_panner_state(b_id, source, ListenerPose::default())
        .await
        .expect("set_panner_state failed");

    let after = a
        .handle
        .panner_state(b_id)
        .await
        .expect("panner_state failed")
        .expect("Remote audio not attached");
    assert_ne!(after, before);
    assert!(after.position.x > 0.0, "source should sit to the right");

    // Frames rendered after the update lean right.
    let deadline = tokio::time::Instant::now() + Duration::from_millis(MESSAGE_TIMEOUT_MS);
    loop {
        if let Some((left, right)) = backend.last_gains(b_id) {
            if right > left {
                break;
            }
        }
        assert!(
            tokio::time::Instant::now() < deadline,
            "Playback never panned right"
        );
        tokio::time::sleep(Duration::from_millis(20)).await;
    }

    speaker.abort();
    a.close().await.expect("Failed to close listener");
    b.close().await.expect("Failed to close speaker");
}
