use anyhow::{Context, Result};
use async_trait::async_trait;
use futures::{SinkExt, StreamExt};
use plaza_core::{PeerId, SignalingMessage};
use plaza_peer::SignalingRelay;
use tokio::sync::mpsc;
use tokio_tungstenite::tungstenite::Message;
use tracing::{debug, info, warn};

/// `SignalingRelay` over a WebSocket connection to `plaza-relay`.
pub struct WsRelay {
    outbound: mpsc::UnboundedSender<Message>,
}

impl WsRelay {
    /// Connects to `{base}/{peer_id}` and returns the relay together with
    /// the inbound stream the orchestrator consumes.
    pub async fn connect(
        base: &str,
        peer_id: PeerId,
    ) -> Result<(Self, mpsc::Receiver<SignalingMessage>)> {
        let url = format!("{}/{}", base.trim_end_matches('/'), peer_id);
        let (socket, _) = tokio_tungstenite::connect_async(url.as_str())
            .await
            .with_context(|| format!("Failed to connect to relay at {}", url))?;
        info!("Connected to relay at {}", url);

        let (mut sink, mut stream) = socket.split();
        let (outbound, mut outbound_rx) = mpsc::unbounded_channel::<Message>();
        let (inbound_tx, inbound_rx) = mpsc::channel(100);

        tokio::spawn(async move {
            while let Some(msg) = outbound_rx.recv().await {
                if let Err(e) = sink.send(msg).await {
                    warn!("Relay socket write failed: {}", e);
                    break;
                }
            }
        });

        tokio::spawn(async move {
            while let Some(msg) = stream.next().await {
                match msg {
                    Ok(Message::Text(text)) => {
                        match serde_json::from_str::<SignalingMessage>(text.as_str()) {
                            Ok(signal) => {
                                if inbound_tx.send(signal).await.is_err() {
                                    debug!("Orchestrator detached from relay");
                                    break;
                                }
                            }
                            Err(e) => warn!("Ignoring malformed relay message: {}", e),
                        }
                    }
                    Ok(Message::Close(_)) => break,
                    Ok(_) => {}
                    Err(e) => {
                        warn!("Relay socket read failed: {}", e);
                        break;
                    }
                }
            }
            info!("Relay connection closed");
        });

        Ok((Self { outbound }, inbound_rx))
    }
}

#[async_trait]
impl SignalingRelay for WsRelay {
    async fn send_signaling_message(&self, msg: SignalingMessage) -> plaza_peer::Result<()> {
        let json = serde_json::to_string(&msg)?;
        self.outbound
            .send(Message::Text(json.into()))
            .map_err(|_| plaza_peer::Error::Signaling("relay connection closed".into()))
    }
}
