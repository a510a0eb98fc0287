//! WebSocket relay that forwards signaling messages between participants.
//!
//! Each participant connects to `/signal/{peer_id}`; every JSON
//! `SignalingMessage` it sends is delivered to the socket of its `to` id.

mod relay_service;
mod ws_handler;

pub use relay_service::{RelayService, RouteError};
pub use ws_handler::ws_handler;

use axum::Router;
use axum::routing::get;
use tokio::net::TcpListener;
use tracing::info;

pub fn router(service: RelayService) -> Router {
    Router::new()
        .route("/signal/{peer_id}", get(ws_handler))
        .with_state(service)
}

/// Serves the relay on an already bound listener until the task is dropped.
pub async fn serve(listener: TcpListener) -> std::io::Result<()> {
    info!("Signaling relay listening on {}", listener.local_addr()?);
    axum::serve(listener, router(RelayService::new())).await
}
