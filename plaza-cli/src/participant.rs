use anyhow::{Context, Result};
use colored::*;
use plaza_core::PeerId;
use plaza_peer::{
    Orchestrator, OrchestratorConfig, OrchestratorEvent, OrchestratorHandle, OutboundFile,
    StaticRoster,
};
use serde_json::json;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{info, warn};

use crate::ws_relay::WsRelay;

pub struct JoinOptions {
    pub relay: String,
    pub id: PeerId,
    pub peers: Vec<PeerId>,
    pub send_file: Option<PathBuf>,
    pub out_dir: PathBuf,
    pub config: OrchestratorConfig,
}

/// Runs a headless participant until Ctrl-C.
pub async fn run(opts: JoinOptions) -> Result<()> {
    let (relay, signal_rx) = WsRelay::connect(&opts.relay, opts.id).await?;
    let roster = Arc::new(StaticRoster::new(opts.id, opts.peers.clone()));

    let (orchestrator, handle, mut events) =
        Orchestrator::new(opts.config, roster, Arc::new(relay), signal_rx)
            .context("Failed to start orchestrator")?;

    let file_name = opts
        .send_file
        .as_deref()
        .and_then(Path::file_name)
        .map(|name| name.to_string_lossy().into_owned());
    let orchestrator = match &opts.send_file {
        Some(path) => orchestrator.with_outbound_file(OutboundFile::Path(path.clone())),
        None => orchestrator,
    };
    let task = orchestrator.spawn();

    println!(
        "{} {} ({} peers)",
        "Joined as".green().bold(),
        opts.id,
        opts.peers.len()
    );

    loop {
        tokio::select! {
            event = events.recv() => {
                let Some(event) = event else { break };
                on_event(&handle, event, file_name.as_deref(), &opts.out_dir).await;
            }
            _ = tokio::signal::ctrl_c() => {
                println!("{}", "Leaving...".yellow());
                break;
            }
        }
    }

    handle.shutdown().await;
    task.await.context("Orchestrator task panicked")?;
    Ok(())
}

async fn on_event(
    handle: &OrchestratorHandle,
    event: OrchestratorEvent,
    file_name: Option<&str>,
    out_dir: &Path,
) {
    match event {
        OrchestratorEvent::ControlChannelOpened { peer_id } => {
            println!("{} {}", "connected".green(), peer_id);
        }

        OrchestratorEvent::FileChannelOpened { peer_id } => {
            if let Some(name) = file_name {
                println!("{} {} to {}", "offering".cyan(), name, peer_id);
                if let Err(e) = handle
                    .start_file_transfer(peer_id, json!({ "name": name }))
                    .await
                {
                    warn!("Could not offer {} to {}: {}", name, peer_id, e);
                }
            }
        }

        OrchestratorEvent::ControlMessageReceived { peer_id, message } => {
            println!("{} {:?}", format!("[{}]", peer_id).dimmed(), message);
        }

        OrchestratorEvent::FileTransferAccepted {
            peer_id, file_size, ..
        } => {
            println!("{} {} bytes from {}", "receiving".cyan(), file_size, peer_id);
        }

        OrchestratorEvent::FileTransferProgress { peer_id, progress } => {
            info!("{}: {:.0}%", peer_id, progress * 100.0);
        }

        OrchestratorEvent::FileReceived {
            peer_id,
            data,
            options,
        } => {
            let path = out_dir.join(received_file_name(peer_id, &options));
            match tokio::fs::write(&path, &data).await {
                Ok(()) => println!(
                    "{} {} ({} bytes)",
                    "saved".green().bold(),
                    path.display(),
                    data.len()
                ),
                Err(e) => println!("{} {}: {}", "failed to save".red(), path.display(), e),
            }
        }

        OrchestratorEvent::FileTransferFailed { peer_id, reason } => {
            println!("{} to {}: {}", "transfer failed".red(), peer_id, reason);
        }

        OrchestratorEvent::VoiceLevelChanged { .. } => {}

        OrchestratorEvent::PeerDisconnected { peer_id } => {
            println!("{} {}", "disconnected".yellow(), peer_id);
        }
    }
}

/// Only the final path component of a sender-supplied name is trusted.
fn received_file_name(peer_id: PeerId, options: &serde_json::Value) -> String {
    options
        .get("name")
        .and_then(|name| name.as_str())
        .and_then(|name| Path::new(name).file_name())
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| format!("{}.bin", peer_id))
}
