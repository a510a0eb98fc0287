mod participant;
mod ws_relay;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use colored::*;
use plaza_core::PeerId;
use plaza_peer::OrchestratorConfig;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

use crate::participant::JoinOptions;

#[derive(Parser)]
#[command(name = "plaza", about = "Peer-to-peer presence for shared 3D spaces")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the signaling relay.
    Relay {
        #[arg(long, default_value = "0.0.0.0:8080")]
        bind: String,
    },

    /// Join as a headless participant.
    Join {
        /// Relay base URL, e.g. ws://localhost:8080/signal
        #[arg(long)]
        relay: String,

        #[arg(long)]
        id: PeerId,

        /// Other participants; repeat for each.
        #[arg(long = "peer")]
        peers: Vec<PeerId>,

        /// Offered to every peer once its file channel opens.
        #[arg(long)]
        send_file: Option<PathBuf>,

        #[arg(long, default_value = ".")]
        out_dir: PathBuf,

        /// JSON orchestrator configuration.
        #[arg(long)]
        config: Option<PathBuf>,

        #[arg(long)]
        check_interval_ms: Option<u64>,

        /// Skip STUN and use host candidates only.
        #[arg(long)]
        no_stun: bool,
    },
}

fn init_tracing() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();
}

fn load_config(
    path: Option<&PathBuf>,
    check_interval_ms: Option<u64>,
    no_stun: bool,
) -> Result<OrchestratorConfig> {
    let mut config = match path {
        Some(path) => {
            let text = std::fs::read_to_string(path)
                .with_context(|| format!("Failed to read {}", path.display()))?;
            OrchestratorConfig::from_json(&text)
                .with_context(|| format!("Invalid config in {}", path.display()))?
        }
        None => OrchestratorConfig::default(),
    };

    if let Some(ms) = check_interval_ms {
        config.connection_check_interval_ms = ms;
    }
    if no_stun {
        config.ice_servers.clear();
    }
    config.validate()?;
    Ok(config)
}

#[tokio::main]
async fn main() -> Result<()> {
    init_tracing();

    match Cli::parse().command {
        Commands::Relay { bind } => {
            let listener = tokio::net::TcpListener::bind(&bind)
                .await
                .with_context(|| format!("Failed to bind {}", bind))?;
            println!("{} {}", "Relay listening on".green().bold(), bind);
            plaza_relay::serve(listener).await?;
        }

        Commands::Join {
            relay,
            id,
            peers,
            send_file,
            out_dir,
            config,
            check_interval_ms,
            no_stun,
        } => {
            let config = load_config(config.as_ref(), check_interval_ms, no_stun)?;
            if let Some(path) = &send_file {
                if !path.is_file() {
                    anyhow::bail!("{} is not a file", path.display());
                }
            }
            tokio::fs::create_dir_all(&out_dir)
                .await
                .with_context(|| format!("Failed to create {}", out_dir.display()))?;

            participant::run(JoinOptions {
                relay,
                id,
                peers,
                send_file,
                out_dir,
                config,
            })
            .await?;
        }
    }

    Ok(())
}
