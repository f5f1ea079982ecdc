//! Testnet faucet service.
//!
//! # Architecture Overview
//!
//! ```text
//!                         ┌──────────────────────────────────────────────┐
//!                         │                 FAUCET                        │
//!   POST /api/claim       │  ┌────────┐    ┌──────────────────┐           │
//!   ──────────────────────┼─▶│  http  │───▶│ ClaimOrchestrator│           │
//!                         │  │ server │    └───┬─────┬────┬───┘           │
//!                         │  └────────┘        │     │    │               │
//!                         │                    ▼     │    ▼               │
//!                         │        ┌────────────┐    │  ┌──────────────┐  │     Verification
//!                         │        │  cooldown  │    │  │ HumanVerifier│──┼───▶ service
//!                         │        │  tracker   │    │  └──────────────┘  │
//!                         │        └────────────┘    ▼                    │
//!                         │              ┌──────────────────────┐         │
//!                         │              │ NetworkEndpoint × N  │─────────┼───▶ JSON-RPC nodes
//!                         │              └──────────────────────┘         │
//!                         │                                               │
//!                         │   config · observability · lifecycle          │
//!                         └──────────────────────────────────────────────┘
//! ```

use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;

use testnet_faucet::config::{resolve_config, ConfigOverrides};
use testnet_faucet::http::FaucetServer;
use testnet_faucet::lifecycle::{build_orchestrator, wait_for_signal, Shutdown};
use testnet_faucet::observability::{logging, metrics};

#[derive(Parser)]
#[command(name = "testnet-faucet")]
#[command(about = "Dispenses test currency on one or more networks", version)]
struct Cli {
    /// TOML configuration file. Defaults apply when omitted.
    #[arg(short, long, env = "FAUCET_CONFIG")]
    config: Option<PathBuf>,

    /// Listening port, overriding the configured bind address.
    #[arg(short, long, env = "PORT")]
    port: Option<u16>,

    /// RPC URL of the single configured network.
    #[arg(long, env = "RPC_URL")]
    rpc_url: Option<String>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let overrides = ConfigOverrides {
        port: cli.port,
        rpc_url: cli.rpc_url,
    };
    let config = resolve_config(cli.config.as_deref(), &overrides)?;

    logging::init_tracing(&config.observability.log_level);
    tracing::info!("testnet-faucet v{} starting", env!("CARGO_PKG_VERSION"));
    tracing::info!(
        bind_address = %config.listener.bind_address,
        networks = config.networks.len(),
        request_timeout_secs = config.security.request_timeout_secs,
        "Configuration loaded"
    );

    if config.observability.metrics_enabled {
        if let Ok(addr) = config.observability.metrics_address.parse() {
            metrics::init_metrics(addr);
        } else {
            tracing::error!(
                metrics_address = %config.observability.metrics_address,
                "Failed to parse metrics address"
            );
        }
    }

    let orchestrator = Arc::new(build_orchestrator(&config).await?);
    let shutdown = Shutdown::new();

    let pruner = if config.claims.prune_interval_secs > 0 {
        let tracker = orchestrator.cooldowns().clone();
        let interval = Duration::from_secs(config.claims.prune_interval_secs);
        Some(tokio::spawn(tracker.run_pruner(interval, shutdown.subscribe())))
    } else {
        None
    };

    let listener = TcpListener::bind(&config.listener.bind_address).await?;
    tracing::info!(address = %listener.local_addr()?, "Listening for connections");

    let server = FaucetServer::new(&config, orchestrator);
    let mut server_task = tokio::spawn(server.run(listener, shutdown.subscribe()));

    tokio::select! {
        _ = wait_for_signal() => {
            shutdown.trigger();
            server_task.await??;
        }
        result = &mut server_task => {
            // Server exited on its own; stop the pruner before reporting.
            shutdown.trigger();
            result??;
        }
    }

    if let Some(pruner) = pruner {
        pruner.await?;
    }

    tracing::info!("Shutdown complete");
    Ok(())
}
