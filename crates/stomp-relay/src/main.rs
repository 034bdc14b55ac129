//! Process entry point: parses CLI args, loads configuration, wires the
//! relay controller to the default tokio TCP client, and runs until a
//! shutdown signal arrives.

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use stomp_relay_core::RelayController;
use stomp_relay_transport::TokioTcpClient;
use tracing::info;

mod cli;
mod config_loader;
mod logging;

use cli::Cli;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    logging::init(&cli.log_level);

    let base = config_loader::load(cli.config.as_deref())?;
    let config = cli.apply_overrides(base);
    config.validate().map_err(|reason| anyhow::anyhow!(reason))?;

    let remote_addr: SocketAddr = format!("{}:{}", config.relay_host, config.relay_port)
        .parse()
        .with_context(|| format!("invalid relay address {}:{}", config.relay_host, config.relay_port))?;

    let tcp_client = Arc::new(TokioTcpClient::new(remote_addr));
    let (controller, mut outbound_rx) = RelayController::new(config, tcp_client)?;

    controller.start().await;
    info!(%remote_addr, "relay controller started");

    // The binary ships no application-facing transport of its own; drain the
    // outbound channel so the controller never blocks on a full queue.
    tokio::spawn(async move {
        while let Some(frame) = outbound_rx.recv().await {
            tracing::trace!(headers = ?frame.headers, "outbound frame ready for delivery");
        }
    });

    tokio::signal::ctrl_c().await.context("waiting for shutdown signal")?;
    info!("shutdown signal received");
    controller.shutdown().await;

    Ok(())
}
