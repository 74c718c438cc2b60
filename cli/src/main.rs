// meetpoint — rendezvous and fallback-relay server
//
// Runs the WebSocket signaling transport and the TCP directory transport
// concurrently until either fails or the process is interrupted.

use anyhow::{Context, Result};
use clap::Parser;
use meetpoint_core::config::{DEFAULT_DIRECTORY_PORT, DEFAULT_HOST, DEFAULT_SIGNAL_PORT};
use meetpoint_core::{DirectoryServer, ServerConfig, SignalServer};
use tracing::info;

#[derive(Parser)]
#[command(name = "meetpoint")]
#[command(about = "Meetpoint — rendezvous and fallback-relay server", long_about = None)]
#[command(version)]
struct Cli {
    /// Host both listeners bind to
    #[arg(long, default_value = DEFAULT_HOST)]
    host: String,

    /// Port for the WebSocket signaling transport
    #[arg(long, default_value_t = DEFAULT_SIGNAL_PORT)]
    signal_port: u16,

    /// Port for the TCP directory transport
    #[arg(long, default_value_t = DEFAULT_DIRECTORY_PORT)]
    directory_port: u16,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();
    let config = ServerConfig {
        host: cli.host,
        signal_port: cli.signal_port,
        directory_port: cli.directory_port,
    };

    let signal = SignalServer::bind(&config.signal_addr())
        .await
        .with_context(|| format!("Failed to bind signaling server on {}", config.signal_addr()))?;
    let directory = DirectoryServer::bind(&config.directory_addr())
        .await
        .with_context(|| {
            format!(
                "Failed to bind directory server on {}",
                config.directory_addr()
            )
        })?;

    info!("Starting servers...");
    tokio::select! {
        result = signal.run() => result.context("Signaling server failed")?,
        result = directory.run() => result.context("Directory server failed")?,
        _ = tokio::signal::ctrl_c() => info!("Received exit signal, shutting down"),
    }

    Ok(())
}
