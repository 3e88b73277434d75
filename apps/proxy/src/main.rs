//! # Lumen Proxy
//!
//! Deployable entry point for the sensor fleet runtime: loads the config
//! directory, starts the [`FleetAgent`], watches the sensors file for
//! live reloads, and shuts down cleanly on SIGINT/SIGTERM.
//!
//! ## Process Layout
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                           Lumen Proxy                                   │
//! │                                                                         │
//! │  config/default_config.json ──► ProxyConfig (backend endpoints)         │
//! │  config/sensors_config.json ──► FileSnapshotSource ──► FleetAgent       │
//! │                    ▲                                        │           │
//! │                    └── notify watcher ── change signal ─────┘           │
//! │                                                                         │
//! │  Ctrl-C / SIGTERM ──► graceful agent shutdown                           │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

mod config;
mod source;
mod watcher;

use std::path::PathBuf;
use std::sync::Arc;

use clap::Parser;
use tracing::info;
use tracing_subscriber::EnvFilter;

use lumen_fleet::{FleetAgent, LogGateway, LogTransport};

use crate::config::ProxyConfig;
use crate::source::FileSnapshotSource;
use crate::watcher::watch_config_dir;

/// Proxy between a fleet of light sensors and the plant database.
#[derive(Debug, Parser)]
#[command(name = "proxy", version, about)]
struct Args {
    /// Directory holding default_config.json and sensors_config.json.
    #[arg(short, long, default_value = "config")]
    config_dir: PathBuf,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .with_target(true)
        .init();

    welcome_message();

    let config = ProxyConfig::load(&args.config_dir)?;
    info!(
        storage = %config.storage.url,
        broker = format!("{}:{}", config.broker.host, config.broker.port),
        listener = %config.listener.bind_ip,
        "Backend configuration loaded"
    );

    let source = Arc::new(FileSnapshotSource::new(ProxyConfig::sensors_path(
        &args.config_dir,
    )));

    let agent = FleetAgent::start(source, Arc::new(LogGateway), Arc::new(LogTransport)).await?;

    for record in agent.registry().snapshot().await {
        info!(
            sensor_id = %record.sensor_id(),
            position = %record.position.name,
            plant = %record.plant.kind,
            sampling_period_secs = record.current_period_secs(),
            accumulation_window_minutes = record.accumulation_window_minutes(),
            "Sensor registered"
        );
    }

    // Keep the watcher alive for the process lifetime; dropping it stops
    // the watch.
    let _watcher = watch_config_dir(&args.config_dir, agent.change_sender())?;
    info!(config_dir = %args.config_dir.display(), "Watching for configuration changes");

    shutdown_signal().await;
    agent.shutdown().await;

    info!("Proxy shutdown complete");
    Ok(())
}

/// Startup banner.
fn welcome_message() {
    println!("===================================================================");
    println!();
    println!("                   Welcome to Lumen Sensor Proxy");
    println!();
    println!("  The proxy sits between the light sensors and the plant database:");
    println!("  it ingests readings, accounts delivery latency, and broadcasts");
    println!("  per-sensor status. Edit sensors_config.json to reconfigure live.");
    println!();
    println!("===================================================================");
}

/// Graceful shutdown signal handler.
async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("Failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    info!("Shutdown signal received, starting graceful shutdown...");
}
