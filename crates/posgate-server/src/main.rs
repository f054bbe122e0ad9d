//! posgate
//!
//! HTTP gateway in front of a store's POS peripherals: barcode scanners, a
//! scale, a check reader, a line display and a receipt printer.

use anyhow::{Context, Result};
use clap::Parser;
use posgate_devices::ReconnectScheduler;
use posgate_server::{AppState, GatewayConfig, build_router, setup_logging};
use std::path::PathBuf;
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio::signal;
use tracing::{error, info};

#[derive(Parser, Debug)]
#[command(name = "posgate")]
#[command(author, version, about = "POS peripheral gateway")]
#[command(long_about = "
Exposes barcode scanners, a scale, a check reader, a line display and a
printer over HTTP. Devices are kept connected in the background.

EXAMPLES:
    # Run with default config
    posgate

    # Run with custom config
    posgate --config /path/to/posgate.toml

    # Listen on every interface with debug logging
    posgate --bind 0.0.0.0:8080 --log-level debug

CONFIGURATION:
    The gateway looks for configuration files in the following order:
    1. Path specified with --config
    2. ~/.config/posgate/posgate.toml
    3. /etc/posgate/posgate.toml
    4. Built-in defaults
")]
struct Args {
    /// Path to configuration file
    #[arg(short, long, value_name = "PATH")]
    config: Option<PathBuf>,

    /// Address to listen on, overriding the configured one
    #[arg(short, long, value_name = "ADDR")]
    bind: Option<String>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(short, long, value_name = "LEVEL")]
    log_level: Option<String>,

    /// Save default configuration to default location and exit
    #[arg(long)]
    save_config: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    if args.save_config {
        let path = args.config.clone().unwrap_or_else(GatewayConfig::default_path);
        GatewayConfig::default()
            .save(&path)
            .context("Failed to save configuration")?;
        println!("Configuration saved to: {}", path.display());
        return Ok(());
    }

    let mut config = match args.config {
        Some(ref path) => GatewayConfig::load(path).context("Failed to load configuration")?,
        None => GatewayConfig::load_or_default(),
    };
    if let Some(bind) = args.bind {
        config.server.bind_addr = bind;
    }

    let log_level = args
        .log_level
        .as_deref()
        .unwrap_or(&config.server.log_level);
    setup_logging(log_level).context("Failed to setup logging")?;

    info!("posgate v{}", env!("CARGO_PKG_VERSION"));
    info!("Log level: {}", log_level);

    let state = AppState::from_config(&config);
    let scheduler = ReconnectScheduler::start(Arc::clone(&state.registry));
    if state.simulator.is_some() {
        info!("Simulator control routes enabled under /v1/simulator");
    }

    let listener = TcpListener::bind(&config.server.bind_addr)
        .await
        .with_context(|| format!("Failed to bind {}", config.server.bind_addr))?;
    info!("Listening on {}", config.server.bind_addr);

    let served = axum::serve(listener, build_router(state))
        .with_graceful_shutdown(shutdown_signal())
        .await;

    info!("Shutting down device tasks...");
    scheduler.shutdown().await;

    if let Err(e) = served {
        error!("Server error: {:#}", e);
        return Err(e).context("HTTP server failed");
    }
    info!("posgate stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = signal::ctrl_c().await {
        error!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
    info!("Shutdown signal received");
}
