//! gopkg node - versioned Go import path server.

use anyhow::{Context, Result};
use clap::Parser;
use gopkg_node::observability::{init_logging, LogFormat};
use gopkg_node::{create_router, AppState, Config};
use std::net::SocketAddr;
use std::path::PathBuf;
use tokio::net::TcpListener;
use tokio::signal;

#[derive(Parser, Debug)]
#[command(name = "gopkg-node")]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Path to a YAML configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// HTTP listen address, overriding the configuration
    #[arg(long)]
    listen: Option<SocketAddr>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long)]
    log_level: Option<String>,

    /// Log format (pretty, json)
    #[arg(long)]
    log_format: Option<LogFormat>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let mut config = Config::load(args.config.as_deref()).context("loading configuration")?;
    if let Some(listen) = args.listen {
        config.listen_addr = listen;
    }
    if let Some(level) = args.log_level {
        config.log_level = level;
    }
    if let Some(format) = args.log_format {
        config.log_format = format;
    }

    init_logging(&config.log_level, config.log_format);
    tracing::info!(version = env!("CARGO_PKG_VERSION"), "Starting gopkg node");
    tracing::info!(
        listen_addr = %config.listen_addr,
        public_host = %config.public_host,
        upstream = %config.upstream.url(&config.upstream.host),
        upload_pack = ?config.upload_pack,
        cache_ttl_secs = config.cache.ttl_secs,
        "Node configuration"
    );

    let listen_addr = config.listen_addr;
    let state = AppState::from_config(config).context("building HTTP clients")?;
    let app = create_router(state);

    let listener = TcpListener::bind(listen_addr)
        .await
        .with_context(|| format!("failed to bind HTTP listener on {listen_addr}"))?;
    tracing::info!(%listen_addr, "HTTP server listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("HTTP server error")?;

    tracing::info!("Shutdown complete");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!(error = %e, "failed to listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
    tracing::info!("Shutdown signal received");
}
