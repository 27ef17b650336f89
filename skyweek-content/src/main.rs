//! skyweek-content - weekly astrology content service
//!
//! Loads the bootstrap config, wires the resolver tiers and serves the
//! HTTP API until Ctrl+C or SIGTERM.

use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;
use skyweek_common::config::{load_or_default, resolve_root_folder};
use skyweek_common::logging::init_tracing;
use skyweek_common::SystemClock;
use skyweek_content::config::{build_resolver, ROOT_FOLDER_ENV};
use skyweek_content::{build_router, AppState};
use tokio::signal;
use tracing::{info, warn};

/// How often expired cache entries are reclaimed
const PURGE_INTERVAL: Duration = Duration::from_secs(15 * 60);

/// Command-line arguments for skyweek-content
#[derive(Parser, Debug)]
#[command(name = "skyweek-content")]
#[command(about = "Weekly astrology content service")]
#[command(version)]
struct Args {
    /// Port to listen on (overrides the TOML config)
    #[arg(short, long, env = "SKYWEEK_PORT")]
    port: Option<u16>,

    /// Root folder for the local document store
    #[arg(short, long)]
    root_folder: Option<PathBuf>,

    /// Bootstrap TOML config file
    #[arg(short, long, env = "SKYWEEK_CONFIG")]
    config: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let toml_config =
        load_or_default(args.config.as_deref()).context("Failed to load configuration")?;
    init_tracing(&toml_config.logging).context("Failed to initialize logging")?;

    let root_folder = resolve_root_folder(args.root_folder.as_deref(), ROOT_FOLDER_ENV, &toml_config);
    let port = args.port.unwrap_or(toml_config.port);

    info!("Starting skyweek-content on port {}", port);
    info!("Root folder: {}", root_folder.display());

    let resolver = build_resolver(&toml_config, &root_folder, Arc::new(SystemClock))
        .await
        .context("Failed to initialize content resolver")?;
    info!("Content resolver initialized (week {})", resolver.current_week());

    let purger = resolver.clone();
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(PURGE_INTERVAL);
        loop {
            interval.tick().await;
            purger.purge_expired().await;
        }
    });

    let app = build_router(AppState::new(resolver));

    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    info!("Starting HTTP server on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .context("Failed to bind to address")?;

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    info!("Server shutdown complete");
    Ok(())
}

/// Graceful shutdown signal handler
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            warn!("Failed to listen for Ctrl+C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(e) => {
                warn!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C, shutting down");
        },
        _ = terminate => {
            info!("Received terminate signal, shutting down");
        },
    }
}
