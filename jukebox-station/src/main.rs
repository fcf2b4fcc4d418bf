//! Jukebox Station (jukebox-station) - Main entry point
//!
//! Starts the player task and the HTTP gateway, and shuts both down on
//! Ctrl+C / SIGTERM.

use std::net::SocketAddr;
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use jukebox_common::config::ConfigResolver;
use tokio::signal;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use jukebox_station::{api, build_station};

/// Command-line arguments for jukebox-station
///
/// Port and track directory fall back to JUKEBOX_PORT / JUKEBOX_TRACKS_DIR,
/// then the config file, then compiled defaults.
#[derive(Parser, Debug)]
#[command(name = "jukebox-station")]
#[command(about = "Single-station audio broadcast service")]
#[command(version)]
struct Args {
    /// Port to listen on
    #[arg(short, long)]
    port: Option<u16>,

    /// Directory containing the audio files
    #[arg(short, long)]
    tracks_dir: Option<PathBuf>,

    /// Config file (default: <config dir>/jukebox/config.toml)
    #[arg(short, long, env = "JUKEBOX_CONFIG")]
    config: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "jukebox_station=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!(
        "Starting Jukebox Station v{} [{}] built {} ({})",
        env!("CARGO_PKG_VERSION"),
        env!("GIT_HASH"),
        env!("BUILD_TIMESTAMP"),
        env!("BUILD_PROFILE")
    );

    let args = Args::parse();

    let config = ConfigResolver::new()
        .with_cli_port(args.port)
        .with_cli_tracks_dir(args.tracks_dir)
        .with_config_file(args.config)
        .resolve()
        .context("Failed to resolve configuration")?;

    info!("Track directory: {}", config.tracks_dir.display());
    if !config.tracks_dir.is_dir() {
        warn!(
            "Track directory {} does not exist; listing will fail until it does",
            config.tracks_dir.display()
        );
    }

    let (app_state, player) = build_station(&config.tracks_dir, &config.stream);
    let player = player.spawn();
    let hub = app_state.hub.clone();

    let app = api::create_router(app_state);
    let addr = SocketAddr::from(([0, 0, 0, 0], config.port));

    info!("Starting HTTP server on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .context("Failed to bind to address")?;

    axum::serve(listener, app)
        .with_graceful_shutdown(async move {
            shutdown_signal().await;
            player.abort();
            // Live streams never end on their own
            hub.disconnect_all();
        })
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
            Ok(mut sig) => {
                sig.recv().await;
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
