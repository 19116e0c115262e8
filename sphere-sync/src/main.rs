//! sphere-sync - library sync and sphere embedding service
//!
//! Serves the sync API on port 5730 by default.

use std::net::{IpAddr, SocketAddr};
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use sphere_common::config::{load_or_default, resolve_root_folder};
use sphere_common::events::EventBus;
use tokio::signal;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use sphere_sync::config::SyncSettings;
use sphere_sync::store::SqlitePayloadStore;
use sphere_sync::AppState;

/// Command-line arguments for sphere-sync
#[derive(Parser, Debug)]
#[command(name = "sphere-sync")]
#[command(about = "Library sync and sphere embedding service")]
#[command(version)]
struct Args {
    /// Path to the TOML config file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Root folder holding sphere.db
    #[arg(short, long)]
    root_folder: Option<PathBuf>,

    /// Port to listen on (overrides the config file)
    #[arg(short, long, env = "SPHERE_PORT")]
    port: Option<u16>,

    /// Address to bind
    #[arg(long, default_value = "127.0.0.1")]
    bind: IpAddr,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let toml_config = load_or_default(args.config.as_deref()).context("Failed to load config")?;

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| {
                    format!("sphere_sync={0},sphere_common={0},tower_http=info", toml_config.logging.level).into()
                }),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting sphere-sync v{} ({})", env!("CARGO_PKG_VERSION"), env!("GIT_HASH"));
    info!("Built: {}", env!("BUILD_TIMESTAMP"));

    let settings = SyncSettings::from_toml(&toml_config).context("Invalid sync settings")?;
    info!("Upstream API: {}", settings.api_base_url);

    let root_folder = resolve_root_folder(args.root_folder.as_deref(), &toml_config);
    let db_path = root_folder.join("sphere.db");
    info!("Database: {}", db_path.display());

    let store = SqlitePayloadStore::open(&db_path)
        .await
        .context("Failed to open payload database")?;

    let event_bus = EventBus::new(100);
    let state = AppState::new(settings, Arc::new(store), event_bus)
        .context("Failed to initialize application state")?;

    let app = sphere_sync::build_router(state);

    let port = args.port.unwrap_or(toml_config.port);
    let addr = SocketAddr::new(args.bind, port);
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind to {}", addr))?;
    info!("Listening on http://{}", addr);
    info!("Health check: http://{}/health", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    info!("Server shutdown complete");
    Ok(())
}

/// Resolves on Ctrl+C or SIGTERM
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
        _ = ctrl_c => info!("Received Ctrl+C, shutting down"),
        _ = terminate => info!("Received SIGTERM, shutting down"),
    }
}
