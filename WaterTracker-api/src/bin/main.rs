use std::net::SocketAddr;
use std::path::PathBuf;

use anyhow::Context;
use dotenv::dotenv;
use tokio::net::TcpListener;
use tokio::signal;
use tracing::{error, info, warn};
use tracing_subscriber::{
    fmt::{self, format::FmtSpan},
    prelude::*,
    EnvFilter,
};

use water_tracker_api::api::create_app;
use water_tracker_api::tasks::{start_maintenance, MAINTENANCE_INTERVAL};
use water_tracker_api::ws::{start_heartbeat, HEARTBEAT_INTERVAL};
use water_tracker_domain::auth::token_blacklist;

/// The main entry point for the WaterTracker API server
///
/// This function:
/// 1. Initializes environment variables from .env file
/// 2. Sets up tracing for logging
/// 3. Ensures the data directory exists and opens the database pool
/// 4. Seeds the achievement catalogue and optionally imports water products
/// 5. Starts the background tasks and serves the Axum application
/// 6. Handles graceful shutdown
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    if dotenv().is_err() {
        eprintln!("Warning: .env file not found or couldn't be read. Using environment variables.");
    }

    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::registry()
        .with(
            fmt::layer()
                .with_span_events(FmtSpan::CLOSE)
                .with_target(false)
                .with_ansi(true)
                .with_timer(fmt::time::uptime())
                .with_writer(std::io::stdout),
        )
        .with(env_filter)
        .init();

    info!("🚀 Starting WaterTracker API server");

    let data_dir = std::env::var("DATA_DIR").unwrap_or_else(|_| "data".to_string());
    let db_path = PathBuf::from(&data_dir).join("water_tracker.db");

    if !PathBuf::from(&data_dir).exists() {
        info!("Creating data directory: {}", data_dir);
        std::fs::create_dir_all(&data_dir)
            .with_context(|| format!("Failed to create data directory {}", data_dir))?;
    }

    if std::env::var("DB_SQLITE_PATH").is_err() {
        std::env::set_var("DB_SQLITE_PATH", db_path.to_string_lossy().to_string());
        info!("Set DB_SQLITE_PATH to {}", db_path.display());
    }

    water_tracker_domain::database::initialize_database_pool().context("Failed to initialize database pool")?;
    info!("Database pool initialized successfully");

    let (app, state) = create_app();

    match state.services.achievements.seed_catalog().await {
        Ok(0) => {}
        Ok(seeded) => info!("Seeded {} achievement definitions", seeded),
        Err(e) => error!("Failed to seed achievement catalogue: {}", e),
    }

    if let Ok(path) = std::env::var("WATER_DATA_PATH") {
        match state.services.water.import_file(PathBuf::from(&path).as_path()).await {
            Ok(summary) => info!(
                "Imported water products from {}: {} imported, {} skipped",
                path, summary.imported, summary.skipped
            ),
            Err(e) => warn!("Water product import from {} failed: {}", path, e),
        }
    }

    let heartbeat = start_heartbeat(state.connections.clone(), HEARTBEAT_INTERVAL);
    let maintenance = start_maintenance(state.services.clone(), MAINTENANCE_INTERVAL);
    let blacklist_cleanup = token_blacklist::start_cleanup_task();

    let connections = state.connections.clone();

    let port = std::env::var("PORT")
        .unwrap_or_else(|_| "3000".to_string())
        .parse::<u16>()
        .context("PORT must be a number")?;

    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    info!("Listening on {}", addr);

    let listener = TcpListener::bind(addr).await.with_context(|| format!("Failed to bind {}", addr))?;

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    heartbeat.abort();
    maintenance.abort();
    blacklist_cleanup.abort();
    connections.shutdown_all().await;

    info!("Server shutdown complete");
    Ok(())
}

/// Resolves on CTRL+C or, on Unix, SIGTERM
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!("Failed to install Ctrl+C handler: {}", e);
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
                error!("Failed to install signal handler: {}", e);
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

    info!("Shutting down server...");
}
