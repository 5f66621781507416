//! classtrack-server - Attendance and billing backend
//!
//! Ingests join/exit events from the meeting platform, reconciles stored
//! attendance against the platform's conference records on a schedule, and
//! serves monthly billing and payroll reports.

use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use tokio::signal;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use classtrack_common::config::Config;
use classtrack_server::services::{HttpMeetProvider, MeetingMonitor, Reconciler};
use classtrack_server::AppState;

/// Command-line arguments for classtrack-server
#[derive(Parser, Debug)]
#[command(name = "classtrack-server")]
#[command(about = "Attendance tracking and billing backend")]
#[command(version)]
struct Args {
    /// Configuration file path (TOML)
    #[arg(short, long, env = "CLASSTRACK_CONFIG")]
    config: Option<PathBuf>,

    /// Port to listen on (overrides configuration)
    #[arg(short, long, env = "CLASSTRACK_PORT")]
    port: Option<u16>,

    /// SQLite database path (overrides configuration)
    #[arg(short, long, env = "CLASSTRACK_DB")]
    database: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "classtrack_server=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let args = Args::parse();

    let mut config = Config::load(args.config.as_deref()).context("Failed to load configuration")?;
    if let Some(port) = args.port {
        config.server.port = port;
    }
    if let Some(database) = args.database {
        config.database.path = database;
    }
    let config = Arc::new(config);

    info!("Starting classtrack-server");
    info!("Version: {}", env!("CARGO_PKG_VERSION"));
    info!("Database: {}", config.database.path.display());

    if let Some(parent) = config.database.path.parent() {
        std::fs::create_dir_all(parent).context("Failed to create data directory")?;
    }

    let db_pool = classtrack_server::db::init_database_pool(&config.database.path).await?;
    info!("Database connection established");

    let provider = HttpMeetProvider::new(&config.provider)
        .context("Failed to initialize meeting-provider client")?;
    let reconciler = Arc::new(Reconciler::new(db_pool.clone(), Arc::new(provider)));

    // Background class/session monitor
    let monitor = Arc::new(MeetingMonitor::new(
        db_pool.clone(),
        Arc::clone(&reconciler),
        config.monitor.clone(),
    ));
    monitor.start();

    let state = AppState::new(db_pool, Arc::clone(&config), reconciler);
    let app = classtrack_server::build_router(state);

    let addr: SocketAddr = format!("{}:{}", config.server.host, config.server.port)
        .parse()
        .context("Invalid listen address")?;

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
        signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
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

    info!("Shutdown signal received");
}
