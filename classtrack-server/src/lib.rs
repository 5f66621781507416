//! classtrack-server library interface
//!
//! Exposes public APIs for integration testing

pub mod api;
pub mod db;
pub mod error;
pub mod models;
pub mod services;

pub use crate::error::{ApiError, ApiResult};

use axum::Router;
use chrono::{DateTime, Utc};
use sqlx::SqlitePool;
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use classtrack_common::config::Config;
use services::{BillingService, DurationEngine, Reconciler};

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    /// Database connection pool
    pub db: SqlitePool,
    /// Loaded configuration
    pub config: Arc<Config>,
    /// Join/exit event processing and duration accounting
    pub engine: DurationEngine,
    /// Monthly billing and payroll aggregation
    pub billing: BillingService,
    /// Provider-record reconciliation (shared with the background monitor)
    pub reconciler: Arc<Reconciler>,
    /// Service startup timestamp for uptime tracking
    pub startup_time: DateTime<Utc>,
}

impl AppState {
    pub fn new(db: SqlitePool, config: Arc<Config>, reconciler: Arc<Reconciler>) -> Self {
        Self {
            engine: DurationEngine::new(db.clone()),
            billing: BillingService::new(db.clone()),
            db,
            config,
            reconciler,
            startup_time: Utc::now(),
        }
    }
}

/// Build application router
pub fn build_router(state: AppState) -> Router {
    Router::new()
        .merge(api::health_routes())
        .merge(api::webhook_routes())
        .merge(api::session_routes())
        .merge(api::report_routes())
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}
