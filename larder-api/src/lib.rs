//! larder-api library interface
//!
//! Exposes the router, state, and domain modules for the binaries and
//! for integration testing.

pub mod api;
pub mod db;
pub mod error;
pub mod gousto;
pub mod ingest;

pub use crate::error::{ApiError, ApiResult};

use axum::Router;
use chrono::{DateTime, Utc};
use sqlx::SqlitePool;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use larder_common::Config;

use crate::gousto::GoustoClient;
use crate::ingest::Ingestor;

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    /// Database connection pool
    pub db: SqlitePool,
    /// Loaded service configuration
    pub config: Arc<Config>,
    /// Discovery and ingestion orchestrator
    pub ingestor: Ingestor,
    /// Service startup timestamp for uptime tracking
    pub startup_time: DateTime<Utc>,
    /// Cancelled on shutdown; long-running ingestion observes it
    pub shutdown: CancellationToken,
}

impl AppState {
    pub fn new(db: SqlitePool, config: Config) -> Self {
        let client = GoustoClient::new(&config.upstream);
        let ingestor = Ingestor::new(
            db.clone(),
            client,
            config.upstream.discovery_concurrency,
        );
        Self {
            db,
            config: Arc::new(config),
            ingestor,
            startup_time: Utc::now(),
            shutdown: CancellationToken::new(),
        }
    }
}

/// Build application router
pub fn build_router(state: AppState) -> Router {
    Router::new()
        .merge(api::health_routes())
        .merge(api::auth_routes())
        .merge(api::recipe_routes())
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}
