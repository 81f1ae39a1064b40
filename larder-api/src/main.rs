//! larder-api - Recipe catalogue service
//!
//! Ingests recipes from the Gousto public API into a local SQLite
//! catalogue and serves them over HTTP REST.

use anyhow::Result;
use tracing::info;
use tracing_subscriber::EnvFilter;

use larder_api::AppState;
use larder_common::Config;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    info!("Starting larder-api");
    info!("Version: {}", env!("CARGO_PKG_VERSION"));

    let config = Config::load(None)?;
    info!("Database: {}", config.database_path.display());

    let db_pool = larder_common::db::init::init_database(&config.database_path).await?;
    info!("Database connection established");

    let bind_address = config.bind_address.clone();
    let state = AppState::new(db_pool, config);
    let shutdown = state.shutdown.clone();

    let app = larder_api::build_router(state);

    let listener = tokio::net::TcpListener::bind(&bind_address).await?;
    info!("Listening on http://{}", bind_address);

    axum::serve(listener, app)
        .with_graceful_shutdown(async move {
            if tokio::signal::ctrl_c().await.is_err() {
                return;
            }
            info!("Shutdown requested");
            shutdown.cancel();
        })
        .await?;

    Ok(())
}
