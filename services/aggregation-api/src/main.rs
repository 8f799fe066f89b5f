//! Aggregation API Server
//!
//! Stores the latest temperature and humidity per (region, city) and serves
//! per-region averages.

use std::sync::Arc;

use anyhow::Result;
use clap::Parser;
use tracing::info;
use tracing_subscriber::{fmt, EnvFilter};

use aggregation_api::config::ServiceConfig;
use aggregation_api::state::AppState;

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file if present
    dotenvy::dotenv().ok();

    let config = ServiceConfig::parse();

    // Initialize tracing
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.log_level));

    fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_level(true)
        .json()
        .init();

    // Initialize Prometheus metrics exporter
    let prometheus_handle = metrics_exporter_prometheus::PrometheusBuilder::new()
        .install_recorder()?;

    info!("Starting aggregation API server");

    let state = Arc::new(AppState::connect(&config).await?);

    // Schema must exist before any request is accepted
    state.bootstrap().await?;

    let app = aggregation_api::build_router(state, Some(prometheus_handle));

    let listener = tokio::net::TcpListener::bind(config.bind_address()).await?;
    info!(address = %listener.local_addr()?, "Server listening");

    axum::serve(listener, app).await?;

    Ok(())
}
