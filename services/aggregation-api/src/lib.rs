//! Aggregation API service library.
//!
//! HTTP facade over the reading store: partial-field upserts keyed by
//! (region, city) and per-region averages. Holds no state of its own.

pub mod config;
pub mod error;
pub mod handlers;
pub mod memory;
pub mod state;

use std::sync::Arc;

use axum::{
    routing::{get, post},
    Extension, Router,
};
use metrics_exporter_prometheus::PrometheusHandle;
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::state::AppState;

/// Build the HTTP router.
///
/// `/metrics` renders the Prometheus handle when one is supplied.
pub fn build_router(state: Arc<AppState>, prometheus: Option<PrometheusHandle>) -> Router {
    let router = Router::new()
        // Core
        .route("/average/:region", get(handlers::readings::average_handler))
        .route("/update/:region/:city", post(handlers::readings::update_handler))
        // Diagnostics
        .route("/memory", get(handlers::memory::memory_handler))
        .route("/health", get(handlers::health::health_handler))
        .route("/ready", get(handlers::health::ready_handler))
        .route("/metrics", get(handlers::health::metrics_handler))
        .layer(Extension(state));

    let router = match prometheus {
        Some(handle) => router.layer(Extension(handle)),
        None => router,
    };

    router
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
}
