//! Reading update and region average handlers.

use std::sync::Arc;
use std::time::Instant;

use axum::{
    extract::{
        rejection::{JsonRejection, PathRejection},
        Extension, Path,
    },
    Json,
};
use readings_common::{ReadingKey, ReadingUpdate, ReadingsResult, RegionAverage};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::ApiError;
use crate::state::AppState;

/// Response body for an accepted update.
#[derive(Debug, Serialize, Deserialize)]
pub struct UpdateResponse {
    pub success: bool,
}

/// POST /update/:region/:city - Set the supplied fields of one reading
pub async fn update_handler(
    Extension(state): Extension<Arc<AppState>>,
    path: Result<Path<(String, String)>, PathRejection>,
    body: Result<Json<ReadingUpdate>, JsonRejection>,
) -> Result<Json<UpdateResponse>, ApiError> {
    let Path((region, city)) = path?;
    let Json(update) = body?;
    let key = ReadingKey::new(region, city)?;

    let start = Instant::now();
    let result = state.store.upsert(&key, &update).await;
    record_store_call("update", start, &result);
    result?;

    debug!(region = %key.region, city = %key.city, ?update, "Reading updated");
    metrics::counter!("readings_updates_total").increment(1);

    Ok(Json(UpdateResponse { success: true }))
}

/// GET /average/:region - Mean temperature and humidity for a region
///
/// Responds with an empty array for a region without readings.
pub async fn average_handler(
    Extension(state): Extension<Arc<AppState>>,
    path: Result<Path<String>, PathRejection>,
) -> Result<Json<Vec<RegionAverage>>, ApiError> {
    let Path(region) = path?;

    let start = Instant::now();
    let result = state.store.average_by_region(&region).await;
    record_store_call("average", start, &result);

    metrics::counter!("readings_average_queries_total").increment(1);

    Ok(Json(result?.into_iter().collect()))
}

fn record_store_call<T>(operation: &'static str, start: Instant, result: &ReadingsResult<T>) {
    metrics::histogram!("readings_request_duration_seconds", "operation" => operation)
        .record(start.elapsed().as_secs_f64());

    if let Err(e) = result {
        metrics::counter!(
            "readings_store_errors_total",
            "operation" => operation,
            "error" => e.error_code()
        )
        .increment(1);
    }
}
