//! Diagnostic memory endpoint.

use axum::Json;
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::memory::process_memory_bytes;

#[derive(Debug, Serialize, Deserialize)]
pub struct MemoryResponse {
    /// Resident set size of the service process, not allocator heap.
    pub bytes: u64,
}

/// GET /memory - Current process resident set size (VmRSS), 0 where unavailable
pub async fn memory_handler() -> Json<MemoryResponse> {
    let bytes = process_memory_bytes();

    info!(
        memory_mb = bytes as f64 / 1024.0 / 1024.0,
        "Memory usage"
    );
    metrics::gauge!("process_resident_memory_bytes").set(bytes as f64);

    Json(MemoryResponse { bytes })
}
