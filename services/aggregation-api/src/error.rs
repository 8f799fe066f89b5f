//! HTTP error responses.

use axum::{
    extract::rejection::{JsonRejection, PathRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use readings_common::ReadingsError;
use serde_json::json;
use tracing::{error, warn};

/// Error returned by handlers; wraps the shared taxonomy.
#[derive(Debug)]
pub struct ApiError(pub ReadingsError);

impl From<ReadingsError> for ApiError {
    fn from(err: ReadingsError) -> Self {
        Self(err)
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        Self(ReadingsError::MalformedRequest(rejection.body_text()))
    }
}

impl From<PathRejection> for ApiError {
    fn from(rejection: PathRejection) -> Self {
        Self(ReadingsError::MalformedRequest(rejection.body_text()))
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let err = self.0;

        if err.is_contract_violation() {
            error!(error = %err, "Store contract violated");
        } else if let ReadingsError::StoreUnavailable(_) = err {
            warn!(error = %err, "Store unavailable");
        }

        let status =
            StatusCode::from_u16(err.http_status_code()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);

        let body = Json(json!({
            "success": false,
            "error": err.error_code(),
            "message": err.to_string(),
        }));

        (status, body).into_response()
    }
}
