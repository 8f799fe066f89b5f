//! Error types for the readings services.

use thiserror::Error;

/// Result type alias using ReadingsError.
pub type ReadingsResult<T> = Result<T, ReadingsError>;

/// Primary error type for reading storage and aggregation.
#[derive(Debug, Error)]
pub enum ReadingsError {
    // === Request Errors ===
    #[error("Malformed request: {0}")]
    MalformedRequest(String),

    // === Storage Errors ===
    #[error("Store unavailable: {0}")]
    StoreUnavailable(String),

    /// Two records for one (region, city) key. The atomic upsert path never
    /// produces this, so seeing it means the store contract was broken.
    #[error("Constraint violation: {0}")]
    ConstraintViolation(String),

    #[error("Incompatible schema: {0}")]
    SchemaConflict(String),

    #[error("Database error: {0}")]
    DatabaseError(String),

    // === Infrastructure Errors ===
    #[error("Internal server error: {0}")]
    Internal(String),
}

impl ReadingsError {
    /// Machine-readable code used in error response bodies.
    pub fn error_code(&self) -> &'static str {
        match self {
            ReadingsError::MalformedRequest(_) => "MALFORMED_REQUEST",
            ReadingsError::StoreUnavailable(_) => "STORE_UNAVAILABLE",
            ReadingsError::ConstraintViolation(_) => "CONSTRAINT_VIOLATION",
            ReadingsError::SchemaConflict(_) => "SCHEMA_CONFLICT",
            ReadingsError::DatabaseError(_) => "DATABASE_ERROR",
            ReadingsError::Internal(_) => "INTERNAL_ERROR",
        }
    }

    /// Get the HTTP status code for this error.
    pub fn http_status_code(&self) -> u16 {
        match self {
            ReadingsError::MalformedRequest(_) => 400,
            ReadingsError::StoreUnavailable(_) => 503,
            _ => 500,
        }
    }

    /// True for failures of the store contract itself rather than of the
    /// environment or the caller.
    pub fn is_contract_violation(&self) -> bool {
        matches!(
            self,
            ReadingsError::ConstraintViolation(_) | ReadingsError::SchemaConflict(_)
        )
    }
}

impl From<std::io::Error> for ReadingsError {
    fn from(err: std::io::Error) -> Self {
        ReadingsError::Internal(err.to_string())
    }
}

impl From<serde_json::Error> for ReadingsError {
    fn from(err: serde_json::Error) -> Self {
        ReadingsError::MalformedRequest(format!("JSON error: {}", err))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_codes() {
        assert_eq!(ReadingsError::MalformedRequest("x".into()).http_status_code(), 400);
        assert_eq!(ReadingsError::StoreUnavailable("x".into()).http_status_code(), 503);
        assert_eq!(ReadingsError::ConstraintViolation("x".into()).http_status_code(), 500);
        assert_eq!(ReadingsError::DatabaseError("x".into()).http_status_code(), 500);
    }

    #[test]
    fn test_contract_violation() {
        assert!(ReadingsError::ConstraintViolation("dup".into()).is_contract_violation());
        assert!(ReadingsError::SchemaConflict("index".into()).is_contract_violation());
        assert!(!ReadingsError::StoreUnavailable("down".into()).is_contract_violation());
    }

    #[test]
    fn test_json_error_is_malformed_request() {
        let err = serde_json::from_str::<serde_json::Value>("{").unwrap_err();
        let err: ReadingsError = err.into();
        assert_eq!(err.error_code(), "MALFORMED_REQUEST");
    }
}
