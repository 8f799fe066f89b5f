//! The reading store interface shared by all backends.

use std::time::Duration;

use async_trait::async_trait;
use readings_common::{Reading, ReadingKey, ReadingUpdate, ReadingsError, ReadingsResult, RegionAverage};
use sqlx::FromRow;

/// Table holding one row per (region, city).
pub const TABLE_NAME: &str = "readings";

/// Unique index enforcing the natural key.
pub const INDEX_NAME: &str = "readings_region_city_key";

/// Latest-value storage keyed by (region, city).
///
/// Every method is a fresh round trip to the backing database: a pooled
/// connection is acquired for the statement and released when it completes
/// or fails.
#[async_trait]
pub trait ReadingStore: Send + Sync {
    /// Create the table and its unique (region, city) index if missing.
    ///
    /// Safe to call repeatedly. Fails with `SchemaConflict` when an existing
    /// table or index does not match what the store requires.
    async fn ensure_schema(&self) -> ReadingsResult<()>;

    /// Set the supplied fields of `key`, creating the record if absent.
    ///
    /// Runs as a single statement; fields absent from `update` keep their
    /// stored value.
    async fn upsert(&self, key: &ReadingKey, update: &ReadingUpdate) -> ReadingsResult<()>;

    /// Mean temperature and humidity over a region, `None` for an empty region.
    async fn average_by_region(&self, region: &str) -> ReadingsResult<Option<RegionAverage>>;

    /// Fetch a single record by its natural key.
    async fn get(&self, key: &ReadingKey) -> ReadingsResult<Option<Reading>>;

    /// Total number of records.
    async fn count(&self) -> ReadingsResult<u64>;

    /// Cheap round trip used by readiness checks.
    async fn ping(&self) -> ReadingsResult<()>;

    /// Short backend name for logs.
    fn backend(&self) -> &'static str;
}

/// Connection pool settings shared by the backends.
#[derive(Debug, Clone)]
pub struct PoolSettings {
    pub max_connections: u32,
    pub acquire_timeout: Duration,
}

impl Default for PoolSettings {
    fn default() -> Self {
        Self {
            max_connections: 10,
            acquire_timeout: Duration::from_secs(5),
        }
    }
}

/// Map a sqlx error onto the readings error taxonomy.
///
/// Transport and pool failures become `StoreUnavailable` so callers can tell
/// them apart from an empty result.
pub fn classify_sqlx_error(err: sqlx::Error) -> ReadingsError {
    match err {
        sqlx::Error::Io(e) => ReadingsError::StoreUnavailable(format!("I/O error: {}", e)),
        sqlx::Error::Tls(e) => ReadingsError::StoreUnavailable(format!("TLS error: {}", e)),
        sqlx::Error::PoolTimedOut => {
            ReadingsError::StoreUnavailable("timed out acquiring a connection".to_string())
        }
        sqlx::Error::PoolClosed => ReadingsError::StoreUnavailable("pool closed".to_string()),
        sqlx::Error::WorkerCrashed => {
            ReadingsError::StoreUnavailable("connection worker crashed".to_string())
        }
        sqlx::Error::Database(db) if db.is_unique_violation() => {
            ReadingsError::ConstraintViolation(db.message().to_string())
        }
        other => ReadingsError::DatabaseError(other.to_string()),
    }
}

#[derive(Debug, FromRow)]
pub(crate) struct ReadingRow {
    pub region: String,
    pub city: String,
    pub temperature: Option<f64>,
    pub humidity: Option<f64>,
}

impl From<ReadingRow> for Reading {
    fn from(row: ReadingRow) -> Self {
        Self {
            region: row.region,
            city: row.city,
            temperature: row.temperature,
            humidity: row.humidity,
        }
    }
}

#[derive(Debug, FromRow)]
pub(crate) struct AverageRow {
    pub region: String,
    pub temperature: Option<f64>,
    pub humidity: Option<f64>,
    pub readings: i64,
}

impl From<AverageRow> for RegionAverage {
    fn from(row: AverageRow) -> Self {
        Self {
            region: row.region,
            temperature: row.temperature,
            humidity: row.humidity,
            readings: row.readings.max(0) as u64,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pool_errors_are_unavailable() {
        assert!(matches!(
            classify_sqlx_error(sqlx::Error::PoolTimedOut),
            ReadingsError::StoreUnavailable(_)
        ));
        assert!(matches!(
            classify_sqlx_error(sqlx::Error::PoolClosed),
            ReadingsError::StoreUnavailable(_)
        ));
    }

    #[test]
    fn test_io_error_is_unavailable() {
        let io = std::io::Error::new(std::io::ErrorKind::ConnectionRefused, "refused");
        let err = classify_sqlx_error(sqlx::Error::Io(io));
        assert_eq!(err.error_code(), "STORE_UNAVAILABLE");
        assert_eq!(err.http_status_code(), 503);
    }

    #[test]
    fn test_row_not_found_is_database_error() {
        let err = classify_sqlx_error(sqlx::Error::RowNotFound);
        assert!(matches!(err, ReadingsError::DatabaseError(_)));
    }

    #[test]
    fn test_average_row_conversion() {
        let avg: RegionAverage = AverageRow {
            region: "R".to_string(),
            temperature: Some(15.0),
            humidity: None,
            readings: 3,
        }
        .into();
        assert_eq!(avg.temperature, Some(15.0));
        assert_eq!(avg.humidity, None);
        assert_eq!(avg.readings, 3);
    }
}
