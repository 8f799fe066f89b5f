//! Reading store backed by SQLite, in memory or on disk.

use std::path::Path;
use std::time::Duration;

use async_trait::async_trait;
use readings_common::{Reading, ReadingKey, ReadingUpdate, ReadingsError, ReadingsResult, RegionAverage};
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePool, SqlitePoolOptions};
use tracing::{debug, info};

use crate::store::{
    classify_sqlx_error, AverageRow, PoolSettings, ReadingRow, ReadingStore, INDEX_NAME, TABLE_NAME,
};

/// SQLite reading store.
pub struct SqliteReadingStore {
    pool: SqlitePool,
}

impl SqliteReadingStore {
    /// Open or create a database file at the given path.
    pub async fn open(path: &Path, settings: &PoolSettings) -> ReadingsResult<Self> {
        // Ensure parent directory exists
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let options = SqliteConnectOptions::new()
            .filename(path)
            .create_if_missing(true)
            .journal_mode(SqliteJournalMode::Wal)
            .busy_timeout(Duration::from_secs(5));

        let pool = SqlitePoolOptions::new()
            .max_connections(settings.max_connections)
            .acquire_timeout(settings.acquire_timeout)
            .connect_with(options)
            .await
            .map_err(classify_sqlx_error)?;

        info!(path = %path.display(), "Opened SQLite reading store");

        Ok(Self { pool })
    }

    /// Open an in-memory database.
    ///
    /// The pool holds exactly one connection that is never recycled, since an
    /// in-memory database disappears with the connection that created it.
    pub async fn open_memory() -> ReadingsResult<Self> {
        let options = SqliteConnectOptions::new()
            .filename(":memory:")
            .create_if_missing(true);

        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .min_connections(1)
            .idle_timeout(None)
            .max_lifetime(None)
            .connect_with(options)
            .await
            .map_err(classify_sqlx_error)?;

        Ok(Self { pool })
    }

    async fn verify_columns(&self) -> ReadingsResult<()> {
        let columns = sqlx::query_as::<_, (String, String)>(
            "SELECT name, type FROM pragma_table_info(?)",
        )
        .bind(TABLE_NAME)
        .fetch_all(&self.pool)
        .await
        .map_err(classify_sqlx_error)?;

        for (name, expected) in [
            ("region", "TEXT"),
            ("city", "TEXT"),
            ("temperature", "REAL"),
            ("humidity", "REAL"),
        ] {
            match columns.iter().find(|(column, _)| column == name) {
                Some((_, declared)) if declared.eq_ignore_ascii_case(expected) => {}
                Some((_, declared)) => {
                    return Err(ReadingsError::SchemaConflict(format!(
                        "column {}.{} has type {}, expected {}",
                        TABLE_NAME, name, declared, expected
                    )))
                }
                None => {
                    return Err(ReadingsError::SchemaConflict(format!(
                        "column {}.{} is missing",
                        TABLE_NAME, name
                    )))
                }
            }
        }

        Ok(())
    }

    async fn verify_index(&self) -> ReadingsResult<()> {
        let index = sqlx::query_as::<_, (i64, i64)>(
            "SELECT \"unique\", partial FROM pragma_index_list(?) WHERE name = ?",
        )
        .bind(TABLE_NAME)
        .bind(INDEX_NAME)
        .fetch_optional(&self.pool)
        .await
        .map_err(classify_sqlx_error)?;

        let Some((unique, partial)) = index else {
            return Err(ReadingsError::SchemaConflict(format!(
                "index {} is missing",
                INDEX_NAME
            )));
        };

        let columns = sqlx::query_scalar::<_, String>(
            "SELECT name FROM pragma_index_info(?) ORDER BY seqno",
        )
        .bind(INDEX_NAME)
        .fetch_all(&self.pool)
        .await
        .map_err(classify_sqlx_error)?;

        if unique != 1 || partial != 0 || columns != ["region", "city"] {
            return Err(ReadingsError::SchemaConflict(format!(
                "index {} is not a unique index on (region, city): unique={}, partial={}, columns={:?}",
                INDEX_NAME, unique, partial, columns
            )));
        }

        Ok(())
    }
}

#[async_trait]
impl ReadingStore for SqliteReadingStore {
    async fn ensure_schema(&self) -> ReadingsResult<()> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS readings (
                region TEXT NOT NULL,
                city TEXT NOT NULL,
                temperature REAL,
                humidity REAL
            )
            "#,
        )
        .execute(&self.pool)
        .await
        .map_err(classify_sqlx_error)?;

        sqlx::query(
            "CREATE UNIQUE INDEX IF NOT EXISTS readings_region_city_key ON readings (region, city)",
        )
        .execute(&self.pool)
        .await
        .map_err(classify_sqlx_error)?;

        self.verify_columns().await?;
        self.verify_index().await?;

        info!(table = TABLE_NAME, index = INDEX_NAME, "SQLite schema ready");
        Ok(())
    }

    async fn upsert(&self, key: &ReadingKey, update: &ReadingUpdate) -> ReadingsResult<()> {
        sqlx::query(
            r#"
            INSERT INTO readings (region, city, temperature, humidity)
            VALUES (?, ?, ?, ?)
            ON CONFLICT (region, city)
            DO UPDATE SET
                temperature = COALESCE(excluded.temperature, readings.temperature),
                humidity = COALESCE(excluded.humidity, readings.humidity)
            "#,
        )
        .bind(&key.region)
        .bind(&key.city)
        .bind(update.temperature)
        .bind(update.humidity)
        .execute(&self.pool)
        .await
        .map_err(classify_sqlx_error)?;

        debug!(region = %key.region, city = %key.city, ?update, "Upserted reading");
        Ok(())
    }

    async fn average_by_region(&self, region: &str) -> ReadingsResult<Option<RegionAverage>> {
        let row = sqlx::query_as::<_, AverageRow>(
            "SELECT region, AVG(temperature) AS temperature, AVG(humidity) AS humidity, \
             COUNT(*) AS readings FROM readings WHERE region = ? GROUP BY region",
        )
        .bind(region)
        .fetch_optional(&self.pool)
        .await
        .map_err(classify_sqlx_error)?;

        Ok(row.map(|r| r.into()))
    }

    async fn get(&self, key: &ReadingKey) -> ReadingsResult<Option<Reading>> {
        let row = sqlx::query_as::<_, ReadingRow>(
            "SELECT region, city, temperature, humidity FROM readings \
             WHERE region = ? AND city = ?",
        )
        .bind(&key.region)
        .bind(&key.city)
        .fetch_optional(&self.pool)
        .await
        .map_err(classify_sqlx_error)?;

        Ok(row.map(|r| r.into()))
    }

    async fn count(&self) -> ReadingsResult<u64> {
        let count = sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM readings")
            .fetch_one(&self.pool)
            .await
            .map_err(classify_sqlx_error)?;

        Ok(count.max(0) as u64)
    }

    async fn ping(&self) -> ReadingsResult<()> {
        sqlx::query("SELECT 1")
            .execute(&self.pool)
            .await
            .map_err(classify_sqlx_error)?;
        Ok(())
    }

    fn backend(&self) -> &'static str {
        "sqlite"
    }
}
