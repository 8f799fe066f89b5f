//! Reading store backed by PostgreSQL.

use async_trait::async_trait;
use readings_common::{Reading, ReadingKey, ReadingUpdate, ReadingsError, ReadingsResult, RegionAverage};
use sqlx::{postgres::PgPoolOptions, PgPool};
use tracing::{debug, info};

use crate::store::{
    classify_sqlx_error, AverageRow, PoolSettings, ReadingRow, ReadingStore, INDEX_NAME, TABLE_NAME,
};

const SCHEMA_SQL: &str = r#"
CREATE TABLE IF NOT EXISTS readings (
    region TEXT NOT NULL,
    city TEXT NOT NULL,
    temperature DOUBLE PRECISION,
    humidity DOUBLE PRECISION
);
CREATE UNIQUE INDEX IF NOT EXISTS readings_region_city_key ON readings (region, city)
"#;

/// Connection pool and reading operations.
pub struct PgReadingStore {
    pool: PgPool,
}

impl PgReadingStore {
    /// Create a new store from a database URL.
    pub async fn connect(database_url: &str, settings: &PoolSettings) -> ReadingsResult<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(settings.max_connections)
            .acquire_timeout(settings.acquire_timeout)
            .connect(database_url)
            .await
            .map_err(classify_sqlx_error)?;

        Ok(Self { pool })
    }

    async fn verify_columns(&self) -> ReadingsResult<()> {
        let columns = sqlx::query_as::<_, (String, String)>(
            "SELECT column_name::text, data_type::text FROM information_schema.columns \
             WHERE table_schema = current_schema() AND table_name = $1",
        )
        .bind(TABLE_NAME)
        .fetch_all(&self.pool)
        .await
        .map_err(classify_sqlx_error)?;

        for (name, expected) in [
            ("region", &["text", "character varying"][..]),
            ("city", &["text", "character varying"][..]),
            ("temperature", &["double precision"][..]),
            ("humidity", &["double precision"][..]),
        ] {
            match columns.iter().find(|(column, _)| column == name) {
                Some((_, data_type)) if expected.contains(&data_type.as_str()) => {}
                Some((_, data_type)) => {
                    return Err(ReadingsError::SchemaConflict(format!(
                        "column {}.{} has type {}, expected {}",
                        TABLE_NAME,
                        name,
                        data_type,
                        expected.join(" or ")
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
        let definition = sqlx::query_scalar::<_, String>(
            "SELECT indexdef FROM pg_indexes \
             WHERE schemaname = current_schema() AND tablename = $1 AND indexname = $2",
        )
        .bind(TABLE_NAME)
        .bind(INDEX_NAME)
        .fetch_optional(&self.pool)
        .await
        .map_err(classify_sqlx_error)?;

        match definition {
            Some(def) if is_unique_key_index(&def) => Ok(()),
            Some(def) => Err(ReadingsError::SchemaConflict(format!(
                "index {} is not a unique index on (region, city): {}",
                INDEX_NAME, def
            ))),
            None => Err(ReadingsError::SchemaConflict(format!(
                "index {} is missing",
                INDEX_NAME
            ))),
        }
    }
}

/// True when a `pg_indexes.indexdef` describes a full unique index on (region, city).
fn is_unique_key_index(definition: &str) -> bool {
    definition.starts_with("CREATE UNIQUE INDEX") && definition.trim_end().ends_with("(region, city)")
}

#[async_trait]
impl ReadingStore for PgReadingStore {
    async fn ensure_schema(&self) -> ReadingsResult<()> {
        // Split SQL statements and execute them individually
        for statement in SCHEMA_SQL.split(';') {
            let trimmed = statement.trim();
            if !trimmed.is_empty() {
                sqlx::query(trimmed)
                    .execute(&self.pool)
                    .await
                    .map_err(classify_sqlx_error)?;
            }
        }

        self.verify_columns().await?;
        self.verify_index().await?;

        info!(table = TABLE_NAME, index = INDEX_NAME, "PostgreSQL schema ready");
        Ok(())
    }

    async fn upsert(&self, key: &ReadingKey, update: &ReadingUpdate) -> ReadingsResult<()> {
        sqlx::query(
            r#"
            INSERT INTO readings (region, city, temperature, humidity)
            VALUES ($1, $2, $3, $4)
            ON CONFLICT (region, city)
            DO UPDATE SET
                temperature = COALESCE(EXCLUDED.temperature, readings.temperature),
                humidity = COALESCE(EXCLUDED.humidity, readings.humidity)
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
             COUNT(*) AS readings FROM readings WHERE region = $1 GROUP BY region",
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
             WHERE region = $1 AND city = $2",
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
        "postgres"
    }
}
