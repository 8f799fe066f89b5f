//! Application state for the aggregation API.

use std::sync::Arc;
use std::time::Instant;

use anyhow::Result;
use storage::{PgReadingStore, ReadingStore, SqliteReadingStore};
use tracing::{info, warn};

use crate::config::{ServiceConfig, StoreLocation};

/// Shared application state.
pub struct AppState {
    /// Backing store; the only owner of reading records.
    pub store: Arc<dyn ReadingStore>,

    /// Process start, reported by the health endpoint.
    pub started_at: Instant,
}

impl AppState {
    pub fn new(store: Arc<dyn ReadingStore>) -> Self {
        Self {
            store,
            started_at: Instant::now(),
        }
    }

    /// Open the store named by the configuration.
    pub async fn connect(config: &ServiceConfig) -> Result<Self> {
        let settings = config.pool_settings();

        let store: Arc<dyn ReadingStore> = match config.store_location()? {
            StoreLocation::Postgres(url) => {
                info!(max_connections = settings.max_connections, "Connecting to PostgreSQL");
                Arc::new(PgReadingStore::connect(&url, &settings).await?)
            }
            StoreLocation::SqliteFile(path) => {
                Arc::new(SqliteReadingStore::open(&path, &settings).await?)
            }
            StoreLocation::Memory => {
                warn!("No DATABASE_URL configured, readings are kept in memory");
                Arc::new(SqliteReadingStore::open_memory().await?)
            }
        };

        Ok(Self::new(store))
    }

    /// Create the schema. Must finish before the listener accepts traffic.
    pub async fn bootstrap(&self) -> Result<()> {
        self.store.ensure_schema().await?;
        info!(backend = self.store.backend(), "Reading store ready");
        Ok(())
    }
}
