//! Storage for the readings service.
//!
//! Provides one interface over two backends:
//! - PostgreSQL for deployed services
//! - SQLite (in-memory or file) for tests and local runs

pub mod postgres;
pub mod sqlite;
pub mod store;

pub use postgres::PgReadingStore;
pub use sqlite::SqliteReadingStore;
pub use store::{classify_sqlx_error, PoolSettings, ReadingStore, INDEX_NAME, TABLE_NAME};
