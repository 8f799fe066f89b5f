//! Common test fixtures for reading tests.

use std::sync::Arc;

use readings_common::{ReadingKey, ReadingUpdate};
use storage::{ReadingStore, SqliteReadingStore};

/// Region whose fixture readings average to known values.
pub const FIXTURE_REGION: &str = "R";

/// Three readings in [`FIXTURE_REGION`]: temperatures {10, 20, absent},
/// humidities {absent, 40, 80}. Mean temperature 15, mean humidity 60.
pub fn fixture_readings() -> Vec<(ReadingKey, ReadingUpdate)> {
    vec![
        (key(FIXTURE_REGION, "city-001"), ReadingUpdate::temperature(10.0)),
        (
            key(FIXTURE_REGION, "city-002"),
            ReadingUpdate {
                temperature: Some(20.0),
                humidity: Some(40.0),
            },
        ),
        (key(FIXTURE_REGION, "city-003"), ReadingUpdate::humidity(80.0)),
    ]
}

/// Build a key from literals known to be valid.
pub fn key(region: &str, city: &str) -> ReadingKey {
    ReadingKey {
        region: region.to_string(),
        city: city.to_string(),
    }
}

/// An empty in-memory store with its schema in place.
pub async fn memory_store() -> Arc<SqliteReadingStore> {
    let store = SqliteReadingStore::open_memory()
        .await
        .expect("open in-memory store");
    store.ensure_schema().await.expect("create schema");
    Arc::new(store)
}

/// An in-memory store holding [`fixture_readings`].
pub async fn seeded_store() -> Arc<SqliteReadingStore> {
    let store = memory_store().await;
    for (key, update) in fixture_readings() {
        store.upsert(&key, &update).await.expect("seed fixture reading");
    }
    store
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_seeded_store_averages() {
        let store = seeded_store().await;
        let avg = store
            .average_by_region(FIXTURE_REGION)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(avg.temperature, Some(15.0));
        assert_eq!(avg.humidity, Some(60.0));
        assert_eq!(avg.readings, 3);
    }
}
