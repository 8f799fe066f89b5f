//! PostgreSQL store tests.
//!
//! These run only when `TEST_DATABASE_URL` points at a disposable database.
//! Each test works in its own region so runs do not interfere.

use std::sync::Arc;

use futures::future::join_all;
use readings_common::{ReadingKey, ReadingUpdate};
use storage::{PgReadingStore, PoolSettings, ReadingStore};

use test_utils::require_env;

macro_rules! require_database {
    () => {{
        let url = require_env!("TEST_DATABASE_URL");
        let store = PgReadingStore::connect(&url, &PoolSettings::default())
            .await
            .unwrap();
        store.ensure_schema().await.unwrap();
        store
    }};
}

fn unique_region(prefix: &str) -> String {
    let nanos = std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .unwrap()
        .as_nanos();
    format!("{}-{}", prefix, nanos)
}

#[tokio::test]
async fn test_pg_schema_is_idempotent() {
    let store = require_database!();
    store.ensure_schema().await.unwrap();
    store.ping().await.unwrap();
}

#[tokio::test]
async fn test_pg_partial_upsert() {
    let store = require_database!();
    let region = unique_region("partial");
    let k = ReadingKey::new(region.as_str(), "city-001").unwrap();

    store.upsert(&k, &ReadingUpdate::temperature(20.0)).await.unwrap();
    store.upsert(&k, &ReadingUpdate::humidity(50.0)).await.unwrap();

    let reading = store.get(&k).await.unwrap().unwrap();
    assert_eq!(reading.temperature, Some(20.0));
    assert_eq!(reading.humidity, Some(50.0));
}

#[tokio::test]
async fn test_pg_average_excludes_absent() {
    let store = require_database!();
    let region = unique_region("avg");

    for (city, update) in [
        ("c1", ReadingUpdate::temperature(10.0)),
        ("c2", ReadingUpdate::temperature(20.0)),
        ("c3", ReadingUpdate::humidity(80.0)),
    ] {
        let k = ReadingKey::new(region.as_str(), city).unwrap();
        store.upsert(&k, &update).await.unwrap();
    }

    let avg = store.average_by_region(&region).await.unwrap().unwrap();
    assert_eq!(avg.temperature, Some(15.0));
    assert_eq!(avg.humidity, Some(80.0));
    assert_eq!(avg.readings, 3);

    assert!(store
        .average_by_region(&unique_region("empty"))
        .await
        .unwrap()
        .is_none());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_pg_concurrent_partial_upserts() {
    let store = Arc::new(require_database!());
    let region = unique_region("concurrent");

    const KEYS: u32 = 20;
    const ROUNDS: u32 = 10;
    let mut handles = Vec::new();
    for round in 0..ROUNDS {
        for city in 0..KEYS {
            let k = ReadingKey::new(region.as_str(), format!("city-{:03}", city)).unwrap();
            let s = store.clone();
            let kt = k.clone();
            handles.push(tokio::spawn(async move {
                s.upsert(&kt, &ReadingUpdate::temperature(f64::from(round))).await
            }));
            let s = store.clone();
            handles.push(tokio::spawn(async move {
                s.upsert(&k, &ReadingUpdate::humidity(f64::from(city))).await
            }));
        }
    }

    for result in join_all(handles).await {
        result.unwrap().unwrap();
    }

    for city in 0..KEYS {
        let k = ReadingKey::new(region.as_str(), format!("city-{:03}", city)).unwrap();
        let reading = store.get(&k).await.unwrap().unwrap();
        assert!(reading.temperature.is_some(), "temperature lost for {}", k.city);
        assert_eq!(reading.humidity, Some(f64::from(city)));
    }

    let avg = store.average_by_region(&region).await.unwrap().unwrap();
    assert_eq!(avg.readings, u64::from(KEYS));
}

#[tokio::test]
async fn test_pg_unreachable_is_store_unavailable() {
    if std::env::var("TEST_DATABASE_URL").is_err() {
        eprintln!("SKIPPED: TEST_DATABASE_URL not set");
        return;
    }
    let settings = PoolSettings {
        max_connections: 1,
        acquire_timeout: std::time::Duration::from_secs(1),
    };
    let result = PgReadingStore::connect("postgres://nobody@127.0.0.1:1/none", &settings).await;
    let err = result.err().expect("connection to port 1 should fail");
    assert_eq!(err.error_code(), "STORE_UNAVAILABLE");
}
