//! Behavioural tests for the reading store against SQLite.

use std::sync::Arc;
use std::time::Duration;

use futures::future::join_all;
use readings_common::ReadingUpdate;
use storage::{PoolSettings, ReadingStore, SqliteReadingStore};
use test_utils::{assert_approx_eq, key, memory_store};

// ============================================================================
// Region averages
// ============================================================================

#[tokio::test]
async fn test_average_excludes_absent_fields() {
    let store = memory_store().await;
    store.upsert(&key("R", "c1"), &ReadingUpdate::temperature(10.0)).await.unwrap();
    store.upsert(&key("R", "c2"), &ReadingUpdate::temperature(20.0)).await.unwrap();
    store.upsert(&key("R", "c3"), &ReadingUpdate::humidity(60.0)).await.unwrap();

    let avg = store.average_by_region("R").await.unwrap().unwrap();
    assert_eq!(avg.region, "R");
    assert_eq!(avg.temperature, Some(15.0));
    assert_eq!(avg.humidity, Some(60.0));
    assert_eq!(avg.readings, 3);
}

#[tokio::test]
async fn test_average_field_without_contributors_is_absent() {
    let store = memory_store().await;
    store.upsert(&key("R", "c1"), &ReadingUpdate::temperature(-2.0)).await.unwrap();

    let avg = store.average_by_region("R").await.unwrap().unwrap();
    assert_eq!(avg.temperature, Some(-2.0));
    assert_eq!(avg.humidity, None);
}

#[tokio::test]
async fn test_average_of_uneven_values() {
    let store = memory_store().await;
    for (city, t) in [("c1", 1.0), ("c2", 2.0), ("c3", 2.0)] {
        store.upsert(&key("U", city), &ReadingUpdate::temperature(t)).await.unwrap();
    }
    store.upsert(&key("U", "c4"), &ReadingUpdate::humidity(33.3)).await.unwrap();
    store.upsert(&key("U", "c5"), &ReadingUpdate::humidity(66.7)).await.unwrap();

    let avg = store.average_by_region("U").await.unwrap().unwrap();
    assert_approx_eq!(avg.temperature.unwrap(), 5.0 / 3.0, 1e-9);
    assert_approx_eq!(avg.humidity.unwrap(), 50.0, 1e-9);
    assert_eq!(avg.readings, 5);
}

#[tokio::test]
async fn test_empty_region_yields_none() {
    let store = memory_store().await;
    store.upsert(&key("R", "c1"), &ReadingUpdate::temperature(3.0)).await.unwrap();

    assert!(store.average_by_region("unknown-region").await.unwrap().is_none());
}

#[tokio::test]
async fn test_average_is_scoped_to_region() {
    let store = memory_store().await;
    store.upsert(&key("A", "c1"), &ReadingUpdate::temperature(0.0)).await.unwrap();
    store.upsert(&key("B", "c1"), &ReadingUpdate::temperature(30.0)).await.unwrap();

    let avg = store.average_by_region("A").await.unwrap().unwrap();
    assert_eq!(avg.temperature, Some(0.0));
    assert_eq!(avg.readings, 1);
}

// ============================================================================
// Uniqueness and concurrency
// ============================================================================

#[tokio::test]
async fn test_repeated_upserts_keep_single_record() {
    let store = memory_store().await;
    let k = key("A", "c1");
    for i in 0..20 {
        let update = if i % 2 == 0 {
            ReadingUpdate::temperature(i as f64)
        } else {
            ReadingUpdate::humidity(i as f64)
        };
        store.upsert(&k, &update).await.unwrap();
    }

    assert_eq!(store.count().await.unwrap(), 1);
    let reading = store.get(&k).await.unwrap().unwrap();
    assert_eq!(reading.temperature, Some(18.0));
    assert_eq!(reading.humidity, Some(19.0));
}

#[tokio::test]
async fn test_concurrent_field_updates_are_not_lost() {
    let store = memory_store().await;

    let mut handles = Vec::new();
    for city in 0..25 {
        let k = key("C", &format!("city-{:03}", city));
        let s = store.clone();
        let kt = k.clone();
        handles.push(tokio::spawn(async move {
            s.upsert(&kt, &ReadingUpdate::temperature(city as f64)).await
        }));
        let s = store.clone();
        handles.push(tokio::spawn(async move {
            s.upsert(&k, &ReadingUpdate::humidity(50.0)).await
        }));
    }

    for result in join_all(handles).await {
        result.unwrap().unwrap();
    }

    assert_eq!(store.count().await.unwrap(), 25);
    for city in 0..25 {
        let reading = store
            .get(&key("C", &format!("city-{:03}", city)))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(reading.temperature, Some(city as f64));
        assert_eq!(reading.humidity, Some(50.0));
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_upserts_across_connections() {
    let dir = tempfile::tempdir().unwrap();
    let settings = PoolSettings {
        max_connections: 8,
        acquire_timeout: Duration::from_secs(30),
    };
    let store = SqliteReadingStore::open(&dir.path().join("readings.db"), &settings)
        .await
        .unwrap();
    store.ensure_schema().await.unwrap();
    let store = Arc::new(store);

    // Every key gets interleaved temperature-only and humidity-only writes
    // from separate tasks; the last round of each field is a known value.
    const KEYS: u32 = 20;
    const ROUNDS: u32 = 10;
    let mut handles = Vec::new();
    for round in 0..ROUNDS {
        for city in 0..KEYS {
            let k = key("M", &format!("city-{:03}", city));
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

    assert_eq!(store.count().await.unwrap(), u64::from(KEYS));
    for city in 0..KEYS {
        let reading = store
            .get(&key("M", &format!("city-{:03}", city)))
            .await
            .unwrap()
            .unwrap();
        let temperature = reading.temperature.expect("temperature lost");
        assert!((0.0..f64::from(ROUNDS)).contains(&temperature));
        assert_eq!(reading.humidity, Some(f64::from(city)));
    }

    let avg = store.average_by_region("M").await.unwrap().unwrap();
    assert_eq!(avg.readings, u64::from(KEYS));
    assert_approx_eq!(avg.humidity.unwrap(), 9.5, 1e-9);
}

// ============================================================================
// File-backed store
// ============================================================================

#[tokio::test]
async fn test_file_store_persists_across_reopen() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("data").join("readings.db");
    let settings = PoolSettings::default();

    {
        let store = SqliteReadingStore::open(&path, &settings).await.unwrap();
        store.ensure_schema().await.unwrap();
        store.upsert(&key("A", "c1"), &ReadingUpdate::temperature(7.0)).await.unwrap();
    }

    let store = SqliteReadingStore::open(&path, &settings).await.unwrap();
    store.ensure_schema().await.unwrap();
    let reading = store.get(&key("A", "c1")).await.unwrap().unwrap();
    assert_eq!(reading.temperature, Some(7.0));
}

#[tokio::test]
async fn test_ping_and_backend() {
    let store = memory_store().await;
    store.ping().await.unwrap();
    assert_eq!(store.backend(), "sqlite");
}
