//! Repository tests against a real PostgreSQL database.
//!
//! These run only when `TEST_DATABASE_URL` is set; without it each test
//! skips so the suite stays green on machines without a database.

use chrono::Utc;
use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;
use std::time::Duration;

use domain::models::TelemetryRecord;
use persistence::repositories::{DeviceRepository, TelemetryRepository};

async fn test_pool() -> Option<PgPool> {
    let url = std::env::var("TEST_DATABASE_URL").ok()?;

    let pool = PgPoolOptions::new()
        .max_connections(5)
        .acquire_timeout(Duration::from_secs(10))
        .connect(&url)
        .await
        .expect("Failed to connect to test database");

    sqlx::migrate!("../persistence/src/migrations")
        .run(&pool)
        .await
        .expect("Failed to run migrations");

    Some(pool)
}

fn unique_device_id(prefix: &str) -> String {
    format!(
        "{}-{}",
        prefix,
        Utc::now().timestamp_nanos_opt().unwrap_or_default()
    )
}

fn record(device_id: &str, battery: i32) -> TelemetryRecord {
    TelemetryRecord {
        device_id: device_id.to_string(),
        latitude: 40.0,
        longitude: -74.0,
        battery_level: battery,
        altitude: Some(120.0),
        speed: None,
        temperature: Some(21.5),
        humidity: None,
        pressure: None,
        heading: Some(90.0),
        status: Some("ACTIVE".into()),
        timestamp: Utc::now(),
    }
}

#[tokio::test]
async fn ensure_device_is_idempotent() {
    let Some(pool) = test_pool().await else {
        eprintln!("TEST_DATABASE_URL not set; skipping");
        return;
    };
    let devices = DeviceRepository::new(pool);
    let device_id = unique_device_id("dev");

    devices.ensure_device(&device_id).await.unwrap();
    devices.ensure_device(&device_id).await.unwrap();

    let found = devices.find_by_device_id(&device_id).await.unwrap().unwrap();
    assert_eq!(found.device_id, device_id);
    assert_eq!(found.name.as_deref(), Some(device_id.as_str()));
    assert_eq!(found.status.as_deref(), Some("ACTIVE"));
}

#[tokio::test]
async fn insert_then_latest_roundtrip() {
    let Some(pool) = test_pool().await else {
        eprintln!("TEST_DATABASE_URL not set; skipping");
        return;
    };
    let devices = DeviceRepository::new(pool.clone());
    let telemetry = TelemetryRepository::new(pool);
    let device_id = unique_device_id("drone");

    devices.ensure_device(&device_id).await.unwrap();
    telemetry.insert(&record(&device_id, 55)).await.unwrap();

    let latest = telemetry
        .latest_for_device(&device_id)
        .await
        .unwrap()
        .expect("row just inserted");
    assert_eq!(latest.battery_level, 55);
    assert_eq!(latest.latitude, 40.0);
    assert_eq!(latest.status.as_deref(), Some("ACTIVE"));
    assert_eq!(latest.speed, None);
}

#[tokio::test]
async fn history_is_newest_first_and_limited() {
    let Some(pool) = test_pool().await else {
        eprintln!("TEST_DATABASE_URL not set; skipping");
        return;
    };
    let devices = DeviceRepository::new(pool.clone());
    let telemetry = TelemetryRepository::new(pool);
    let device_id = unique_device_id("drone");

    devices.ensure_device(&device_id).await.unwrap();
    for battery in [10, 20, 30, 40] {
        let mut row = record(&device_id, battery);
        row.timestamp = Utc::now() + chrono::Duration::milliseconds(battery as i64);
        telemetry.insert(&row).await.unwrap();
    }

    let history = telemetry.history(&device_id, 3).await.unwrap();
    assert_eq!(history.len(), 3);
    assert_eq!(history[0].battery_level, 40);
    assert_eq!(history[1].battery_level, 30);
    assert_eq!(history[2].battery_level, 20);
}

#[tokio::test]
async fn latest_for_unknown_device_is_none() {
    let Some(pool) = test_pool().await else {
        eprintln!("TEST_DATABASE_URL not set; skipping");
        return;
    };
    let telemetry = TelemetryRepository::new(pool);
    assert!(telemetry
        .latest_for_device("no-such-device")
        .await
        .unwrap()
        .is_none());
}
