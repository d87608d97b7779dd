//! Sled Record Store Integration Tests
//!
//! Imports datasets into a temporary sled store and reads them back through
//! the `RecordRepository` trait.

use std::sync::Arc;

use chrono::{NaiveDate, NaiveDateTime};
use tokio_util::sync::CancellationToken;

use avicola_monitor::repository::{Dataset, RecordRepository, RepositoryError, SledRepository};
use avicola_monitor::types::{
    Batch, BatchStatus, EnvironmentalReading, GrowthRecord, HealthState, IndividualBird,
    MortalityRecord,
};
use avicola_monitor::{build_batch_report, Monitor, MonitorConfig};

fn june(day: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(2024, 6, day).unwrap()
}

fn at(day: u32, hour: u32, minute: u32) -> NaiveDateTime {
    june(day).and_hms_opt(hour, minute, 0).unwrap()
}

fn batch(id: &str) -> Batch {
    Batch {
        id: id.to_string(),
        code: id.to_uppercase(),
        start_date: june(1),
        initial_count: 500,
        breed: "Ross 308".to_string(),
        status: BatchStatus::Active,
    }
}

fn reading(batch_id: &str, recorded_at: NaiveDateTime, temperature: f64) -> EnvironmentalReading {
    EnvironmentalReading {
        batch_id: batch_id.to_string(),
        recorded_at,
        temperature_c: temperature,
        humidity_pct: 65.0,
        co2_ppm: None,
        ammonia_ppm: None,
        illumination_lux: None,
        location: None,
        notes: None,
    }
}

/// Two batches whose ids share a prefix, with readings inserted out of order
fn dataset() -> Dataset {
    Dataset {
        batches: vec![batch("b1"), batch("b10")],
        environmental: vec![
            reading("b1", at(10, 18, 0), 29.0),
            reading("b1", at(10, 6, 30), 24.0),
            reading("b10", at(10, 7, 0), 99.0),
            reading("b1", at(9, 23, 59), 23.0),
            reading("b1", at(11, 0, 0), 22.0),
            reading("b1", at(10, 12, 0), 27.0),
        ],
        growth: vec![
            GrowthRecord {
                batch_id: "b1".to_string(),
                date: june(14),
                average_weight_g: 410.0,
                daily_gain_g: None,
                uniformity_pct: Some(84.0),
            },
            GrowthRecord {
                batch_id: "b1".to_string(),
                date: june(7),
                average_weight_g: 180.0,
                daily_gain_g: Some(22.0),
                uniformity_pct: Some(88.0),
            },
        ],
        mortality: vec![MortalityRecord {
            batch_id: "b10".to_string(),
            date: june(3),
            count: 4,
            cause: None,
            notes: None,
        }],
        birds: vec![
            IndividualBird {
                batch_id: "b1".to_string(),
                identifier: "AV-002".to_string(),
                weight_g: 420.0,
                health_state: HealthState::Healthy,
            },
            IndividualBird {
                batch_id: "b1".to_string(),
                identifier: "AV-001".to_string(),
                weight_g: 395.0,
                health_state: HealthState::Recovering,
            },
        ],
        ..Dataset::default()
    }
}

fn open_store() -> (tempfile::TempDir, SledRepository) {
    let dir = tempfile::tempdir().unwrap();
    let store = SledRepository::open(dir.path().join("store")).unwrap();
    (dir, store)
}

#[tokio::test]
async fn import_counts_batches_and_records() {
    let (_dir, store) = open_store();
    let stats = store.import(&dataset()).unwrap();
    assert_eq!(stats.batches, 2);
    assert_eq!(stats.records, 6 + 2 + 1 + 2);

    let mut ids: Vec<String> = store.list_batches().await.unwrap().into_iter().map(|b| b.id).collect();
    ids.sort();
    assert_eq!(ids, vec!["b1".to_string(), "b10".to_string()]);
    assert_eq!(store.get_batch("b10").await.unwrap().code, "B10");
}

#[tokio::test]
async fn reading_window_is_scoped_and_chronological() {
    let (_dir, store) = open_store();
    store.import(&dataset()).unwrap();

    let day = store
        .list_environmental_readings("b1", at(10, 0, 0), at(10, 23, 59))
        .await
        .unwrap();
    let temps: Vec<f64> = day.iter().map(|r| r.temperature_c).collect();
    assert_eq!(temps, vec![24.0, 27.0, 29.0], "only b1 on 10 June, in time order");

    // Both ends inclusive
    let edges = store
        .list_environmental_readings("b1", at(9, 23, 59), at(11, 0, 0))
        .await
        .unwrap();
    assert_eq!(edges.len(), 5);

    let inverted = store
        .list_environmental_readings("b1", at(11, 0, 0), at(10, 0, 0))
        .await
        .unwrap();
    assert!(inverted.is_empty());
}

#[tokio::test]
async fn per_batch_lists_do_not_leak_across_prefixes() {
    let (_dir, store) = open_store();
    store.import(&dataset()).unwrap();

    assert!(store.list_mortality_records("b1").await.unwrap().is_empty());
    assert_eq!(store.list_mortality_records("b10").await.unwrap().len(), 1);

    let growth = store.list_growth_records("b1").await.unwrap();
    let dates: Vec<NaiveDate> = growth.iter().map(|g| g.date).collect();
    assert_eq!(dates, vec![june(7), june(14)]);

    let birds = store.list_individual_birds("b1").await.unwrap();
    assert_eq!(birds.len(), 2);
    assert!(store.list_individual_birds("b10").await.unwrap().is_empty());
}

#[tokio::test]
async fn missing_batch_is_not_found() {
    let (_dir, store) = open_store();
    store.import(&dataset()).unwrap();
    let err = store.get_batch("b2").await.unwrap_err();
    assert!(matches!(err, RepositoryError::BatchNotFound(_)));
}

#[tokio::test]
async fn store_survives_reopen() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("store");
    {
        let store = SledRepository::open(&path).unwrap();
        store.import(&dataset()).unwrap();
    }

    let store = SledRepository::open(&path).unwrap();
    assert_eq!(store.source_name(), "sled");
    let report = build_batch_report(&store, "b1", june(10), &MonitorConfig::default())
        .await
        .unwrap();
    assert_eq!(report.age_days, 10);
    assert_eq!(report.environment.summary.reading_count, 3);
    assert_eq!(report.distribution.bird_count, 2);
}

#[tokio::test]
async fn monitor_refreshes_from_store() {
    let (_dir, store) = open_store();
    store.import(&dataset()).unwrap();

    let repo: Arc<dyn RecordRepository> = Arc::new(store);
    let mut monitor = Monitor::new(repo, "b1", MonitorConfig::default(), CancellationToken::new());

    let outcome = monitor.tick(june(10)).await.unwrap();
    assert_eq!(outcome.report.kpis.living_birds, 500);
    assert!(outcome.new_alerts.is_empty(), "all readings within the default band");
}

#[tokio::test]
async fn reading_imported_late_still_raises_alert() {
    let (_dir, store) = open_store();
    let store = Arc::new(store);
    store
        .import(&Dataset {
            batches: vec![batch("b1")],
            environmental: vec![reading("b1", at(12, 12, 0), 25.0)],
            ..Dataset::default()
        })
        .unwrap();

    let repo: Arc<dyn RecordRepository> = store.clone();
    let mut monitor = Monitor::new(repo, "b1", MonitorConfig::default(), CancellationToken::new());
    assert!(monitor.tick(june(12)).await.unwrap().new_alerts.is_empty());

    // A sensor upload arrives after the refresh, timestamped earlier in the day
    store
        .import(&Dataset {
            environmental: vec![reading("b1", at(12, 9, 0), 39.0)],
            ..Dataset::default()
        })
        .unwrap();

    let outcome = monitor.tick(june(12)).await.unwrap();
    assert_eq!(outcome.new_alerts.len(), 1);
    assert_eq!(outcome.new_alerts[0].value, 39.0);
    assert_eq!(outcome.report.environment.summary.reading_count, 2);

    assert!(monitor.tick(june(12)).await.unwrap().new_alerts.is_empty());
}

#[tokio::test]
async fn reading_at_an_already_seen_instant_is_evaluated() {
    let (_dir, store) = open_store();
    let store = Arc::new(store);
    let mut first = reading("b1", at(12, 12, 0), 25.0);
    first.location = Some("Norte".to_string());
    store
        .import(&Dataset {
            batches: vec![batch("b1")],
            environmental: vec![first],
            ..Dataset::default()
        })
        .unwrap();

    let repo: Arc<dyn RecordRepository> = store.clone();
    let mut monitor = Monitor::new(repo, "b1", MonitorConfig::default(), CancellationToken::new());
    assert!(monitor.tick(june(12)).await.unwrap().new_alerts.is_empty());

    let mut second = reading("b1", at(12, 12, 0), 38.0);
    second.location = Some("Sur".to_string());
    store
        .import(&Dataset {
            environmental: vec![second],
            ..Dataset::default()
        })
        .unwrap();

    assert_eq!(monitor.tick(june(12)).await.unwrap().new_alerts.len(), 1);
}
