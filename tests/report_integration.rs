//! Batch Report Integration Tests
//!
//! Builds full batch reports through the in-memory repository, the way the
//! CLI `report` command does, and checks the figures end to end.

use chrono::{NaiveDate, NaiveDateTime};

use avicola_monitor::alerts::{AlertKind, Breach};
use avicola_monitor::repository::{Dataset, InMemoryRepository, RepositoryError};
use avicola_monitor::types::{
    Batch, BatchStatus, Bucket, ConsumptionRecord, EnvironmentalReading, FeedType, FeedingRecord,
    GrowthRecord, HealthState, IndividualBird, MortalityRecord, ThermalMap,
};
use avicola_monitor::{build_batch_report, MonitorConfig};

const BATCH: &str = "lote-1";

fn march(day: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(2024, 3, day).unwrap()
}

fn at(day: u32, hour: u32) -> NaiveDateTime {
    march(day).and_hms_opt(hour, 0, 0).unwrap()
}

fn reading(day: u32, hour: u32, temperature: f64) -> EnvironmentalReading {
    EnvironmentalReading {
        batch_id: BATCH.to_string(),
        recorded_at: at(day, hour),
        temperature_c: temperature,
        humidity_pct: 60.0,
        co2_ppm: Some(1800.0),
        ammonia_ppm: Some(12.0),
        illumination_lux: None,
        location: Some("Centro".to_string()),
        notes: None,
    }
}

fn consumption(day: u32, water: f64, feed: f64) -> ConsumptionRecord {
    ConsumptionRecord {
        batch_id: BATCH.to_string(),
        recorded_at: at(day, 10),
        water_liters: water,
        feed_kg: feed,
        feed_type: Some(FeedType::Grower),
        waste_kg: Some(1.0),
        electricity_kwh: Some(10.0),
    }
}

fn growth(day: u32, weight: f64, uniformity: Option<f64>) -> GrowthRecord {
    GrowthRecord {
        batch_id: BATCH.to_string(),
        date: march(day),
        average_weight_g: weight,
        daily_gain_g: None,
        uniformity_pct: uniformity,
    }
}

fn deaths(day: u32, count: u32, cause: Option<&str>, notes: Option<&str>) -> MortalityRecord {
    MortalityRecord {
        batch_id: BATCH.to_string(),
        date: march(day),
        count,
        cause: cause.map(str::to_string),
        notes: notes.map(str::to_string),
    }
}

/// A 1000-bird batch placed on 1 March, with one record of each kind after
/// 25 March that a report for the 25th must ignore.
fn dataset() -> Dataset {
    Dataset {
        batches: vec![Batch {
            id: BATCH.to_string(),
            code: "L-0301".to_string(),
            start_date: march(1),
            initial_count: 1000,
            breed: "Cobb 500".to_string(),
            status: BatchStatus::Active,
        }],
        environmental: vec![
            reading(24, 10, 25.0),
            reading(25, 10, 27.0),
            reading(25, 11, 36.0),
            reading(26, 10, 40.0),
        ],
        consumption: vec![
            consumption(24, 200.0, 100.0),
            consumption(25, 250.0, 125.0),
            consumption(26, 999.0, 999.0),
        ],
        feeding: vec![FeedingRecord {
            batch_id: BATCH.to_string(),
            recorded_at: at(25, 7),
            feed_type: FeedType::Grower,
            amount_supplied_kg: 130.0,
            supplied_at_hour: Some("07:30".to_string()),
            responsible_party: "Turno mañana".to_string(),
        }],
        growth: vec![
            growth(18, 600.0, Some(80.0)),
            growth(25, 900.0, Some(86.0)),
            growth(30, 1400.0, None),
        ],
        mortality: vec![
            deaths(10, 3, Some("Ascitis"), Some("Zona: A1")),
            deaths(20, 2, None, None),
            deaths(28, 10, Some("Golpe de calor"), None),
        ],
        birds: [850.0, 900.0, 900.0, 950.0, 900.0]
            .iter()
            .enumerate()
            .map(|(i, &w)| IndividualBird {
                batch_id: BATCH.to_string(),
                identifier: format!("AV-{:03}", i + 1),
                weight_g: w,
                health_state: HealthState::Healthy,
            })
            .collect(),
        thermal_maps: vec![ThermalMap {
            batch_id: BATCH.to_string(),
            recorded_at: at(25, 14),
            temperatures: vec![vec![26.0, 27.5], vec![28.0, 31.0]],
        }],
    }
}

#[tokio::test]
async fn report_combines_every_section() {
    let repo = InMemoryRepository::new(dataset());
    let config = MonitorConfig::default();
    let report = build_batch_report(&repo, BATCH, march(25), &config).await.unwrap();

    assert_eq!(report.age_days, 25);
    assert_eq!(report.batch.code, "L-0301");

    // Mortality ignores the 28 March record
    assert_eq!(report.mortality.total_deaths, 5);
    assert_eq!(report.mortality.by_cause.get("Ascitis"), Some(&3));
    assert_eq!(report.mortality.by_cause.get("Sin causa"), Some(&2));
    assert_eq!(report.mortality.by_zone.get("A1"), Some(&3));
    assert_eq!(report.kpis.living_birds, 995);
    assert_eq!(report.kpis.mortality_rate, 0.5);

    // Environment: the 36 °C reading trips the high temperature alert
    assert_eq!(report.environment.summary.reading_count, 2);
    assert_eq!(report.environment.hourly.len(), 24);
    assert_eq!(report.environment.hourly[11].value("temperature_c"), Bucket::Value(36.0));
    assert_eq!(report.environment.hourly[12].value("temperature_c"), Bucket::Empty);
    assert_eq!(report.environment.hourly[10].value("co2_ppm"), Bucket::Value(1800.0));
    assert_eq!(report.environment.hourly[11].value("ammonia_ppm"), Bucket::Value(12.0));
    assert_eq!(report.environment.hourly[10].value("illumination_lux"), Bucket::Empty);
    assert_eq!(report.environment.alerts.len(), 1);
    let alert = &report.environment.alerts[0];
    assert_eq!((alert.kind, alert.breach), (AlertKind::Temperature, Breach::High));
    assert_eq!(alert.message, "Temperatura alta: 36.0°C (límite: 35.0°C)");

    // Today against yesterday
    assert_eq!(report.kpis.temperature_c, Some(31.5));
    assert_eq!(report.kpis.temperature_trend, 26.0);
    assert_eq!(report.kpis.water_today_liters, 250.0);
    assert_eq!(report.kpis.water_trend, 25.0);
    assert_eq!(report.kpis.feed_trend, 25.0);
    assert_eq!(report.kpis.water_to_feed_ratio, 2.0);
    assert_eq!(report.kpis.electricity_today_kwh, 10.0);
    assert_eq!(report.kpis.electricity_trend, 0.0);
    assert_eq!(report.kpis.deaths_today, 0);
    assert_eq!(report.kpis.weight_trend, 50.0);

    // Consumption to date excludes the 26th
    assert_eq!(report.consumption.summary.record_count, 2);
    assert_eq!(report.consumption.summary.total_feed_kg, 225.0);
    assert_eq!(report.consumption.daily.len(), 2);
    assert_eq!(report.consumption.daily[1].value("electricity_kwh"), Bucket::Value(10.0));
    assert_eq!(report.consumption.daily[1].value("water_liters"), Bucket::Value(250.0));
    assert!((report.consumption.electricity_cost - 3.0).abs() < 1e-9);
    assert_eq!(report.feeding.total_supplied_kg, 130.0);

    // Growth against the ideal curve
    assert_eq!(report.kpis.ideal_weight_g, 920.0);
    assert_eq!(report.kpis.average_weight_g, Some(900.0));
    assert_eq!(report.growth.comparison.len(), 2);
    assert_eq!(report.growth.comparison[1].ideal_g, 920.0);
    assert_eq!(report.growth.comparison[1].gain_g, Some(300.0));
    assert_eq!(report.growth.ideal_curve.len(), 42);
    let fcr = report.kpis.feed_conversion_ratio.expect("gain recorded");
    assert!((fcr - 225.0 / (995.0 * 0.3)).abs() < 1e-9);

    // Individual weights
    assert_eq!(report.distribution.bird_count, 5);
    assert_eq!(report.distribution.mean_weight_g, 900.0);
    assert_eq!(report.distribution.points.len(), config.distribution.steps);
    assert!((report.distribution.coefficient_of_variation - 3.5136418446).abs() < 1e-6);

    let thermal = report.thermal_map.as_ref().expect("thermal map on the day");
    assert_eq!((thermal.rows, thermal.cols), (2, 2));
    assert_eq!(thermal.hottest.map(|c| c.temperature_c), Some(31.0));
}

#[tokio::test]
async fn report_for_an_earlier_day_replays_history() {
    let repo = InMemoryRepository::new(dataset());
    let report = build_batch_report(&repo, BATCH, march(20), &MonitorConfig::default())
        .await
        .unwrap();

    assert_eq!(report.age_days, 20);
    assert_eq!(report.mortality.total_deaths, 5);
    assert_eq!(report.growth.comparison.len(), 1);
    assert!(report.environment.alerts.is_empty());
    assert_eq!(report.kpis.temperature_c, None);
    assert_eq!(report.kpis.temperature_trend, 0.0);
    assert!(report.thermal_map.is_none());
    // A single weighing gives no gain to convert feed against
    assert_eq!(report.kpis.feed_conversion_ratio, None);
}

#[tokio::test]
async fn deaths_today_trend_against_yesterday() {
    let mut data = dataset();
    data.mortality.push(deaths(24, 2, None, None));
    data.mortality.push(deaths(25, 1, Some("Ascitis"), None));
    data.mortality.push(deaths(25, 2, None, None));
    let repo = InMemoryRepository::new(data);

    let report = build_batch_report(&repo, BATCH, march(25), &MonitorConfig::default())
        .await
        .unwrap();
    assert_eq!(report.kpis.deaths_today, 3);
    assert_eq!(report.kpis.mortality_trend, 50.0);
    assert_eq!(report.mortality.total_deaths, 10);
    assert_eq!(report.kpis.living_birds, 990);
}

#[tokio::test]
async fn invalid_thermal_map_is_skipped() {
    let mut data = dataset();
    data.thermal_maps[0].temperatures = vec![vec![26.0, 27.0], vec![28.0]];
    let repo = InMemoryRepository::new(data);

    let report = build_batch_report(&repo, BATCH, march(25), &MonitorConfig::default())
        .await
        .unwrap();
    assert!(report.thermal_map.is_none());
    assert_eq!(report.kpis.living_birds, 995);
}

#[tokio::test]
async fn tighter_thresholds_raise_more_alerts() {
    let mut config = MonitorConfig::default();
    config.thresholds.nh3.max = 10.0;
    let repo = InMemoryRepository::new(dataset());

    let report = build_batch_report(&repo, BATCH, march(25), &config).await.unwrap();
    let kinds: Vec<_> = report.environment.alerts.iter().map(|a| a.kind).collect();
    assert!(kinds.contains(&AlertKind::Ammonia));
    assert!(kinds.contains(&AlertKind::Temperature));
}

#[tokio::test]
async fn unknown_batch_is_not_found() {
    let repo = InMemoryRepository::new(dataset());
    let err = build_batch_report(&repo, "lote-9", march(25), &MonitorConfig::default())
        .await
        .unwrap_err();
    assert!(matches!(err, RepositoryError::BatchNotFound(id) if id == "lote-9"));
}

#[tokio::test]
async fn dataset_file_round_trip_gives_same_report() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("lote.json");
    std::fs::write(&path, dataset().to_json_pretty().unwrap()).unwrap();

    let config = MonitorConfig::default();
    let from_file = InMemoryRepository::from_json_file(&path).unwrap();
    let direct = InMemoryRepository::new(dataset());

    let a = build_batch_report(&from_file, BATCH, march(25), &config).await.unwrap();
    let b = build_batch_report(&direct, BATCH, march(25), &config).await.unwrap();
    assert_eq!(a, b);
}

#[test]
fn dataset_validation_flags_orphans() {
    let mut data = dataset();
    assert!(data.ensure_valid().is_ok());

    data.growth[0].batch_id = "ghost".to_string();
    let errors = data.validate();
    assert_eq!(errors.len(), 1);
    assert!(errors[0].contains("ghost"));
    assert!(matches!(data.ensure_valid(), Err(RepositoryError::InvalidDataset(_))));
}
