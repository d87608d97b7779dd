//! Avícola Monitor: poultry house monitoring core
//!
//! Computes what a broiler farm dashboard shows for a batch from raw
//! records: ideal growth, time buckets, rates, weight spread and alerts.
//!
//! ## Architecture
//!
//! - **Growth Model**: Gompertz ideal-weight curve and growth comparison
//! - **Aggregation**: hourly/daily buckets, summaries, mortality and feed ratios
//! - **Distribution**: weight density estimate and coefficient of variation
//! - **Repository**: record access seam with in-memory and sled backends
//! - **Dashboard / Monitor**: batch report and periodic refresh loop

pub mod aggregation;
pub mod alerts;
pub mod config;
pub mod dashboard;
pub mod distribution;
pub mod growth_model;
pub mod monitor;
pub mod repository;
pub mod thermal_map;
pub mod types;

// Re-export configuration
pub use config::{ConfigError, MonitorConfig};

// Re-export record and series types
pub use types::{
    Batch, BatchStatus, Bucket, ConsumptionRecord, CurvePoint, DailyBucket, DistributionPoint,
    EnvironmentalReading, FeedType, FeedingRecord, GrowthRecord, HealthState, HourlyBucket,
    IndividualBird, MortalityRecord, SummaryStats, ThermalMap,
};

pub use growth_model::GompertzCurve;
pub use alerts::{Alert, AlertEvaluator};
pub use dashboard::{build_batch_report, BatchReport, DashboardKpis};
pub use monitor::{Monitor, MonitorStats, RefreshOutcome};

// Re-export storage
pub use repository::{
    Dataset, InMemoryRepository, RecordRepository, RepositoryError, RepositoryResult,
    SledRepository,
};
