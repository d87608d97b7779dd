//! Record repository abstraction
//!
//! The farm's records live in an external store; the core only needs the
//! read operations below. Two implementations ship with the crate:
//!
//! - `InMemoryRepository`: a loaded JSON `Dataset` (tests, one-off reports)
//! - `SledRepository`: local embedded store fed by `import`

mod dataset;
mod memory;
mod sled_store;

pub use dataset::*;
pub use memory::InMemoryRepository;
pub use sled_store::{ImportStats, SledRepository};

use async_trait::async_trait;
use chrono::{NaiveDate, NaiveDateTime};
use thiserror::Error;

use crate::types::{
    Batch, ConsumptionRecord, EnvironmentalReading, FeedingRecord, GrowthRecord, IndividualBird,
    MortalityRecord, ThermalMap,
};

#[derive(Debug, Error)]
pub enum RepositoryError {
    #[error("Batch not found: {0}")]
    BatchNotFound(String),

    #[error("Invalid dataset: {0}")]
    InvalidDataset(String),

    #[error("Storage error: {0}")]
    Storage(#[from] sled::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub type RepositoryResult<T> = Result<T, RepositoryError>;

/// Read access to a farm's records.
///
/// Every call returns a fresh snapshot; callers never mutate what they get.
/// Time ranges are inclusive on both ends.
#[async_trait]
pub trait RecordRepository: Send + Sync {
    async fn get_batch(&self, batch_id: &str) -> RepositoryResult<Batch>;

    async fn list_batches(&self) -> RepositoryResult<Vec<Batch>>;

    async fn list_environmental_readings(
        &self,
        batch_id: &str,
        from: NaiveDateTime,
        to: NaiveDateTime,
    ) -> RepositoryResult<Vec<EnvironmentalReading>>;

    async fn list_consumption_records(&self, batch_id: &str) -> RepositoryResult<Vec<ConsumptionRecord>>;

    async fn list_feeding_records(
        &self,
        batch_id: &str,
        from: NaiveDate,
        to: NaiveDate,
    ) -> RepositoryResult<Vec<FeedingRecord>>;

    /// Growth records in ascending date order
    async fn list_growth_records(&self, batch_id: &str) -> RepositoryResult<Vec<GrowthRecord>>;

    async fn list_mortality_records(&self, batch_id: &str) -> RepositoryResult<Vec<MortalityRecord>>;

    async fn list_individual_birds(&self, batch_id: &str) -> RepositoryResult<Vec<IndividualBird>>;

    async fn list_thermal_maps(&self, batch_id: &str) -> RepositoryResult<Vec<ThermalMap>>;

    /// Human-readable name for logging (e.g. "memory", "sled").
    fn source_name(&self) -> &str;
}
