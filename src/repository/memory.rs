//! In-memory repository backed by a loaded `Dataset`

use std::path::Path;

use async_trait::async_trait;
use chrono::{NaiveDate, NaiveDateTime};

use super::{Dataset, RecordRepository, RepositoryError, RepositoryResult};
use crate::types::{
    Batch, ConsumptionRecord, EnvironmentalReading, FeedingRecord, GrowthRecord, IndividualBird,
    MortalityRecord, ThermalMap,
};

/// Serves records straight out of a `Dataset`
#[derive(Debug, Clone, Default)]
pub struct InMemoryRepository {
    dataset: Dataset,
}

impl InMemoryRepository {
    pub fn new(dataset: Dataset) -> Self {
        Self { dataset }
    }

    pub fn from_json_file(path: &Path) -> RepositoryResult<Self> {
        Ok(Self::new(Dataset::from_json_file(path)?))
    }

    pub fn dataset(&self) -> &Dataset {
        &self.dataset
    }
}

fn for_batch<'a, T: Clone + 'a>(
    records: impl IntoIterator<Item = &'a T>,
    batch_id: &str,
    batch_of: impl Fn(&T) -> &str,
) -> Vec<T> {
    records
        .into_iter()
        .filter(|r| batch_of(*r) == batch_id)
        .cloned()
        .collect()
}

#[async_trait]
impl RecordRepository for InMemoryRepository {
    async fn get_batch(&self, batch_id: &str) -> RepositoryResult<Batch> {
        self.dataset
            .batches
            .iter()
            .find(|b| b.id == batch_id)
            .cloned()
            .ok_or_else(|| RepositoryError::BatchNotFound(batch_id.to_string()))
    }

    async fn list_batches(&self) -> RepositoryResult<Vec<Batch>> {
        Ok(self.dataset.batches.clone())
    }

    async fn list_environmental_readings(
        &self,
        batch_id: &str,
        from: NaiveDateTime,
        to: NaiveDateTime,
    ) -> RepositoryResult<Vec<EnvironmentalReading>> {
        let mut readings: Vec<EnvironmentalReading> = self
            .dataset
            .environmental
            .iter()
            .filter(|r| r.batch_id == batch_id && r.recorded_at >= from && r.recorded_at <= to)
            .cloned()
            .collect();
        readings.sort_by_key(|r| r.recorded_at);
        Ok(readings)
    }

    async fn list_consumption_records(&self, batch_id: &str) -> RepositoryResult<Vec<ConsumptionRecord>> {
        let mut records = for_batch(&self.dataset.consumption, batch_id, |r| r.batch_id.as_str());
        records.sort_by_key(|r| r.recorded_at);
        Ok(records)
    }

    async fn list_feeding_records(
        &self,
        batch_id: &str,
        from: NaiveDate,
        to: NaiveDate,
    ) -> RepositoryResult<Vec<FeedingRecord>> {
        let mut records: Vec<FeedingRecord> = self
            .dataset
            .feeding
            .iter()
            .filter(|r| {
                let day = r.recorded_at.date();
                r.batch_id == batch_id && day >= from && day <= to
            })
            .cloned()
            .collect();
        records.sort_by_key(|r| r.recorded_at);
        Ok(records)
    }

    async fn list_growth_records(&self, batch_id: &str) -> RepositoryResult<Vec<GrowthRecord>> {
        let mut records = for_batch(&self.dataset.growth, batch_id, |r| r.batch_id.as_str());
        records.sort_by_key(|r| r.date);
        Ok(records)
    }

    async fn list_mortality_records(&self, batch_id: &str) -> RepositoryResult<Vec<MortalityRecord>> {
        let mut records = for_batch(&self.dataset.mortality, batch_id, |r| r.batch_id.as_str());
        records.sort_by_key(|r| r.date);
        Ok(records)
    }

    async fn list_individual_birds(&self, batch_id: &str) -> RepositoryResult<Vec<IndividualBird>> {
        Ok(for_batch(&self.dataset.birds, batch_id, |r| r.batch_id.as_str()))
    }

    async fn list_thermal_maps(&self, batch_id: &str) -> RepositoryResult<Vec<ThermalMap>> {
        let mut maps = for_batch(&self.dataset.thermal_maps, batch_id, |r| r.batch_id.as_str());
        maps.sort_by_key(|m| m.recorded_at);
        Ok(maps)
    }

    fn source_name(&self) -> &str {
        "memory"
    }
}
