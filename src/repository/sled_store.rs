//! Local record store on sled
//!
//! One tree per record kind. Time-stamped keys are
//! `batch_id ‖ 0x00 ‖ timestamp (u64 BE, sign-flipped ms) ‖ sequence (u64 BE)`
//! so a prefix scan returns one batch in chronological order and a range
//! scan answers inclusive time windows. Values are JSON.

use std::path::Path;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::{debug, info, warn};

use super::{Dataset, RecordRepository, RepositoryError, RepositoryResult};
use crate::types::{
    Batch, ConsumptionRecord, EnvironmentalReading, FeedingRecord, GrowthRecord, IndividualBird,
    MortalityRecord, ThermalMap,
};

const TREE_BATCHES: &str = "batches";
const TREE_ENVIRONMENTAL: &str = "environmental";
const TREE_CONSUMPTION: &str = "consumption";
const TREE_FEEDING: &str = "feeding";
const TREE_GROWTH: &str = "growth";
const TREE_MORTALITY: &str = "mortality";
const TREE_BIRDS: &str = "birds";
const TREE_THERMAL_MAPS: &str = "thermal_maps";

/// Counts written by one `import`
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ImportStats {
    pub batches: usize,
    pub records: usize,
}

/// Persistent record store
#[derive(Clone)]
pub struct SledRepository {
    db: Arc<sled::Db>,
}

// ============================================================================
// Key encoding
// ============================================================================

fn batch_prefix(batch_id: &str) -> Vec<u8> {
    let mut key = Vec::with_capacity(batch_id.len() + 1);
    key.extend_from_slice(batch_id.as_bytes());
    key.push(0);
    key
}

/// Milliseconds since epoch, sign bit flipped so pre-1970 times sort first
fn sortable_millis(at: NaiveDateTime) -> u64 {
    (at.and_utc().timestamp_millis() as u64) ^ (1u64 << 63)
}

fn time_key(batch_id: &str, at: NaiveDateTime, seq: u64) -> Vec<u8> {
    let mut key = batch_prefix(batch_id);
    key.extend_from_slice(&sortable_millis(at).to_be_bytes());
    key.extend_from_slice(&seq.to_be_bytes());
    key
}

fn start_of(day: NaiveDate) -> NaiveDateTime {
    day.and_time(NaiveTime::MIN)
}

fn end_of(day: NaiveDate) -> NaiveDateTime {
    day.and_hms_milli_opt(23, 59, 59, 999).unwrap_or_else(|| start_of(day))
}

impl SledRepository {
    /// Open or create the store at the specified path
    pub fn open<P: AsRef<Path>>(path: P) -> RepositoryResult<Self> {
        let db = sled::open(path.as_ref())?;
        info!(path = %path.as_ref().display(), "Opened record store");
        Ok(Self { db: Arc::new(db) })
    }

    /// Write every batch and record of a dataset.
    ///
    /// Re-importing a batch appends its records again; callers import a
    /// dataset once.
    pub fn import(&self, dataset: &Dataset) -> RepositoryResult<ImportStats> {
        let batches = self.db.open_tree(TREE_BATCHES)?;
        for batch in &dataset.batches {
            batches.insert(batch.id.as_bytes(), serde_json::to_vec(batch)?)?;
        }

        let mut records = 0;
        records += self.insert_timed(TREE_ENVIRONMENTAL, &dataset.environmental, |r| (&r.batch_id, r.recorded_at))?;
        records += self.insert_timed(TREE_CONSUMPTION, &dataset.consumption, |r| (&r.batch_id, r.recorded_at))?;
        records += self.insert_timed(TREE_FEEDING, &dataset.feeding, |r| (&r.batch_id, r.recorded_at))?;
        records += self.insert_timed(TREE_GROWTH, &dataset.growth, |r| (&r.batch_id, start_of(r.date)))?;
        records += self.insert_timed(TREE_MORTALITY, &dataset.mortality, |r| (&r.batch_id, start_of(r.date)))?;
        records += self.insert_timed(TREE_THERMAL_MAPS, &dataset.thermal_maps, |r| (&r.batch_id, r.recorded_at))?;

        let birds = self.db.open_tree(TREE_BIRDS)?;
        for bird in &dataset.birds {
            let mut key = batch_prefix(&bird.batch_id);
            key.extend_from_slice(bird.identifier.as_bytes());
            birds.insert(key, serde_json::to_vec(bird)?)?;
            records += 1;
        }

        self.db.flush()?;
        let stats = ImportStats { batches: dataset.batches.len(), records };
        info!(batches = stats.batches, records = stats.records, "Dataset imported");
        Ok(stats)
    }

    fn insert_timed<T, F>(&self, tree_name: &str, items: &[T], key_of: F) -> RepositoryResult<usize>
    where
        T: Serialize,
        F: Fn(&T) -> (&String, NaiveDateTime),
    {
        let tree = self.db.open_tree(tree_name)?;
        for item in items {
            let (batch_id, at) = key_of(item);
            let seq = self.db.generate_id()?;
            tree.insert(time_key(batch_id, at, seq), serde_json::to_vec(item)?)?;
        }
        debug!(tree = tree_name, count = items.len(), "Inserted records");
        Ok(items.len())
    }

    fn decode_all<T, I>(tree_name: &str, iter: I) -> RepositoryResult<Vec<T>>
    where
        T: DeserializeOwned,
        I: Iterator<Item = sled::Result<(sled::IVec, sled::IVec)>>,
    {
        let mut out = Vec::new();
        for item in iter {
            let (_key, value) = item?;
            match serde_json::from_slice::<T>(&value) {
                Ok(record) => out.push(record),
                Err(e) => warn!(tree = tree_name, error = %e, "Skipping undecodable record"),
            }
        }
        Ok(out)
    }

    fn scan_batch<T: DeserializeOwned>(&self, tree_name: &str, batch_id: &str) -> RepositoryResult<Vec<T>> {
        let tree = self.db.open_tree(tree_name)?;
        Self::decode_all(tree_name, tree.scan_prefix(batch_prefix(batch_id)))
    }

    fn scan_window<T: DeserializeOwned>(
        &self,
        tree_name: &str,
        batch_id: &str,
        from: NaiveDateTime,
        to: NaiveDateTime,
    ) -> RepositoryResult<Vec<T>> {
        if from > to {
            return Ok(Vec::new());
        }
        let tree = self.db.open_tree(tree_name)?;
        let start = time_key(batch_id, from, 0);
        let end = time_key(batch_id, to, u64::MAX);
        Self::decode_all(tree_name, tree.range(start..=end))
    }
}

#[async_trait]
impl RecordRepository for SledRepository {
    async fn get_batch(&self, batch_id: &str) -> RepositoryResult<Batch> {
        let tree = self.db.open_tree(TREE_BATCHES)?;
        match tree.get(batch_id.as_bytes())? {
            Some(value) => Ok(serde_json::from_slice(&value)?),
            None => Err(RepositoryError::BatchNotFound(batch_id.to_string())),
        }
    }

    async fn list_batches(&self) -> RepositoryResult<Vec<Batch>> {
        let tree = self.db.open_tree(TREE_BATCHES)?;
        Self::decode_all(TREE_BATCHES, tree.iter())
    }

    async fn list_environmental_readings(
        &self,
        batch_id: &str,
        from: NaiveDateTime,
        to: NaiveDateTime,
    ) -> RepositoryResult<Vec<EnvironmentalReading>> {
        self.scan_window(TREE_ENVIRONMENTAL, batch_id, from, to)
    }

    async fn list_consumption_records(&self, batch_id: &str) -> RepositoryResult<Vec<ConsumptionRecord>> {
        self.scan_batch(TREE_CONSUMPTION, batch_id)
    }

    async fn list_feeding_records(
        &self,
        batch_id: &str,
        from: NaiveDate,
        to: NaiveDate,
    ) -> RepositoryResult<Vec<FeedingRecord>> {
        self.scan_window(TREE_FEEDING, batch_id, start_of(from), end_of(to))
    }

    async fn list_growth_records(&self, batch_id: &str) -> RepositoryResult<Vec<GrowthRecord>> {
        self.scan_batch(TREE_GROWTH, batch_id)
    }

    async fn list_mortality_records(&self, batch_id: &str) -> RepositoryResult<Vec<MortalityRecord>> {
        self.scan_batch(TREE_MORTALITY, batch_id)
    }

    async fn list_individual_birds(&self, batch_id: &str) -> RepositoryResult<Vec<IndividualBird>> {
        self.scan_batch(TREE_BIRDS, batch_id)
    }

    async fn list_thermal_maps(&self, batch_id: &str) -> RepositoryResult<Vec<ThermalMap>> {
        self.scan_batch(TREE_THERMAL_MAPS, batch_id)
    }

    fn source_name(&self) -> &str {
        "sled"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sortable_millis_orders_across_epoch() {
        let before = NaiveDate::from_ymd_opt(1969, 12, 31).unwrap().and_hms_opt(0, 0, 0).unwrap();
        let after = NaiveDate::from_ymd_opt(1970, 1, 2).unwrap().and_hms_opt(0, 0, 0).unwrap();
        assert!(sortable_millis(before) < sortable_millis(after));
    }

    #[test]
    fn test_batch_prefix_does_not_match_longer_ids() {
        let at = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap().and_hms_opt(0, 0, 0).unwrap();
        let key = time_key("b10", at, 0);
        assert!(!key.starts_with(&batch_prefix("b1")));
        assert!(key.starts_with(&batch_prefix("b10")));
    }
}
