//! JSON bundle of every record kind for one or more batches

use std::collections::HashSet;
use std::path::Path;
use std::sync::OnceLock;

use regex::Regex;
use serde::{Deserialize, Serialize};
use tracing::info;

use super::{RepositoryError, RepositoryResult};
use crate::types::{
    Batch, ConsumptionRecord, EnvironmentalReading, FeedingRecord, GrowthRecord, IndividualBird,
    MortalityRecord, ThermalMap,
};

/// Records exported from (or destined for) a record store
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Dataset {
    #[serde(default)]
    pub batches: Vec<Batch>,
    #[serde(default)]
    pub environmental: Vec<EnvironmentalReading>,
    #[serde(default)]
    pub consumption: Vec<ConsumptionRecord>,
    #[serde(default)]
    pub feeding: Vec<FeedingRecord>,
    #[serde(default)]
    pub growth: Vec<GrowthRecord>,
    #[serde(default)]
    pub mortality: Vec<MortalityRecord>,
    #[serde(default)]
    pub birds: Vec<IndividualBird>,
    #[serde(default)]
    pub thermal_maps: Vec<ThermalMap>,
}

static HOUR_PATTERN: OnceLock<Option<Regex>> = OnceLock::new();

fn is_clock_time(value: &str) -> bool {
    HOUR_PATTERN
        .get_or_init(|| Regex::new(r"^([01]\d|2[0-3]):[0-5]\d$").ok())
        .as_ref()
        .is_some_and(|re| re.is_match(value))
}

impl Dataset {
    pub fn from_json_str(contents: &str) -> RepositoryResult<Self> {
        Ok(serde_json::from_str(contents)?)
    }

    pub fn from_json_file(path: &Path) -> RepositoryResult<Self> {
        let contents = std::fs::read_to_string(path)?;
        let dataset = Self::from_json_str(&contents)?;
        info!(
            path = %path.display(),
            batches = dataset.batches.len(),
            records = dataset.record_count(),
            "Loaded dataset"
        );
        Ok(dataset)
    }

    pub fn to_json_pretty(&self) -> RepositoryResult<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Total records across all kinds, batches excluded
    pub fn record_count(&self) -> usize {
        self.environmental.len()
            + self.consumption.len()
            + self.feeding.len()
            + self.growth.len()
            + self.mortality.len()
            + self.birds.len()
            + self.thermal_maps.len()
    }

    /// Check every record against the backend's field constraints.
    ///
    /// Returns one message per offending record; empty means valid.
    pub fn validate(&self) -> Vec<String> {
        let mut errors = Vec::new();
        let mut batch_ids: HashSet<&str> = HashSet::new();

        for batch in &self.batches {
            if !batch_ids.insert(batch.id.as_str()) {
                errors.push(format!("batch {}: duplicate id", batch.id));
            }
            if batch.initial_count == 0 {
                errors.push(format!("batch {}: initial_count must be > 0", batch.id));
            }
        }

        let check_batch = |kind: &str, batch_id: &str, errors: &mut Vec<String>| {
            if !batch_ids.contains(batch_id) {
                errors.push(format!("{kind}: unknown batch '{batch_id}'"));
            }
        };

        for r in &self.environmental {
            check_batch("environmental", &r.batch_id, &mut errors);
            if !(-50.0..=100.0).contains(&r.temperature_c) {
                errors.push(format!(
                    "environmental {}: temperature {:.1} outside -50..100 °C",
                    r.recorded_at, r.temperature_c
                ));
            }
            if !(0.0..=100.0).contains(&r.humidity_pct) {
                errors.push(format!(
                    "environmental {}: humidity {:.1} outside 0..100 %",
                    r.recorded_at, r.humidity_pct
                ));
            }
            for (name, value) in [("co2", r.co2_ppm), ("ammonia", r.ammonia_ppm), ("illumination", r.illumination_lux)] {
                if value.is_some_and(|v| v < 0.0) {
                    errors.push(format!("environmental {}: {name} cannot be negative", r.recorded_at));
                }
            }
        }

        for r in &self.consumption {
            check_batch("consumption", &r.batch_id, &mut errors);
            if r.water_liters < 0.0 || r.feed_kg < 0.0 || r.waste_kg.is_some_and(|w| w < 0.0) {
                errors.push(format!("consumption {}: quantities cannot be negative", r.recorded_at));
            }
        }

        for r in &self.feeding {
            check_batch("feeding", &r.batch_id, &mut errors);
            if r.amount_supplied_kg <= 0.0 {
                errors.push(format!("feeding {}: amount_supplied_kg must be > 0", r.recorded_at));
            }
            if let Some(hour) = &r.supplied_at_hour {
                if !is_clock_time(hour) {
                    errors.push(format!("feeding {}: supplied_at_hour '{hour}' is not HH:MM", r.recorded_at));
                }
            }
        }

        for r in &self.growth {
            check_batch("growth", &r.batch_id, &mut errors);
            if r.average_weight_g <= 0.0 {
                errors.push(format!("growth {}: average_weight_g must be > 0", r.date));
            }
            if r.uniformity_pct.is_some_and(|u| !(0.0..=100.0).contains(&u)) {
                errors.push(format!("growth {}: uniformity outside 0..100 %", r.date));
            }
        }

        for r in &self.mortality {
            check_batch("mortality", &r.batch_id, &mut errors);
            if r.count == 0 {
                errors.push(format!("mortality {}: count must be > 0", r.date));
            }
        }

        for r in &self.birds {
            check_batch("birds", &r.batch_id, &mut errors);
            if r.weight_g <= 0.0 {
                errors.push(format!("bird {}: weight_g must be > 0", r.identifier));
            }
        }

        for r in &self.thermal_maps {
            check_batch("thermal_maps", &r.batch_id, &mut errors);
        }

        errors
    }

    /// `validate()` as a `Result`, joining messages into one error
    pub fn ensure_valid(&self) -> RepositoryResult<()> {
        let errors = self.validate();
        if errors.is_empty() {
            Ok(())
        } else {
            Err(RepositoryError::InvalidDataset(errors.join("; ")))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"{
        "batches": [
            {"id": "b1", "code": "L-01", "start_date": "2024-01-01", "initial_count": 1000, "breed": "Cobb 500", "status": "activo"}
        ],
        "feeding": [
            {"batch_id": "b1", "recorded_at": "2024-01-02T07:00:00", "feed_type": "Iniciador",
             "amount_supplied_kg": 40.0, "supplied_at_hour": "07:30", "responsible_party": "Ana"}
        ],
        "mortality": [
            {"batch_id": "b1", "date": "2024-01-02", "count": 2, "notes": "Zona: C3"}
        ]
    }"#;

    #[test]
    fn test_parse_sample_with_missing_sections() {
        let dataset = Dataset::from_json_str(SAMPLE).unwrap();
        assert_eq!(dataset.batches.len(), 1);
        assert_eq!(dataset.record_count(), 2);
        assert!(dataset.environmental.is_empty());
        assert!(dataset.validate().is_empty(), "{:?}", dataset.validate());
    }

    #[test]
    fn test_validate_flags_bad_records() {
        let mut dataset = Dataset::from_json_str(SAMPLE).unwrap();
        dataset.feeding[0].supplied_at_hour = Some("7h".to_string());
        dataset.mortality[0].count = 0;
        dataset.mortality[0].batch_id = "ghost".to_string();

        let errors = dataset.validate();
        assert!(errors.iter().any(|e| e.contains("HH:MM")));
        assert!(errors.iter().any(|e| e.contains("count must be > 0")));
        assert!(errors.iter().any(|e| e.contains("unknown batch 'ghost'")));
        assert!(dataset.ensure_valid().is_err());
    }

    #[test]
    fn test_clock_time_pattern() {
        assert!(is_clock_time("00:00"));
        assert!(is_clock_time("23:59"));
        assert!(!is_clock_time("24:00"));
        assert!(!is_clock_time("7:30"));
    }
}
