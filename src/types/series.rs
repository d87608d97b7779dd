//! Chart-ready series types produced by the growth model, aggregation engine
//! and distribution estimator.

use std::collections::BTreeMap;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

// ============================================================================
// Bucket values
// ============================================================================

/// Aggregated value of one field in one time slot.
///
/// `Empty` means no record contributed to the slot, which is not the same as
/// a slot whose records summed to zero. Serializes to `null` / number so
/// charts render a gap rather than a dip.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(from = "Option<f64>", into = "Option<f64>")]
pub enum Bucket {
    #[default]
    Empty,
    Value(f64),
}

impl Bucket {
    pub fn value(&self) -> Option<f64> {
        match self {
            Bucket::Empty => None,
            Bucket::Value(v) => Some(*v),
        }
    }

    pub fn is_empty(&self) -> bool {
        matches!(self, Bucket::Empty)
    }
}

impl From<Option<f64>> for Bucket {
    fn from(value: Option<f64>) -> Self {
        match value {
            Some(v) => Bucket::Value(v),
            None => Bucket::Empty,
        }
    }
}

impl From<Bucket> for Option<f64> {
    fn from(bucket: Bucket) -> Self {
        bucket.value()
    }
}

/// One hour-of-day slot (`00:00`..`23:00`) with a bucket per selected field
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HourlyBucket {
    pub hour: String,
    #[serde(flatten)]
    pub values: BTreeMap<String, Bucket>,
}

impl HourlyBucket {
    pub fn value(&self, field: &str) -> Bucket {
        self.values.get(field).copied().unwrap_or_default()
    }
}

/// One calendar day with a per-field average over that day's records
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DailyBucket {
    pub date: NaiveDate,
    pub record_count: usize,
    #[serde(flatten)]
    pub values: BTreeMap<String, Bucket>,
}

impl DailyBucket {
    pub fn value(&self, field: &str) -> Bucket {
        self.values.get(field).copied().unwrap_or_default()
    }
}

// ============================================================================
// Statistics and curves
// ============================================================================

/// Minimum, maximum and mean over the present values of a field
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SummaryStats {
    pub min: f64,
    pub max: f64,
    pub mean: f64,
}

/// Ideal weight at an integer age
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CurvePoint {
    pub day: i64,
    pub weight_g: f64,
}

/// Estimated number of birds around a weight
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DistributionPoint {
    pub weight_g: f64,
    pub frequency: f64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bucket_serializes_as_null_or_number() {
        assert_eq!(serde_json::to_string(&Bucket::Empty).unwrap(), "null");
        assert_eq!(serde_json::to_string(&Bucket::Value(0.0)).unwrap(), "0.0");
        let parsed: Bucket = serde_json::from_str("12.5").unwrap();
        assert_eq!(parsed, Bucket::Value(12.5));
    }

    #[test]
    fn test_hourly_bucket_flattens_fields() {
        let mut values = BTreeMap::new();
        values.insert("feed_kg".to_string(), Bucket::Value(3.0));
        values.insert("water_liters".to_string(), Bucket::Empty);
        let bucket = HourlyBucket { hour: "07:00".to_string(), values };

        let json = serde_json::to_value(&bucket).unwrap();
        assert_eq!(json["hour"], "07:00");
        assert_eq!(json["feed_kg"], 3.0);
        assert!(json["water_liters"].is_null());
        assert_eq!(bucket.value("missing"), Bucket::Empty);
    }
}
