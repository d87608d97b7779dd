//! Per-page rollups over a batch's records

use std::collections::{BTreeMap, BTreeSet};

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use super::{mortality_rate, summary_stats, survival_rate, water_to_feed_ratio};
use crate::types::{
    ConsumptionRecord, EnvironmentalReading, FeedingRecord, MortalityRecord, SummaryStats,
};

/// Key used for mortality records without a cause
pub const UNKNOWN_CAUSE: &str = "Sin causa";
/// Key used for mortality records without a zone tag
pub const UNKNOWN_ZONE: &str = "N/A";

// ============================================================================
// Environment
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EnvironmentalSummary {
    pub reading_count: usize,
    pub temperature_c: Option<SummaryStats>,
    pub humidity_pct: Option<SummaryStats>,
    pub co2_ppm: Option<SummaryStats>,
    pub ammonia_ppm: Option<SummaryStats>,
    pub illumination_lux: Option<SummaryStats>,
}

pub fn environmental_summary(readings: &[EnvironmentalReading]) -> EnvironmentalSummary {
    EnvironmentalSummary {
        reading_count: readings.len(),
        temperature_c: summary_stats(readings.iter().map(|r| Some(r.temperature_c))),
        humidity_pct: summary_stats(readings.iter().map(|r| Some(r.humidity_pct))),
        co2_ppm: summary_stats(readings.iter().map(|r| r.co2_ppm)),
        ammonia_ppm: summary_stats(readings.iter().map(|r| r.ammonia_ppm)),
        illumination_lux: summary_stats(readings.iter().map(|r| r.illumination_lux)),
    }
}

// ============================================================================
// Consumption
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConsumptionSummary {
    pub record_count: usize,
    pub total_water_liters: f64,
    pub total_feed_kg: f64,
    pub total_waste_kg: f64,
    pub total_electricity_kwh: f64,
    /// Average per logged record
    pub average_water_liters: f64,
    pub average_feed_kg: f64,
    pub water_to_feed_ratio: f64,
}

pub fn consumption_summary(records: &[ConsumptionRecord]) -> ConsumptionSummary {
    let total_water_liters: f64 = records.iter().map(|r| r.water_liters).sum();
    let total_feed_kg: f64 = records.iter().map(|r| r.feed_kg).sum();
    let total_waste_kg: f64 = records.iter().filter_map(|r| r.waste_kg).sum();
    let total_electricity_kwh: f64 = records.iter().filter_map(|r| r.electricity_kwh).sum();

    let (average_water_liters, average_feed_kg) = if records.is_empty() {
        (0.0, 0.0)
    } else {
        let n = records.len() as f64;
        (total_water_liters / n, total_feed_kg / n)
    };

    ConsumptionSummary {
        record_count: records.len(),
        total_water_liters,
        total_feed_kg,
        total_waste_kg,
        total_electricity_kwh,
        average_water_liters,
        average_feed_kg,
        water_to_feed_ratio: water_to_feed_ratio(total_water_liters, total_feed_kg),
    }
}

// ============================================================================
// Feeding
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeedingSummary {
    pub total_supplied_kg: f64,
    /// Distinct calendar days with at least one delivery
    pub feeding_days: usize,
    pub average_per_day_kg: f64,
    /// Total supplied keyed by feed label
    pub by_feed_type: BTreeMap<String, f64>,
}

pub fn feeding_summary(records: &[FeedingRecord]) -> FeedingSummary {
    let total_supplied_kg: f64 = records.iter().map(|r| r.amount_supplied_kg).sum();
    let days: BTreeSet<NaiveDate> = records.iter().map(|r| r.recorded_at.date()).collect();

    let mut by_feed_type: BTreeMap<String, f64> = BTreeMap::new();
    for record in records {
        *by_feed_type.entry(record.feed_type.label().to_string()).or_insert(0.0) +=
            record.amount_supplied_kg;
    }

    let average_per_day_kg = if days.is_empty() {
        0.0
    } else {
        total_supplied_kg / days.len() as f64
    };

    FeedingSummary {
        total_supplied_kg,
        feeding_days: days.len(),
        average_per_day_kg,
        by_feed_type,
    }
}

// ============================================================================
// Mortality
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DailyMortality {
    pub date: NaiveDate,
    pub count: u64,
    /// Day's deaths as a percentage of the birds placed
    pub percentage: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MortalitySummary {
    pub total_deaths: u64,
    pub mortality_rate: f64,
    pub survival_rate: f64,
    pub by_cause: BTreeMap<String, u64>,
    pub by_zone: BTreeMap<String, u64>,
    pub daily: Vec<DailyMortality>,
}

/// Deaths per calendar day, ascending
pub fn daily_mortality(records: &[MortalityRecord], initial_count: u64) -> Vec<DailyMortality> {
    let mut per_day: BTreeMap<NaiveDate, u64> = BTreeMap::new();
    for record in records {
        *per_day.entry(record.date).or_insert(0) += u64::from(record.count);
    }
    per_day
        .into_iter()
        .map(|(date, count)| DailyMortality {
            date,
            count,
            percentage: mortality_rate(count, initial_count),
        })
        .collect()
}

pub fn mortality_summary(records: &[MortalityRecord], initial_count: u64) -> MortalitySummary {
    let total_deaths: u64 = records.iter().map(|r| u64::from(r.count)).sum();

    let mut by_cause: BTreeMap<String, u64> = BTreeMap::new();
    let mut by_zone: BTreeMap<String, u64> = BTreeMap::new();
    for record in records {
        let cause = record
            .cause
            .as_deref()
            .map(str::trim)
            .filter(|c| !c.is_empty())
            .unwrap_or(UNKNOWN_CAUSE);
        *by_cause.entry(cause.to_string()).or_insert(0) += u64::from(record.count);

        let zone = record.zone().unwrap_or(UNKNOWN_ZONE);
        *by_zone.entry(zone.to_string()).or_insert(0) += u64::from(record.count);
    }

    MortalitySummary {
        total_deaths,
        mortality_rate: mortality_rate(total_deaths, initial_count),
        survival_rate: survival_rate(total_deaths, initial_count),
        by_cause,
        by_zone,
        daily: daily_mortality(records, initial_count),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::FeedType;

    fn day(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 2, d).unwrap()
    }

    fn death(d: u32, count: u32, cause: Option<&str>, notes: Option<&str>) -> MortalityRecord {
        MortalityRecord {
            batch_id: "b1".to_string(),
            date: day(d),
            count,
            cause: cause.map(str::to_string),
            notes: notes.map(str::to_string),
        }
    }

    fn feeding(d: u32, hour: u32, feed_type: FeedType, kg: f64) -> FeedingRecord {
        FeedingRecord {
            batch_id: "b1".to_string(),
            recorded_at: day(d).and_hms_opt(hour, 0, 0).unwrap(),
            feed_type,
            amount_supplied_kg: kg,
            supplied_at_hour: None,
            responsible_party: "Operario".to_string(),
        }
    }

    #[test]
    fn test_mortality_summary_groups_cause_and_zone() {
        let records = vec![
            death(1, 2, Some("Ascitis"), Some("Zona: A1")),
            death(1, 1, None, None),
            death(3, 2, Some("Ascitis"), Some("Zona: A1, revisar ventilación")),
        ];
        let summary = mortality_summary(&records, 1000);

        assert_eq!(summary.total_deaths, 5);
        assert!((summary.mortality_rate - 0.5).abs() < 1e-12);
        assert!((summary.survival_rate - 99.5).abs() < 1e-12);
        assert_eq!(summary.by_cause.get("Ascitis"), Some(&4));
        assert_eq!(summary.by_cause.get(UNKNOWN_CAUSE), Some(&1));
        assert_eq!(summary.by_zone.get("A1"), Some(&4));
        assert_eq!(summary.by_zone.get(UNKNOWN_ZONE), Some(&1));

        assert_eq!(summary.daily.len(), 2);
        assert_eq!(summary.daily[0].count, 3);
        assert!((summary.daily[0].percentage - 0.3).abs() < 1e-12);
    }

    #[test]
    fn test_feeding_summary_per_day_and_type() {
        let records = vec![
            feeding(1, 7, FeedType::Starter, 50.0),
            feeding(1, 17, FeedType::Starter, 30.0),
            feeding(2, 7, FeedType::Grower, 40.0),
        ];
        let summary = feeding_summary(&records);

        assert_eq!(summary.total_supplied_kg, 120.0);
        assert_eq!(summary.feeding_days, 2);
        assert_eq!(summary.average_per_day_kg, 60.0);
        assert_eq!(summary.by_feed_type.get("Iniciador"), Some(&80.0));
        assert_eq!(summary.by_feed_type.get("Crecimiento"), Some(&40.0));

        let empty = feeding_summary(&[]);
        assert_eq!(empty.average_per_day_kg, 0.0);
    }

    #[test]
    fn test_consumption_summary_empty_is_zeroed() {
        let summary = consumption_summary(&[]);
        assert_eq!(summary.record_count, 0);
        assert_eq!(summary.average_feed_kg, 0.0);
        assert_eq!(summary.water_to_feed_ratio, 0.0);
    }

    #[test]
    fn test_environmental_summary_skips_missing_fields() {
        let reading = EnvironmentalReading {
            batch_id: "b1".to_string(),
            recorded_at: day(1).and_hms_opt(10, 0, 0).unwrap(),
            temperature_c: 24.0,
            humidity_pct: 60.0,
            co2_ppm: None,
            ammonia_ppm: Some(8.0),
            illumination_lux: None,
            location: None,
            notes: None,
        };
        let summary = environmental_summary(&[reading]);
        assert_eq!(summary.reading_count, 1);
        assert_eq!(summary.temperature_c.map(|s| s.mean), Some(24.0));
        assert!(summary.co2_ppm.is_none());
        assert_eq!(summary.ammonia_ppm.map(|s| s.max), Some(8.0));
    }
}
