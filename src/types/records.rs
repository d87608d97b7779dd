//! Farm records: batches, environmental readings, consumption, feeding,
//! growth, mortality, individual birds and thermal maps.
//!
//! Records are read-only snapshots fetched from the record repository for a
//! single computation. Enum variants serialize with the labels the farm
//! backend stores (`activo`, `saludable`, `Iniciador`, ...).

use std::sync::OnceLock;

use chrono::{NaiveDate, NaiveDateTime};
use regex::Regex;
use serde::{Deserialize, Serialize};

// ============================================================================
// Enumerations
// ============================================================================

/// Lifecycle status of a batch
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default, Hash)]
pub enum BatchStatus {
    #[default]
    #[serde(rename = "activo")]
    Active,
    #[serde(rename = "inactivo")]
    Inactive,
    #[serde(rename = "vendido")]
    Sold,
}

impl std::fmt::Display for BatchStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            BatchStatus::Active => write!(f, "Active"),
            BatchStatus::Inactive => write!(f, "Inactive"),
            BatchStatus::Sold => write!(f, "Sold"),
        }
    }
}

/// Health state of an individually weighed bird
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default, Hash)]
pub enum HealthState {
    #[default]
    #[serde(rename = "saludable")]
    Healthy,
    #[serde(rename = "enfermo")]
    Sick,
    #[serde(rename = "recuperandose")]
    Recovering,
}

/// Feed formulation, in the order a batch moves through them
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum FeedType {
    #[serde(rename = "Pre-iniciador")]
    PreStarter,
    #[serde(rename = "Iniciador")]
    Starter,
    #[serde(rename = "Crecimiento")]
    Grower,
    #[serde(rename = "Finalizador")]
    Finisher,
}

impl FeedType {
    /// Label used by the farm backend and in report keys
    pub fn label(&self) -> &'static str {
        match self {
            FeedType::PreStarter => "Pre-iniciador",
            FeedType::Starter => "Iniciador",
            FeedType::Grower => "Crecimiento",
            FeedType::Finisher => "Finalizador",
        }
    }

    /// Formulation normally fed at a given bird age
    pub fn for_age(age_days: i64) -> Self {
        match age_days {
            i64::MIN..=7 => FeedType::PreStarter,
            8..=21 => FeedType::Starter,
            22..=35 => FeedType::Grower,
            _ => FeedType::Finisher,
        }
    }
}

impl std::fmt::Display for FeedType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.label())
    }
}

// ============================================================================
// Batch
// ============================================================================

/// A cohort of birds raised together from a start date ("lote")
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Batch {
    pub id: String,
    pub code: String,
    pub start_date: NaiveDate,
    pub initial_count: u32,
    pub breed: String,
    #[serde(default)]
    pub status: BatchStatus,
}

// ============================================================================
// Time-stamped records
// ============================================================================

/// One environmental reading in the shed
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct EnvironmentalReading {
    pub batch_id: String,
    pub recorded_at: NaiveDateTime,
    pub temperature_c: f64,
    pub humidity_pct: f64,
    #[serde(default)]
    pub co2_ppm: Option<f64>,
    #[serde(default)]
    pub ammonia_ppm: Option<f64>,
    #[serde(default)]
    pub illumination_lux: Option<f64>,
    #[serde(default)]
    pub location: Option<String>,
    #[serde(default)]
    pub notes: Option<String>,
}

/// Water and feed drawn over a logging interval
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ConsumptionRecord {
    pub batch_id: String,
    pub recorded_at: NaiveDateTime,
    pub water_liters: f64,
    pub feed_kg: f64,
    #[serde(default)]
    pub feed_type: Option<FeedType>,
    #[serde(default)]
    pub waste_kg: Option<f64>,
    #[serde(default)]
    pub electricity_kwh: Option<f64>,
}

/// A feed delivery to the batch
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct FeedingRecord {
    pub batch_id: String,
    pub recorded_at: NaiveDateTime,
    pub feed_type: FeedType,
    pub amount_supplied_kg: f64,
    /// Hour of delivery as `HH:MM` when it differs from `recorded_at`
    #[serde(default)]
    pub supplied_at_hour: Option<String>,
    pub responsible_party: String,
}

/// Weekly or daily average weighing of a batch
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct GrowthRecord {
    pub batch_id: String,
    pub date: NaiveDate,
    pub average_weight_g: f64,
    #[serde(default)]
    pub daily_gain_g: Option<f64>,
    /// Share of birds within ±10% of the average weight (0-100)
    #[serde(default)]
    pub uniformity_pct: Option<f64>,
}

/// Deaths recorded on a given day
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct MortalityRecord {
    pub batch_id: String,
    pub date: NaiveDate,
    pub count: u32,
    #[serde(default)]
    pub cause: Option<String>,
    /// Free text; operators tag the shed sector as `Zona: B2`
    #[serde(default)]
    pub notes: Option<String>,
}

static ZONE_PATTERN: OnceLock<Option<Regex>> = OnceLock::new();

fn zone_pattern() -> Option<&'static Regex> {
    ZONE_PATTERN
        .get_or_init(|| Regex::new(r"Zona:\s*([A-C][1-3])").ok())
        .as_ref()
}

impl MortalityRecord {
    /// Shed zone tag (`A1`..`C3`) parsed from the notes, if present
    pub fn zone(&self) -> Option<&str> {
        let notes = self.notes.as_deref()?;
        zone_pattern()?
            .captures(notes)
            .and_then(|caps| caps.get(1))
            .map(|m| m.as_str())
    }
}

/// A single weighed bird
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct IndividualBird {
    pub batch_id: String,
    pub identifier: String,
    pub weight_g: f64,
    #[serde(default)]
    pub health_state: HealthState,
}

/// Temperature grid sampled across the shed floor
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ThermalMap {
    pub batch_id: String,
    pub recorded_at: NaiveDateTime,
    /// Row-major grid of temperatures in °C
    pub temperatures: Vec<Vec<f64>>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn mortality(notes: Option<&str>) -> MortalityRecord {
        MortalityRecord {
            batch_id: "L-001".to_string(),
            date: NaiveDate::from_ymd_opt(2024, 1, 10).unwrap(),
            count: 3,
            cause: None,
            notes: notes.map(str::to_string),
        }
    }

    #[test]
    fn test_zone_parsed_from_notes() {
        assert_eq!(mortality(Some("Zona: B2 cerca del bebedero")).zone(), Some("B2"));
        assert_eq!(mortality(Some("sin zona")).zone(), None);
        assert_eq!(mortality(Some("Zona: D4")).zone(), None, "D4 is outside the shed grid");
        assert_eq!(mortality(None).zone(), None);
    }

    #[test]
    fn test_enum_labels_roundtrip_backend_strings() {
        let json = serde_json::to_string(&FeedType::PreStarter).unwrap();
        assert_eq!(json, "\"Pre-iniciador\"");
        let status: BatchStatus = serde_json::from_str("\"vendido\"").unwrap();
        assert_eq!(status, BatchStatus::Sold);
        let health: HealthState = serde_json::from_str("\"recuperandose\"").unwrap();
        assert_eq!(health, HealthState::Recovering);
    }

    #[test]
    fn test_feed_type_for_age() {
        assert_eq!(FeedType::for_age(1), FeedType::PreStarter);
        assert_eq!(FeedType::for_age(14), FeedType::Starter);
        assert_eq!(FeedType::for_age(30), FeedType::Grower);
        assert_eq!(FeedType::for_age(42), FeedType::Finisher);
    }
}
