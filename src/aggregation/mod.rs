//! Aggregation engine: time buckets, summary statistics and batch ratios
//!
//! Everything here is a pure function over record slices. Degenerate inputs
//! (no records, zero denominators) produce sentinels rather than errors, so
//! callers never see `NaN` or infinities.
//!
//! - `bucket_by_hour`: 24 hour-of-day slots, summed
//! - `bucket_by_day`: calendar days with data, averaged
//! - `summary_stats`: min / max / mean
//! - mortality, survival, feed conversion, trend and water:feed ratios
//! - `summaries`: per-page rollups (environment, consumption, feeding, mortality)

pub mod summaries;

use std::collections::BTreeMap;

use chrono::{NaiveDate, NaiveDateTime, Timelike};

use crate::types::{
    Bucket, ConsumptionRecord, DailyBucket, EnvironmentalReading, HourlyBucket, SummaryStats,
};

pub use summaries::*;

// ============================================================================
// Record fields
// ============================================================================

/// Records that can be placed on a timeline
pub trait Timestamped {
    fn recorded_at(&self) -> NaiveDateTime;
}

impl Timestamped for EnvironmentalReading {
    fn recorded_at(&self) -> NaiveDateTime {
        self.recorded_at
    }
}

impl Timestamped for ConsumptionRecord {
    fn recorded_at(&self) -> NaiveDateTime {
        self.recorded_at
    }
}

/// A named numeric field of a record type.
///
/// `extract` returns `None` when the record does not carry the field.
pub struct Field<R> {
    pub name: &'static str,
    pub extract: fn(&R) -> Option<f64>,
}

impl<R> Clone for Field<R> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<R> Copy for Field<R> {}

impl<R> std::fmt::Debug for Field<R> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Field").field("name", &self.name).finish()
    }
}

/// Predefined fields for the farm record types
pub mod fields {
    use super::Field;
    use crate::types::{ConsumptionRecord, EnvironmentalReading};

    fn temperature(r: &EnvironmentalReading) -> Option<f64> {
        Some(r.temperature_c)
    }
    fn humidity(r: &EnvironmentalReading) -> Option<f64> {
        Some(r.humidity_pct)
    }
    fn co2(r: &EnvironmentalReading) -> Option<f64> {
        r.co2_ppm
    }
    fn ammonia(r: &EnvironmentalReading) -> Option<f64> {
        r.ammonia_ppm
    }
    fn illumination(r: &EnvironmentalReading) -> Option<f64> {
        r.illumination_lux
    }
    fn water(r: &ConsumptionRecord) -> Option<f64> {
        Some(r.water_liters)
    }
    fn feed(r: &ConsumptionRecord) -> Option<f64> {
        Some(r.feed_kg)
    }
    fn waste(r: &ConsumptionRecord) -> Option<f64> {
        r.waste_kg
    }
    fn electricity(r: &ConsumptionRecord) -> Option<f64> {
        r.electricity_kwh
    }

    pub const TEMPERATURE: Field<EnvironmentalReading> = Field { name: "temperature_c", extract: temperature };
    pub const HUMIDITY: Field<EnvironmentalReading> = Field { name: "humidity_pct", extract: humidity };
    pub const CO2: Field<EnvironmentalReading> = Field { name: "co2_ppm", extract: co2 };
    pub const AMMONIA: Field<EnvironmentalReading> = Field { name: "ammonia_ppm", extract: ammonia };
    pub const ILLUMINATION: Field<EnvironmentalReading> = Field { name: "illumination_lux", extract: illumination };
    pub const WATER: Field<ConsumptionRecord> = Field { name: "water_liters", extract: water };
    pub const FEED: Field<ConsumptionRecord> = Field { name: "feed_kg", extract: feed };
    pub const WASTE: Field<ConsumptionRecord> = Field { name: "waste_kg", extract: waste };
    pub const ELECTRICITY: Field<ConsumptionRecord> = Field { name: "electricity_kwh", extract: electricity };
}

// ============================================================================
// Time buckets
// ============================================================================

/// Sum selected fields into the 24 hour-of-day slots.
///
/// With `date` set only records from that calendar day count. The result
/// always has 24 entries labelled `00:00`..`23:00`; a field with no value in
/// an hour is `Bucket::Empty`.
pub fn bucket_by_hour<R: Timestamped>(
    records: &[R],
    date: Option<NaiveDate>,
    fields: &[Field<R>],
) -> Vec<HourlyBucket> {
    let mut sums: Vec<Vec<Option<f64>>> = vec![vec![None; fields.len()]; 24];

    for record in records {
        let at = record.recorded_at();
        if date.is_some_and(|d| at.date() != d) {
            continue;
        }
        let slot = &mut sums[at.hour() as usize];
        for (acc, field) in slot.iter_mut().zip(fields) {
            if let Some(v) = (field.extract)(record).filter(|v| v.is_finite()) {
                *acc = Some(acc.unwrap_or(0.0) + v);
            }
        }
    }

    sums.into_iter()
        .enumerate()
        .map(|(hour, slot)| HourlyBucket {
            hour: format!("{:02}:00", hour),
            values: fields
                .iter()
                .zip(slot)
                .map(|(field, sum)| (field.name.to_string(), Bucket::from(sum)))
                .collect(),
        })
        .collect()
}

/// Average selected fields per calendar day in `[start, end]`.
///
/// Days without records are omitted; output is in ascending date order.
pub fn bucket_by_day<R: Timestamped>(
    records: &[R],
    start: NaiveDate,
    end: NaiveDate,
    fields: &[Field<R>],
) -> Vec<DailyBucket> {
    let mut by_day: BTreeMap<NaiveDate, Vec<&R>> = BTreeMap::new();
    for record in records {
        let day = record.recorded_at().date();
        if day >= start && day <= end {
            by_day.entry(day).or_default().push(record);
        }
    }

    by_day
        .into_iter()
        .map(|(date, day_records)| {
            let values = fields
                .iter()
                .map(|field| {
                    let present: Vec<f64> = day_records
                        .iter()
                        .filter_map(|r| (field.extract)(*r))
                        .filter(|v| v.is_finite())
                        .collect();
                    let bucket = if present.is_empty() {
                        Bucket::Empty
                    } else {
                        Bucket::Value(present.iter().sum::<f64>() / present.len() as f64)
                    };
                    (field.name.to_string(), bucket)
                })
                .collect();
            DailyBucket { date, record_count: day_records.len(), values }
        })
        .collect()
}

// ============================================================================
// Statistics
// ============================================================================

/// Min, max and mean over present, finite values; `None` when nothing remains
pub fn summary_stats<I>(values: I) -> Option<SummaryStats>
where
    I: IntoIterator<Item = Option<f64>>,
{
    let mut count = 0usize;
    let mut sum = 0.0;
    let mut min = f64::INFINITY;
    let mut max = f64::NEG_INFINITY;

    for v in values.into_iter().flatten().filter(|v| v.is_finite()) {
        count += 1;
        sum += v;
        min = min.min(v);
        max = max.max(v);
    }

    if count == 0 {
        return None;
    }
    Some(SummaryStats { min, max, mean: sum / count as f64 })
}

/// Mean of present, finite values; 0 when there are none
pub fn average<I>(values: I) -> f64
where
    I: IntoIterator<Item = Option<f64>>,
{
    summary_stats(values).map_or(0.0, |s| s.mean)
}

// ============================================================================
// Batch ratios
// ============================================================================

/// Deaths as a percentage of the birds placed
pub fn mortality_rate(total_deaths: u64, initial_count: u64) -> f64 {
    if initial_count == 0 {
        return 0.0;
    }
    total_deaths as f64 / initial_count as f64 * 100.0
}

/// 100 − mortality rate
pub fn survival_rate(total_deaths: u64, initial_count: u64) -> f64 {
    100.0 - mortality_rate(total_deaths, initial_count)
}

/// Feed conversion ratio: kg of feed per kg of live weight gained.
///
/// `None` when there are no living birds or no gain to divide by.
pub fn feed_conversion_ratio(total_feed_kg: f64, living_birds: u64, gain_per_bird_kg: f64) -> Option<f64> {
    if living_birds == 0 || gain_per_bird_kg <= 0.0 || !gain_per_bird_kg.is_finite() {
        return None;
    }
    let fcr = total_feed_kg / (living_birds as f64 * gain_per_bird_kg);
    fcr.is_finite().then_some(fcr)
}

/// Percentage change from `previous` to `current`; 0 without a usable baseline
pub fn trend_percent(current: f64, previous: Option<f64>) -> f64 {
    match previous {
        Some(prev) if prev != 0.0 && prev.is_finite() && current.is_finite() => {
            (current - prev) / prev * 100.0
        }
        _ => 0.0,
    }
}

/// Litres of water drunk per kg of feed eaten; 0 when no feed was eaten
pub fn water_to_feed_ratio(total_water_liters: f64, total_feed_kg: f64) -> f64 {
    if total_feed_kg <= 0.0 || !total_water_liters.is_finite() {
        return 0.0;
    }
    total_water_liters / total_feed_kg
}

/// Share of a batch total per living bird; 0 for an empty house
pub fn per_bird(total: f64, bird_count: u64) -> f64 {
    if bird_count == 0 || !total.is_finite() {
        return 0.0;
    }
    total / bird_count as f64
}

/// Energy cost at a flat rate per kWh
pub fn electricity_cost(total_kwh: f64, rate_per_kwh: f64) -> f64 {
    if total_kwh <= 0.0 || rate_per_kwh <= 0.0 {
        return 0.0;
    }
    total_kwh * rate_per_kwh
}
