//! Headline dashboard figures: flock size, weight against the ideal, and
//! today-versus-yesterday trends.

use chrono::{Duration, NaiveDate};
use serde::{Deserialize, Serialize};

use crate::aggregation::{
    average, feed_conversion_ratio, mortality_rate, per_bird, survival_rate, trend_percent,
    water_to_feed_ratio,
};
use crate::growth_model::{productive_efficiency, weight_efficiency, GompertzCurve, GrowthSummary};
use crate::types::{ConsumptionRecord, EnvironmentalReading, MortalityRecord};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DashboardKpis {
    pub living_birds: u64,
    pub mortality_rate: f64,
    pub survival_rate: f64,
    pub deaths_today: u64,
    pub mortality_trend: f64,

    /// Latest recorded average weight
    pub average_weight_g: Option<f64>,
    /// Change against the weighing before the latest
    pub weight_trend: f64,
    pub ideal_weight_g: f64,
    pub weight_efficiency: f64,
    pub productive_efficiency: f64,
    pub feed_conversion_ratio: Option<f64>,

    pub temperature_c: Option<f64>,
    pub temperature_trend: f64,
    pub humidity_pct: Option<f64>,
    pub humidity_trend: f64,

    pub water_today_liters: f64,
    pub water_trend: f64,
    pub feed_today_kg: f64,
    pub feed_trend: f64,
    pub water_per_bird_liters: f64,
    pub feed_per_bird_kg: f64,
    pub water_to_feed_ratio: f64,

    pub electricity_today_kwh: f64,
    pub electricity_trend: f64,
}

/// Everything the KPI computation reads
pub struct KpiInputs<'a> {
    pub as_of: NaiveDate,
    pub age_days: i64,
    pub initial_count: u64,
    pub total_deaths: u64,
    /// Readings covering at least `as_of` and the day before
    pub readings: &'a [EnvironmentalReading],
    pub consumption: &'a [ConsumptionRecord],
    pub mortality: &'a [MortalityRecord],
    pub growth_summary: Option<&'a GrowthSummary>,
    pub latest_weight_g: Option<f64>,
    pub previous_weight_g: Option<f64>,
    pub curve: &'a GompertzCurve,
}

/// Mean of a reading field on one day; `None` without readings that day
fn day_mean(readings: &[EnvironmentalReading], day: NaiveDate, field: fn(&EnvironmentalReading) -> f64) -> Option<f64> {
    let values: Vec<f64> = readings
        .iter()
        .filter(|r| r.recorded_at.date() == day)
        .map(field)
        .collect();
    if values.is_empty() {
        None
    } else {
        Some(average(values.into_iter().map(Some)))
    }
}

/// Sum of a consumption field on one day; `None` without records that day
fn day_total(records: &[ConsumptionRecord], day: NaiveDate, field: fn(&ConsumptionRecord) -> f64) -> Option<f64> {
    let mut on_day = records.iter().filter(|r| r.recorded_at.date() == day).peekable();
    on_day.peek()?;
    Some(on_day.map(field).sum())
}

/// Deaths recorded on one day; `None` without records that day
fn day_deaths(records: &[MortalityRecord], day: NaiveDate) -> Option<u64> {
    let mut on_day = records.iter().filter(|r| r.date == day).peekable();
    on_day.peek()?;
    Some(on_day.map(|r| u64::from(r.count)).sum())
}

pub fn compute_kpis(input: &KpiInputs<'_>) -> DashboardKpis {
    let yesterday = input.as_of - Duration::days(1);
    let living_birds = input.initial_count.saturating_sub(input.total_deaths);
    let survival = survival_rate(input.total_deaths, input.initial_count);

    let ideal_weight_g = input.curve.ideal_weight(input.age_days as f64);
    let weight_eff = input
        .latest_weight_g
        .map_or(0.0, |w| weight_efficiency(w, ideal_weight_g));

    let total_feed_kg: f64 = input.consumption.iter().map(|r| r.feed_kg).sum();
    let gain_per_bird_kg = input.growth_summary.map_or(0.0, |g| g.total_gain_g / 1000.0);

    let temperature = |r: &EnvironmentalReading| r.temperature_c;
    let humidity = |r: &EnvironmentalReading| r.humidity_pct;
    let temperature_c = day_mean(input.readings, input.as_of, temperature);
    let humidity_pct = day_mean(input.readings, input.as_of, humidity);

    let water = |r: &ConsumptionRecord| r.water_liters;
    let feed = |r: &ConsumptionRecord| r.feed_kg;
    let water_today = day_total(input.consumption, input.as_of, water).unwrap_or(0.0);
    let feed_today = day_total(input.consumption, input.as_of, feed).unwrap_or(0.0);
    let electricity = |r: &ConsumptionRecord| r.electricity_kwh.unwrap_or(0.0);
    let electricity_today = day_total(input.consumption, input.as_of, electricity).unwrap_or(0.0);

    let deaths_today = day_deaths(input.mortality, input.as_of).unwrap_or(0);
    let deaths_yesterday = day_deaths(input.mortality, yesterday).map(|d| d as f64);

    DashboardKpis {
        living_birds,
        mortality_rate: mortality_rate(input.total_deaths, input.initial_count),
        survival_rate: survival,
        deaths_today,
        mortality_trend: trend_percent(deaths_today as f64, deaths_yesterday),
        average_weight_g: input.latest_weight_g,
        weight_trend: input
            .latest_weight_g
            .map_or(0.0, |w| trend_percent(w, input.previous_weight_g)),
        ideal_weight_g,
        weight_efficiency: weight_eff,
        productive_efficiency: productive_efficiency(survival, weight_eff),
        feed_conversion_ratio: feed_conversion_ratio(total_feed_kg, living_birds, gain_per_bird_kg),

        temperature_trend: temperature_c.map_or(0.0, |t| {
            trend_percent(t, day_mean(input.readings, yesterday, temperature))
        }),
        temperature_c,
        humidity_trend: humidity_pct.map_or(0.0, |h| {
            trend_percent(h, day_mean(input.readings, yesterday, humidity))
        }),
        humidity_pct,

        water_today_liters: water_today,
        water_trend: trend_percent(water_today, day_total(input.consumption, yesterday, water)),
        feed_today_kg: feed_today,
        feed_trend: trend_percent(feed_today, day_total(input.consumption, yesterday, feed)),
        water_per_bird_liters: per_bird(water_today, living_birds),
        feed_per_bird_kg: per_bird(feed_today, living_birds),
        water_to_feed_ratio: water_to_feed_ratio(water_today, feed_today),

        electricity_today_kwh: electricity_today,
        electricity_trend: trend_percent(
            electricity_today,
            day_total(input.consumption, yesterday, electricity),
        ),
    }
}
