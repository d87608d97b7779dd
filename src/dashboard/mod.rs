//! Batch report: every figure the farm dashboard shows for one batch on one
//! day, pulled through the record repository and computed by the growth,
//! aggregation and distribution modules.

mod kpis;

pub use kpis::*;

use chrono::{Duration, NaiveDate, NaiveTime};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::aggregation::{
    self, bucket_by_day, bucket_by_hour, consumption_summary, electricity_cost,
    environmental_summary, feeding_summary, fields, mortality_summary, ConsumptionSummary,
    EnvironmentalSummary, FeedingSummary, MortalitySummary,
};
use crate::alerts::{Alert, AlertEvaluator};
use crate::config::defaults::{CONSUMPTION_WINDOW_DAYS, IDEAL_CURVE_HORIZON_DAYS};
use crate::config::MonitorConfig;
use crate::distribution::{coefficient_of_variation, estimate_distribution};
use crate::growth_model::{age_in_days, compare_growth, growth_summary, GrowthComparison, GrowthSummary};
use crate::repository::{RecordRepository, RepositoryResult};
use crate::thermal_map::{self, ThermalSnapshot};
use crate::types::{Batch, CurvePoint, DailyBucket, DistributionPoint, HourlyBucket};

// ============================================================================
// Report sections
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EnvironmentSection {
    /// Readings of the report day only
    pub summary: EnvironmentalSummary,
    pub hourly: Vec<HourlyBucket>,
    /// Alerts raised by the report day's readings
    pub alerts: Vec<Alert>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConsumptionSection {
    /// Whole batch to date
    pub summary: ConsumptionSummary,
    pub hourly: Vec<HourlyBucket>,
    pub daily: Vec<DailyBucket>,
    pub electricity_cost: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GrowthSection {
    pub summary: Option<GrowthSummary>,
    pub comparison: Vec<GrowthComparison>,
    pub ideal_curve: Vec<CurvePoint>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DistributionSection {
    pub bird_count: usize,
    pub mean_weight_g: f64,
    pub coefficient_of_variation: f64,
    pub points: Vec<DistributionPoint>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BatchReport {
    pub batch: Batch,
    pub as_of: NaiveDate,
    pub age_days: i64,
    pub kpis: DashboardKpis,
    pub environment: EnvironmentSection,
    pub consumption: ConsumptionSection,
    pub feeding: FeedingSummary,
    pub growth: GrowthSection,
    pub distribution: DistributionSection,
    pub mortality: MortalitySummary,
    pub thermal_map: Option<ThermalSnapshot>,
}

// ============================================================================
// Builder
// ============================================================================

/// Build the report for `batch_id` as of the end of `as_of`.
///
/// Records dated after `as_of` are ignored so past days can be replayed.
pub async fn build_batch_report<R>(
    repo: &R,
    batch_id: &str,
    as_of: NaiveDate,
    config: &MonitorConfig,
) -> RepositoryResult<BatchReport>
where
    R: RecordRepository + ?Sized,
{
    let batch = repo.get_batch(batch_id).await?;
    let age_days = age_in_days(batch.start_date, as_of);
    info!(batch = %batch.code, age_days, source = repo.source_name(), "Building batch report");

    let yesterday = as_of - Duration::days(1);
    let window_start = yesterday.and_time(NaiveTime::MIN);
    let window_end = as_of.and_hms_milli_opt(23, 59, 59, 999).unwrap_or(window_start);

    let readings = repo.list_environmental_readings(batch_id, window_start, window_end).await?;
    let consumption: Vec<_> = repo
        .list_consumption_records(batch_id)
        .await?
        .into_iter()
        .filter(|r| r.recorded_at.date() <= as_of)
        .collect();
    let feeding = repo.list_feeding_records(batch_id, batch.start_date, as_of).await?;
    let growth: Vec<_> = repo
        .list_growth_records(batch_id)
        .await?
        .into_iter()
        .filter(|r| r.date <= as_of)
        .collect();
    let mortality_records: Vec<_> = repo
        .list_mortality_records(batch_id)
        .await?
        .into_iter()
        .filter(|r| r.date <= as_of)
        .collect();
    let birds = repo.list_individual_birds(batch_id).await?;
    let thermal_maps = repo.list_thermal_maps(batch_id).await?;

    debug!(
        readings = readings.len(),
        consumption = consumption.len(),
        feeding = feeding.len(),
        growth = growth.len(),
        mortality = mortality_records.len(),
        birds = birds.len(),
        "Fetched batch records"
    );

    let curve = &config.growth_curve;
    let initial_count = u64::from(batch.initial_count);

    // Environment
    let today_readings: Vec<_> = readings.iter().filter(|r| r.recorded_at.date() == as_of).cloned().collect();
    let mut evaluator = AlertEvaluator::from_config(config);
    let alerts: Vec<Alert> = today_readings.iter().flat_map(|r| evaluator.check(r)).collect();
    let environment = EnvironmentSection {
        summary: environmental_summary(&today_readings),
        hourly: bucket_by_hour(
            &today_readings,
            Some(as_of),
            &[fields::TEMPERATURE, fields::HUMIDITY, fields::CO2, fields::AMMONIA, fields::ILLUMINATION],
        ),
        alerts,
    };

    // Consumption
    let summary = consumption_summary(&consumption);
    let consumption_section = ConsumptionSection {
        electricity_cost: electricity_cost(summary.total_electricity_kwh, config.costs.electricity_rate_per_kwh),
        hourly: bucket_by_hour(&consumption, Some(as_of), &[fields::WATER, fields::FEED]),
        daily: bucket_by_day(
            &consumption,
            as_of - Duration::days(CONSUMPTION_WINDOW_DAYS - 1),
            as_of,
            &[fields::WATER, fields::FEED, fields::WASTE, fields::ELECTRICITY],
        ),
        summary,
    };

    // Growth
    let growth_section = GrowthSection {
        summary: growth_summary(&growth),
        comparison: compare_growth(&growth, &batch, curve),
        ideal_curve: curve.weight_curve(1, age_days.max(IDEAL_CURVE_HORIZON_DAYS)).collect(),
    };

    // Distribution
    let weights: Vec<f64> = birds.iter().map(|b| b.weight_g).collect();
    let distribution = DistributionSection {
        bird_count: weights.len(),
        mean_weight_g: aggregation::average(weights.iter().map(|w| Some(*w))),
        coefficient_of_variation: coefficient_of_variation(&weights),
        points: estimate_distribution(&weights, config.distribution.steps),
    };

    let mortality = mortality_summary(&mortality_records, initial_count);

    // Latest valid thermal map at or before the report day
    let thermal_map = thermal_maps
        .iter()
        .filter(|m| m.recorded_at.date() <= as_of)
        .max_by_key(|m| m.recorded_at)
        .and_then(|m| match thermal_map::render(m, &config.thermal_map) {
            Ok(snapshot) => Some(snapshot),
            Err(e) => {
                warn!(batch = %batch.code, recorded_at = %m.recorded_at, error = %e, "Skipping invalid thermal map");
                None
            }
        });

    let kpis = compute_kpis(&KpiInputs {
        as_of,
        age_days,
        initial_count,
        total_deaths: mortality.total_deaths,
        readings: &readings,
        consumption: &consumption,
        mortality: &mortality_records,
        growth_summary: growth_section.summary.as_ref(),
        latest_weight_g: growth.last().map(|r| r.average_weight_g),
        previous_weight_g: growth.iter().rev().nth(1).map(|r| r.average_weight_g),
        curve,
    });

    info!(
        batch = %batch.code,
        living_birds = kpis.living_birds,
        survival_pct = kpis.survival_rate,
        alerts = environment.alerts.len(),
        "Batch report ready"
    );

    Ok(BatchReport {
        batch,
        as_of,
        age_days,
        kpis,
        environment,
        consumption: consumption_section,
        feeding: feeding_summary(&feeding),
        growth: growth_section,
        distribution,
        mortality,
        thermal_map,
    })
}
