//! Ideal broiler growth model
//!
//! Reference weights come from a Gompertz curve:
//!
//! W(t) = W∞ × exp(−exp(−k × (t − tᵢ)))
//!
//! Where:
//! - W∞ = asymptotic (mature) weight in grams
//! - k = growth-rate constant per day
//! - tᵢ = inflection age in days (fastest growth)
//!
//! On top of the curve this module compares recorded weighings against the
//! ideal and summarizes a batch's growth records.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::types::{Batch, CurvePoint, GrowthRecord};

fn default_asymptotic_weight() -> f64 {
    2500.0
}
fn default_growth_rate() -> f64 {
    0.07
}
fn default_inflection_day() -> f64 {
    25.0
}

// ============================================================================
// Gompertz curve
// ============================================================================

/// Parameters of the ideal growth curve
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GompertzCurve {
    /// Mature weight the curve approaches (g)
    #[serde(default = "default_asymptotic_weight")]
    pub asymptotic_weight_g: f64,
    /// Growth-rate constant (1/day)
    #[serde(default = "default_growth_rate")]
    pub growth_rate_k: f64,
    /// Age of fastest growth (days)
    #[serde(default = "default_inflection_day")]
    pub inflection_day: f64,
}

impl Default for GompertzCurve {
    fn default() -> Self {
        Self {
            asymptotic_weight_g: default_asymptotic_weight(),
            growth_rate_k: default_growth_rate(),
            inflection_day: default_inflection_day(),
        }
    }
}

impl GompertzCurve {
    pub fn new(asymptotic_weight_g: f64, growth_rate_k: f64, inflection_day: f64) -> Self {
        Self { asymptotic_weight_g, growth_rate_k, inflection_day }
    }

    /// Ideal weight in whole grams at a given age.
    ///
    /// Zero and negative ages are valid and yield small weights.
    pub fn ideal_weight(&self, age_days: f64) -> f64 {
        let exponent = -self.growth_rate_k * (age_days - self.inflection_day);
        (self.asymptotic_weight_g * (-exponent.exp()).exp()).round()
    }

    /// Ideal weight gained between day `t - 1` and day `t` (g)
    pub fn daily_gain(&self, age_days: f64) -> f64 {
        (self.ideal_weight(age_days) - self.ideal_weight(age_days - 1.0)).round()
    }

    /// Lazy curve over every integer day in `[start_day, end_day]`.
    ///
    /// The returned iterator is `Clone`, so a consumer can restart it.
    pub fn weight_curve(&self, start_day: i64, end_day: i64) -> WeightCurve {
        WeightCurve { curve: *self, next_day: start_day, end_day }
    }
}

/// Iterator over ideal weights for consecutive days
#[derive(Debug, Clone)]
pub struct WeightCurve {
    curve: GompertzCurve,
    next_day: i64,
    end_day: i64,
}

impl Iterator for WeightCurve {
    type Item = CurvePoint;

    fn next(&mut self) -> Option<CurvePoint> {
        if self.next_day > self.end_day {
            return None;
        }
        let day = self.next_day;
        self.next_day += 1;
        Some(CurvePoint { day, weight_g: self.curve.ideal_weight(day as f64) })
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let remaining = usize::try_from(self.end_day.saturating_sub(self.next_day).saturating_add(1))
            .unwrap_or(0);
        (remaining, Some(remaining))
    }
}

// ============================================================================
// Age and efficiency
// ============================================================================

/// Age of the batch on `date`, counting the arrival date as day 1
pub fn age_in_days(start_date: NaiveDate, date: NaiveDate) -> i64 {
    (date - start_date).num_days() + 1
}

/// Actual weight as a percentage of the ideal weight
pub fn weight_efficiency(actual_weight_g: f64, ideal_weight_g: f64) -> f64 {
    if ideal_weight_g <= 0.0 || !actual_weight_g.is_finite() {
        return 0.0;
    }
    actual_weight_g / ideal_weight_g * 100.0
}

/// Survival and weight efficiency folded into one percentage
pub fn productive_efficiency(survival_pct: f64, weight_efficiency_pct: f64) -> f64 {
    if !survival_pct.is_finite() || !weight_efficiency_pct.is_finite() {
        return 0.0;
    }
    survival_pct * weight_efficiency_pct / 100.0
}

// ============================================================================
// Recorded growth vs ideal
// ============================================================================

/// One weighing compared against the ideal curve
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GrowthComparison {
    pub day: i64,
    pub date: NaiveDate,
    pub actual_g: f64,
    pub ideal_g: f64,
    /// Gain since the previous weighing, or the stored gain for the first one
    pub gain_g: Option<f64>,
    /// (actual − ideal) / ideal × 100
    pub diff_percent: f64,
}

/// Compare each growth record with the ideal weight for the batch's age
pub fn compare_growth(
    records: &[GrowthRecord],
    batch: &Batch,
    curve: &GompertzCurve,
) -> Vec<GrowthComparison> {
    let mut sorted: Vec<&GrowthRecord> = records.iter().collect();
    sorted.sort_by_key(|r| r.date);

    let mut previous: Option<f64> = None;
    sorted
        .into_iter()
        .map(|record| {
            let day = age_in_days(batch.start_date, record.date);
            let ideal_g = curve.ideal_weight(day as f64);
            let gain_g = match previous {
                Some(prev) => Some(record.average_weight_g - prev),
                None => record.daily_gain_g,
            };
            previous = Some(record.average_weight_g);

            let diff_percent = if ideal_g > 0.0 {
                (record.average_weight_g - ideal_g) / ideal_g * 100.0
            } else {
                0.0
            };

            GrowthComparison {
                day,
                date: record.date,
                actual_g: record.average_weight_g,
                ideal_g,
                gain_g,
                diff_percent,
            }
        })
        .collect()
}

/// Whole-batch growth figures derived from its weighings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GrowthSummary {
    pub initial_weight_g: f64,
    pub final_weight_g: f64,
    pub total_gain_g: f64,
    pub days_elapsed: i64,
    pub average_daily_gain_g: f64,
    pub average_uniformity_pct: Option<f64>,
}

/// Summarize growth records; `None` when there are none
pub fn growth_summary(records: &[GrowthRecord]) -> Option<GrowthSummary> {
    let first = records.iter().min_by_key(|r| r.date)?;
    let last = records.iter().max_by_key(|r| r.date)?;

    let total_gain_g = last.average_weight_g - first.average_weight_g;
    let days_elapsed = (last.date - first.date).num_days();
    let average_daily_gain_g = if days_elapsed > 0 {
        total_gain_g / days_elapsed as f64
    } else {
        0.0
    };

    let uniformities: Vec<f64> = records.iter().filter_map(|r| r.uniformity_pct).collect();
    let average_uniformity_pct = if uniformities.is_empty() {
        None
    } else {
        Some(uniformities.iter().sum::<f64>() / uniformities.len() as f64)
    };

    Some(GrowthSummary {
        initial_weight_g: first.average_weight_g,
        final_weight_g: last.average_weight_g,
        total_gain_g,
        days_elapsed,
        average_daily_gain_g,
        average_uniformity_pct,
    })
}
