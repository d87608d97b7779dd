//! Environmental threshold alerts
//!
//! Readings are checked against the configured bands. A breach raises an
//! alert unless an alert of the same kind and side was raised within the
//! cooldown window with a similar value. Alerts are kept for the retention
//! window, capped in number, and can be acknowledged.

use chrono::{Duration, NaiveDateTime};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::config::{AlertConfig, MonitorConfig, ThresholdConfig, ThresholdRange};
use crate::types::EnvironmentalReading;

// ============================================================================
// Alert types
// ============================================================================

/// Measured quantity that left its band
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum AlertKind {
    Temperature,
    Humidity,
    Co2,
    Ammonia,
}

impl AlertKind {
    fn label(&self) -> &'static str {
        match self {
            AlertKind::Temperature => "Temperatura",
            AlertKind::Humidity => "Humedad",
            AlertKind::Co2 => "CO₂",
            AlertKind::Ammonia => "Amoníaco",
        }
    }

    fn unit(&self) -> &'static str {
        match self {
            AlertKind::Temperature => "°C",
            AlertKind::Humidity => "%",
            AlertKind::Co2 | AlertKind::Ammonia => " ppm",
        }
    }

    /// Grammatical gender of the label, for the adjective
    fn feminine(&self) -> bool {
        matches!(self, AlertKind::Temperature | AlertKind::Humidity)
    }
}

/// Which side of the band was crossed
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum Breach {
    Low,
    High,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Alert {
    pub id: u64,
    pub batch_id: String,
    pub kind: AlertKind,
    pub breach: Breach,
    pub value: f64,
    pub limit: f64,
    pub message: String,
    pub raised_at: NaiveDateTime,
    pub acknowledged: bool,
}

/// Operator-facing message, e.g. `Temperatura alta: 36.2°C (límite: 35.0°C)`
pub fn alert_message(kind: AlertKind, breach: Breach, value: f64, limit: f64) -> String {
    let adjective = match (breach, kind.feminine()) {
        (Breach::High, true) => "alta",
        (Breach::High, false) => "alto",
        (Breach::Low, true) => "baja",
        (Breach::Low, false) => "bajo",
    };
    let unit = kind.unit();
    format!(
        "{} {}: {:.1}{} (límite: {:.1}{})",
        kind.label(),
        adjective,
        value,
        unit,
        limit,
        unit
    )
}

/// Every band a reading falls outside, as `(kind, breach, value, limit)`
pub fn find_breaches(
    reading: &EnvironmentalReading,
    thresholds: &ThresholdConfig,
) -> Vec<(AlertKind, Breach, f64, f64)> {
    let checks = [
        (AlertKind::Temperature, Some(reading.temperature_c), &thresholds.temperature),
        (AlertKind::Humidity, Some(reading.humidity_pct), &thresholds.humidity),
        (AlertKind::Co2, reading.co2_ppm, &thresholds.co2),
        (AlertKind::Ammonia, reading.ammonia_ppm, &thresholds.nh3),
    ];

    checks
        .into_iter()
        .filter_map(|(kind, value, range)| {
            let value = value.filter(|v| v.is_finite())?;
            classify(value, range).map(|(breach, limit)| (kind, breach, value, limit))
        })
        .collect()
}

fn classify(value: f64, range: &ThresholdRange) -> Option<(Breach, f64)> {
    if value < range.min {
        Some((Breach::Low, range.min))
    } else if value > range.max {
        Some((Breach::High, range.max))
    } else {
        None
    }
}

/// Longest window honoured, roughly a century
const MAX_WINDOW_SECS: i64 = 3_153_600_000;

fn window(seconds: u64) -> Duration {
    Duration::seconds(i64::try_from(seconds).unwrap_or(i64::MAX).min(MAX_WINDOW_SECS))
}

/// Relative difference below `tolerance`
fn values_similar(a: f64, b: f64, tolerance: f64) -> bool {
    let scale = a.abs().max(b.abs());
    if scale == 0.0 {
        return true;
    }
    (a - b).abs() / scale < tolerance
}

// ============================================================================
// Evaluator
// ============================================================================

/// Stateful alert list for one farm
#[derive(Debug, Clone)]
pub struct AlertEvaluator {
    thresholds: ThresholdConfig,
    config: AlertConfig,
    alerts: Vec<Alert>,
    next_id: u64,
}

impl AlertEvaluator {
    pub fn new(thresholds: ThresholdConfig, config: AlertConfig) -> Self {
        Self { thresholds, config, alerts: Vec::new(), next_id: 1 }
    }

    pub fn from_config(config: &MonitorConfig) -> Self {
        Self::new(config.thresholds.clone(), config.alerts.clone())
    }

    /// Check a reading and return the alerts it newly raised.
    ///
    /// The reading's timestamp is taken as "now" for cooldown and retention.
    pub fn check(&mut self, reading: &EnvironmentalReading) -> Vec<Alert> {
        if !self.config.enabled {
            return Vec::new();
        }
        let now = reading.recorded_at;
        self.prune(now);

        let mut raised = Vec::new();
        for (kind, breach, value, limit) in find_breaches(reading, &self.thresholds) {
            if self.is_duplicate(kind, breach, value, limit, now) {
                debug!(?kind, ?breach, value, "Alert suppressed by cooldown");
                continue;
            }

            let alert = Alert {
                id: self.next_id,
                batch_id: reading.batch_id.clone(),
                kind,
                breach,
                value,
                limit,
                message: alert_message(kind, breach, value, limit),
                raised_at: now,
                acknowledged: false,
            };
            self.next_id += 1;
            warn!(batch = %alert.batch_id, id = alert.id, "{}", alert.message);
            self.alerts.push(alert.clone());
            raised.push(alert);
        }

        self.enforce_cap();
        raised
    }

    fn is_duplicate(&self, kind: AlertKind, breach: Breach, value: f64, limit: f64, now: NaiveDateTime) -> bool {
        let cooldown = window(self.config.cooldown_seconds);
        self.alerts.iter().any(|a| {
            a.kind == kind
                && a.breach == breach
                && a.limit == limit
                && now - a.raised_at < cooldown
                && values_similar(a.value, value, self.config.similarity_tolerance)
        })
    }

    /// Drop alerts older than the retention window
    pub fn prune(&mut self, now: NaiveDateTime) {
        let retention = window(self.config.retention_hours.saturating_mul(3600));
        self.alerts.retain(|a| now - a.raised_at < retention);
    }

    fn enforce_cap(&mut self) {
        let excess = self.alerts.len().saturating_sub(self.config.max_retained);
        if excess > 0 {
            self.alerts.drain(..excess);
        }
    }

    /// Mark one alert as read; false when the id is unknown
    pub fn acknowledge(&mut self, id: u64) -> bool {
        match self.alerts.iter_mut().find(|a| a.id == id) {
            Some(alert) => {
                alert.acknowledged = true;
                true
            }
            None => false,
        }
    }

    pub fn acknowledge_all(&mut self) {
        for alert in &mut self.alerts {
            alert.acknowledged = true;
        }
    }

    pub fn unread_count(&self) -> usize {
        self.alerts.iter().filter(|a| !a.acknowledged).count()
    }

    /// Retained alerts, oldest first
    pub fn alerts(&self) -> &[Alert] {
        &self.alerts
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn reading(minute: u32, temperature: f64, humidity: f64) -> EnvironmentalReading {
        EnvironmentalReading {
            batch_id: "b1".to_string(),
            recorded_at: NaiveDate::from_ymd_opt(2024, 7, 1)
                .unwrap()
                .and_hms_opt(12, 0, 0)
                .unwrap()
                + Duration::minutes(i64::from(minute)),
            temperature_c: temperature,
            humidity_pct: humidity,
            co2_ppm: None,
            ammonia_ppm: None,
            illumination_lux: None,
            location: None,
            notes: None,
        }
    }

    fn evaluator() -> AlertEvaluator {
        AlertEvaluator::from_config(&MonitorConfig::default())
    }

    #[test]
    fn test_message_format() {
        assert_eq!(
            alert_message(AlertKind::Temperature, Breach::High, 36.24, 35.0),
            "Temperatura alta: 36.2°C (límite: 35.0°C)"
        );
        assert_eq!(
            alert_message(AlertKind::Ammonia, Breach::High, 30.0, 25.0),
            "Amoníaco alto: 30.0 ppm (límite: 25.0 ppm)"
        );
    }

    #[test]
    fn test_in_band_reading_raises_nothing() {
        let mut eval = evaluator();
        assert!(eval.check(&reading(0, 25.0, 60.0)).is_empty());
        assert_eq!(eval.unread_count(), 0);
    }

    #[test]
    fn test_breaches_on_both_sides() {
        let mut eval = evaluator();
        let raised = eval.check(&reading(0, 36.0, 40.0));
        assert_eq!(raised.len(), 2);
        assert!(raised.iter().any(|a| a.kind == AlertKind::Temperature && a.breach == Breach::High));
        assert!(raised.iter().any(|a| a.kind == AlertKind::Humidity && a.breach == Breach::Low));
    }

    #[test]
    fn test_cooldown_suppresses_similar_alert() {
        let mut eval = evaluator();
        assert_eq!(eval.check(&reading(0, 36.0, 60.0)).len(), 1);
        // 2 minutes later, within 5%
        assert!(eval.check(&reading(2, 36.5, 60.0)).is_empty());
        // Much hotter is a new alert even inside the cooldown
        assert_eq!(eval.check(&reading(3, 40.0, 60.0)).len(), 1);
        // Same value after the cooldown raises again
        assert_eq!(eval.check(&reading(9, 36.0, 60.0)).len(), 1);
        assert_eq!(eval.alerts().len(), 3);
    }

    #[test]
    fn test_retention_and_cap() {
        let mut config = MonitorConfig::default();
        config.alerts.max_retained = 2;
        let mut eval = AlertEvaluator::from_config(&config);

        eval.check(&reading(0, 36.0, 60.0));
        eval.check(&reading(10, 36.0, 60.0));
        eval.check(&reading(20, 36.0, 60.0));
        assert_eq!(eval.alerts().len(), 2);
        assert_eq!(eval.alerts()[0].raised_at, reading(10, 0.0, 0.0).recorded_at);

        eval.prune(reading(20, 0.0, 0.0).recorded_at + Duration::hours(25));
        assert!(eval.alerts().is_empty());
    }

    #[test]
    fn test_acknowledge() {
        let mut eval = evaluator();
        let raised = eval.check(&reading(0, 36.0, 40.0));
        assert_eq!(eval.unread_count(), 2);
        assert!(eval.acknowledge(raised[0].id));
        assert!(!eval.acknowledge(999));
        assert_eq!(eval.unread_count(), 1);
        eval.acknowledge_all();
        assert_eq!(eval.unread_count(), 0);
    }

    #[test]
    fn test_disabled_evaluator() {
        let mut config = MonitorConfig::default();
        config.alerts.enabled = false;
        let mut eval = AlertEvaluator::from_config(&config);
        assert!(eval.check(&reading(0, 50.0, 10.0)).is_empty());
    }
}
