//! Monitor configuration: alert thresholds, growth curve, refresh cadence and
//! display settings as operator-tunable TOML values.
//!
//! Each section implements `Default` with the values the farm dashboard ships
//! with, so an absent or empty file behaves exactly like a fresh install.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::{info, warn};

use crate::growth_model::GompertzCurve;

/// Environment variable holding an explicit config path
pub const CONFIG_ENV_VAR: &str = "AVICOLA_CONFIG";
/// Config file looked up in the working directory
pub const LOCAL_CONFIG_FILE: &str = "avicola.toml";

// ============================================================================
// Top-Level Config
// ============================================================================

/// Root configuration for a farm deployment.
///
/// Load with `MonitorConfig::load()` which searches:
/// 1. `$AVICOLA_CONFIG` env var
/// 2. `./avicola.toml`
/// 3. Built-in defaults
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MonitorConfig {
    #[serde(default)]
    pub farm: FarmInfo,

    #[serde(default)]
    pub refresh: RefreshConfig,

    /// Environmental alert limits
    #[serde(default)]
    pub thresholds: ThresholdConfig,

    /// Ideal growth curve parameters
    #[serde(default)]
    pub growth_curve: GompertzCurve,

    #[serde(default)]
    pub distribution: DistributionConfig,

    #[serde(default)]
    pub alerts: AlertConfig,

    #[serde(default)]
    pub thermal_map: ThermalMapConfig,

    #[serde(default)]
    pub costs: CostConfig,

    #[serde(default)]
    pub display: DisplayConfig,

    #[serde(default)]
    pub storage: StorageConfig,
}

impl MonitorConfig {
    /// Load configuration using the standard search order:
    /// 1. `$AVICOLA_CONFIG` environment variable
    /// 2. `./avicola.toml` in the current working directory
    /// 3. Built-in defaults
    pub fn load() -> Self {
        if let Ok(path) = std::env::var(CONFIG_ENV_VAR) {
            let p = PathBuf::from(&path);
            if p.exists() {
                match Self::load_from_file(&p) {
                    Ok(config) => {
                        info!(path = %p.display(), farm = %config.farm.name, "Loaded monitor config from {}", CONFIG_ENV_VAR);
                        return config;
                    }
                    Err(e) => {
                        warn!(path = %p.display(), error = %e, "Failed to load config from {}, falling back", CONFIG_ENV_VAR);
                    }
                }
            } else {
                warn!(path = %path, "{} points to non-existent file, falling back", CONFIG_ENV_VAR);
            }
        }

        let local = PathBuf::from(LOCAL_CONFIG_FILE);
        if local.exists() {
            match Self::load_from_file(&local) {
                Ok(config) => {
                    info!(farm = %config.farm.name, "Loaded monitor config from ./{}", LOCAL_CONFIG_FILE);
                    return config;
                }
                Err(e) => {
                    warn!(error = %e, "Failed to load ./{}, using defaults", LOCAL_CONFIG_FILE);
                }
            }
        }

        info!("No {} found, using built-in defaults", LOCAL_CONFIG_FILE);
        Self::default()
    }

    /// Load from a specific TOML file path.
    pub fn load_from_file(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)
            .map_err(|e| ConfigError::Io(path.to_path_buf(), e))?;
        Self::from_toml_str(&contents).map_err(|e| match e {
            ConfigError::Parse(_, inner) => ConfigError::Parse(path.to_path_buf(), inner),
            other => other,
        })
    }

    /// Parse and validate a TOML document.
    ///
    /// Unknown keys are logged as warnings; they never fail the load.
    pub fn from_toml_str(contents: &str) -> Result<Self, ConfigError> {
        for w in super::validation::validate_unknown_keys(contents) {
            warn!("{}", w);
        }

        let config: Self = toml::from_str(contents)
            .map_err(|e| ConfigError::Parse(PathBuf::from("<inline>"), e))?;
        config.validate()?;
        Ok(config)
    }

    /// Serialize the current config to a TOML string.
    pub fn to_toml(&self) -> Result<String, ConfigError> {
        toml::to_string_pretty(self).map_err(ConfigError::Serialize)
    }

    /// Write the config to a file.
    pub fn save_to_file(&self, path: &Path) -> Result<(), ConfigError> {
        let contents = self.to_toml()?;
        std::fs::write(path, contents)
            .map_err(|e| ConfigError::Io(path.to_path_buf(), e))?;
        info!(path = %path.display(), "Monitor config saved");
        Ok(())
    }

    /// Validate all values for internal consistency.
    ///
    /// Rules:
    /// - Every threshold range must have min <= max
    /// - Refresh interval and alert cooldown must be positive
    /// - Growth curve parameters must be positive
    /// - The distribution needs at least 2 evaluation points
    pub fn validate(&self) -> Result<(), ConfigError> {
        let t = &self.thresholds;
        let mut errors: Vec<String> = Vec::new();

        Self::check_range(&t.temperature, "thresholds.temperature", &mut errors);
        Self::check_range(&t.humidity, "thresholds.humidity", &mut errors);
        Self::check_range(&t.co2, "thresholds.co2", &mut errors);
        Self::check_range(&t.nh3, "thresholds.nh3", &mut errors);

        if self.thermal_map.min_temp_c >= self.thermal_map.max_temp_c {
            errors.push(format!(
                "thermal_map.min_temp_c ({:.1}) must be less than max_temp_c ({:.1})",
                self.thermal_map.min_temp_c, self.thermal_map.max_temp_c
            ));
        }

        if self.refresh.interval_seconds == 0 {
            errors.push("refresh.interval_seconds must be > 0".to_string());
        }

        let g = &self.growth_curve;
        if g.asymptotic_weight_g <= 0.0 {
            errors.push("growth_curve.asymptotic_weight_g must be > 0".to_string());
        }
        if g.growth_rate_k <= 0.0 {
            errors.push("growth_curve.growth_rate_k must be > 0".to_string());
        }
        if g.inflection_day <= 0.0 {
            errors.push("growth_curve.inflection_day must be > 0".to_string());
        }

        if self.distribution.steps < 2 {
            errors.push(format!(
                "distribution.steps ({}) must be >= 2",
                self.distribution.steps
            ));
        }

        let a = &self.alerts;
        if a.cooldown_seconds == 0 {
            errors.push("alerts.cooldown_seconds must be > 0".to_string());
        }
        if !(0.0..1.0).contains(&a.similarity_tolerance) {
            errors.push(format!(
                "alerts.similarity_tolerance ({}) must be in [0, 1)",
                a.similarity_tolerance
            ));
        }
        if a.max_retained == 0 {
            errors.push("alerts.max_retained must be > 0".to_string());
        }

        if self.costs.electricity_rate_per_kwh < 0.0 {
            errors.push("costs.electricity_rate_per_kwh cannot be negative".to_string());
        }

        let (range_errors, range_warnings) = super::validation::validate_physical_ranges(self);
        errors.extend(range_errors);
        for w in &range_warnings {
            warn!("{}", w);
        }

        // NaN/Inf slip through every comparison above; sweep all floats via serialization
        if let Ok(value) = toml::Value::try_from(self) {
            let bad = super::validation::non_finite_keys(&value, "");
            if !bad.is_empty() {
                errors.push(format!(
                    "Config contains NaN or Inf values ({}), all values must be finite numbers",
                    bad.join(", ")
                ));
            }
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(ConfigError::Validation(errors))
        }
    }

    fn check_range(range: &ThresholdRange, name: &str, errors: &mut Vec<String>) {
        if !range.min.is_finite() || !range.max.is_finite() {
            errors.push(format!(
                "{name}: values must be finite (got min={}, max={})",
                range.min, range.max
            ));
            return;
        }
        if range.min > range.max {
            errors.push(format!(
                "{name}: min ({:.2}) must be <= max ({:.2})",
                range.min, range.max
            ));
        }
    }
}

// ============================================================================
// Error Type
// ============================================================================

#[derive(Debug)]
pub enum ConfigError {
    Io(PathBuf, std::io::Error),
    Parse(PathBuf, toml::de::Error),
    Serialize(toml::ser::Error),
    Validation(Vec<String>),
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigError::Io(path, e) => write!(f, "Config I/O error ({}): {}", path.display(), e),
            ConfigError::Parse(path, e) => {
                write!(f, "Config parse error ({}): {}", path.display(), e)
            }
            ConfigError::Serialize(e) => write!(f, "Config serialization error: {}", e),
            ConfigError::Validation(errors) => {
                writeln!(f, "Config validation failed:")?;
                for e in errors {
                    writeln!(f, "  - {}", e)?;
                }
                Ok(())
            }
        }
    }
}

impl std::error::Error for ConfigError {}

// ============================================================================
// Farm Info
// ============================================================================

/// Identification metadata, shown in logs and reports.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FarmInfo {
    #[serde(default = "default_farm_name")]
    pub name: String,
    #[serde(default = "default_house")]
    pub house: String,
}

fn default_farm_name() -> String {
    "Granja".to_string()
}
fn default_house() -> String {
    "Nave 1".to_string()
}

impl Default for FarmInfo {
    fn default() -> Self {
        Self { name: default_farm_name(), house: default_house() }
    }
}

// ============================================================================
// Refresh
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RefreshConfig {
    /// Seconds between dashboard refreshes
    #[serde(default = "default_refresh_interval")]
    pub interval_seconds: u64,
}

fn default_refresh_interval() -> u64 {
    60
}

impl Default for RefreshConfig {
    fn default() -> Self {
        Self { interval_seconds: default_refresh_interval() }
    }
}

// ============================================================================
// Thresholds
// ============================================================================

/// Acceptable band for one environmental measurement
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ThresholdRange {
    pub min: f64,
    pub max: f64,
}

impl ThresholdRange {
    pub const fn new(min: f64, max: f64) -> Self {
        Self { min, max }
    }

    pub fn contains(&self, value: f64) -> bool {
        value >= self.min && value <= self.max
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ThresholdConfig {
    /// Shed air temperature (°C)
    #[serde(default = "default_temperature_range")]
    pub temperature: ThresholdRange,
    /// Relative humidity (%)
    #[serde(default = "default_humidity_range")]
    pub humidity: ThresholdRange,
    /// Carbon dioxide (ppm)
    #[serde(default = "default_co2_range")]
    pub co2: ThresholdRange,
    /// Ammonia (ppm)
    #[serde(default = "default_nh3_range")]
    pub nh3: ThresholdRange,
}

fn default_temperature_range() -> ThresholdRange {
    ThresholdRange::new(18.0, 35.0)
}

fn default_humidity_range() -> ThresholdRange {
    ThresholdRange::new(50.0, 75.0)
}

fn default_co2_range() -> ThresholdRange {
    ThresholdRange::new(0.0, 3000.0)
}

fn default_nh3_range() -> ThresholdRange {
    ThresholdRange::new(0.0, 25.0)
}

impl Default for ThresholdConfig {
    fn default() -> Self {
        Self {
            temperature: default_temperature_range(),
            humidity: default_humidity_range(),
            co2: default_co2_range(),
            nh3: default_nh3_range(),
        }
    }
}

// ============================================================================
// Distribution
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DistributionConfig {
    /// Evaluation points across the weight range
    #[serde(default = "default_steps")]
    pub steps: usize,
}

fn default_steps() -> usize {
    crate::distribution::DEFAULT_STEPS
}

impl Default for DistributionConfig {
    fn default() -> Self {
        Self { steps: default_steps() }
    }
}

// ============================================================================
// Alerts
// ============================================================================

/// Alert evaluation and retention.
///
/// A new alert is suppressed when one of the same kind and side was raised
/// within `cooldown_seconds` and its value differs by less than
/// `similarity_tolerance` (relative).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AlertConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,
    #[serde(default = "default_cooldown")]
    pub cooldown_seconds: u64,
    #[serde(default = "default_similarity_tolerance")]
    pub similarity_tolerance: f64,
    /// Alerts older than this are dropped
    #[serde(default = "default_retention_hours")]
    pub retention_hours: u64,
    #[serde(default = "default_max_retained")]
    pub max_retained: usize,
}

fn default_true() -> bool {
    true
}

fn default_cooldown() -> u64 {
    300
}

fn default_similarity_tolerance() -> f64 {
    0.05
}

fn default_retention_hours() -> u64 {
    24
}

fn default_max_retained() -> usize {
    50
}

impl Default for AlertConfig {
    fn default() -> Self {
        Self {
            enabled: default_true(),
            cooldown_seconds: default_cooldown(),
            similarity_tolerance: default_similarity_tolerance(),
            retention_hours: default_retention_hours(),
            max_retained: default_max_retained(),
        }
    }
}

// ============================================================================
// Thermal map
// ============================================================================

/// Temperatures mapped onto the blue→red colour scale
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ThermalMapConfig {
    #[serde(default = "default_map_min")]
    pub min_temp_c: f64,
    #[serde(default = "default_map_max")]
    pub max_temp_c: f64,
}

fn default_map_min() -> f64 {
    15.0
}

fn default_map_max() -> f64 {
    40.0
}

impl Default for ThermalMapConfig {
    fn default() -> Self {
        Self { min_temp_c: default_map_min(), max_temp_c: default_map_max() }
    }
}

// ============================================================================
// Costs
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CostConfig {
    /// Tariff in €/kWh
    #[serde(default = "default_electricity_rate")]
    pub electricity_rate_per_kwh: f64,
}

fn default_electricity_rate() -> f64 {
    0.15
}

impl Default for CostConfig {
    fn default() -> Self {
        Self { electricity_rate_per_kwh: default_electricity_rate() }
    }
}

// ============================================================================
// Display
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Theme {
    Light,
    Dark,
    #[default]
    Auto,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DisplayConfig {
    #[serde(default)]
    pub theme: Theme,
    #[serde(default = "default_true")]
    pub notifications: bool,
}

impl Default for DisplayConfig {
    fn default() -> Self {
        Self { theme: Theme::default(), notifications: true }
    }
}

// ============================================================================
// Storage
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StorageConfig {
    /// Local record store directory
    #[serde(default = "default_storage_path")]
    pub path: PathBuf,
}

fn default_storage_path() -> PathBuf {
    PathBuf::from(super::defaults::DEFAULT_STORE_PATH)
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self { path: default_storage_path() }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        let config = MonitorConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.refresh.interval_seconds, 60);
        assert_eq!(config.thresholds.temperature, ThresholdRange::new(18.0, 35.0));
        assert_eq!(config.growth_curve, GompertzCurve::default());
    }

    #[test]
    fn test_partial_section_keeps_other_defaults() {
        let config = MonitorConfig::from_toml_str(
            r#"
[thresholds.humidity]
min = 55.0
max = 70.0

[growth_curve]
asymptotic_weight_g = 2800.0
"#,
        )
        .unwrap();
        assert_eq!(config.thresholds.humidity, ThresholdRange::new(55.0, 70.0));
        assert_eq!(config.thresholds.nh3, ThresholdRange::new(0.0, 25.0));
        assert_eq!(config.growth_curve.asymptotic_weight_g, 2800.0);
        assert_eq!(config.growth_curve.growth_rate_k, 0.07);
    }

    #[test]
    fn test_toml_roundtrip() {
        let config = MonitorConfig::default();
        let text = config.to_toml().unwrap();
        let back = MonitorConfig::from_toml_str(&text).unwrap();
        assert_eq!(back, config);
    }

    #[test]
    fn test_threshold_range_contains() {
        let range = ThresholdRange::new(18.0, 35.0);
        assert!(range.contains(18.0));
        assert!(range.contains(35.0));
        assert!(!range.contains(35.1));
    }
}
