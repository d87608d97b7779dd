//! Config validation: unknown-key detection with Levenshtein suggestions
//! and physical range checks.
//!
//! Two-pass parse approach: first deserialize raw TOML into `toml::Value`,
//! walk the key tree, compare against known field names, and emit warnings
//! with "did you mean?" suggestions. Then proceed with normal serde
//! deserialization. Warnings never break existing configs.

use std::collections::HashSet;

/// A non-fatal config warning (typo, suspicious value).
#[derive(Debug, Clone)]
pub struct ValidationWarning {
    pub field: String,
    pub message: String,
    pub suggestion: Option<String>,
}

impl std::fmt::Display for ValidationWarning {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.message)?;
        if let Some(ref s) = self.suggestion {
            write!(f, " (did you mean '{s}'?)")?;
        }
        Ok(())
    }
}

// ============================================================================
// Known Config Keys
// ============================================================================

/// Returns the complete set of valid dotted key paths for MonitorConfig.
///
/// Kept in step with the struct hierarchy in monitor_config.rs.
pub fn known_config_keys() -> HashSet<&'static str> {
    let keys: &[&str] = &[
        // [farm]
        "farm",
        "farm.name",
        "farm.house",
        // [refresh]
        "refresh",
        "refresh.interval_seconds",
        // [thresholds]
        "thresholds",
        "thresholds.temperature",
        "thresholds.temperature.min",
        "thresholds.temperature.max",
        "thresholds.humidity",
        "thresholds.humidity.min",
        "thresholds.humidity.max",
        "thresholds.co2",
        "thresholds.co2.min",
        "thresholds.co2.max",
        "thresholds.nh3",
        "thresholds.nh3.min",
        "thresholds.nh3.max",
        // [growth_curve]
        "growth_curve",
        "growth_curve.asymptotic_weight_g",
        "growth_curve.growth_rate_k",
        "growth_curve.inflection_day",
        // [distribution]
        "distribution",
        "distribution.steps",
        // [alerts]
        "alerts",
        "alerts.enabled",
        "alerts.cooldown_seconds",
        "alerts.similarity_tolerance",
        "alerts.retention_hours",
        "alerts.max_retained",
        // [thermal_map]
        "thermal_map",
        "thermal_map.min_temp_c",
        "thermal_map.max_temp_c",
        // [costs]
        "costs",
        "costs.electricity_rate_per_kwh",
        // [display]
        "display",
        "display.theme",
        "display.notifications",
        // [storage]
        "storage",
        "storage.path",
    ];
    keys.iter().copied().collect()
}

// ============================================================================
// TOML Key Walking
// ============================================================================

/// Recursively walks a `toml::Value` tree and collects all dotted key paths.
///
/// For example, a table `{ a = { b = 1, c = 2 } }` yields:
/// `["a", "a.b", "a.c"]`
pub fn walk_toml_keys(value: &toml::Value, prefix: &str) -> Vec<String> {
    let mut keys = Vec::new();
    if let Some(table) = value.as_table() {
        for (k, v) in table {
            let path = if prefix.is_empty() {
                k.clone()
            } else {
                format!("{prefix}.{k}")
            };
            keys.push(path.clone());
            if v.is_table() {
                keys.extend(walk_toml_keys(v, &path));
            }
        }
    }
    keys
}

/// Dotted paths of every float in the tree that is NaN or infinite.
pub fn non_finite_keys(value: &toml::Value, prefix: &str) -> Vec<String> {
    let mut keys = Vec::new();
    if let Some(table) = value.as_table() {
        for (k, v) in table {
            let path = if prefix.is_empty() {
                k.clone()
            } else {
                format!("{prefix}.{k}")
            };
            match v {
                toml::Value::Float(f) if !f.is_finite() => keys.push(path),
                toml::Value::Table(_) => keys.extend(non_finite_keys(v, &path)),
                _ => {}
            }
        }
    }
    keys
}

// ============================================================================
// Levenshtein Distance
// ============================================================================

/// Compute the Levenshtein edit distance between two strings.
fn levenshtein(a: &str, b: &str) -> usize {
    let a_len = a.chars().count();
    let b_len = b.chars().count();
    if a_len == 0 {
        return b_len;
    }
    if b_len == 0 {
        return a_len;
    }

    let mut prev: Vec<usize> = (0..=b_len).collect();
    let mut curr = vec![0; b_len + 1];

    for (i, ca) in a.chars().enumerate() {
        curr[0] = i + 1;
        for (j, cb) in b.chars().enumerate() {
            let cost = usize::from(ca != cb);
            curr[j + 1] = (prev[j + 1] + 1).min(curr[j] + 1).min(prev[j] + cost);
        }
        std::mem::swap(&mut prev, &mut curr);
    }

    prev[b_len]
}

/// Suggest the closest known key for an unknown key, if within edit distance 3.
pub fn suggest_correction(unknown: &str, known: &HashSet<&str>) -> Option<String> {
    known
        .iter()
        .map(|&k| (k, levenshtein(unknown, k)))
        .filter(|&(_, dist)| dist <= 3)
        .min_by(|a, b| a.1.cmp(&b.1).then_with(|| a.0.cmp(b.0)))
        .map(|(k, _)| k.to_string())
}

// ============================================================================
// Unknown Key Validation (entry point)
// ============================================================================

/// Parse a raw TOML string and return warnings for any unknown config keys.
///
/// This does NOT fail on unknown keys, it only warns.
pub fn validate_unknown_keys(raw_toml: &str) -> Vec<ValidationWarning> {
    let value: toml::Value = match raw_toml.parse() {
        Ok(v) => v,
        Err(_) => return Vec::new(), // parse errors are reported by serde later
    };

    let known = known_config_keys();
    walk_toml_keys(&value, "")
        .into_iter()
        .filter(|key| !known.contains(key.as_str()))
        .map(|key| {
            let suggestion = suggest_correction(&key, &known);
            let message = format!("Unknown config key '{key}'");
            ValidationWarning { field: key, message, suggestion }
        })
        .collect()
}

// ============================================================================
// Physical Range Validation
// ============================================================================

/// Validate physical ranges on a parsed MonitorConfig.
///
/// Returns (errors, warnings): errors are impossible values that must
/// prevent startup; warnings are suspicious but not fatal.
pub fn validate_physical_ranges(
    config: &super::MonitorConfig,
) -> (Vec<String>, Vec<ValidationWarning>) {
    let mut errors = Vec::new();
    let mut warnings = Vec::new();
    let t = &config.thresholds;

    // Relative humidity is a percentage
    for (name, value) in [("min", t.humidity.min), ("max", t.humidity.max)] {
        if !(0.0..=100.0).contains(&value) {
            errors.push(format!(
                "thresholds.humidity.{name} = {value:.1} is outside physical range (0-100 %)"
            ));
        }
    }

    // Shed sensors report -50..100 °C
    for (name, value) in [("min", t.temperature.min), ("max", t.temperature.max)] {
        if !(-50.0..=100.0).contains(&value) {
            errors.push(format!(
                "thresholds.temperature.{name} = {value:.1} is outside sensor range (-50-100 °C)"
            ));
        }
    }

    // Gas concentrations cannot be negative
    for (name, range) in [("co2", &t.co2), ("nh3", &t.nh3)] {
        if range.min < 0.0 {
            errors.push(format!(
                "thresholds.{name}.min = {:.1} cannot be negative",
                range.min
            ));
        }
    }

    // Broiler houses run roughly 10-40 °C
    if t.temperature.min < 10.0 || t.temperature.max > 40.0 {
        warnings.push(ValidationWarning {
            field: "thresholds.temperature".to_string(),
            message: format!(
                "temperature band {:.1}-{:.1} °C is outside typical house range (10-40 °C)",
                t.temperature.min, t.temperature.max
            ),
            suggestion: None,
        });
    }

    // Ammonia above 25 ppm harms birds and workers
    if t.nh3.max > 25.0 {
        warnings.push(ValidationWarning {
            field: "thresholds.nh3.max".to_string(),
            message: format!(
                "nh3.max = {:.1} ppm exceeds the usual 25 ppm exposure limit",
                t.nh3.max
            ),
            suggestion: None,
        });
    }

    // Commercial broilers mature at roughly 1-6 kg
    let w = config.growth_curve.asymptotic_weight_g;
    if w > 0.0 && !(1000.0..=6000.0).contains(&w) {
        warnings.push(ValidationWarning {
            field: "growth_curve.asymptotic_weight_g".to_string(),
            message: format!(
                "asymptotic_weight_g = {w:.0} is outside typical broiler range (1000-6000 g)"
            ),
            suggestion: None,
        });
    }

    if config.refresh.interval_seconds > 3600 {
        warnings.push(ValidationWarning {
            field: "refresh.interval_seconds".to_string(),
            message: format!(
                "refresh.interval_seconds = {} is longer than an hour",
                config.refresh.interval_seconds
            ),
            suggestion: None,
        });
    }

    (errors, warnings)
}

// ============================================================================
// Tests
// ============================================================================
