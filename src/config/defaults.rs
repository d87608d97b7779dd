//! System-wide default constants.
//!
//! Centralises magic numbers used outside the TOML config.
//! Grouped by subsystem for easy discovery.

// ============================================================================
// Storage
// ============================================================================

/// Local record store directory when `[storage] path` is not set.
pub const DEFAULT_STORE_PATH: &str = "./data/avicola.sled";

// ============================================================================
// Reports
// ============================================================================

/// Length of the ideal growth curve attached to a batch report (days).
///
/// 42 days covers a standard broiler cycle.
pub const IDEAL_CURVE_HORIZON_DAYS: i64 = 42;

/// Days of daily consumption buckets shown in a batch report.
pub const CONSUMPTION_WINDOW_DAYS: i64 = 7;

// ============================================================================
// Monitor
// ============================================================================

/// Consecutive failed refreshes logged at warn before escalating to error.
pub const MAX_QUIET_REFRESH_FAILURES: u32 = 3;

// ============================================================================
// Simulation
// ============================================================================

/// Birds placed in a simulated batch.
pub const SIMULATION_INITIAL_BIRDS: u32 = 10_000;

/// Length of a simulated batch (days).
pub const SIMULATION_DAYS: u32 = 42;

/// Birds weighed individually on the last simulated day.
pub const SIMULATION_WEIGHED_BIRDS: usize = 100;
