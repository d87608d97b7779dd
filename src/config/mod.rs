//! Monitor Configuration Module
//!
//! Farm configuration loaded from TOML files: environmental alert limits,
//! ideal growth curve, refresh cadence and display settings.
//!
//! ## Loading Order
//!
//! 1. `AVICOLA_CONFIG` environment variable (path to TOML file)
//! 2. `avicola.toml` in the current working directory
//! 3. Built-in defaults
//!
//! ## Usage
//!
//! The config is an explicit value: load it once at startup and hand it to
//! whatever needs it.
//!
//! ```ignore
//! let config = MonitorConfig::load();
//! let report = build_batch_report(&repo, "lote-1", today, &config).await?;
//! ```

mod monitor_config;
pub mod defaults;
pub mod validation;

pub use monitor_config::*;
