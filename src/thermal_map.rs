//! Thermal map of the shed floor
//!
//! Validates a temperature grid and maps each cell onto a blue (cold) to
//! red (hot) hue scale: hue = (1 − normalized) × 240°.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::aggregation::summary_stats;
use crate::config::ThermalMapConfig;
use crate::types::{SummaryStats, ThermalMap};

/// Hue of the coldest colour (blue), in degrees
const COLD_HUE: f64 = 240.0;

#[derive(Debug, Error, PartialEq)]
pub enum ThermalMapError {
    #[error("Thermal map grid is empty")]
    EmptyGrid,

    #[error("Thermal map row {row} has {found} cells, expected {expected}")]
    RaggedRow { row: usize, expected: usize, found: usize },
}

/// Grid dimensions as `(rows, cols)` for a non-empty rectangular grid
pub fn validate_grid(grid: &[Vec<f64>]) -> Result<(usize, usize), ThermalMapError> {
    let cols = grid.first().map(Vec::len).unwrap_or(0);
    if cols == 0 {
        return Err(ThermalMapError::EmptyGrid);
    }
    for (row, cells) in grid.iter().enumerate() {
        if cells.len() != cols {
            return Err(ThermalMapError::RaggedRow { row, expected: cols, found: cells.len() });
        }
    }
    Ok((grid.len(), cols))
}

/// Hue in degrees for a temperature on the `[min, max]` scale.
///
/// `None` (render grey) when the scale is degenerate or the value unusable.
pub fn temperature_hue(temperature_c: f64, min_c: f64, max_c: f64) -> Option<f64> {
    if !temperature_c.is_finite() || !(max_c > min_c) {
        return None;
    }
    let normalized = ((temperature_c - min_c) / (max_c - min_c)).clamp(0.0, 1.0);
    Some((1.0 - normalized) * COLD_HUE)
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ThermalCell {
    pub row: usize,
    pub col: usize,
    pub temperature_c: f64,
    pub hue: Option<f64>,
}

/// A thermal map ready to draw
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ThermalSnapshot {
    pub rows: usize,
    pub cols: usize,
    pub stats: Option<SummaryStats>,
    pub hottest: Option<ThermalCell>,
    pub cells: Vec<ThermalCell>,
}

pub fn render(map: &ThermalMap, scale: &ThermalMapConfig) -> Result<ThermalSnapshot, ThermalMapError> {
    let (rows, cols) = validate_grid(&map.temperatures)?;

    let cells: Vec<ThermalCell> = map
        .temperatures
        .iter()
        .enumerate()
        .flat_map(|(row, line)| {
            line.iter().enumerate().map(move |(col, &t)| ThermalCell {
                row,
                col,
                temperature_c: t,
                hue: temperature_hue(t, scale.min_temp_c, scale.max_temp_c),
            })
        })
        .collect();

    let stats = summary_stats(cells.iter().map(|c| Some(c.temperature_c)));
    let hottest = cells
        .iter()
        .filter(|c| c.temperature_c.is_finite())
        .max_by(|a, b| a.temperature_c.total_cmp(&b.temperature_c))
        .copied();

    Ok(ThermalSnapshot { rows, cols, stats, hottest, cells })
}
