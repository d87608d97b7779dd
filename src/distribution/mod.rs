//! Weight distribution of individually weighed birds
//!
//! Smooth histogram via Gaussian kernel density estimation, plus the
//! coefficient of variation used as the batch uniformity figure.

use statrs::statistics::Statistics;

use crate::types::DistributionPoint;

/// Default number of evaluation points across the weight range
pub const DEFAULT_STEPS: usize = 30;

/// Bandwidth is the weight range split into this many parts
const BANDWIDTH_DIVISOR: f64 = 15.0;

/// Standard normal density
pub fn gaussian_kernel(x: f64) -> f64 {
    (-0.5 * x * x).exp() / (2.0 * std::f64::consts::PI).sqrt()
}

/// Estimate the weight distribution at `steps` evenly spaced weights.
///
/// The evaluation points span `[min, max]` of the sample inclusive. Each
/// `frequency` is the density scaled by sample size, so the curve reads as
/// "birds per gram around this weight". Empty input yields an empty curve; a
/// constant sample falls back to a unit bandwidth.
pub fn estimate_distribution(weights: &[f64], steps: usize) -> Vec<DistributionPoint> {
    let sample: Vec<f64> = weights.iter().copied().filter(|w| w.is_finite()).collect();
    if sample.is_empty() || steps == 0 {
        return Vec::new();
    }

    let min = sample.iter().copied().fold(f64::INFINITY, f64::min);
    let max = sample.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    let range = max - min;

    let mut bandwidth = range / BANDWIDTH_DIVISOR;
    if bandwidth <= 0.0 {
        bandwidth = 1.0;
    }

    let n = sample.len() as f64;
    let last = steps.saturating_sub(1).max(1) as f64;

    (0..steps)
        .map(|i| {
            let x = min + range * i as f64 / last;
            let density = sample
                .iter()
                .map(|w| gaussian_kernel((x - w) / bandwidth))
                .sum::<f64>()
                / (n * bandwidth);
            DistributionPoint { weight_g: x, frequency: density * n }
        })
        .collect()
}

/// Population standard deviation as a percentage of the mean; 0 when the
/// sample is empty or its mean is zero
pub fn coefficient_of_variation(weights: &[f64]) -> f64 {
    if weights.is_empty() {
        return 0.0;
    }
    let mean = weights.iter().mean();
    if mean == 0.0 || !mean.is_finite() {
        return 0.0;
    }
    let std_dev = weights.iter().population_std_dev();
    if !std_dev.is_finite() {
        return 0.0;
    }
    std_dev / mean * 100.0
}
