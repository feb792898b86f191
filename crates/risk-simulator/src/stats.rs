//! Summary statistics over simulated outcomes.
//!
//! Standard deviations are population (divide by n). Percentiles expect a
//! slice already sorted ascending.

use std::cmp::Ordering;

pub fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    values.iter().sum::<f64>() / values.len() as f64
}

pub fn std_dev(values: &[f64]) -> f64 {
    if values.len() < 2 {
        return 0.0;
    }
    let m = mean(values);
    let var = values.iter().map(|v| (v - m).powi(2)).sum::<f64>() / values.len() as f64;
    var.sqrt()
}

/// Percentile with linear interpolation between closest ranks.
///
/// `p` is in percent (0-100). The fractional rank is `p/100 * (n-1)`.
pub fn percentile(sorted: &[f64], p: f64) -> f64 {
    match sorted.len() {
        0 => 0.0,
        1 => sorted[0],
        n => {
            let rank = (p.clamp(0.0, 100.0) / 100.0) * (n - 1) as f64;
            let lower = rank.floor() as usize;
            let upper = rank.ceil() as usize;
            let weight = rank - lower as f64;
            sorted[lower] + (sorted[upper] - sorted[lower]) * weight
        }
    }
}

pub fn median(sorted: &[f64]) -> f64 {
    percentile(sorted, 50.0)
}

/// Fraction of `sorted` strictly below `threshold`.
pub fn fraction_below(sorted: &[f64], threshold: f64) -> f64 {
    if sorted.is_empty() {
        return 0.0;
    }
    sorted.partition_point(|v| *v < threshold) as f64 / sorted.len() as f64
}

pub fn sorted_copy(values: &[f64]) -> Vec<f64> {
    let mut sorted = values.to_vec();
    sorted.sort_by(|a, b| a.partial_cmp(b).unwrap_or(Ordering::Equal));
    sorted
}

/// Evenly spaced sample of at most `max_pts` values from a sorted slice.
pub fn sample_distribution(sorted: &[f64], max_pts: usize) -> Vec<f64> {
    if sorted.len() <= max_pts {
        return sorted.to_vec();
    }
    let step = sorted.len() as f64 / max_pts as f64;
    (0..max_pts)
        .map(|i| sorted[(i as f64 * step) as usize])
        .collect()
}
