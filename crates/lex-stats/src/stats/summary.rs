//! Summary statistics over plain `f64` slices.
//!
//! Thin defaults over `u_numflow::stats`: the engines want a number for an
//! empty or single-value group, not an `Option`.

use std::cmp::Ordering;
use u_numflow::stats;

/// Arithmetic mean; 0.0 for an empty slice.
pub fn mean(values: &[f64]) -> f64 {
    stats::mean(values).unwrap_or(0.0)
}

/// Sample standard deviation (n - 1 denominator); 0.0 below two values.
pub fn sample_std(values: &[f64]) -> f64 {
    stats::std_dev(values).unwrap_or(0.0)
}

/// Population standard deviation (n denominator).
pub fn population_std(values: &[f64]) -> f64 {
    stats::population_std_dev(values).unwrap_or(0.0)
}

/// Sort a copy of the values ascending. NaN sorts as equal.
pub fn sorted(values: &[f64]) -> Vec<f64> {
    let mut out = values.to_vec();
    out.sort_by(|a, b| a.partial_cmp(b).unwrap_or(Ordering::Equal));
    out
}

/// Quantile of already sorted values with linear interpolation between
/// closest ranks (position `q * (n - 1)`).
pub fn quantile_sorted(sorted: &[f64], q: f64) -> Option<f64> {
    stats::quantile_sorted(sorted, q.clamp(0.0, 1.0))
}

/// Median with linear interpolation.
pub fn median(values: &[f64]) -> Option<f64> {
    stats::median(values)
}
