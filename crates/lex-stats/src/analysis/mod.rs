//! Analysis engines.
//!
//! Each engine is a free function taking the dataset and a column selection,
//! returning a typed result that implements [`Report`](crate::reporting::Report).
//! Engines only read the frame.
//!
//! | Engine | Entry point |
//! |--------|-------------|
//! | Descriptive statistics | [`descriptive::describe`] |
//! | Two-sample t-test | [`ttest::independent_ttest`] |
//! | One-way ANOVA + Tukey HSD | [`anova::one_way_anova`] |
//! | Pearson / Spearman correlation | [`correlation::correlate`] |
//! | Simple linear regression | [`regression::simple_linear_regression`] |
//! | Principal component analysis | [`pca::run_pca`] |
//! | K-means clustering | [`clustering::run_kmeans`] |

pub mod anova;
pub mod clustering;
pub mod correlation;
pub mod descriptive;
pub mod pca;
pub mod regression;
pub mod ttest;

use crate::error::{Result, StatsError};
use crate::stats::summary::{mean, sample_std};
use crate::utils::{is_numeric_dtype, series};
use polars::prelude::*;
use serde::Serialize;

/// Size, mean and sample standard deviation of one group.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GroupStats {
    pub name: String,
    pub count: usize,
    pub mean: f64,
    pub std: f64,
}

impl GroupStats {
    pub fn from_values(name: &str, values: &[f64]) -> Self {
        Self {
            name: name.to_string(),
            count: values.len(),
            mean: mean(values),
            std: sample_std(values),
        }
    }
}

/// Fail with [`StatsError::TypeMismatch`] unless the column is numeric.
pub(crate) fn ensure_numeric(df: &DataFrame, column: &str) -> Result<()> {
    let dtype = series(df, column)?.dtype();
    if is_numeric_dtype(dtype) {
        Ok(())
    } else {
        Err(StatsError::TypeMismatch(format!(
            "column '{}' is {}, a numeric column is required",
            column, dtype
        )))
    }
}

/// Check that every selected column is numeric, naming all offenders.
pub(crate) fn ensure_all_numeric(df: &DataFrame, columns: &[String]) -> Result<()> {
    if columns.is_empty() {
        return Err(StatsError::EmptyInput("no columns were selected".to_string()));
    }

    let mut offenders = Vec::new();
    for name in columns {
        let dtype = series(df, name)?.dtype();
        if !is_numeric_dtype(dtype) {
            offenders.push(format!("'{}' ({})", name, dtype));
        }
    }

    if offenders.is_empty() {
        Ok(())
    } else {
        Err(StatsError::TypeMismatch(format!(
            "numeric columns are required, got {}",
            offenders.join(", ")
        )))
    }
}

/// Pairwise-complete `(x, y)` observations of two numeric columns.
pub(crate) fn paired_values(df: &DataFrame, x: &str, y: &str) -> Result<(Vec<f64>, Vec<f64>)> {
    let x_dtype = series(df, x)?.dtype().clone();
    let y_dtype = series(df, y)?.dtype().clone();
    if !is_numeric_dtype(&x_dtype) || !is_numeric_dtype(&y_dtype) {
        return Err(StatsError::TypeMismatch(format!(
            "both variables must be numeric, got '{}' ({}) and '{}' ({})",
            x, x_dtype, y, y_dtype
        )));
    }

    let rows = crate::utils::complete_rows(df, &[x.to_string(), y.to_string()])?;
    Ok(rows.into_iter().map(|row| (row[0], row[1])).unzip())
}

/// Z-score each column in place with the population standard deviation.
///
/// Returns the column means and scales; a constant column gets scale 1.
pub(crate) fn standardize(rows: &mut [Vec<f64>]) -> (Vec<f64>, Vec<f64>) {
    let n_cols = rows.first().map_or(0, Vec::len);
    let mut means = Vec::with_capacity(n_cols);
    let mut scales = Vec::with_capacity(n_cols);

    for j in 0..n_cols {
        let column: Vec<f64> = rows.iter().map(|row| row[j]).collect();
        let m = mean(&column);
        let sd = crate::stats::summary::population_std(&column);
        let scale = if sd > 0.0 { sd } else { 1.0 };
        for row in rows.iter_mut() {
            row[j] = (row[j] - m) / scale;
        }
        means.push(m);
        scales.push(scale);
    }

    (means, scales)
}
