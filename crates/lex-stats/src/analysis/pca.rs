//! Principal component analysis on standardized numeric columns.
//!
//! Columns are z-scored with the population standard deviation, the
//! covariance matrix of the standardized data (n - 1 denominator) is
//! decomposed with `u_numflow`'s symmetric eigen-solver, and each
//! component's sign is fixed so that its largest absolute loading is
//! positive.

use super::{ensure_all_numeric, standardize};
use crate::error::{Result, StatsError};
use crate::reporting::{Report, TextReport};
use crate::utils::{complete_rows, truncate_name};
use polars::prelude::*;
use serde::Serialize;
use tracing::{debug, info};
use u_numflow::matrix::Matrix;

/// Components kept when the caller does not ask for a number.
pub const DEFAULT_MAX_COMPONENTS: usize = 5;

/// Loadings above this magnitude are marked in the report.
const LOADING_MARK: f64 = 0.5;

#[derive(Debug, Clone, Serialize)]
pub struct PcaResult {
    pub columns: Vec<String>,
    /// Complete rows used in the fit.
    pub n_samples: usize,
    pub n_components: usize,
    /// Eigenvalues of the retained components.
    pub eigenvalues: Vec<f64>,
    /// Variance ratios of the retained components.
    pub explained_variance_ratio: Vec<f64>,
    /// Variance ratios of every component; sums to 1.
    pub full_variance_ratio: Vec<f64>,
    /// `loadings[variable][component]`.
    pub loadings: Vec<Vec<f64>>,
    /// Component scores, one column per retained component (`PC1`..`PCk`).
    #[serde(skip)]
    pub scores: DataFrame,
}

impl PcaResult {
    /// Component names `PC1`..`PCk`.
    pub fn component_names(&self) -> Vec<String> {
        (1..=self.n_components).map(|i| format!("PC{}", i)).collect()
    }

    /// First two component scores per sample, for a scatter plot.
    ///
    /// With a single component the second coordinate is 0.
    pub fn projection(&self) -> Result<Vec<(f64, f64)>> {
        let first = crate::utils::float_values(self.scores.column("PC1")?.as_materialized_series())?;
        let second = if self.n_components >= 2 {
            crate::utils::float_values(self.scores.column("PC2")?.as_materialized_series())?
        } else {
            vec![Some(0.0); first.len()]
        };
        Ok(first
            .into_iter()
            .zip(second)
            .map(|(a, b)| (a.unwrap_or(0.0), b.unwrap_or(0.0)))
            .collect())
    }

    /// Loadings as a frame with a `variable` column and one column per component.
    pub fn loadings_frame(&self) -> Result<DataFrame> {
        let mut columns = vec![Column::from(Series::new(
            "variable".into(),
            self.columns.clone(),
        ))];
        for (j, name) in self.component_names().into_iter().enumerate() {
            let values: Vec<f64> = self.loadings.iter().map(|row| row[j]).collect();
            columns.push(Column::from(Series::new(name.into(), values)));
        }
        Ok(DataFrame::new(columns)?)
    }
}

/// Fit PCA on `columns`, keeping `n_components` (default: up to five).
pub fn run_pca(
    df: &DataFrame,
    columns: &[String],
    n_components: Option<usize>,
) -> Result<PcaResult> {
    info!("Running PCA on {} columns", columns.len());
    ensure_all_numeric(df, columns)?;

    let mut rows = complete_rows(df, columns)?;
    let n = rows.len();
    if n < 2 {
        return Err(StatsError::insufficient("PCA (complete rows)", 2, n));
    }

    let c = columns.len();
    let k = n_components
        .unwrap_or_else(|| c.min(DEFAULT_MAX_COMPONENTS))
        .clamp(1, c);

    standardize(&mut rows);

    let mut cov = vec![0.0; c * c];
    for row in &rows {
        for i in 0..c {
            for j in i..c {
                cov[i * c + j] += row[i] * row[j];
            }
        }
    }
    let denominator = (n - 1) as f64;
    for i in 0..c {
        for j in i..c {
            cov[i * c + j] /= denominator;
            cov[j * c + i] = cov[i * c + j];
        }
    }

    let cov = Matrix::new(c, c, cov).map_err(|e| StatsError::Numerical(e.to_string()))?;
    let (values, vectors) = cov
        .eigen_symmetric()
        .map_err(|e| StatsError::Numerical(format!("eigen decomposition failed: {}", e)))?;

    let eigenvalues: Vec<f64> = values.iter().map(|v| v.max(0.0)).collect();
    let total: f64 = eigenvalues.iter().sum();
    let full_variance_ratio: Vec<f64> = eigenvalues
        .iter()
        .map(|v| if total > 0.0 { v / total } else { 0.0 })
        .collect();
    debug!("Variance ratios: {:?}", full_variance_ratio);

    // Column j of `vectors` belongs to the j-th largest eigenvalue
    let components: Vec<Vec<f64>> = (0..k)
        .map(|j| normalize_sign((0..c).map(|i| vectors.get(i, j)).collect()))
        .collect();

    let score_columns: Vec<Column> = components
        .iter()
        .enumerate()
        .map(|(j, component)| {
            let scores: Vec<f64> = rows
                .iter()
                .map(|row| row.iter().zip(component).map(|(x, w)| x * w).sum())
                .collect();
            Column::from(Series::new(format!("PC{}", j + 1).into(), scores))
        })
        .collect();

    let loadings = (0..c)
        .map(|var| components.iter().map(|comp| comp[var]).collect())
        .collect();

    Ok(PcaResult {
        columns: columns.to_vec(),
        n_samples: n,
        n_components: k,
        eigenvalues: eigenvalues[..k].to_vec(),
        explained_variance_ratio: full_variance_ratio[..k].to_vec(),
        full_variance_ratio,
        loadings,
        scores: DataFrame::new(score_columns)?,
    })
}

/// Flip a component so its largest-magnitude entry is positive.
fn normalize_sign(mut component: Vec<f64>) -> Vec<f64> {
    let pivot = component
        .iter()
        .copied()
        .fold(0.0f64, |best, v| if v.abs() > best.abs() { v } else { best });
    if pivot < 0.0 {
        for v in component.iter_mut() {
            *v = -*v;
        }
    }
    component
}

impl Report for PcaResult {
    fn report(&self) -> String {
        let mut report = TextReport::new("Principal Component Analysis (PCA)");
        report.line(format!("Sample size: {}", self.n_samples));
        report.line(format!("Variables: {}", self.columns.len()));

        report.section("Explained variance (eigenvalues)");
        let mut cumulative = 0.0;
        let rows: Vec<Vec<String>> = self
            .eigenvalues
            .iter()
            .zip(&self.explained_variance_ratio)
            .enumerate()
            .map(|(i, (eigenvalue, ratio))| {
                cumulative += ratio * 100.0;
                vec![
                    format!("PC{}", i + 1),
                    format!("{:.4}", eigenvalue),
                    format!("{:.2}", ratio * 100.0),
                    format!("{:.2}", cumulative),
                ]
            })
            .collect();
        report.table(&["Component", "Eigenvalue", "Variance %", "Cumulative %"], &rows);

        report.section("Component matrix (loadings)");
        let mut header = vec!["Variable".to_string()];
        header.extend(self.component_names());
        let rows: Vec<Vec<String>> = self
            .columns
            .iter()
            .zip(&self.loadings)
            .map(|(name, loadings)| {
                let mut row = vec![truncate_name(name, 15)];
                row.extend(loadings.iter().map(|v| {
                    let mark = if v.abs() > LOADING_MARK { "*" } else { " " };
                    format!("{:.4}{}", v, mark)
                }));
                row
            })
            .collect();
        report.table(&header, &rows);
        report.line("Note: * marks |loading| > 0.5 (main contributing variables)");

        report.finish()
    }
}
