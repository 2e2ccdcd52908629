//! Simple linear regression of one numeric column on another.
//!
//! The least squares fit itself comes from `u_analytics::regression`.

use super::paired_values;
use crate::error::{Result, StatsError};
use crate::reporting::{Report, TextReport, format_p_value, significance_stars};
use crate::stats::sample_std;
use polars::prelude::*;
use serde::Serialize;
use tracing::{debug, info};
use u_analytics::regression;

const ALPHA: f64 = 0.05;

/// A coefficient estimate with its standard error and t test.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Coefficient {
    pub estimate: f64,
    pub std_error: f64,
    pub t_statistic: f64,
    pub p_value: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RegressionResult {
    pub x_col: String,
    pub y_col: String,
    pub n: usize,
    pub intercept: Coefficient,
    pub slope: Coefficient,
    pub r_squared: f64,
    pub adj_r_squared: f64,
    /// Residual standard error on n - 2 degrees of freedom.
    pub residual_se: f64,
    pub f_statistic: f64,
    pub f_p_value: f64,
    /// Endpoints of the fitted line over the observed x range.
    pub line: [(f64, f64); 2],
    pub points: Vec<(f64, f64)>,
}

impl RegressionResult {
    pub fn predict(&self, x: f64) -> f64 {
        self.intercept.estimate + self.slope.estimate * x
    }

    pub fn is_significant(&self) -> bool {
        self.f_p_value < ALPHA
    }
}

/// Coefficient with a zero standard error reported as an exact fit: t = 0
/// and p = 1 for a zero estimate, t = ±∞ and p = 0 otherwise.
fn coefficient(estimate: f64, std_error: f64, t_statistic: f64, p_value: f64) -> Coefficient {
    let (t_statistic, p_value) = if std_error > 0.0 && t_statistic.is_finite() {
        (t_statistic, p_value.clamp(0.0, 1.0))
    } else if estimate == 0.0 {
        (0.0, 1.0)
    } else {
        (estimate.signum() * f64::INFINITY, 0.0)
    };
    Coefficient {
        estimate,
        std_error,
        t_statistic,
        p_value,
    }
}

/// Ordinary least squares fit of `y_col` on `x_col`.
pub fn simple_linear_regression(
    df: &DataFrame,
    x_col: &str,
    y_col: &str,
) -> Result<RegressionResult> {
    info!("Regressing '{}' on '{}'", y_col, x_col);

    let (x, y) = paired_values(df, x_col, y_col)?;
    let n = x.len();
    if n < 3 {
        return Err(StatsError::insufficient("linear regression", 3, n));
    }
    if sample_std(&x) == 0.0 {
        return Err(StatsError::EmptyInput(format!(
            "'{}' has no variance, a regression line cannot be fitted",
            x_col
        )));
    }

    let fit = regression::simple_linear_regression(&x, &y).ok_or_else(|| {
        StatsError::Numerical(format!(
            "least squares fit of '{}' on '{}' failed",
            y_col, x_col
        ))
    })?;

    let intercept = coefficient(
        fit.intercept,
        fit.intercept_se,
        fit.intercept_t,
        fit.intercept_p,
    );
    let slope = coefficient(fit.slope, fit.slope_se, fit.slope_t, fit.slope_p);

    // F = t² for a single predictor
    let (f_statistic, f_p_value) = if slope.t_statistic.is_finite() && slope.t_statistic != 0.0 {
        (fit.f_statistic, fit.f_p_value.clamp(0.0, 1.0))
    } else if slope.t_statistic == 0.0 {
        (0.0, 1.0)
    } else {
        (f64::INFINITY, 0.0)
    };
    let r_squared = if sample_std(&y) > 0.0 {
        fit.r_squared.clamp(0.0, 1.0)
    } else {
        0.0
    };
    let df_resid = (n - 2) as f64;
    let adj_r_squared = 1.0 - (1.0 - r_squared) * (n as f64 - 1.0) / df_resid;
    debug!("Fitted slope {:.4}, R² {:.4}", fit.slope, r_squared);

    let x_min = x.iter().copied().fold(f64::INFINITY, f64::min);
    let x_max = x.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    let at = |v: f64| fit.intercept + fit.slope * v;

    Ok(RegressionResult {
        x_col: x_col.to_string(),
        y_col: y_col.to_string(),
        n,
        intercept,
        slope,
        r_squared,
        adj_r_squared,
        residual_se: fit.residual_se,
        f_statistic,
        f_p_value,
        line: [(x_min, at(x_min)), (x_max, at(x_max))],
        points: x.into_iter().zip(y).collect(),
    })
}

impl Report for RegressionResult {
    fn report(&self) -> String {
        let mut report = TextReport::new("Simple Linear Regression");
        report.blank();
        report.line(format!("Dependent variable (Y): {}", self.y_col));
        report.line(format!("Independent variable (X): {}", self.x_col));
        report.line(format!("Sample size (n): {}", self.n));

        report.section("Model fit");
        report.line(format!("   - R² = {:.4}", self.r_squared));
        report.line(format!("   - Adjusted R² = {:.4}", self.adj_r_squared));
        report.line(format!("   - Residual standard error = {:.4}", self.residual_se));
        report.line(format!(
            "   - F(1, {}) = {:.3}, p = {} ({})",
            self.n - 2,
            self.f_statistic,
            format_p_value(self.f_p_value),
            significance_stars(self.f_p_value)
        ));

        report.section("Coefficients");
        let row = |name: &str, c: &Coefficient| {
            vec![
                name.to_string(),
                format!("{:.4}", c.estimate),
                format!("{:.4}", c.std_error),
                format!("{:.3}", c.t_statistic),
                format_p_value(c.p_value),
                significance_stars(c.p_value).to_string(),
            ]
        };
        report.table(
            &["Term", "Estimate", "Std. Error", "t", "p", ""],
            &[
                row("(Intercept)", &self.intercept),
                row(&self.x_col, &self.slope),
            ],
        );

        report.section("Conclusion");
        report.line(format!(
            "   Fitted line: {} = {:.4} {} {:.4} * {}",
            self.y_col,
            self.intercept.estimate,
            if self.slope.estimate < 0.0 { "-" } else { "+" },
            self.slope.estimate.abs(),
            self.x_col
        ));
        if self.is_significant() {
            report.line(format!(
                "   {} is a significant predictor of {}; each unit of {} changes {} by {:.4} on average.",
                self.x_col, self.y_col, self.x_col, self.y_col, self.slope.estimate
            ));
        } else {
            report.line(format!(
                "   {} is not a significant predictor of {} (p >= 0.05).",
                self.x_col, self.y_col
            ));
        }

        report.finish()
    }
}
