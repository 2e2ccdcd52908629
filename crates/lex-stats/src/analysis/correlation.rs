//! Bivariate correlation with automatic Pearson/Spearman selection.
//!
//! Both variables are checked for normality first; Pearson's r is used only
//! when both pass, Spearman's rank correlation otherwise. Both coefficients
//! and their t-based p-values come from `u_analytics::correlation`.

use super::paired_values;
use crate::error::{Result, StatsError};
use crate::reporting::{Report, TextReport, format_p_value, significance_stars};
use crate::stats::{NormalityResult, check_normality};
use polars::prelude::*;
use serde::Serialize;
use tracing::{debug, info};
use u_analytics::correlation;

const ALPHA: f64 = 0.05;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum CorrelationMethod {
    Pearson,
    Spearman,
}

impl CorrelationMethod {
    pub fn label(&self) -> &'static str {
        match self {
            CorrelationMethod::Pearson => "Pearson Correlation",
            CorrelationMethod::Spearman => "Spearman Rank Correlation",
        }
    }
}

/// Strength class of |r|.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum CorrelationStrength {
    Negligible,
    Low,
    Moderate,
    High,
}

impl CorrelationStrength {
    pub fn classify(r: f64) -> Self {
        let r = r.abs();
        if r < 0.3 {
            CorrelationStrength::Negligible
        } else if r < 0.5 {
            CorrelationStrength::Low
        } else if r < 0.8 {
            CorrelationStrength::Moderate
        } else {
            CorrelationStrength::High
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            CorrelationStrength::Negligible => "negligible or no correlation",
            CorrelationStrength::Low => "low correlation",
            CorrelationStrength::Moderate => "moderate correlation",
            CorrelationStrength::High => "high correlation",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    Positive,
    Negative,
    None,
}

impl Direction {
    fn of(r: f64) -> Self {
        if r > 0.0 {
            Direction::Positive
        } else if r < 0.0 {
            Direction::Negative
        } else {
            Direction::None
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Direction::Positive => "positive",
            Direction::Negative => "negative",
            Direction::None => "none",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CorrelationResult {
    pub x_col: String,
    pub y_col: String,
    /// Pairwise complete observations.
    pub n: usize,
    pub x_normality: NormalityResult,
    pub y_normality: NormalityResult,
    pub method: CorrelationMethod,
    pub r: f64,
    pub p_value: f64,
    pub strength: CorrelationStrength,
    pub direction: Direction,
    /// The paired observations, for a scatter plot.
    pub points: Vec<(f64, f64)>,
}

impl CorrelationResult {
    pub fn is_significant(&self) -> bool {
        self.p_value < ALPHA
    }

    /// Share of variance explained (r²), reported for significant Pearson results.
    pub fn variance_explained(&self) -> Option<f64> {
        (self.method == CorrelationMethod::Pearson && self.is_significant())
            .then(|| self.r * self.r)
    }
}

/// Correlate two numeric columns over their pairwise complete rows.
pub fn correlate(df: &DataFrame, x_col: &str, y_col: &str) -> Result<CorrelationResult> {
    info!("Correlating '{}' and '{}'", x_col, y_col);

    let (x, y) = paired_values(df, x_col, y_col)?;
    let n = x.len();
    if n < 3 {
        return Err(StatsError::insufficient("correlation", 3, n));
    }

    let x_normality = check_normality(&x)?;
    let y_normality = check_normality(&y)?;
    let method = if x_normality.is_normal() && y_normality.is_normal() {
        CorrelationMethod::Pearson
    } else {
        CorrelationMethod::Spearman
    };
    debug!(
        "Normality p-values: {:.4} / {:.4}, using {}",
        x_normality.p_value,
        y_normality.p_value,
        method.label()
    );

    let result = match method {
        CorrelationMethod::Pearson => correlation::pearson(&x, &y),
        CorrelationMethod::Spearman => correlation::spearman(&x, &y),
    }
    .ok_or_else(|| {
        StatsError::EmptyInput(format!(
            "'{}' or '{}' has no variance, correlation is undefined",
            x_col, y_col
        ))
    })?;
    let r = result.r;
    let p_value = result.p_value.clamp(0.0, 1.0);

    Ok(CorrelationResult {
        x_col: x_col.to_string(),
        y_col: y_col.to_string(),
        n,
        x_normality,
        y_normality,
        method,
        r,
        p_value,
        strength: CorrelationStrength::classify(r),
        direction: Direction::of(r),
        points: x.into_iter().zip(y).collect(),
    })
}

impl Report for CorrelationResult {
    fn report(&self) -> String {
        let mut report = TextReport::new(self.method.label());
        report.blank();
        report.line(format!("Variable 1: {}", self.x_col));
        report.line(format!("Variable 2: {}", self.y_col));
        report.line(format!("Sample size (n): {}", self.n));

        let yes_no = |normal: bool| if normal { "yes" } else { "no" };
        report.section("Assumption checks");
        report.line(format!(
            "   - {} normal: {} ({} p={:.4})",
            self.x_col,
            yes_no(self.x_normality.is_normal()),
            self.x_normality.test.label(),
            self.x_normality.p_value
        ));
        report.line(format!(
            "   - {} normal: {} ({} p={:.4})",
            self.y_col,
            yes_no(self.y_normality.is_normal()),
            self.y_normality.test.label(),
            self.y_normality.p_value
        ));
        report.line(match self.method {
            CorrelationMethod::Pearson => {
                "   - Decision: both variables look normal, using the parametric test."
            }
            CorrelationMethod::Spearman => {
                "   - Decision: normality not met, using the rank-based test."
            }
        });

        report.section("Results");
        report.line(format!("   - r = {:.3}", self.r));
        report.line(format!(
            "   - p = {} ({})",
            format_p_value(self.p_value),
            significance_stars(self.p_value)
        ));

        report.section("Conclusion");
        if self.is_significant() {
            report.line(format!(
                "   The variables show a significant {}.",
                self.strength.label()
            ));
            report.line(format!("   Direction: {}.", self.direction.label()));
            if let Some(r2) = self.variance_explained() {
                report.line(format!(
                    "   ({} explains about {:.1}% of the variance in {} (R²))",
                    self.x_col,
                    r2 * 100.0,
                    self.y_col
                ));
            }
        } else {
            report.line("   No significant correlation between the variables (p >= 0.05).");
        }

        report.finish()
    }
}
