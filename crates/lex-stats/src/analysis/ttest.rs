//! Independent two-sample t-test with automatic Student/Welch selection.
//!
//! Levene's test (median-centred) decides whether the variances can be pooled:
//! p > 0.05 selects Student's test, otherwise Welch's test from
//! `u_analytics`. Cohen's d always uses the pooled standard deviation.

use super::{GroupStats, ensure_numeric};
use crate::error::{Result, StatsError};
use crate::reporting::{Report, TextReport, format_p_value, significance_stars};
use crate::stats::{levene, mean, one_way_anova, sample_std};
use crate::utils::grouped_values;
use polars::prelude::*;
use serde::Serialize;
use tracing::{debug, info};
use u_analytics::testing;

const ALPHA: f64 = 0.05;

/// Which t-test variant was run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum TTestVariant {
    /// Pooled variance
    Student,
    /// Separate variances
    Welch,
}

impl TTestVariant {
    pub fn label(&self) -> &'static str {
        match self {
            TTestVariant::Student => "Student's t-test",
            TTestVariant::Welch => "Welch's t-test",
        }
    }
}

/// Magnitude class of Cohen's d.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum EffectSize {
    Small,
    Medium,
    Large,
}

impl EffectSize {
    pub fn classify(d: f64) -> Self {
        let d = d.abs();
        if d > 0.8 {
            EffectSize::Large
        } else if d > 0.5 {
            EffectSize::Medium
        } else {
            EffectSize::Small
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            EffectSize::Small => "small",
            EffectSize::Medium => "medium",
            EffectSize::Large => "large",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TTestResult {
    pub group_col: String,
    pub value_col: String,
    /// The two groups, in first-appearance order.
    pub groups: [GroupStats; 2],
    pub levene_statistic: f64,
    pub levene_p: f64,
    pub variant: TTestVariant,
    pub t_statistic: f64,
    pub df: f64,
    pub p_value: f64,
    /// Signed: positive when the first group has the larger mean.
    pub cohens_d: f64,
    pub effect_size: EffectSize,
}

impl TTestResult {
    pub fn is_significant(&self) -> bool {
        self.p_value < ALPHA
    }
}

/// Compare `value_col` between the two groups defined by `group_col`.
pub fn independent_ttest(df: &DataFrame, group_col: &str, value_col: &str) -> Result<TTestResult> {
    info!("Running t-test of '{}' by '{}'", value_col, group_col);
    ensure_numeric(df, value_col)?;

    let groups = grouped_values(df, group_col, value_col)?;
    if groups.len() != 2 {
        return Err(StatsError::InvalidGroupCount {
            column: group_col.to_string(),
            expected: "exactly 2".to_string(),
            found: groups.len(),
            groups: groups.into_iter().map(|(name, _)| name).collect(),
        });
    }

    for (name, values) in &groups {
        if values.len() < 2 {
            return Err(StatsError::insufficient(
                format!("t-test group '{}'", name),
                2,
                values.len(),
            ));
        }
    }

    let (name1, x1) = &groups[0];
    let (name2, x2) = &groups[1];
    let s1 = GroupStats::from_values(name1, x1);
    let s2 = GroupStats::from_values(name2, x2);

    let (levene_statistic, levene_p) = levene(&[x1.clone(), x2.clone()])?;
    let variant = if levene_p > ALPHA {
        TTestVariant::Student
    } else {
        TTestVariant::Welch
    };
    debug!(
        "Levene W = {:.4}, p = {:.4}, using {}",
        levene_statistic,
        levene_p,
        variant.label()
    );

    let (t_statistic, df_t, p_value) = match variant {
        TTestVariant::Student => student_t(x1, x2)?,
        TTestVariant::Welch => welch_t(x1, x2)?,
    };

    let (n1, n2) = (s1.count as f64, s2.count as f64);
    let diff = s1.mean - s2.mean;
    let pooled_var =
        ((n1 - 1.0) * s1.std.powi(2) + (n2 - 1.0) * s2.std.powi(2)) / (n1 + n2 - 2.0);
    let pooled_sd = pooled_var.sqrt();
    let cohens_d = if pooled_sd > 0.0 { diff / pooled_sd } else { 0.0 };

    Ok(TTestResult {
        group_col: group_col.to_string(),
        value_col: value_col.to_string(),
        groups: [s1, s2],
        levene_statistic,
        levene_p,
        variant,
        t_statistic,
        df: df_t,
        p_value,
        cohens_d,
        effect_size: EffectSize::classify(cohens_d),
    })
}

/// Pooled-variance t test as a two-group ANOVA: t² = F with n1 + n2 - 2 df.
fn student_t(x1: &[f64], x2: &[f64]) -> Result<(f64, f64, f64)> {
    let anova = one_way_anova(&[x1.to_vec(), x2.to_vec()])?;
    let sign = if mean(x1) < mean(x2) { -1.0 } else { 1.0 };
    Ok((
        sign * anova.f_statistic.sqrt(),
        anova.df_within as f64,
        anova.p_value,
    ))
}

/// Separate-variance t test with Welch-Satterthwaite degrees of freedom.
fn welch_t(x1: &[f64], x2: &[f64]) -> Result<(f64, f64, f64)> {
    match testing::two_sample_t_test(x1, x2) {
        Some(result) => Ok((result.statistic, result.df, result.p_value.clamp(0.0, 1.0))),
        // Both groups constant
        None if sample_std(x1) == 0.0 && sample_std(x2) == 0.0 => {
            let df = (x1.len() + x2.len() - 2) as f64;
            let diff = mean(x1) - mean(x2);
            if diff == 0.0 {
                Ok((0.0, df, 1.0))
            } else {
                Ok((diff.signum() * f64::INFINITY, df, 0.0))
            }
        }
        None => Err(StatsError::Numerical(
            "Welch's t-test is undefined for non-finite values".to_string(),
        )),
    }
}

impl Report for TTestResult {
    fn report(&self) -> String {
        let mut report = TextReport::new("Independent Samples T-Test");

        report.section("Descriptive statistics");
        for g in &self.groups {
            report.line(format!(
                "   - {}: n={}, Mean={:.2}, SD={:.2}",
                g.name, g.count, g.mean, g.std
            ));
        }

        report.section("Homogeneity of variance (Levene's test)");
        report.line(format!(
            "   - W={:.3}, p={:.3}",
            self.levene_statistic, self.levene_p
        ));
        match self.variant {
            TTestVariant::Student => {
                report.line("   - Result: variances equal (p > 0.05), using Student's t-test")
            }
            TTestVariant::Welch => {
                report.line("   - Result: variances unequal (p <= 0.05), using Welch's t-test")
            }
        };

        report.section("T-test results");
        report.line(format!("   - t = {:.3}, df = {:.2}", self.t_statistic, self.df));
        report.line(format!(
            "   - p = {} ({})",
            format_p_value(self.p_value),
            significance_stars(self.p_value)
        ));
        report.line(format!(
            "   - Cohen's d = {:.3} ({})",
            self.cohens_d.abs(),
            self.effect_size.label()
        ));

        report.section("Conclusion");
        let [g1, g2] = &self.groups;
        if self.is_significant() {
            report.line(format!(
                "   {} and {} differ significantly on '{}'.",
                g1.name, g2.name, self.value_col
            ));
        } else {
            report.line(format!(
                "   No significant difference between {} and {} on '{}'.",
                g1.name, g2.name, self.value_col
            ));
        }

        report.finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn two_groups() -> DataFrame {
        df![
            "group" => ["A", "A", "A", "B", "B", "B"],
            "score" => [10.0, 12.0, 11.0, 20.0, 19.0, 21.0],
        ]
        .unwrap()
    }

    #[test]
    fn test_clear_difference_is_significant_and_large() {
        let result = independent_ttest(&two_groups(), "group", "score").unwrap();

        assert_eq!(result.variant, TTestVariant::Student);
        assert!((result.t_statistic + 11.0227).abs() < 1e-3);
        assert_eq!(result.df, 4.0);
        assert!(result.p_value < 0.05);
        assert_eq!(result.effect_size, EffectSize::Large);
        assert!((result.cohens_d + 9.0).abs() < 1e-9);
        assert_eq!(result.groups[0].name, "A");
        assert_eq!(result.groups[0].mean, 11.0);
    }

    #[test]
    fn test_three_groups_rejected_with_names() {
        let df = df![
            "g" => ["a", "b", "c", "a", "b", "c"],
            "v" => [1.0, 2.0, 3.0, 4.0, 5.0, 6.0],
        ]
        .unwrap();

        match independent_ttest(&df, "g", "v").unwrap_err() {
            StatsError::InvalidGroupCount { found, groups, .. } => {
                assert_eq!(found, 3);
                assert_eq!(groups, vec!["a", "b", "c"]);
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_group_with_one_observation() {
        let df = df![
            "g" => ["a", "a", "b"],
            "v" => [1.0, 2.0, 3.0],
        ]
        .unwrap();

        assert!(matches!(
            independent_ttest(&df, "g", "v"),
            Err(StatsError::InsufficientSample { .. })
        ));
    }

    #[test]
    fn test_text_value_column_rejected() {
        let df = df![
            "g" => ["a", "a", "b", "b"],
            "v" => ["x", "y", "z", "w"],
        ]
        .unwrap();

        assert!(matches!(
            independent_ttest(&df, "g", "v"),
            Err(StatsError::TypeMismatch(_))
        ));
    }

    #[test]
    fn test_unequal_variances_use_welch() {
        let df = df![
            "g" => ["a", "a", "a", "a", "a", "a", "b", "b", "b", "b", "b", "b"],
            "v" => [10.0, 10.1, 9.9, 10.0, 10.05, 9.95, 0.0, 20.0, 5.0, 15.0, -5.0, 25.0],
        ]
        .unwrap();

        let result = independent_ttest(&df, "g", "v").unwrap();
        assert_eq!(result.variant, TTestVariant::Welch);
        assert!(result.df < 10.0);
        assert!(!result.is_significant());
    }

    #[test]
    fn test_effect_size_thresholds() {
        assert_eq!(EffectSize::classify(0.3), EffectSize::Small);
        assert_eq!(EffectSize::classify(-0.6), EffectSize::Medium);
        assert_eq!(EffectSize::classify(0.8), EffectSize::Medium);
        assert_eq!(EffectSize::classify(1.2), EffectSize::Large);
    }

    #[test]
    fn test_report_layout() {
        let text = independent_ttest(&two_groups(), "group", "score")
            .unwrap()
            .report();
        assert!(text.starts_with("=== Independent Samples T-Test ==="));
        assert!(text.contains("A: n=3, Mean=11.00, SD=1.00"));
        assert!(text.contains("(large)"));
        assert!(text.contains("differ significantly"));
    }
}
