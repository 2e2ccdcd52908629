//! One-way ANOVA with Levene's test and Tukey HSD post-hoc comparisons.

use super::{GroupStats, ensure_numeric};
use crate::error::{Result, StatsError};
use crate::reporting::{Report, TextReport, format_p_value, significance_stars};
use crate::stats::{OneWayAnova, levene, one_way_anova as anova_kernel, ptukey_upper, qtukey};
use crate::utils::grouped_values;
use polars::prelude::*;
use serde::Serialize;
use tracing::{debug, info};

const ALPHA: f64 = 0.05;

/// One row of the Tukey HSD table.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TukeyComparison {
    pub group1: String,
    pub group2: String,
    /// `mean(group2) - mean(group1)`.
    pub mean_diff: f64,
    pub p_adj: f64,
    pub lower: f64,
    pub upper: f64,
    pub reject: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AnovaResult {
    pub group_col: String,
    pub value_col: String,
    /// Per-group statistics, sorted by group name.
    pub groups: Vec<GroupStats>,
    pub levene_statistic: f64,
    pub levene_p: f64,
    pub anova: OneWayAnova,
    /// Present only when the F test is significant.
    pub tukey: Option<Vec<TukeyComparison>>,
}

impl AnovaResult {
    pub fn is_significant(&self) -> bool {
        self.anova.p_value < ALPHA
    }

    pub fn variances_equal(&self) -> bool {
        self.levene_p > ALPHA
    }
}

/// ANOVA either ran or was not applicable.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum AnovaOutcome {
    /// Fewer than three groups; a two-sample test is the right tool.
    TooFewGroups { group_col: String, found: usize },
    Tested(AnovaResult),
}

/// Compare `value_col` across the groups defined by `group_col`.
pub fn one_way_anova(df: &DataFrame, group_col: &str, value_col: &str) -> Result<AnovaOutcome> {
    info!("Running one-way ANOVA of '{}' by '{}'", value_col, group_col);
    ensure_numeric(df, value_col)?;

    let mut groups = grouped_values(df, group_col, value_col)?;
    if groups.len() < 3 {
        debug!("Only {} groups, suggesting a t-test instead", groups.len());
        return Ok(AnovaOutcome::TooFewGroups {
            group_col: group_col.to_string(),
            found: groups.len(),
        });
    }

    for (name, values) in &groups {
        if values.len() < 2 {
            return Err(StatsError::insufficient(
                format!("ANOVA group '{}'", name),
                2,
                values.len(),
            ));
        }
    }

    groups.sort_by(|a, b| a.0.cmp(&b.0));
    let samples: Vec<Vec<f64>> = groups.iter().map(|(_, v)| v.clone()).collect();

    let (levene_statistic, levene_p) = levene(&samples)?;
    let anova = anova_kernel(&samples)?;
    debug!("F = {:.4}, p = {:.6}", anova.f_statistic, anova.p_value);

    let tukey = if anova.p_value < ALPHA {
        Some(tukey_hsd(&groups, &anova))
    } else {
        None
    };

    Ok(AnovaOutcome::Tested(AnovaResult {
        group_col: group_col.to_string(),
        value_col: value_col.to_string(),
        groups: groups
            .iter()
            .map(|(name, values)| GroupStats::from_values(name, values))
            .collect(),
        levene_statistic,
        levene_p,
        anova,
        tukey,
    }))
}

/// All pairwise comparisons with the Tukey-Kramer standard error.
fn tukey_hsd(groups: &[(String, Vec<f64>)], anova: &OneWayAnova) -> Vec<TukeyComparison> {
    let k = groups.len();
    let df_err = anova.df_within as f64;
    let q_crit = qtukey(ALPHA, k, df_err);

    let mut comparisons = Vec::with_capacity(k * (k - 1) / 2);
    for i in 0..k {
        for j in (i + 1)..k {
            let (name_i, xi) = &groups[i];
            let (name_j, xj) = &groups[j];
            let mean_diff = crate::stats::mean(xj) - crate::stats::mean(xi);
            let se = (anova.ms_within / 2.0
                * (1.0 / xi.len() as f64 + 1.0 / xj.len() as f64))
                .sqrt();

            let p_adj = if se > 0.0 {
                ptukey_upper(mean_diff.abs() / se, k, df_err)
            } else if mean_diff == 0.0 {
                1.0
            } else {
                0.0
            };

            comparisons.push(TukeyComparison {
                group1: name_i.clone(),
                group2: name_j.clone(),
                mean_diff,
                p_adj,
                lower: mean_diff - q_crit * se,
                upper: mean_diff + q_crit * se,
                reject: p_adj < ALPHA,
            });
        }
    }
    comparisons
}

impl Report for AnovaOutcome {
    fn report(&self) -> String {
        match self {
            AnovaOutcome::TooFewGroups { group_col, found } => format!(
                "Note: grouping column '{}' has only {} groups. Use the independent samples t-test to compare two groups.\n",
                group_col, found
            ),
            AnovaOutcome::Tested(result) => result.report(),
        }
    }
}

impl Report for AnovaResult {
    fn report(&self) -> String {
        let mut report = TextReport::new("One-way ANOVA");

        report.section("Descriptive statistics");
        let rows: Vec<Vec<String>> = self
            .groups
            .iter()
            .map(|g| {
                vec![
                    g.name.clone(),
                    g.count.to_string(),
                    format!("{:.2}", g.mean),
                    format!("{:.2}", g.std),
                ]
            })
            .collect();
        report.table(&[self.group_col.as_str(), "count", "mean", "std"], &rows);

        report.section("Homogeneity of variance (Levene's test)");
        report.line(format!(
            "   - W = {:.3}, p = {:.3}",
            self.levene_statistic, self.levene_p
        ));
        if self.variances_equal() {
            report.line("   - Conclusion: variances equal (p > 0.05), ANOVA results are reliable.");
        } else {
            report.line(
                "   - Conclusion: variances unequal (p <= 0.05), interpret ANOVA with care or use a non-parametric test (Kruskal-Wallis).",
            );
        }

        report.section("ANOVA main effect");
        report.line(format!(
            "   - F({}, {}) = {:.3}",
            self.anova.df_between, self.anova.df_within, self.anova.f_statistic
        ));
        report.line(format!(
            "   - p = {} ({})",
            format_p_value(self.anova.p_value),
            significance_stars(self.anova.p_value)
        ));

        match &self.tukey {
            Some(comparisons) => {
                report.line("   - Conclusion: the groups differ significantly.");
                report.section("Tukey HSD post-hoc comparisons");

                let significant: Vec<&TukeyComparison> =
                    comparisons.iter().filter(|c| c.reject).collect();
                if significant.is_empty() {
                    report.line("   (no pair differs significantly)");
                } else {
                    report.line("   (significant pairs only)");
                    for c in significant {
                        report.line(format!(
                            "   - {} vs {}: diff={:.2}, p={:.4}",
                            c.group1, c.group2, c.mean_diff, c.p_adj
                        ));
                    }
                }

                report.blank();
                let rows: Vec<Vec<String>> = comparisons
                    .iter()
                    .map(|c| {
                        vec![
                            c.group1.clone(),
                            c.group2.clone(),
                            format!("{:.4}", c.mean_diff),
                            format!("{:.4}", c.p_adj),
                            format!("{:.4}", c.lower),
                            format!("{:.4}", c.upper),
                            c.reject.to_string(),
                        ]
                    })
                    .collect();
                report.table(
                    &["group1", "group2", "meandiff", "p-adj", "lower", "upper", "reject"],
                    &rows,
                );
            }
            None => {
                report.line(
                    "   - Conclusion: no significant difference between groups, post-hoc tests are not needed.",
                );
            }
        }

        report.finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn three_groups() -> DataFrame {
        df![
            "dose" => ["low", "low", "low", "low", "mid", "mid", "mid", "mid", "high", "high", "high", "high"],
            "y" => [4.0, 5.0, 6.0, 5.0, 7.0, 8.0, 9.0, 8.0, 1.0, 2.0, 3.0, 2.0],
        ]
        .unwrap()
    }

    fn tested(outcome: AnovaOutcome) -> AnovaResult {
        match outcome {
            AnovaOutcome::Tested(result) => result,
            other => panic!("expected a tested outcome, got {other:?}"),
        }
    }

    #[test]
    fn test_two_groups_suggest_ttest() {
        let df = df![
            "g" => ["a", "a", "b", "b"],
            "v" => [1.0, 2.0, 3.0, 4.0],
        ]
        .unwrap();

        let outcome = one_way_anova(&df, "g", "v").unwrap();
        assert_eq!(
            outcome,
            AnovaOutcome::TooFewGroups {
                group_col: "g".to_string(),
                found: 2
            }
        );
        assert!(outcome.report().contains("t-test"));
    }

    #[test]
    fn test_small_group_names_the_group() {
        let df = df![
            "g" => ["a", "a", "b", "b", "c"],
            "v" => [1.0, 2.0, 3.0, 4.0, 5.0],
        ]
        .unwrap();

        let err = one_way_anova(&df, "g", "v").unwrap_err();
        assert!(err.to_string().contains("'c'"));
    }

    #[test]
    fn test_significant_anova_runs_tukey() {
        let result = tested(one_way_anova(&three_groups(), "dose", "y").unwrap());

        assert!((result.anova.f_statistic - 54.0).abs() < 1e-9);
        assert!(result.is_significant());
        assert!(result.variances_equal());

        let names: Vec<&str> = result.groups.iter().map(|g| g.name.as_str()).collect();
        assert_eq!(names, vec!["high", "low", "mid"]);

        let tukey = result.tukey.as_ref().unwrap();
        assert_eq!(tukey.len(), 3);
        // high vs low: diff 3 with SE sqrt(6/9 / 4) so q = 7.35, well past q(0.05; 3, 9) = 3.95
        let first = &tukey[0];
        assert_eq!((first.group1.as_str(), first.group2.as_str()), ("high", "low"));
        assert!((first.mean_diff - 3.0).abs() < 1e-9);
        assert!(first.reject);
        assert!(first.lower > 0.0);
        assert!(tukey.iter().all(|c| c.reject));
    }

    #[test]
    fn test_tukey_matches_r_plant_growth() {
        // R: TukeyHSD(aov(weight ~ group, data = PlantGrowth))
        let df = df![
            "group" => [
                "ctrl", "ctrl", "ctrl", "ctrl", "ctrl", "ctrl", "ctrl", "ctrl", "ctrl", "ctrl",
                "trt1", "trt1", "trt1", "trt1", "trt1", "trt1", "trt1", "trt1", "trt1", "trt1",
                "trt2", "trt2", "trt2", "trt2", "trt2", "trt2", "trt2", "trt2", "trt2", "trt2",
            ],
            "weight" => [
                4.17, 5.58, 5.18, 6.11, 4.50, 4.61, 5.17, 4.53, 5.33, 5.14,
                4.81, 4.17, 4.41, 3.59, 5.87, 3.83, 6.03, 4.89, 4.32, 4.69,
                6.31, 5.12, 5.54, 5.50, 5.37, 5.29, 4.92, 6.15, 5.80, 5.26,
            ],
        ]
        .unwrap();

        let result = tested(one_way_anova(&df, "group", "weight").unwrap());
        assert!((result.anova.f_statistic - 4.846088).abs() < 1e-5);
        assert_eq!(result.anova.df_within, 27);

        let tukey = result.tukey.as_ref().unwrap();
        let expected = [
            ("ctrl", "trt1", -0.371, -1.0622161, 0.3202161, 0.3908711),
            ("ctrl", "trt2", 0.494, -0.1972161, 1.1852161, 0.1979960),
            ("trt1", "trt2", 0.865, 0.1737839, 1.5562161, 0.0120064),
        ];
        for (row, (g1, g2, diff, lwr, upr, p_adj)) in tukey.iter().zip(expected) {
            assert_eq!((row.group1.as_str(), row.group2.as_str()), (g1, g2));
            assert!((row.mean_diff - diff).abs() < 1e-9);
            assert!((row.lower - lwr).abs() < 1e-5);
            assert!((row.upper - upr).abs() < 1e-5);
            assert!((row.p_adj - p_adj).abs() < 1e-5);
        }
        assert_eq!(
            tukey.iter().map(|c| c.reject).collect::<Vec<_>>(),
            vec![false, false, true]
        );
    }

    #[test]
    fn test_non_significant_anova_skips_tukey() {
        let df = df![
            "g" => ["a", "a", "a", "b", "b", "b", "c", "c", "c"],
            "v" => [1.0, 5.0, 3.0, 2.0, 4.0, 3.0, 3.0, 1.0, 5.0],
        ]
        .unwrap();

        let result = tested(one_way_anova(&df, "g", "v").unwrap());
        assert!(!result.is_significant());
        assert!(result.tukey.is_none());
        assert!(result.report().contains("post-hoc tests are not needed"));
    }

    #[test]
    fn test_report_lists_tukey_table() {
        let text = one_way_anova(&three_groups(), "dose", "y")
            .unwrap()
            .report();
        assert!(text.starts_with("=== One-way ANOVA ==="));
        assert!(text.contains("4. Tukey HSD post-hoc comparisons"));
        assert!(text.contains("meandiff"));
        assert!(text.contains("high vs low: diff=3.00"));
    }
}
