//! One-way analysis of variance and Levene's test for equal variances.
//!
//! Both run on `u_analytics::testing`; this module adds the error mapping
//! and a consistent answer for groups without any spread.

use super::summary::median;
use crate::error::{Result, StatsError};
use serde::Serialize;
use u_analytics::testing;

/// Variance decomposition of a one-way layout.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OneWayAnova {
    pub f_statistic: f64,
    pub p_value: f64,
    pub df_between: usize,
    pub df_within: usize,
    pub ss_between: f64,
    pub ss_within: f64,
    /// Within-group mean square, the error term for post-hoc comparisons.
    pub ms_within: f64,
}

/// Rounding noise below this share of the data's magnitude counts as zero.
fn negligible(groups: &[Vec<f64>]) -> f64 {
    let scale = groups.iter().flatten().map(|v| v * v).sum::<f64>().max(1.0);
    f64::EPSILON * scale
}

fn check_layout(groups: &[Vec<f64>], test: &str) -> Result<()> {
    if groups.len() < 2 {
        return Err(StatsError::insufficient(
            format!("{} groups", test),
            2,
            groups.len(),
        ));
    }
    for group in groups {
        if group.len() < 2 {
            return Err(StatsError::insufficient(
                format!("{} group", test),
                2,
                group.len(),
            ));
        }
    }
    Ok(())
}

/// One-way ANOVA F test over two or more groups of at least two values.
///
/// When the within-group sum of squares is zero the statistic is infinite
/// (p = 0) if the group means differ and zero (p = 1) if they do not.
pub fn one_way_anova(groups: &[Vec<f64>]) -> Result<OneWayAnova> {
    check_layout(groups, "one-way ANOVA")?;

    let samples: Vec<&[f64]> = groups.iter().map(Vec::as_slice).collect();
    let result = testing::one_way_anova(&samples).ok_or_else(|| {
        StatsError::Numerical("one-way ANOVA is undefined for non-finite values".to_string())
    })?;

    let tiny = negligible(groups);
    let (f_statistic, p_value) = if result.ss_within <= tiny {
        if result.ss_between <= tiny {
            (0.0, 1.0)
        } else {
            (f64::INFINITY, 0.0)
        }
    } else {
        (result.f_statistic, result.p_value.clamp(0.0, 1.0))
    };

    Ok(OneWayAnova {
        f_statistic,
        p_value,
        df_between: result.df_between,
        df_within: result.df_within,
        ss_between: result.ss_between,
        ss_within: result.ss_within,
        ms_within: result.ms_within,
    })
}

/// Levene's test centred on group medians (Brown-Forsythe variant).
///
/// Returns `(W, p)`. A large p means the variances can be treated as equal.
/// Groups whose absolute deviations are all the same size, constant groups
/// included, give `(0, 1)`.
pub fn levene(groups: &[Vec<f64>]) -> Result<(f64, f64)> {
    check_layout(groups, "Levene's test")?;

    let samples: Vec<&[f64]> = groups.iter().map(Vec::as_slice).collect();
    let result = testing::levene_test(&samples).ok_or_else(|| {
        StatsError::Numerical("Levene's test is undefined for non-finite values".to_string())
    })?;

    if result.statistic.is_finite() {
        return Ok((result.statistic, result.p_value.clamp(0.0, 1.0)));
    }

    // Zero spread of the deviations within every group: decide on whether
    // the groups differ at all.
    let spreads: Vec<f64> = groups
        .iter()
        .map(|group| {
            let center = median(group).unwrap_or(0.0);
            group.iter().map(|v| (v - center).abs()).sum::<f64>() / group.len() as f64
        })
        .collect();
    let tiny = negligible(groups).sqrt();
    let first = spreads[0];
    if spreads.iter().all(|s| (s - first).abs() <= tiny) {
        Ok((0.0, 1.0))
    } else {
        Ok((f64::INFINITY, 0.0))
    }
}
