//! Descriptive statistics for every numeric and categorical column.

use crate::error::Result;
use crate::reporting::{Report, TextReport};
use crate::stats::summary::{mean, quantile_sorted, sample_std, sorted};
use crate::utils::{DtypeCategory, float_values, get_dtype_category, string_values, truncate_name};
use polars::prelude::*;
use serde::Serialize;
use std::collections::HashMap;
use tracing::info;

/// Display width for column names in the numeric table.
const NAME_WIDTH: usize = 12;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NumericSummary {
    pub column: String,
    /// Non-null values.
    pub count: usize,
    pub mean: Option<f64>,
    /// Sample standard deviation; `None` below two values.
    pub std: Option<f64>,
    pub min: Option<f64>,
    pub q1: Option<f64>,
    pub median: Option<f64>,
    pub q3: Option<f64>,
    pub max: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Frequency {
    pub category: String,
    pub count: usize,
    /// Share of all rows, nulls included in the denominator.
    pub percent: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CategoricalSummary {
    pub column: String,
    pub frequencies: Vec<Frequency>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DescriptiveSummary {
    pub n_rows: usize,
    pub numeric: Vec<NumericSummary>,
    pub categorical: Vec<CategoricalSummary>,
}

/// Summarize every numeric and categorical column of `df`.
///
/// Columns of other types (dates, booleans) are skipped.
pub fn describe(df: &DataFrame) -> Result<DescriptiveSummary> {
    info!("Describing {} columns", df.width());

    let mut numeric = Vec::new();
    let mut categorical = Vec::new();

    for col in df.get_columns() {
        let series = col.as_materialized_series();
        match get_dtype_category(col.dtype()) {
            DtypeCategory::Numeric => numeric.push(numeric_summary(series)?),
            DtypeCategory::Categorical => {
                categorical.push(categorical_summary(series, df.height())?)
            }
            _ => {}
        }
    }

    Ok(DescriptiveSummary {
        n_rows: df.height(),
        numeric,
        categorical,
    })
}

fn numeric_summary(series: &Series) -> Result<NumericSummary> {
    let values: Vec<f64> = float_values(series)?.into_iter().flatten().collect();
    let sorted = sorted(&values);
    let non_empty = !values.is_empty();

    Ok(NumericSummary {
        column: series.name().to_string(),
        count: values.len(),
        mean: non_empty.then(|| mean(&values)),
        std: (values.len() >= 2).then(|| sample_std(&values)),
        min: sorted.first().copied(),
        q1: quantile_sorted(&sorted, 0.25),
        median: quantile_sorted(&sorted, 0.5),
        q3: quantile_sorted(&sorted, 0.75),
        max: sorted.last().copied(),
    })
}

fn categorical_summary(series: &Series, n_rows: usize) -> Result<CategoricalSummary> {
    let mut counts: HashMap<String, usize> = HashMap::new();
    for value in string_values(series)?.into_iter().flatten() {
        *counts.entry(value).or_insert(0) += 1;
    }

    let mut frequencies: Vec<Frequency> = counts
        .into_iter()
        .map(|(category, count)| Frequency {
            category,
            count,
            percent: if n_rows == 0 {
                0.0
            } else {
                count as f64 / n_rows as f64 * 100.0
            },
        })
        .collect();
    frequencies.sort_by(|a, b| b.count.cmp(&a.count).then_with(|| a.category.cmp(&b.category)));

    Ok(CategoricalSummary {
        column: series.name().to_string(),
        frequencies,
    })
}

fn fmt_opt(value: Option<f64>) -> String {
    value.map_or_else(|| "-".to_string(), |v| format!("{:.2}", v))
}

impl Report for DescriptiveSummary {
    fn report(&self) -> String {
        let mut report = TextReport::new("Descriptive Statistics");

        if self.numeric.is_empty() && self.categorical.is_empty() {
            report.blank().line("No usable columns were found.");
            return report.finish();
        }

        if !self.numeric.is_empty() {
            report.section("Numeric variables");
            let rows: Vec<Vec<String>> = self
                .numeric
                .iter()
                .map(|s| {
                    vec![
                        truncate_name(&s.column, NAME_WIDTH),
                        s.count.to_string(),
                        fmt_opt(s.mean),
                        fmt_opt(s.std),
                        fmt_opt(s.min),
                        fmt_opt(s.q1),
                        fmt_opt(s.median),
                        fmt_opt(s.q3),
                        fmt_opt(s.max),
                    ]
                })
                .collect();
            report.table(
                &["Variable", "N", "Mean", "SD", "Min", "Q1", "Median", "Q3", "Max"],
                &rows,
            );
        }

        if !self.categorical.is_empty() {
            report.section("Categorical variables (count / percent)");
            for summary in &self.categorical {
                report.blank().line(format!("Variable: {}", summary.column));
                for f in &summary.frequencies {
                    report.line(format!("  - {}: {} ({:.1}%)", f.category, f.count, f.percent));
                }
            }
        }

        report.finish()
    }
}
