//! Read-only data quality inspection: duplicates, missing values and IQR outliers.

use crate::config::{CleaningConfig, MissingMethod};
use crate::error::Result;
use crate::stats::summary::{quantile_sorted, sorted};
use crate::utils::{DtypeCategory, column_names, float_values, get_dtype_category};
use once_cell::sync::Lazy;
use polars::prelude::*;
use regex::Regex;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

// Column-name fragments that mark identifier columns (English "id",
// Chinese "number/code" and "serial number")
static ID_NAME_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"id|编号|序号").expect("Invalid regex: ID column name"));

/// IQR fence multiplier.
const IQR_FACTOR: f64 = 1.5;

/// Snapshot of a dataset's quality at inspection time.
///
/// Row indices are positions in the inspected frame.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QualityReport {
    pub n_rows: usize,
    pub n_cols: usize,
    /// Columns compared for duplicate detection. Never empty.
    pub subset_cols: Vec<String>,
    /// Number of rows belonging to a duplicate group (first occurrences included).
    pub duplicates: usize,
    pub duplicate_indices: Vec<usize>,
    /// Total number of null cells.
    pub missing_count: usize,
    /// Rows with at least one null.
    pub missing_indices: Vec<usize>,
    /// Null count per column, only for columns with nulls, in column order.
    pub missing_details: Vec<(String, usize)>,
    /// IQR outlier count per numeric column, zero counts omitted, in column order.
    pub outliers: Vec<(String, usize)>,
}

impl QualityReport {
    /// Whether any duplicates or missing values were found.
    pub fn needs_cleaning(&self) -> bool {
        self.duplicates > 0 || self.missing_count > 0
    }

    /// Total outliers across all numeric columns.
    pub fn total_outliers(&self) -> usize {
        self.outliers.iter().map(|(_, n)| n).sum()
    }

    /// Cleaning policy a user would get by accepting every suggestion:
    /// remove duplicates on the ID-excluding subset and fill missing values
    /// with the mean/mode.
    pub fn suggested_config(&self) -> CleaningConfig {
        let mut config = CleaningConfig::from_quality_report(self);
        config.remove_duplicates = self.duplicates > 0;
        config.handle_missing = self.missing_count > 0;
        config.missing_method = MissingMethod::Mean;
        config
    }

    /// Render the report as text.
    pub fn summary(&self) -> String {
        let mut out = String::new();
        out.push_str("=== Data Quality Report ===\n");
        out.push_str(&format!(
            "Rows: {} | Columns: {}\n",
            self.n_rows, self.n_cols
        ));

        let mut problems = Vec::new();
        if self.duplicates > 0 {
            let mut msg = format!("Found {} suspected duplicate rows", self.duplicates);
            if self.subset_cols.len() < self.n_cols {
                msg.push_str(&format!(
                    " (compared on {} columns, ID columns ignored)",
                    self.subset_cols.len()
                ));
            }
            problems.push(msg);
        }
        if self.missing_count > 0 {
            problems.push(format!(
                "Found {} missing values (in {} columns)",
                self.missing_count,
                self.missing_details.len()
            ));
        }
        if !self.outliers.is_empty() {
            problems.push(format!(
                "Found {} potential outliers (IQR rule)",
                self.total_outliers()
            ));
        }

        if problems.is_empty() {
            out.push_str("Data quality looks good, no obvious problems found.\n");
            return out;
        }

        for problem in problems {
            out.push_str(&format!("- {problem}\n"));
        }
        for (column, count) in &self.missing_details {
            out.push_str(&format!("  missing  {column}: {count}\n"));
        }
        for (column, count) in &self.outliers {
            out.push_str(&format!("  outliers {column}: {count}\n"));
        }
        out
    }
}

/// Stateless inspector; all methods take the frame by reference.
#[derive(Debug, Default, Clone, Copy)]
pub struct DataQualityInspector;

impl DataQualityInspector {
    pub fn new() -> Self {
        Self
    }

    /// Columns that should take part in duplicate detection.
    ///
    /// A column is left out when its name looks like an identifier and all of
    /// its values (nulls included) are distinct. If that would leave nothing,
    /// every column is returned.
    pub fn get_cols_to_check(&self, df: &DataFrame) -> Result<Vec<String>> {
        let mut cols = Vec::new();

        for name in column_names(df) {
            if is_id_like_name(&name) && is_all_distinct(df, &name)? {
                debug!("Excluding identifier column '{}' from duplicate check", name);
                continue;
            }
            cols.push(name);
        }

        if cols.is_empty() {
            return Ok(column_names(df));
        }
        Ok(cols)
    }

    /// Inspect a dataset without modifying it.
    pub fn check_quality(&self, df: &DataFrame) -> Result<QualityReport> {
        info!(
            "Checking data quality ({} rows, {} columns)",
            df.height(),
            df.width()
        );

        let subset_cols = self.get_cols_to_check(df)?;
        let duplicate_indices = duplicate_group_members(df, &subset_cols)?;
        let (missing_count, missing_indices, missing_details) = missing_summary(df);
        let outliers = iqr_outliers(df)?;

        debug!(
            "Duplicates: {}, missing cells: {}, outlier columns: {}",
            duplicate_indices.len(),
            missing_count,
            outliers.len()
        );

        Ok(QualityReport {
            n_rows: df.height(),
            n_cols: df.width(),
            subset_cols,
            duplicates: duplicate_indices.len(),
            duplicate_indices,
            missing_count,
            missing_indices,
            missing_details,
            outliers,
        })
    }
}

fn is_id_like_name(name: &str) -> bool {
    ID_NAME_PATTERN.is_match(&name.to_lowercase())
}

/// Whether every value of the column is distinct, counting null as a value.
fn is_all_distinct(df: &DataFrame, name: &str) -> Result<bool> {
    Ok(df.column(name)?.n_unique()? == df.height())
}

/// Positions of every row whose subset values are shared with another row.
fn duplicate_group_members(df: &DataFrame, subset: &[String]) -> Result<Vec<usize>> {
    if df.height() == 0 || subset.is_empty() {
        return Ok(Vec::new());
    }
    let mask = df.select(subset.iter().map(String::as_str))?.is_duplicated()?;

    Ok(mask
        .into_iter()
        .enumerate()
        .filter(|(_, shared)| shared.unwrap_or(false))
        .map(|(i, _)| i)
        .collect())
}

fn missing_summary(df: &DataFrame) -> (usize, Vec<usize>, Vec<(String, usize)>) {
    let mut row_has_null = vec![false; df.height()];
    let mut details = Vec::new();
    let mut total = 0;

    for col in df.get_columns() {
        let nulls = col.null_count();
        if nulls == 0 {
            continue;
        }
        total += nulls;
        details.push((col.name().to_string(), nulls));

        let mask = col.as_materialized_series().is_null();
        for (i, is_null) in mask.into_iter().enumerate() {
            if is_null.unwrap_or(false) {
                row_has_null[i] = true;
            }
        }
    }

    let indices = row_has_null
        .iter()
        .enumerate()
        .filter(|(_, flagged)| **flagged)
        .map(|(i, _)| i)
        .collect();

    (total, indices, details)
}

/// Lower and upper IQR fences of a set of values.
pub fn iqr_bounds(values: &[f64]) -> Option<(f64, f64)> {
    let sorted = sorted(values);
    let q1 = quantile_sorted(&sorted, 0.25)?;
    let q3 = quantile_sorted(&sorted, 0.75)?;
    let iqr = q3 - q1;
    Some((q1 - IQR_FACTOR * iqr, q3 + IQR_FACTOR * iqr))
}

fn iqr_outliers(df: &DataFrame) -> Result<Vec<(String, usize)>> {
    let mut outliers = Vec::new();

    for col in df.get_columns() {
        if get_dtype_category(col.dtype()) != DtypeCategory::Numeric {
            continue;
        }

        let values: Vec<f64> = float_values(col.as_materialized_series())?
            .into_iter()
            .flatten()
            .collect();
        let Some((lower, upper)) = iqr_bounds(&values) else {
            continue;
        };

        let count = values.iter().filter(|&&v| v < lower || v > upper).count();
        if count > 0 {
            debug!(
                "Column '{}': {} values outside [{:.4}, {:.4}]",
                col.name(),
                count,
                lower,
                upper
            );
            outliers.push((col.name().to_string(), count));
        }
    }

    Ok(outliers)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn inspector() -> DataQualityInspector {
        DataQualityInspector::new()
    }

    // ==================== get_cols_to_check tests ====================

    #[test]
    fn test_unique_id_column_excluded() {
        let df = df![
            "user_id" => [1i64, 2, 3],
            "score" => [10.0, 10.0, 20.0],
        ]
        .unwrap();

        assert_eq!(
            inspector().get_cols_to_check(&df).unwrap(),
            vec!["score".to_string()]
        );
    }

    #[test]
    fn test_non_unique_id_column_kept() {
        let df = df![
            "ID" => [1i64, 1, 2],
            "score" => [10.0, 10.0, 20.0],
        ]
        .unwrap();

        assert_eq!(
            inspector().get_cols_to_check(&df).unwrap(),
            vec!["ID".to_string(), "score".to_string()]
        );
    }

    #[test]
    fn test_chinese_id_names_excluded() {
        let df = df![
            "学生编号" => ["a", "b", "c"],
            "序号" => [1i64, 2, 3],
            "成绩" => [90i64, 90, 80],
        ]
        .unwrap();

        assert_eq!(
            inspector().get_cols_to_check(&df).unwrap(),
            vec!["成绩".to_string()]
        );
    }

    #[test]
    fn test_id_match_ignores_case() {
        let df = df![
            "Student_ID" => [101i64, 102, 103],
            "UserId" => ["u1", "u2", "u3"],
            "编号" => [7i64, 8, 9],
            "score" => [1.0, 1.0, 2.0],
        ]
        .unwrap();

        assert_eq!(
            inspector().get_cols_to_check(&df).unwrap(),
            vec!["score".to_string()]
        );
    }

    #[test]
    fn test_two_nulls_are_not_unique() {
        let df = df![
            "id" => [Some(1i64), None, None],
            "v" => [1.0, 2.0, 3.0],
        ]
        .unwrap();

        assert_eq!(
            inspector().get_cols_to_check(&df).unwrap(),
            vec!["id".to_string(), "v".to_string()]
        );
    }

    #[test]
    fn test_all_id_columns_fall_back_to_everything() {
        let df = df![
            "id" => [1i64, 2, 3],
            "uuid" => ["a", "b", "c"],
        ]
        .unwrap();

        assert_eq!(
            inspector().get_cols_to_check(&df).unwrap(),
            vec!["id".to_string(), "uuid".to_string()]
        );
    }

    // ==================== check_quality tests ====================

    #[test]
    fn test_duplicate_groups_flag_all_members() {
        let df = df![
            "name" => ["a", "b", "a", "c", "b"],
            "score" => [1i64, 2, 1, 3, 2],
        ]
        .unwrap();

        let report = inspector().check_quality(&df).unwrap();
        assert_eq!(report.duplicate_indices, vec![0, 1, 2, 4]);
        assert_eq!(report.duplicates, 4);
    }

    #[test]
    fn test_null_equals_null_for_duplicates() {
        let df = df![
            "a" => [None, None, Some(1.0)],
            "b" => ["x", "x", "x"],
        ]
        .unwrap();

        let report = inspector().check_quality(&df).unwrap();
        assert_eq!(report.duplicate_indices, vec![0, 1]);
    }

    #[test]
    fn test_float_duplicates_compare_by_value() {
        let df = df![
            "x" => [0.0, -0.0, f64::NAN, f64::NAN, 1.0],
            "tag" => ["p", "p", "q", "q", "q"],
        ]
        .unwrap();

        let report = inspector().check_quality(&df).unwrap();
        assert_eq!(report.duplicate_indices, vec![0, 1, 2, 3]);
    }

    #[test]
    fn test_all_null_numeric_column() {
        let df = df![
            "empty" => [Option::<f64>::None, None, None],
            "v" => [1.0, 2.0, 3.0],
        ]
        .unwrap();

        let report = inspector().check_quality(&df).unwrap();
        assert_eq!(report.missing_count, 3);
        assert_eq!(report.missing_indices, vec![0, 1, 2]);
        assert!(report.outliers.is_empty());
        assert!(report.duplicate_indices.is_empty());
    }

    #[test]
    fn test_missing_summary() {
        let df = df![
            "a" => [Some(1.0), None, Some(3.0), None],
            "b" => [Some("x"), Some("y"), None, Some("w")],
            "c" => [1i64, 2, 3, 4],
        ]
        .unwrap();

        let report = inspector().check_quality(&df).unwrap();
        assert_eq!(report.missing_count, 3);
        assert_eq!(report.missing_indices, vec![1, 2, 3]);
        assert_eq!(
            report.missing_details,
            vec![("a".to_string(), 2), ("b".to_string(), 1)]
        );
    }

    #[test]
    fn test_outliers_use_column_quartiles() {
        let df = df![
            "v" => [1.0, 2.0, 3.0, 4.0, 100.0],
            "w" => [10.0, 11.0, 12.0, 13.0, 14.0],
            "label" => ["a", "b", "c", "d", "e"],
        ]
        .unwrap();

        let report = inspector().check_quality(&df).unwrap();
        // v: Q1 = 2, Q3 = 4, upper fence 7
        assert_eq!(report.outliers, vec![("v".to_string(), 1)]);
        assert_eq!(report.total_outliers(), 1);
    }

    #[test]
    fn test_value_on_fence_is_not_outlier() {
        // Q1 = 2, Q3 = 4, upper fence exactly 7
        assert_eq!(iqr_bounds(&[1.0, 2.0, 3.0, 4.0, 7.0]), Some((-1.0, 7.0)));
        let df = df!["v" => [1.0, 2.0, 3.0, 4.0, 7.0]].unwrap();
        let report = inspector().check_quality(&df).unwrap();
        assert!(report.outliers.is_empty());
    }

    #[test]
    fn test_clean_dataset_summary() {
        let df = df![
            "x" => [1.0, 2.0, 3.0],
            "y" => ["a", "b", "c"],
        ]
        .unwrap();

        let report = inspector().check_quality(&df).unwrap();
        assert!(!report.needs_cleaning());
        let text = report.summary();
        assert!(text.starts_with("=== Data Quality Report ==="));
        assert!(text.contains("no obvious problems"));
    }

    #[test]
    fn test_suggested_config_follows_findings() {
        let df = df![
            "id" => [1i64, 2, 3],
            "v" => [Some(1.0), Some(2.0), None],
        ]
        .unwrap();

        let report = inspector().check_quality(&df).unwrap();
        let config = report.suggested_config();
        assert!(!config.remove_duplicates);
        assert!(config.handle_missing);
        assert_eq!(config.duplicate_subset, Some(vec!["v".to_string()]));
    }

    #[test]
    fn test_report_serializes() {
        let df = df!["v" => [1.0, 1.0]].unwrap();
        let report = inspector().check_quality(&df).unwrap();
        let json = serde_json::to_value(&report).unwrap();
        assert_eq!(json["duplicates"], 2);
        assert_eq!(json["subset_cols"][0], "v");
    }
}
