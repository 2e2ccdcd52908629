//! Statistical imputation methods.
//!
//! Numeric columns are filled with their mean or median, everything else with
//! the most frequent value.

use crate::error::Result;
use crate::stats::summary::{mean, median};
use crate::utils::{fill_mode_nulls, fill_numeric_nulls, fill_string_nulls, float_values, series};
use polars::prelude::*;

/// Fill value for non-numeric columns that have no values at all.
pub const UNKNOWN_SENTINEL: &str = "Unknown";

/// How a column was filled.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FillMethod {
    Mean,
    Median,
    Mode,
}

impl FillMethod {
    pub fn label(&self) -> &'static str {
        match self {
            FillMethod::Mean => "mean",
            FillMethod::Median => "median",
            FillMethod::Mode => "mode",
        }
    }
}

/// Statistical imputation methods for filling missing values.
pub struct StatisticalImputer;

impl StatisticalImputer {
    /// Fill a numeric column with the mean of its non-null values.
    ///
    /// The column becomes Float64. An all-null column is left as is.
    pub fn apply_numeric_mean(
        df: &mut DataFrame,
        col_name: &str,
        processing_steps: &mut Vec<String>,
    ) -> Result<FillMethod> {
        let values = Self::non_null_values(df, col_name)?;
        if !values.is_empty() {
            Self::fill_with_value(df, col_name, mean(&values), processing_steps, "mean")?;
        }
        Ok(FillMethod::Mean)
    }

    /// Fill a numeric column with the median of its non-null values.
    pub fn apply_numeric_median(
        df: &mut DataFrame,
        col_name: &str,
        processing_steps: &mut Vec<String>,
    ) -> Result<FillMethod> {
        let values = Self::non_null_values(df, col_name)?;
        if let Some(median_val) = median(&values) {
            Self::fill_with_value(df, col_name, median_val, processing_steps, "median")?;
        }
        Ok(FillMethod::Median)
    }

    /// Fill a non-numeric column with its mode, or with [`UNKNOWN_SENTINEL`]
    /// when it has no values.
    ///
    /// A mode fill keeps the column's dtype; the sentinel fill makes it String.
    pub fn apply_mode_imputation(
        df: &mut DataFrame,
        col_name: &str,
        processing_steps: &mut Vec<String>,
    ) -> Result<FillMethod> {
        let column = series(df, col_name)?;
        let (filled, fill_value) = match fill_mode_nulls(column)? {
            Some(filled) => filled,
            None => (
                fill_string_nulls(column, UNKNOWN_SENTINEL)?,
                UNKNOWN_SENTINEL.to_string(),
            ),
        };
        df.replace(col_name, filled)?;

        processing_steps.push(format!("Filled '{}' with mode: '{}'", col_name, fill_value));
        Ok(FillMethod::Mode)
    }

    fn non_null_values(df: &DataFrame, col_name: &str) -> Result<Vec<f64>> {
        Ok(float_values(series(df, col_name)?)?
            .into_iter()
            .flatten()
            .collect())
    }

    /// Fill numeric column with a specific value.
    fn fill_with_value(
        df: &mut DataFrame,
        col_name: &str,
        fill_value: f64,
        processing_steps: &mut Vec<String>,
        method: &str,
    ) -> Result<()> {
        let filled = fill_numeric_nulls(series(df, col_name)?, fill_value)?;
        df.replace(col_name, filled)?;

        processing_steps.push(format!(
            "Filled '{}' with {}: {:.4}",
            col_name, method, fill_value
        ));
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::utils::string_values;

    fn column_f64(df: &DataFrame, name: &str) -> Vec<Option<f64>> {
        float_values(df.column(name).unwrap().as_materialized_series()).unwrap()
    }

    #[test]
    fn test_mean_fill() {
        let mut df = df!["v" => [Some(1i64), None, Some(3)]].unwrap();
        let mut steps = Vec::new();

        let method = StatisticalImputer::apply_numeric_mean(&mut df, "v", &mut steps).unwrap();

        assert_eq!(method, FillMethod::Mean);
        assert_eq!(column_f64(&df, "v"), vec![Some(1.0), Some(2.0), Some(3.0)]);
        assert_eq!(df.column("v").unwrap().dtype(), &DataType::Float64);
        assert_eq!(steps.len(), 1);
    }

    #[test]
    fn test_median_fill() {
        let mut df = df!["v" => [Some(1.0), None, Some(3.0), Some(10.0)]].unwrap();
        let mut steps = Vec::new();

        StatisticalImputer::apply_numeric_median(&mut df, "v", &mut steps).unwrap();

        assert_eq!(column_f64(&df, "v")[1], Some(3.0));
    }

    #[test]
    fn test_mode_fill() {
        let mut df = df!["c" => [Some("x"), None, Some("y"), Some("x")]].unwrap();
        let mut steps = Vec::new();

        let method = StatisticalImputer::apply_mode_imputation(&mut df, "c", &mut steps).unwrap();

        assert_eq!(method, FillMethod::Mode);
        let values = string_values(df.column("c").unwrap().as_materialized_series()).unwrap();
        assert_eq!(values[1], Some("x".to_string()));
    }

    #[test]
    fn test_mode_fill_keeps_boolean() {
        let mut df = df!["flag" => [Some(false), None, Some(false), Some(true)]].unwrap();
        let mut steps = Vec::new();

        StatisticalImputer::apply_mode_imputation(&mut df, "flag", &mut steps).unwrap();

        let column = df.column("flag").unwrap();
        assert_eq!(column.dtype(), &DataType::Boolean);
        assert_eq!(column.as_materialized_series().bool().unwrap().get(1), Some(false));
        assert_eq!(steps, vec!["Filled 'flag' with mode: 'false'".to_string()]);
    }

    #[test]
    fn test_all_null_text_column_gets_sentinel() {
        let mut df = df!["c" => [Option::<&str>::None, None]].unwrap();
        let mut steps = Vec::new();

        StatisticalImputer::apply_mode_imputation(&mut df, "c", &mut steps).unwrap();

        let values = string_values(df.column("c").unwrap().as_materialized_series()).unwrap();
        assert_eq!(
            values,
            vec![
                Some(UNKNOWN_SENTINEL.to_string()),
                Some(UNKNOWN_SENTINEL.to_string())
            ]
        );
    }
}
