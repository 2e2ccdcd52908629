//! Shared utilities for the statistics engine.
//!
//! Column classification, value extraction and null filling used by the
//! inspector, the cleaner and the analysis engines.

use crate::error::{Result, StatsError};
use polars::prelude::*;
use std::collections::HashMap;

// =============================================================================
// Data Type Utilities
// =============================================================================

/// Category of a data type for analysis purposes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DtypeCategory {
    /// Integer or floating point numbers
    Numeric,
    /// Date or datetime types
    Datetime,
    /// Boolean type
    Boolean,
    /// String/categorical type
    Categorical,
    /// Other/unknown types
    Other,
}

/// Check if a DataType is numeric (integer or float).
#[inline]
pub fn is_numeric_dtype(dtype: &DataType) -> bool {
    matches!(
        dtype,
        DataType::Int8
            | DataType::Int16
            | DataType::Int32
            | DataType::Int64
            | DataType::UInt8
            | DataType::UInt16
            | DataType::UInt32
            | DataType::UInt64
            | DataType::Float32
            | DataType::Float64
    )
}

/// Check if a DataType is a datetime type.
#[inline]
pub fn is_datetime_dtype(dtype: &DataType) -> bool {
    matches!(
        dtype,
        DataType::Datetime(_, _) | DataType::Date | DataType::Time
    )
}

/// Get the category of a DataType.
pub fn get_dtype_category(dtype: &DataType) -> DtypeCategory {
    if is_numeric_dtype(dtype) {
        DtypeCategory::Numeric
    } else if is_datetime_dtype(dtype) {
        DtypeCategory::Datetime
    } else if matches!(dtype, DataType::Boolean) {
        DtypeCategory::Boolean
    } else if matches!(dtype, DataType::String | DataType::Categorical(_, _)) {
        DtypeCategory::Categorical
    } else {
        DtypeCategory::Other
    }
}

/// All column names of `df`, in order.
pub fn column_names(df: &DataFrame) -> Vec<String> {
    df.get_column_names()
        .iter()
        .map(|s| s.to_string())
        .collect()
}

/// Look up a column as a Series, mapping a miss to [`StatsError::ColumnNotFound`].
pub fn series<'a>(df: &'a DataFrame, name: &str) -> Result<&'a Series> {
    df.column(name)
        .map(|col| col.as_materialized_series())
        .map_err(|_| StatsError::ColumnNotFound(name.to_string()))
}

// =============================================================================
// Value Extraction
// =============================================================================

/// Cast a Series to Float64 and collect its values (nulls preserved).
pub fn float_values(series: &Series) -> PolarsResult<Vec<Option<f64>>> {
    let cast = series.cast(&DataType::Float64)?;
    Ok(cast.f64()?.into_iter().collect())
}

/// Cast a Series to String and collect its values (nulls preserved).
pub fn string_values(series: &Series) -> PolarsResult<Vec<Option<String>>> {
    let cast = series.cast(&DataType::String)?;
    Ok(cast
        .str()?
        .into_iter()
        .map(|v| v.map(str::to_string))
        .collect())
}

/// Values of a numeric column, or a [`StatsError::TypeMismatch`] naming its dtype.
pub fn numeric_values(df: &DataFrame, name: &str) -> Result<Vec<Option<f64>>> {
    let series = series(df, name)?;
    if !is_numeric_dtype(series.dtype()) {
        return Err(StatsError::TypeMismatch(format!(
            "column '{}' is {}, a numeric column is required",
            name,
            series.dtype()
        )));
    }
    Ok(float_values(series)?)
}

/// Rows where every selected column is non-null, as row vectors.
///
/// All columns must be numeric.
pub fn complete_rows(df: &DataFrame, columns: &[String]) -> Result<Vec<Vec<f64>>> {
    let values = columns
        .iter()
        .map(|name| numeric_values(df, name))
        .collect::<Result<Vec<_>>>()?;

    let rows = (0..df.height())
        .filter_map(|i| values.iter().map(|col| col[i]).collect::<Option<Vec<f64>>>())
        .collect();

    Ok(rows)
}

/// Non-null values of `value_col` grouped by the non-null labels of
/// `group_col`, in first-appearance order of the labels.
pub fn grouped_values(
    df: &DataFrame,
    group_col: &str,
    value_col: &str,
) -> Result<Vec<(String, Vec<f64>)>> {
    let labels = string_values(series(df, group_col)?)?;
    let values = numeric_values(df, value_col)?;

    let mut groups: Vec<(String, Vec<f64>)> = Vec::new();
    let mut positions: HashMap<String, usize> = HashMap::new();

    for (label, value) in labels.into_iter().zip(values) {
        let Some(label) = label else { continue };
        let idx = *positions.entry(label.clone()).or_insert_with(|| {
            groups.push((label, Vec::new()));
            groups.len() - 1
        });
        if let Some(v) = value {
            groups[idx].1.push(v);
        }
    }

    Ok(groups)
}

// =============================================================================
// Series Statistics Utilities
// =============================================================================

/// Most frequent non-null value.
///
/// Ties go to the lexicographically smallest value, so the result does not
/// depend on hash order.
fn most_frequent(values: &[Option<String>]) -> Option<String> {
    let mut value_counts: HashMap<&str, usize> = HashMap::new();
    for val in values.iter().flatten() {
        *value_counts.entry(val.as_str()).or_insert(0) += 1;
    }

    value_counts
        .into_iter()
        .max_by(|(a_val, a_count), (b_val, b_count)| {
            a_count.cmp(b_count).then_with(|| b_val.cmp(a_val))
        })
        .map(|(val, _)| val.to_string())
}

// =============================================================================
// Series Transformation Utilities
// =============================================================================

/// Fill null values in a numeric Series with a specific value.
///
/// The result is always Float64.
pub fn fill_numeric_nulls(series: &Series, fill_value: f64) -> PolarsResult<Series> {
    let filled: Vec<f64> = float_values(series)?
        .into_iter()
        .map(|v| v.unwrap_or(fill_value))
        .collect();

    Ok(Series::new(series.name().clone(), filled))
}

/// Fill null values in a Series with a string value.
///
/// The result is always String.
pub fn fill_string_nulls(series: &Series, fill_value: &str) -> PolarsResult<Series> {
    let filled: Vec<String> = string_values(series)?
        .into_iter()
        .map(|v| v.unwrap_or_else(|| fill_value.to_string()))
        .collect();

    Ok(Series::new(series.name().clone(), filled))
}

/// Fill null values with the column's mode, keeping its dtype.
///
/// The fill value is taken from the first row holding the mode, so Boolean,
/// Date and Categorical columns stay what they are. Returns the filled
/// Series and the mode's display form, or `None` for an all-null column.
pub fn fill_mode_nulls(series: &Series) -> PolarsResult<Option<(Series, String)>> {
    let values = string_values(series)?;
    let Some(mode) = most_frequent(&values) else {
        return Ok(None);
    };
    let Some(position) = values
        .iter()
        .position(|v| v.as_deref() == Some(mode.as_str()))
    else {
        return Ok(None);
    };

    let fill = series.slice(position as i64, 1);
    let filled = series.zip_with(&series.is_not_null(), &fill)?;
    Ok(Some((filled, mode)))
}

/// Truncate a display name, marking the cut with `..`.
pub fn truncate_name(name: &str, max_chars: usize) -> String {
    if name.chars().count() <= max_chars {
        name.to_string()
    } else {
        let head: String = name.chars().take(max_chars).collect();
        format!("{head}..")
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_is_numeric_dtype() {
        assert!(is_numeric_dtype(&DataType::Int64));
        assert!(is_numeric_dtype(&DataType::Float64));
        assert!(!is_numeric_dtype(&DataType::String));
        assert!(!is_numeric_dtype(&DataType::Boolean));
    }

    #[test]
    fn test_dtype_category() {
        assert_eq!(get_dtype_category(&DataType::Int64), DtypeCategory::Numeric);
        assert_eq!(get_dtype_category(&DataType::Date), DtypeCategory::Datetime);
        assert_eq!(
            get_dtype_category(&DataType::Boolean),
            DtypeCategory::Boolean
        );
        assert_eq!(
            get_dtype_category(&DataType::String),
            DtypeCategory::Categorical
        );
    }

    #[test]
    fn test_numeric_values_rejects_text() {
        let df = df!["name" => ["a", "b"]].unwrap();
        let err = numeric_values(&df, "name").unwrap_err();
        assert!(matches!(err, StatsError::TypeMismatch(_)));
    }

    #[test]
    fn test_missing_column() {
        let df = df!["a" => [1.0]].unwrap();
        assert!(matches!(
            series(&df, "b"),
            Err(StatsError::ColumnNotFound(_))
        ));
    }

    #[test]
    fn test_complete_rows_skips_nulls() {
        let df = df![
            "x" => [Some(1.0), None, Some(3.0)],
            "y" => [Some(10.0), Some(20.0), Some(30.0)],
        ]
        .unwrap();

        let rows = complete_rows(&df, &["x".to_string(), "y".to_string()]).unwrap();
        assert_eq!(rows, vec![vec![1.0, 10.0], vec![3.0, 30.0]]);
    }

    #[test]
    fn test_grouped_values_first_appearance_order() {
        let df = df![
            "g" => [Some("b"), Some("a"), None, Some("b"), Some("a")],
            "v" => [Some(1.0), Some(2.0), Some(9.0), None, Some(4.0)],
        ]
        .unwrap();

        let groups = grouped_values(&df, "g", "v").unwrap();
        assert_eq!(groups.len(), 2);
        assert_eq!(groups[0], ("b".to_string(), vec![1.0]));
        assert_eq!(groups[1], ("a".to_string(), vec![2.0, 4.0]));
    }

    #[test]
    fn test_fill_numeric_nulls() {
        let series = Series::new("test".into(), &[Some(1.0), None, Some(3.0)]);
        let filled = fill_numeric_nulls(&series, 0.0).unwrap();

        assert_eq!(filled.get(0).unwrap().try_extract::<f64>().unwrap(), 1.0);
        assert_eq!(filled.get(1).unwrap().try_extract::<f64>().unwrap(), 0.0);
        assert_eq!(filled.get(2).unwrap().try_extract::<f64>().unwrap(), 3.0);
    }

    #[test]
    fn test_fill_string_nulls_keeps_raw_text() {
        let series = Series::new("test".into(), &[Some("a"), None]);
        let filled = fill_string_nulls(&series, "Unknown").unwrap();
        let values = string_values(&filled).unwrap();
        assert_eq!(
            values,
            vec![Some("a".to_string()), Some("Unknown".to_string())]
        );
    }

    #[test]
    fn test_fill_mode_nulls_keeps_boolean() {
        let series = Series::new("flag".into(), &[Some(true), None, Some(true), Some(false)]);
        let (filled, mode) = fill_mode_nulls(&series).unwrap().unwrap();

        assert_eq!(mode, "true");
        assert_eq!(filled.dtype(), &DataType::Boolean);
        assert_eq!(filled.null_count(), 0);
        assert_eq!(filled.bool().unwrap().get(1), Some(true));
    }

    #[test]
    fn test_fill_mode_nulls_keeps_date() {
        // Days since the epoch: 19001 is 2022-01-09
        let series = Series::new("d".into(), &[Some(19001i32), None, Some(19000), Some(19001)])
            .cast(&DataType::Date)
            .unwrap();
        let (filled, _) = fill_mode_nulls(&series).unwrap().unwrap();

        assert_eq!(filled.dtype(), &DataType::Date);
        assert_eq!(filled.null_count(), 0);
        assert_eq!(filled.date().unwrap().physical().get(1), Some(19001));
    }

    #[test]
    fn test_fill_mode_nulls_all_null() {
        let series = Series::new("c".into(), &[Option::<bool>::None, None]);
        assert!(fill_mode_nulls(&series).unwrap().is_none());
    }

    #[test]
    fn test_most_frequent() {
        let series = Series::new("test".into(), &["a", "b", "a", "c", "a"]);
        assert_eq!(most_frequent(&string_values(&series).unwrap()), Some("a".to_string()));
    }

    #[test]
    fn test_most_frequent_tie_is_deterministic() {
        let series = Series::new("test".into(), &["b", "a", "b", "a"]);
        assert_eq!(most_frequent(&string_values(&series).unwrap()), Some("a".to_string()));
    }

    #[test]
    fn test_most_frequent_all_null() {
        let series = Series::new("test".into(), &[Option::<&str>::None, None]);
        assert_eq!(most_frequent(&string_values(&series).unwrap()), None);
    }

    #[test]
    fn test_truncate_name() {
        assert_eq!(truncate_name("short", 12), "short");
        assert_eq!(truncate_name("a_really_long_name", 12), "a_really_lon..");
    }
}
