//! Data quality inspection module.
//!
//! This module flags duplicate rows, missing values and IQR outliers without
//! touching the data, so callers can decide on a cleaning policy.

mod inspector;

pub use inspector::{DataQualityInspector, QualityReport, iqr_bounds};
