//! Imputation module for handling missing values.
//!
//! Statistical imputation (mean, median, mode) used by the cleaning executor.

mod statistical;

pub use statistical::{FillMethod, StatisticalImputer, UNKNOWN_SENTINEL};
