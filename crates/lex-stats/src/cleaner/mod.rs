//! Data cleaning module.
//!
//! Applies a [`CleaningConfig`] to a dataset in a fixed order:
//! 1. Remove duplicate rows (keep the first of each group)
//! 2. Drop rows with missing values, or
//! 3. Fill missing values (mean/median for numbers, mode for the rest)
//!
//! The input frame is never modified; a cleaned copy is returned together with
//! a [`CleaningLog`] describing what changed.

use crate::config::{CleaningConfig, MissingMethod};
use crate::error::{Result, ResultExt};
use crate::imputers::{FillMethod, StatisticalImputer};
use crate::utils::{column_names, is_numeric_dtype};
use polars::prelude::*;
use serde::Serialize;
use tracing::{debug, info};

/// What a log entry records.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum CleaningAction {
    DuplicatesRemoved,
    MissingRowsDropped,
    MissingValuesFilled,
}

/// One change made by the executor.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CleaningEntry {
    pub action: CleaningAction,
    /// Rows removed, or columns filled for [`CleaningAction::MissingValuesFilled`].
    pub count: usize,
    pub message: String,
}

/// Ordered record of the changes made during cleaning.
///
/// Empty when nothing changed.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct CleaningLog {
    pub entries: Vec<CleaningEntry>,
}

impl CleaningLog {
    fn push(&mut self, action: CleaningAction, count: usize, message: String) {
        info!("{}", message);
        self.entries.push(CleaningEntry {
            action,
            count,
            message,
        });
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// The human-readable messages, in order.
    pub fn messages(&self) -> Vec<&str> {
        self.entries.iter().map(|e| e.message.as_str()).collect()
    }

    /// Entry for a given action, if it happened.
    pub fn entry(&self, action: CleaningAction) -> Option<&CleaningEntry> {
        self.entries.iter().find(|e| e.action == action)
    }
}

/// Applies cleaning policies. Stateless.
#[derive(Debug, Default, Clone, Copy)]
pub struct CleaningPolicyExecutor;

impl CleaningPolicyExecutor {
    pub fn new() -> Self {
        Self
    }

    /// Apply `config` to a copy of `df`.
    pub fn apply_cleaning(
        &self,
        df: &DataFrame,
        config: &CleaningConfig,
    ) -> Result<(DataFrame, CleaningLog)> {
        let columns = column_names(df);
        config.validate(columns.as_slice())?;

        let mut log = CleaningLog::default();
        let mut df = df.clone();

        if config.is_noop() {
            debug!("Cleaning config is a no-op");
            return Ok((df, log));
        }

        info!("Applying cleaning policy to {} rows", df.height());

        // 1. Duplicates
        if config.remove_duplicates {
            let n_before = df.height();
            df = remove_duplicates(&df, config.duplicate_subset.as_deref())
                .context("Removing duplicate rows")?;
            let n_dropped = n_before - df.height();

            if n_dropped > 0 {
                let basis = match &config.duplicate_subset {
                    None => "all columns".to_string(),
                    Some(subset) => {
                        format!("subset excluding ID columns, {} columns", subset.len())
                    }
                };
                log.push(
                    CleaningAction::DuplicatesRemoved,
                    n_dropped,
                    format!("Removed {} duplicate rows (basis: {})", n_dropped, basis),
                );
            } else {
                debug!("No duplicate rows found");
            }
        }

        // 2./3. Missing values
        if config.handle_missing {
            match config.missing_method {
                MissingMethod::Drop => {
                    let n_before = df.height();
                    df = drop_rows_with_nulls(&df).context("Dropping rows with missing values")?;
                    let n_dropped = n_before - df.height();

                    if n_dropped > 0 {
                        log.push(
                            CleaningAction::MissingRowsDropped,
                            n_dropped,
                            format!("Dropped {} rows containing missing values", n_dropped),
                        );
                    }
                }
                method => {
                    debug!("Filling missing values with the {} policy", method.label());
                    let mut steps = Vec::new();
                    let (filled, last_method) = fill_missing(&mut df, method, &mut steps)?;
                    for step in &steps {
                        debug!("{}", step);
                    }

                    if let Some(last_method) = last_method {
                        log.push(
                            CleaningAction::MissingValuesFilled,
                            filled,
                            format!(
                                "Filled missing values in {} columns ({})",
                                filled,
                                last_method.label()
                            ),
                        );
                    }
                }
            }
        }

        // polars frames carry no index: positions are already contiguous from 0
        Ok((df, log))
    }
}

/// Keep the first row of each group of rows equal on `subset` (or all columns).
fn remove_duplicates(df: &DataFrame, subset: Option<&[String]>) -> Result<DataFrame> {
    if df.height() == 0 || df.width() == 0 {
        return Ok(df.clone());
    }
    Ok(df.unique_stable(subset, UniqueKeepStrategy::First, None)?)
}

fn drop_rows_with_nulls(df: &DataFrame) -> Result<DataFrame> {
    Ok(df.drop_nulls::<String>(None)?)
}

/// Fill every column that has nulls. Returns the number of filled columns
/// and the method used for the last one.
fn fill_missing(
    df: &mut DataFrame,
    method: MissingMethod,
    steps: &mut Vec<String>,
) -> Result<(usize, Option<FillMethod>)> {
    let targets: Vec<(String, bool)> = df
        .get_columns()
        .iter()
        .filter(|col| col.null_count() > 0)
        .map(|col| (col.name().to_string(), is_numeric_dtype(col.dtype())))
        .collect();

    let mut last = None;
    for (name, numeric) in &targets {
        let used = match (numeric, method) {
            (true, MissingMethod::Median) => {
                StatisticalImputer::apply_numeric_median(df, name, steps)?
            }
            (true, _) => StatisticalImputer::apply_numeric_mean(df, name, steps)?,
            (false, _) => StatisticalImputer::apply_mode_imputation(df, name, steps)?,
        };
        last = Some(used);
    }

    Ok((targets.len(), last))
}
