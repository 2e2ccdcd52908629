use super::Report;
use crate::error::{Result, StatsError};
use serde::Serialize;
use tracing::warn;

/// Result of an analysis as seen by a presentation layer.
///
/// User-input problems (wrong group count, too few observations, non-numeric
/// columns) become [`AnalysisOutcome::Rejected`] and render as an error
/// report. Anything else stays an `Err`.
#[derive(Debug, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum AnalysisOutcome<T> {
    Completed { result: T },
    Rejected { error: StatsError },
}

impl<T> AnalysisOutcome<T> {
    pub fn from_result(result: Result<T>) -> Result<Self> {
        match result {
            Ok(result) => Ok(AnalysisOutcome::Completed { result }),
            Err(error) if error.is_user_input() => {
                warn!("Analysis rejected: {}", error);
                Ok(AnalysisOutcome::Rejected { error })
            }
            Err(error) => Err(error),
        }
    }

    pub fn is_completed(&self) -> bool {
        self.completed().is_some()
    }

    /// The completed result, if any.
    pub fn completed(&self) -> Option<&T> {
        match self {
            AnalysisOutcome::Completed { result } => Some(result),
            AnalysisOutcome::Rejected { .. } => None,
        }
    }
}

impl<T: Report> Report for AnalysisOutcome<T> {
    fn report(&self) -> String {
        match self {
            AnalysisOutcome::Completed { result } => result.report(),
            AnalysisOutcome::Rejected { error } => format!("Error: {}\n", error),
        }
    }
}
