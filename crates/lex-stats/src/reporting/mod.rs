//! Report formatting module.
//!
//! Every analysis result implements [`Report`], which renders the structured
//! result as plain text with a `=== Title ===` header and numbered sections.
//! [`AnalysisOutcome`] separates expected user-input problems (shown as a
//! report) from genuine failures (propagated as errors).
//!
//! # Example
//!
//! ```rust,ignore
//! use lex_stats::analysis::ttest::independent_ttest;
//! use lex_stats::reporting::{AnalysisOutcome, Report};
//!
//! let outcome = AnalysisOutcome::from_result(independent_ttest(&df, "group", "score"))?;
//! println!("{}", outcome.report());
//! ```

mod outcome;
mod text;

pub use outcome::AnalysisOutcome;
pub use text::{TextReport, format_p_value, significance_stars};

/// Something that renders as a text report.
pub trait Report {
    fn report(&self) -> String;
}
