//! Statistical Decision Engine
//!
//! Data quality inspection, policy-driven cleaning and a set of classical
//! analyses over Polars DataFrames, each producing a typed result and a
//! plain-text report.
//!
//! # Overview
//!
//! - **Quality inspection**: duplicates (ignoring ID-like columns), missing
//!   values and IQR outliers via [`DataQualityInspector`]
//! - **Cleaning**: duplicate removal and missing-value handling driven by a
//!   [`CleaningConfig`], applied by [`CleaningPolicyExecutor`]
//! - **Analysis**: descriptive statistics, t-test, ANOVA with Tukey HSD,
//!   correlation, linear regression, PCA and K-means (see [`analysis`])
//!
//! Engines take `&DataFrame` and never mutate it. Cleaning returns a new
//! frame together with a [`CleaningLog`].
//!
//! # Quick Start
//!
//! ```rust,ignore
//! use lex_stats::{CleaningPolicyExecutor, DataQualityInspector, Report};
//! use lex_stats::analysis::ttest::independent_ttest;
//! use polars::prelude::*;
//!
//! let df = CsvReadOptions::default()
//!     .with_has_header(true)
//!     .try_into_reader_with_file_path(Some("data.csv".into()))?
//!     .finish()?;
//!
//! let report = DataQualityInspector::new().check_quality(&df)?;
//! println!("{}", report.summary());
//!
//! let (clean, log) = CleaningPolicyExecutor::new()
//!     .apply_cleaning(&df, &report.suggested_config())?;
//! for message in log.messages() {
//!     println!("{}", message);
//! }
//!
//! let result = independent_ttest(&clean, "group", "score")?;
//! println!("{}", result.report());
//! ```
//!
//! # Errors
//!
//! Every operation returns [`Result`]. Errors caused by the user's data or
//! column choice ([`StatsError::is_user_input`]) can be turned into a
//! displayable report with [`AnalysisOutcome::from_result`].

pub mod analysis;
pub mod cleaner;
pub mod config;
pub mod error;
pub mod imputers;
pub mod quality;
pub mod reporting;
pub mod stats;
pub mod utils;

// Re-exports for convenient access
pub use analysis::GroupStats;
pub use analysis::anova::{AnovaOutcome, AnovaResult, TukeyComparison};
pub use analysis::clustering::{KMeansParams, KMeansResult};
pub use analysis::correlation::{CorrelationMethod, CorrelationResult, CorrelationStrength};
pub use analysis::descriptive::DescriptiveSummary;
pub use analysis::pca::PcaResult;
pub use analysis::regression::RegressionResult;
pub use analysis::ttest::{EffectSize, TTestResult, TTestVariant};
pub use cleaner::{CleaningAction, CleaningEntry, CleaningLog, CleaningPolicyExecutor};
pub use config::{
    AnalysisSettings, CleaningConfig, CleaningConfigBuilder, ConfigValidationError, MissingMethod,
};
pub use error::{Result, ResultExt, StatsError};
pub use imputers::{FillMethod, StatisticalImputer};
pub use quality::{DataQualityInspector, QualityReport};
pub use reporting::{AnalysisOutcome, Report, TextReport};
pub use utils::{DtypeCategory, get_dtype_category, is_numeric_dtype};

static_assertions::assert_impl_all!(DataQualityInspector: Send, Sync);
static_assertions::assert_impl_all!(CleaningPolicyExecutor: Send, Sync);
static_assertions::assert_impl_all!(QualityReport: Send, Sync);
static_assertions::assert_impl_all!(StatsError: Send, Sync);
