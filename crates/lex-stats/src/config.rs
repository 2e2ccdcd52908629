//! Configuration types for cleaning and analysis.
//!
//! [`CleaningConfig`] is the value object a caller builds (usually from a
//! [`QualityReport`](crate::quality::QualityReport)) and hands to the
//! [`CleaningPolicyExecutor`](crate::cleaner::CleaningPolicyExecutor).
//! [`AnalysisSettings`] holds the few knobs the analysis engines expose.

use crate::error::StatsError;
use crate::quality::QualityReport;
use serde::{Deserialize, Serialize};

/// Strategy for handling missing values.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum MissingMethod {
    /// Fill numeric columns with the mean, others with the mode
    #[default]
    Mean,
    /// Fill numeric columns with the median, others with the mode
    Median,
    /// Drop rows containing any missing value
    Drop,
}

impl MissingMethod {
    /// Human-readable label used in logs and reports.
    pub fn label(&self) -> &'static str {
        match self {
            MissingMethod::Mean => "mean",
            MissingMethod::Median => "median",
            MissingMethod::Drop => "drop",
        }
    }
}

/// Cleaning policy applied by the executor.
///
/// Absent keys deserialize to no-ops and unknown keys are ignored, so a map
/// collected by a frontend dialog can be passed straight through:
///
/// ```rust,ignore
/// let config: CleaningConfig = serde_json::from_str(r#"{
///     "remove_duplicates": true,
///     "duplicate_subset": ["name", "score"]
/// }"#)?;
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct CleaningConfig {
    /// Whether to drop rows that duplicate an earlier row.
    pub remove_duplicates: bool,

    /// Columns compared when looking for duplicates.
    /// `None` means all columns.
    pub duplicate_subset: Option<Vec<String>>,

    /// Whether to handle missing values at all.
    pub handle_missing: bool,

    /// How missing values are handled when `handle_missing` is set.
    /// Default: Mean
    pub missing_method: MissingMethod,
}

impl CleaningConfig {
    /// Create a new configuration builder.
    pub fn builder() -> CleaningConfigBuilder {
        CleaningConfigBuilder::default()
    }

    /// Start from a quality report: duplicates are compared on the
    /// report's ID-excluding subset. Nothing is enabled yet.
    pub fn from_quality_report(report: &QualityReport) -> Self {
        Self {
            duplicate_subset: Some(report.subset_cols.clone()),
            ..Self::default()
        }
    }

    /// Whether this configuration would change anything.
    pub fn is_noop(&self) -> bool {
        !self.remove_duplicates && !self.handle_missing
    }

    /// Validate the configuration against the columns of a dataset.
    pub fn validate<S: AsRef<str>>(&self, columns: &[S]) -> Result<(), ConfigValidationError> {
        if let Some(subset) = &self.duplicate_subset {
            if subset.is_empty() {
                return Err(ConfigValidationError::EmptySubset);
            }

            let unknown: Vec<String> = subset
                .iter()
                .filter(|name| !columns.iter().any(|c| c.as_ref() == name.as_str()))
                .cloned()
                .collect();

            if !unknown.is_empty() {
                return Err(ConfigValidationError::UnknownSubsetColumns(unknown));
            }
        }

        Ok(())
    }
}

/// Errors that can occur during configuration validation.
#[derive(Debug, thiserror::Error)]
pub enum ConfigValidationError {
    #[error("duplicate_subset must not be empty (omit it to compare all columns)")]
    EmptySubset,

    #[error("duplicate_subset references unknown columns: {0:?}")]
    UnknownSubsetColumns(Vec<String>),

    #[error("Invalid value for '{field}': {value} (must be at least 1)")]
    MustBePositive { field: String, value: usize },
}

impl From<ConfigValidationError> for StatsError {
    fn from(err: ConfigValidationError) -> Self {
        StatsError::InvalidConfig(err.to_string())
    }
}

/// Builder for [`CleaningConfig`] with fluent API.
#[derive(Debug, Default)]
pub struct CleaningConfigBuilder {
    remove_duplicates: Option<bool>,
    duplicate_subset: Option<Vec<String>>,
    handle_missing: Option<bool>,
    missing_method: Option<MissingMethod>,
}

impl CleaningConfigBuilder {
    /// Enable or disable duplicate row removal.
    pub fn remove_duplicates(mut self, remove: bool) -> Self {
        self.remove_duplicates = Some(remove);
        self
    }

    /// Restrict duplicate comparison to these columns.
    pub fn duplicate_subset<I, S>(mut self, columns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.duplicate_subset = Some(columns.into_iter().map(Into::into).collect());
        self
    }

    /// Enable missing-value handling with the given method.
    pub fn missing(mut self, method: MissingMethod) -> Self {
        self.handle_missing = Some(true);
        self.missing_method = Some(method);
        self
    }

    /// Enable or disable missing-value handling.
    pub fn handle_missing(mut self, handle: bool) -> Self {
        self.handle_missing = Some(handle);
        self
    }

    /// Build the configuration.
    ///
    /// Column membership is checked later, against the dataset being cleaned.
    pub fn build(self) -> Result<CleaningConfig, ConfigValidationError> {
        if let Some(subset) = &self.duplicate_subset
            && subset.is_empty()
        {
            return Err(ConfigValidationError::EmptySubset);
        }

        Ok(CleaningConfig {
            remove_duplicates: self.remove_duplicates.unwrap_or(false),
            duplicate_subset: self.duplicate_subset,
            handle_missing: self.handle_missing.unwrap_or(false),
            missing_method: self.missing_method.unwrap_or_default(),
        })
    }
}

/// Tunables for the analysis engines.
///
/// Significance thresholds are fixed; only the clustering and PCA knobs
/// can be changed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalysisSettings {
    /// Seed for K-means++ initialisation.
    /// Default: 42
    pub kmeans_seed: u64,

    /// Number of K-means restarts; the lowest-inertia run is kept.
    /// Default: 10
    pub kmeans_n_init: usize,

    /// Maximum Lloyd iterations per restart.
    /// Default: 300
    pub kmeans_max_iter: usize,

    /// Upper bound on retained principal components when none is requested.
    /// Default: 5
    pub max_pca_components: usize,
}

impl Default for AnalysisSettings {
    fn default() -> Self {
        Self {
            kmeans_seed: 42,
            kmeans_n_init: 10,
            kmeans_max_iter: 300,
            max_pca_components: 5,
        }
    }
}

impl AnalysisSettings {
    /// Validate the settings and return errors if invalid.
    pub fn validate(&self) -> Result<(), ConfigValidationError> {
        for (field, value) in [
            ("kmeans_n_init", self.kmeans_n_init),
            ("kmeans_max_iter", self.kmeans_max_iter),
            ("max_pca_components", self.max_pca_components),
        ] {
            if value == 0 {
                return Err(ConfigValidationError::MustBePositive {
                    field: field.to_string(),
                    value,
                });
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_default_config_is_noop() {
        let config = CleaningConfig::default();
        assert!(config.is_noop());
        assert_eq!(config.duplicate_subset, None);
        assert_eq!(config.missing_method, MissingMethod::Mean);
    }

    #[test]
    fn test_builder_custom_values() {
        let config = CleaningConfig::builder()
            .remove_duplicates(true)
            .duplicate_subset(["name", "score"])
            .missing(MissingMethod::Median)
            .build()
            .unwrap();

        assert!(config.remove_duplicates);
        assert!(config.handle_missing);
        assert_eq!(config.missing_method, MissingMethod::Median);
        assert_eq!(
            config.duplicate_subset,
            Some(vec!["name".to_string(), "score".to_string()])
        );
    }

    #[test]
    fn test_missing_method_label_matches_config_key() {
        for method in [MissingMethod::Mean, MissingMethod::Median, MissingMethod::Drop] {
            assert_eq!(serde_json::to_value(method).unwrap(), method.label());
        }
    }

    #[test]
    fn test_builder_rejects_empty_subset() {
        let result = CleaningConfig::builder()
            .duplicate_subset(Vec::<String>::new())
            .build();
        assert!(matches!(result, Err(ConfigValidationError::EmptySubset)));
    }

    #[test]
    fn test_validate_unknown_columns() {
        let config = CleaningConfig::builder()
            .remove_duplicates(true)
            .duplicate_subset(["name", "ghost"])
            .build()
            .unwrap();

        let err = config.validate(&["name", "score"]).unwrap_err();
        match err {
            ConfigValidationError::UnknownSubsetColumns(cols) => {
                assert_eq!(cols, vec!["ghost".to_string()]);
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_config_from_frontend_json() {
        // Unknown keys are ignored, absent keys are no-ops
        let json = r#"{
            "remove_duplicates": true,
            "missing_method": "drop",
            "theme": "dark"
        }"#;

        let config: CleaningConfig = serde_json::from_str(json).unwrap();
        assert!(config.remove_duplicates);
        assert!(!config.handle_missing);
        assert_eq!(config.missing_method, MissingMethod::Drop);
        assert_eq!(config.duplicate_subset, None);
    }

    #[test]
    fn test_config_null_subset_means_all_columns() {
        let json = r#"{"remove_duplicates": true, "duplicate_subset": null}"#;
        let config: CleaningConfig = serde_json::from_str(json).unwrap();
        assert_eq!(config.duplicate_subset, None);
        assert!(config.validate(&["a"]).is_ok());
    }

    #[test]
    fn test_settings_defaults_and_validation() {
        let settings = AnalysisSettings::default();
        assert_eq!(settings.kmeans_seed, 42);
        assert_eq!(settings.max_pca_components, 5);
        assert!(settings.validate().is_ok());

        let bad = AnalysisSettings {
            kmeans_n_init: 0,
            ..AnalysisSettings::default()
        };
        assert!(matches!(
            bad.validate(),
            Err(ConfigValidationError::MustBePositive { .. })
        ));
    }

    #[test]
    fn test_settings_partial_json() {
        let settings: AnalysisSettings = serde_json::from_str(r#"{"kmeans_seed": 7}"#).unwrap();
        assert_eq!(settings.kmeans_seed, 7);
        assert_eq!(settings.kmeans_n_init, 10);
    }
}
