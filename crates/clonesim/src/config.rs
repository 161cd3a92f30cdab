//! YAML run configuration
//!
//! ```yaml
//! workflow:
//!   keeps: [96, 12]
//!   top_percent: 5.0
//!   criteria:
//!     - column: criteria_titer
//!       op: ">="
//!       threshold: 1.0
//! distribution:
//!   method: kde
//!   bandwidth: 0.3
//! correlation: { start: 0.0, end: 1.0, step: 0.1 }
//! monte_carlo: { repetitions: 5000, seed: 42 }
//! sensitivity:
//!   baseline_correlation: 0.5
//!   parameters:
//!     - parameter: step1_keep
//!       values: [48, 96, 192]
//!     - parameter: top_percent
//! ```

use std::fs;
use std::path::Path;

use clonesim_core::advisor::ParameterRecommendation;
use clonesim_core::analysis::{SensitivityConfig, SweepParameter};
use clonesim_core::distribution::FitMethod;
use clonesim_core::model::{CorrelationSpec, WorkflowConfig};
use clonesim_core::simulation::MonteCarloSettings;
use serde::{Deserialize, Serialize};

/// Baseline correlation for sensitivity runs when none is configured
pub const DEFAULT_BASELINE_CORRELATION: f64 = 0.5;

/// Error types for configuration loading
#[derive(Debug)]
pub enum ConfigError {
    Io(String),
    Parse(String),
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigError::Io(msg) => write!(f, "IO error: {msg}"),
            ConfigError::Parse(msg) => write!(f, "Parse error: {msg}"),
        }
    }
}

impl std::error::Error for ConfigError {}

/// One parameter to sweep; `values: None` uses the default grid
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParameterSweep {
    pub parameter: SweepParameter,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub values: Option<Vec<f64>>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SensitivitySettings {
    pub baseline_correlation: f64,
    /// Empty sweeps every parameter that applies to the workflow
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub parameters: Vec<ParameterSweep>,
}

impl Default for SensitivitySettings {
    fn default() -> Self {
        Self {
            baseline_correlation: DEFAULT_BASELINE_CORRELATION,
            parameters: Vec::new(),
        }
    }
}

impl SensitivitySettings {
    /// Concrete sweep configurations for `workflow`, or `None` when every
    /// applicable parameter should use its defaults
    pub fn configs(
        &self,
        workflow: &WorkflowConfig,
        population: usize,
    ) -> Option<Vec<SensitivityConfig>> {
        if self.parameters.is_empty() {
            return None;
        }
        Some(
            self.parameters
                .iter()
                .map(|sweep| match &sweep.values {
                    Some(values) => SensitivityConfig::new(
                        sweep.parameter,
                        values.clone(),
                        self.baseline_correlation,
                    ),
                    None => SensitivityConfig::with_defaults(
                        sweep.parameter,
                        workflow,
                        population,
                        self.baseline_correlation,
                    ),
                })
                .collect(),
        )
    }
}

/// Everything a run needs besides the dataset
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunConfig {
    pub workflow: WorkflowConfig,
    #[serde(default)]
    pub distribution: FitMethod,
    #[serde(default)]
    pub correlation: CorrelationSpec,
    #[serde(default)]
    pub monte_carlo: MonteCarloSettings,
    #[serde(default)]
    pub sensitivity: SensitivitySettings,
}

impl RunConfig {
    pub fn from_yaml(yaml: &str) -> Result<Self, serde_saphyr::Error> {
        serde_saphyr::from_str(yaml)
    }

    pub fn to_yaml(&self) -> Result<String, serde_saphyr::ser::Error> {
        serde_saphyr::to_string(self)
    }

    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path)
            .map_err(|e| ConfigError::Io(format!("{}: {e}", path.display())))?;
        let config = Self::from_yaml(&content)
            .map_err(|e| ConfigError::Parse(format!("{}: {e}", path.display())))?;
        tracing::debug!(
            path = %path.display(),
            steps = config.workflow.steps(),
            "Loaded run configuration"
        );
        Ok(config)
    }

    /// Build a configuration from the advisor's suggestions, keeping the
    /// user's seed
    pub fn from_recommendation(recommendation: &ParameterRecommendation, seed: Option<u64>) -> Self {
        Self {
            workflow: recommendation.workflow.clone(),
            distribution: recommendation.fit_method,
            correlation: recommendation.correlation,
            monte_carlo: MonteCarloSettings::new(recommendation.repetitions, seed),
            sensitivity: SensitivitySettings::default(),
        }
    }

    /// Apply command-line overrides
    pub fn with_overrides(mut self, repetitions: Option<usize>, seed: Option<u64>) -> Self {
        if let Some(repetitions) = repetitions {
            self.monte_carlo.repetitions = repetitions;
        }
        if seed.is_some() {
            self.monte_carlo.seed = seed;
        }
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clonesim_core::model::{AssayDataset, Comparison, CriteriaFilterSpec};

    const FULL: &str = r#"
workflow:
  keeps: [96, 12]
  top_percent: 5.0
  criteria:
    - column: criteria_titer
      op: ">="
      threshold: 1.0
distribution:
  method: kde
  bandwidth: 0.3
correlation:
  start: 0.2
  end: 0.8
  step: 0.2
monte_carlo:
  repetitions: 500
  seed: 7
sensitivity:
  baseline_correlation: 0.6
  parameters:
    - parameter: step1_keep
      values: [48, 96, 192]
    - parameter: top_percent
"#;

    #[test]
    fn test_full_config() {
        let config = RunConfig::from_yaml(FULL).unwrap();

        assert_eq!(config.workflow.keeps(), &[96, 12]);
        assert_eq!(
            config.workflow.criteria(),
            Some(&CriteriaFilterSpec::new().rule("criteria_titer", Comparison::AtLeast, 1.0))
        );
        assert_eq!(
            config.distribution,
            FitMethod::Kde {
                bandwidth: Some(0.3)
            }
        );
        assert_eq!(config.correlation.values().len(), 4);
        assert_eq!(config.monte_carlo, MonteCarloSettings::new(500, Some(7)));
        assert_eq!(config.sensitivity.baseline_correlation, 0.6);
        assert_eq!(config.sensitivity.parameters.len(), 2);
        assert_eq!(config.sensitivity.parameters[1].values, None);
    }

    #[test]
    fn test_minimal_config_uses_defaults() {
        let config = RunConfig::from_yaml("workflow:\n  keeps: [50, 10, 3]\n  top_percent: 1.0\n")
            .unwrap();

        assert_eq!(config.workflow.steps(), 3);
        assert_eq!(config.distribution, FitMethod::Lognormal);
        assert_eq!(config.correlation, CorrelationSpec::default());
        assert_eq!(config.monte_carlo, MonteCarloSettings::default());
        assert_eq!(config.sensitivity, SensitivitySettings::default());
    }

    #[test]
    fn test_invalid_workflow_rejected() {
        // keeps must be non-increasing
        assert!(RunConfig::from_yaml("workflow:\n  keeps: [10, 20]\n  top_percent: 5.0\n").is_err());
        assert!(RunConfig::from_yaml("workflow:\n  keeps: [10, 5]\n  top_percent: 0.0\n").is_err());
        assert!(
            RunConfig::from_yaml(
                "workflow:\n  keeps: [10, 5]\n  top_percent: 5.0\ncorrelation:\n  start: 0.0\n  end: 1.5\n  step: 0.1\n"
            )
            .is_err()
        );
    }

    #[test]
    fn test_yaml_round_trip() {
        let config = RunConfig::from_yaml(FULL).unwrap();
        let yaml = config.to_yaml().unwrap();
        assert_eq!(RunConfig::from_yaml(&yaml).unwrap(), config);
    }

    #[test]
    fn test_sensitivity_configs() {
        let config = RunConfig::from_yaml(FULL).unwrap();
        let configs = config
            .sensitivity
            .configs(&config.workflow, 2000)
            .unwrap();

        assert_eq!(configs[0].values, vec![48.0, 96.0, 192.0]);
        assert_eq!(configs[1].parameter, SweepParameter::TopPercent);
        assert!(!configs[1].values.is_empty());
        assert!(configs.iter().all(|c| c.baseline_correlation == 0.6));

        assert!(
            SensitivitySettings::default()
                .configs(&config.workflow, 2000)
                .is_none()
        );
    }

    #[test]
    fn test_from_recommendation_and_overrides() {
        let dataset = AssayDataset::new((1..=1500).map(|i| 1.0 + f64::from(i) * 0.01).collect());
        let recommendation =
            clonesim_core::advisor::recommend_parameters(&dataset, 5.0).unwrap();

        let config = RunConfig::from_recommendation(&recommendation, Some(3))
            .with_overrides(Some(250), None);

        assert_eq!(config.workflow, recommendation.workflow);
        assert_eq!(config.monte_carlo.repetitions, 250);
        assert_eq!(config.monte_carlo.seed, Some(3));
    }
}
