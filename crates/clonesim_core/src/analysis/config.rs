//! Configuration types for sensitivity sweeps.

use serde::{Deserialize, Serialize};

use crate::error::ParameterError;
use crate::model::{CorrelationSpec, KEEP_FIELDS, WorkflowConfig};

/// Multipliers applied to a baseline keep-count for the default sweep
pub const KEEP_MULTIPLIERS: [f64; 5] = [0.5, 0.75, 1.0, 1.25, 1.5];

/// Default top-X% values
pub const TOP_PERCENT_VALUES: [f64; 5] = [1.0, 2.0, 5.0, 10.0, 15.0];

/// A workflow parameter that can be swept
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SweepParameter {
    Step1Keep,
    Step2Keep,
    Step3Keep,
    TopPercent,
    Correlation,
}

impl SweepParameter {
    pub const ALL: [SweepParameter; 5] = [
        SweepParameter::Step1Keep,
        SweepParameter::Step2Keep,
        SweepParameter::Step3Keep,
        SweepParameter::TopPercent,
        SweepParameter::Correlation,
    ];

    #[must_use]
    pub fn label(&self) -> &'static str {
        match self {
            Self::Step1Keep => "Step 1 Keep",
            Self::Step2Keep => "Step 2 Keep",
            Self::Step3Keep => "Step 3 Keep",
            Self::TopPercent => "Top X%",
            Self::Correlation => "Correlation",
        }
    }

    /// Machine-readable name, matches the serde representation
    #[must_use]
    pub fn key(&self) -> &'static str {
        match self {
            Self::Step1Keep => "step1_keep",
            Self::Step2Keep => "step2_keep",
            Self::Step3Keep => "step3_keep",
            Self::TopPercent => "top_percent",
            Self::Correlation => "correlation",
        }
    }

    /// Workflow step for keep-count parameters (0-based)
    #[must_use]
    pub fn step_index(&self) -> Option<usize> {
        match self {
            Self::Step1Keep => Some(0),
            Self::Step2Keep => Some(1),
            Self::Step3Keep => Some(2),
            Self::TopPercent | Self::Correlation => None,
        }
    }

    /// Whether the parameter exists for a workflow with `steps` steps
    #[must_use]
    pub fn applies_to(&self, steps: usize) -> bool {
        self.step_index().is_none_or(|step| step < steps)
    }

    /// Parameters that apply to a workflow with `steps` steps
    pub fn applicable(steps: usize) -> impl Iterator<Item = SweepParameter> {
        Self::ALL.into_iter().filter(move |p| p.applies_to(steps))
    }

    /// The configuration and correlation one swept value produces.
    ///
    /// Keep-count sweeps lower later steps as needed to keep the funnel
    /// non-increasing.
    pub fn apply(
        &self,
        workflow: &WorkflowConfig,
        baseline_correlation: f64,
        value: f64,
    ) -> Result<(WorkflowConfig, f64), ParameterError> {
        match self.step_index() {
            Some(step) => {
                let field = KEEP_FIELDS[step];
                let keep = whole_count(field, value)?;
                Ok((workflow.with_keep(step, keep)?, baseline_correlation))
            }
            None if *self == Self::TopPercent => {
                Ok((workflow.with_top_percent(value)?, baseline_correlation))
            }
            None => {
                check_correlation("correlation", value)?;
                Ok((workflow.clone(), value))
            }
        }
    }
}

impl std::fmt::Display for SweepParameter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.label())
    }
}

fn whole_count(field: &'static str, value: f64) -> Result<usize, ParameterError> {
    if !value.is_finite() {
        return Err(ParameterError::NotFinite { field });
    }
    if value.fract() != 0.0 {
        return Err(ParameterError::NotWhole { field, value });
    }
    if value < 1.0 {
        return Err(ParameterError::ZeroCount { field });
    }
    Ok(value as usize)
}

pub(crate) fn check_correlation(field: &'static str, value: f64) -> Result<(), ParameterError> {
    if !value.is_finite() {
        return Err(ParameterError::NotFinite { field });
    }
    if !(0.0..=1.0).contains(&value) {
        return Err(ParameterError::OutOfRange {
            field,
            value,
            min: 0.0,
            max: 1.0,
        });
    }
    Ok(())
}

/// One parameter, its test values and the correlation the other points use
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SensitivityConfig {
    pub parameter: SweepParameter,
    pub values: Vec<f64>,
    pub baseline_correlation: f64,
}

impl SensitivityConfig {
    #[must_use]
    pub fn new(parameter: SweepParameter, values: Vec<f64>, baseline_correlation: f64) -> Self {
        Self {
            parameter,
            values,
            baseline_correlation,
        }
    }

    /// Sweep `parameter` over [`default_sweep_values`]
    #[must_use]
    pub fn with_defaults(
        parameter: SweepParameter,
        workflow: &WorkflowConfig,
        population: usize,
        baseline_correlation: f64,
    ) -> Self {
        Self::new(
            parameter,
            default_sweep_values(parameter, workflow, population),
            baseline_correlation,
        )
    }
}

/// Default test values for `parameter` around `workflow`'s baseline.
///
/// Keep-counts are the baseline scaled by [`KEEP_MULTIPLIERS`] (truncated),
/// dropping values below 1, above the upstream limit, and duplicates. An
/// inapplicable keep step yields an empty list.
#[must_use]
pub fn default_sweep_values(
    parameter: SweepParameter,
    workflow: &WorkflowConfig,
    population: usize,
) -> Vec<f64> {
    match parameter.step_index() {
        Some(step) if step < workflow.steps() => {
            let baseline = workflow.keeps()[step] as f64;
            let limit = if step == 0 {
                population
            } else {
                workflow.keeps()[step - 1]
            };

            let mut values: Vec<f64> = Vec::with_capacity(KEEP_MULTIPLIERS.len());
            for multiplier in KEEP_MULTIPLIERS {
                let keep = (baseline * multiplier).trunc();
                if keep >= 1.0 && keep <= limit as f64 && !values.contains(&keep) {
                    values.push(keep);
                }
            }
            values
        }
        Some(_) => Vec::new(),
        None if parameter == SweepParameter::TopPercent => TOP_PERCENT_VALUES.to_vec(),
        None => CorrelationSpec::default().values(),
    }
}
