//! Two-step vs three-step workflow comparison at one correlation.
//!
//! Both variants share the plan's dataset, marginals, criteria filter and
//! top-X%, and run from the same seed, so the difference in success
//! probability comes from the extra selection step alone.

use serde::{Deserialize, Serialize};

use crate::error::{ParameterError, Result};
use crate::model::{SimulationResult, WorkflowConfig};
use crate::simulation::{MonteCarloSettings, RunProgress, SimulationPlan};

use super::config::check_correlation;

/// Correlation used when a comparison is requested without one
pub const DEFAULT_COMPARISON_CORRELATION: f64 = 0.5;

/// One workflow and its simulated outcome
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkflowVariant {
    pub workflow: WorkflowConfig,
    pub result: SimulationResult,
}

impl WorkflowVariant {
    #[must_use]
    pub fn steps(&self) -> usize {
        self.workflow.steps()
    }

    #[must_use]
    pub fn success_probability(&self) -> f64 {
        self.result.success_probability
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkflowComparison {
    pub correlation: f64,
    pub two_step: WorkflowVariant,
    pub three_step: WorkflowVariant,
}

impl WorkflowComparison {
    /// Three-step probability minus two-step probability
    #[must_use]
    pub fn difference(&self) -> f64 {
        self.three_step.success_probability() - self.two_step.success_probability()
    }

    /// Variant with the higher success probability; ties go to the shorter
    /// workflow
    #[must_use]
    pub fn preferred(&self) -> &WorkflowVariant {
        if self.difference() > 0.0 {
            &self.three_step
        } else {
            &self.two_step
        }
    }
}

/// The two-step and three-step forms of `workflow`.
///
/// Both keep the first two keep-counts. The third keep is `step3_keep` when
/// given, else the workflow's own third keep, else half the second keep.
pub fn comparison_workflows(
    workflow: &WorkflowConfig,
    step3_keep: Option<usize>,
) -> std::result::Result<(WorkflowConfig, WorkflowConfig), ParameterError> {
    let keeps = workflow.keeps();
    let (step1, step2) = (keeps[0], keeps[1]);
    let step3 = step3_keep
        .or_else(|| keeps.get(2).copied())
        .unwrap_or((step2 / 2).max(1));

    let mut two_step = WorkflowConfig::two_step(step1, step2, workflow.top_percent())?;
    let mut three_step = WorkflowConfig::three_step(step1, step2, step3, workflow.top_percent())?;
    if let Some(criteria) = workflow.criteria() {
        two_step = two_step.with_criteria(criteria.clone());
        three_step = three_step.with_criteria(criteria.clone());
    }
    Ok((two_step, three_step))
}

/// Simulate the two-step and three-step forms of the plan's workflow at
/// `rho` with one seed.
///
/// Returns `Ok(None)` when cancelled through `progress`.
pub fn compare_workflows(
    plan: &SimulationPlan,
    step3_keep: Option<usize>,
    rho: f64,
    settings: &MonteCarloSettings,
    progress: &RunProgress,
) -> Result<Option<WorkflowComparison>> {
    settings.validate()?;
    check_correlation("correlation", rho)?;
    let (two_step, three_step) = comparison_workflows(plan.workflow(), step3_keep)?;
    let two_step_plan = plan.reconfigure(two_step)?;
    let three_step_plan = plan.reconfigure(three_step)?;

    let seed = settings.resolve_seed();
    progress.reset(2 * settings.repetitions);
    tracing::info!(
        rho,
        repetitions = settings.repetitions,
        seed,
        "Starting workflow comparison"
    );

    let Some(two_step_result) =
        two_step_plan.simulate_point(rho, seed, settings.repetitions, progress)?
    else {
        return Ok(None);
    };
    let Some(three_step_result) =
        three_step_plan.simulate_point(rho, seed, settings.repetitions, progress)?
    else {
        return Ok(None);
    };

    let comparison = WorkflowComparison {
        correlation: rho,
        two_step: WorkflowVariant {
            workflow: two_step_plan.workflow().clone(),
            result: two_step_result,
        },
        three_step: WorkflowVariant {
            workflow: three_step_plan.workflow().clone(),
            result: three_step_result,
        },
    };
    tracing::info!(
        two_step = comparison.two_step.success_probability(),
        three_step = comparison.three_step.success_probability(),
        preferred_steps = comparison.preferred().steps(),
        "Workflow comparison complete"
    );
    Ok(Some(comparison))
}
