//! Funnel reduction statistics

use serde::{Deserialize, Serialize};

use crate::error::ParameterError;
use crate::model::WorkflowConfig;

/// Reduction at one workflow step
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct StepReduction {
    pub input: usize,
    pub kept: usize,
    /// `kept / input`
    pub ratio: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EfficiencyReport {
    pub population: usize,
    pub steps: Vec<StepReduction>,
    /// `final_keep / population`
    pub overall_ratio: f64,
    /// `population / final_keep`
    pub reduction_factor: f64,
    /// `step1_keep / final_keep`: reduction after the primary screen
    pub screening_reduction: f64,
    /// `1 − geometric mean of the step ratios`; higher is more selective
    pub selectivity: f64,
}

impl EfficiencyReport {
    #[must_use]
    pub fn step_ratios(&self) -> Vec<f64> {
        self.steps.iter().map(|s| s.ratio).collect()
    }

    /// Selectivity weighted by how often the workflow succeeds
    #[must_use]
    pub fn efficiency_score(&self, success_probability: f64) -> f64 {
        self.selectivity * success_probability.clamp(0.0, 1.0)
    }
}

pub struct EfficiencyAnalyzer;

impl EfficiencyAnalyzer {
    pub fn analyze(
        workflow: &WorkflowConfig,
        population: usize,
    ) -> Result<EfficiencyReport, ParameterError> {
        workflow.check_population(population)?;

        let mut input = population;
        let steps: Vec<StepReduction> = workflow
            .keeps()
            .iter()
            .map(|&kept| {
                let step = StepReduction {
                    input,
                    kept,
                    ratio: kept as f64 / input as f64,
                };
                input = kept;
                step
            })
            .collect();

        let final_keep = workflow.final_keep() as f64;
        let log_sum: f64 = steps.iter().map(|s| s.ratio.ln()).sum();
        let geometric_mean = (log_sum / steps.len() as f64).exp();

        Ok(EfficiencyReport {
            population,
            overall_ratio: final_keep / population as f64,
            reduction_factor: population as f64 / final_keep,
            screening_reduction: workflow.keeps()[0] as f64 / final_keep,
            selectivity: 1.0 - geometric_mean,
            steps,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_two_step_ratios() {
        let workflow = WorkflowConfig::two_step(100, 10, 5.0).unwrap();
        let report = EfficiencyAnalyzer::analyze(&workflow, 1000).unwrap();

        assert!((report.overall_ratio - 0.01).abs() < 1e-12);
        assert_eq!(report.step_ratios(), vec![0.1, 0.1]);
        assert_eq!(report.reduction_factor, 100.0);
        assert_eq!(report.screening_reduction, 10.0);
        assert!((report.selectivity - 0.9).abs() < 1e-12);
        assert!((report.efficiency_score(0.5) - 0.45).abs() < 1e-12);
    }

    #[test]
    fn test_selectivity_grows_with_narrower_funnel() {
        let wide = WorkflowConfig::three_step(500, 250, 100, 5.0).unwrap();
        let narrow = WorkflowConfig::three_step(100, 20, 5, 5.0).unwrap();
        let wide = EfficiencyAnalyzer::analyze(&wide, 1000).unwrap();
        let narrow = EfficiencyAnalyzer::analyze(&narrow, 1000).unwrap();
        assert!(narrow.selectivity > wide.selectivity);
        assert_eq!(narrow.steps[2].input, 20);
    }

    #[test]
    fn test_population_must_cover_first_step() {
        let workflow = WorkflowConfig::two_step(100, 10, 5.0).unwrap();
        assert!(EfficiencyAnalyzer::analyze(&workflow, 50).is_err());
    }
}
