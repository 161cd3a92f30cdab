//! Rule-based interpretation of datasets and simulation results.
//!
//! Every function here is a pure mapping from engine output to fixed labels and
//! templated text. Nothing is stored between calls.

use serde::{Deserialize, Serialize};

use crate::analysis::{SensitivityBand, SensitivityResult};
use crate::distribution::FitMethod;
use crate::error::ParameterError;
use crate::model::{AssayDataset, CorrelationSpec, CorrelationSweep, WorkflowConfig};
use crate::quality::skewness;

/// Best-probability thresholds for the performance bands
pub const EXCELLENT_PROBABILITY: f64 = 0.8;
pub const GOOD_PROBABILITY: f64 = 0.6;
pub const FAIR_PROBABILITY: f64 = 0.4;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PerformanceBand {
    Excellent,
    Good,
    Fair,
    Poor,
}

impl PerformanceBand {
    #[must_use]
    pub fn classify(probability: f64) -> Self {
        if probability >= EXCELLENT_PROBABILITY {
            Self::Excellent
        } else if probability >= GOOD_PROBABILITY {
            Self::Good
        } else if probability >= FAIR_PROBABILITY {
            Self::Fair
        } else {
            Self::Poor
        }
    }

    #[must_use]
    pub fn label(&self) -> &'static str {
        match self {
            Self::Excellent => "Excellent",
            Self::Good => "Good",
            Self::Fair => "Fair",
            Self::Poor => "Poor",
        }
    }
}

/// How strongly the best result depends on assay consistency
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CorrelationBand {
    High,
    Moderate,
    Low,
}

impl CorrelationBand {
    /// `> 0.7` High, `> 0.5` Moderate
    #[must_use]
    pub fn classify(rho: f64) -> Self {
        if rho > 0.7 {
            Self::High
        } else if rho > 0.5 {
            Self::Moderate
        } else {
            Self::Low
        }
    }

    #[must_use]
    pub fn label(&self) -> &'static str {
        match self {
            Self::High => "high",
            Self::Moderate => "moderate",
            Self::Low => "low",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ImprovementPotential {
    High,
    Moderate,
    Low,
}

impl ImprovementPotential {
    /// On the max − min probability range: `> 0.3` High, `> 0.2` Moderate
    #[must_use]
    pub fn classify(range: f64) -> Self {
        if range > 0.3 {
            Self::High
        } else if range > 0.2 {
            Self::Moderate
        } else {
            Self::Low
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SweepAssessment {
    pub performance: PerformanceBand,
    pub best_probability: f64,
    pub best_correlation: f64,
    pub correlation_band: CorrelationBand,
    pub mean_probability: f64,
    pub improvement_range: f64,
    pub improvement: ImprovementPotential,
    pub insights: Vec<String>,
    pub recommendations: Vec<String>,
    pub opportunities: Vec<String>,
    pub risks: Vec<String>,
}

/// Classify a correlation sweep. `None` for an empty sweep.
#[must_use]
pub fn assess_sweep(sweep: &CorrelationSweep) -> Option<SweepAssessment> {
    let best = sweep.best()?;
    let best_probability = best.success_probability;
    let best_correlation = best.correlation;
    let improvement_range = sweep.max_probability() - sweep.min_probability();

    let performance = PerformanceBand::classify(best_probability);
    let correlation_band = CorrelationBand::classify(best_correlation);
    let improvement = ImprovementPotential::classify(improvement_range);

    let mut insights = Vec::new();
    let mut recommendations = Vec::new();
    let mut opportunities = Vec::new();
    let mut risks = Vec::new();

    let pct = best_probability * 100.0;
    match performance {
        PerformanceBand::Excellent => {
            insights.push(format!("Outstanding performance: {pct:.1}% success rate"));
            recommendations
                .push("Current parameters are near optimal; consider resource optimization".into());
        }
        PerformanceBand::Good => {
            insights.push(format!("Good performance: {pct:.1}% success rate"));
            opportunities.push("Room for improvement through parameter optimization".into());
        }
        PerformanceBand::Fair => {
            insights.push(format!("Fair performance: {pct:.1}% success rate"));
            opportunities.push("Significant optimization opportunities available".into());
        }
        PerformanceBand::Poor => {
            insights.push(format!("Poor performance: {pct:.1}% success rate"));
            risks.push("Major parameter review required".into());
        }
    }

    match correlation_band {
        CorrelationBand::High => {
            insights.push(format!(
                "High optimal correlation ({best_correlation:.2}): strong assay consistency pays off"
            ));
            recommendations.push("Invest in improving assay correlation".into());
        }
        CorrelationBand::Moderate => insights.push(format!(
            "Moderate optimal correlation ({best_correlation:.2}): reasonable assay consistency"
        )),
        CorrelationBand::Low => insights.push(format!(
            "Low optimal correlation ({best_correlation:.2}): correlation is less critical"
        )),
    }

    let range_pct = improvement_range * 100.0;
    match improvement {
        ImprovementPotential::High => {
            opportunities.push(format!("High improvement potential: {range_pct:.1}% range"));
        }
        ImprovementPotential::Moderate => {
            opportunities.push(format!("Moderate improvement potential: {range_pct:.1}% range"));
        }
        ImprovementPotential::Low => {
            insights.push(format!("Low improvement potential: {range_pct:.1}% range"));
        }
    }

    Some(SweepAssessment {
        performance,
        best_probability,
        best_correlation,
        correlation_band,
        mean_probability: sweep.mean_probability(),
        improvement_range,
        improvement,
        insights,
        recommendations,
        opportunities,
        risks,
    })
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SensitivityAssessment {
    pub critical: Vec<String>,
    pub moderate: Vec<String>,
    pub stable: Vec<String>,
    pub priorities: Vec<String>,
    pub insights: Vec<String>,
}

#[must_use]
pub fn assess_sensitivity(result: &SensitivityResult) -> SensitivityAssessment {
    let mut assessment = SensitivityAssessment {
        critical: Vec::new(),
        moderate: Vec::new(),
        stable: Vec::new(),
        priorities: Vec::new(),
        insights: Vec::new(),
    };

    for record in result.ranked() {
        let name = record.parameter.label().to_string();
        match record.band {
            SensitivityBand::High => {
                assessment.priorities.push(format!(
                    "High priority: {name} (sensitivity {:.1} points)",
                    record.score
                ));
                assessment.critical.push(name);
            }
            SensitivityBand::Medium => {
                assessment.insights.push(format!(
                    "Moderate sensitivity: {name} ({:.1} points)",
                    record.score
                ));
                assessment.moderate.push(name);
            }
            SensitivityBand::Low => {
                assessment.insights.push(format!(
                    "Low sensitivity: {name} ({:.1} points)",
                    record.score
                ));
                assessment.stable.push(name);
            }
        }
    }
    assessment
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct OptimizationPlan {
    pub immediate: Vec<String>,
    pub short_term: Vec<String>,
    pub long_term: Vec<String>,
}

#[must_use]
pub fn optimization_plan(
    best_probability: f64,
    sensitivity: Option<&SensitivityResult>,
) -> OptimizationPlan {
    let mut plan = OptimizationPlan::default();

    match PerformanceBand::classify(best_probability) {
        PerformanceBand::Poor => {
            plan.immediate
                .push("Review all workflow parameters; current performance is poor".into());
            plan.short_term
                .push("Test different keep-counts and correlation ranges".into());
        }
        PerformanceBand::Fair => {
            plan.immediate
                .push("Optimize the high-sensitivity parameters first".into());
            plan.short_term
                .push("Fine-tune correlation and threshold settings".into());
        }
        PerformanceBand::Good => {
            plan.short_term
                .push("Minor parameter adjustments for marginal improvements".into());
            plan.long_term
                .push("Consider workflow efficiency optimization".into());
        }
        PerformanceBand::Excellent => {
            plan.long_term
                .push("Focus on resource optimization and workflow efficiency".into());
        }
    }

    if let Some(result) = sensitivity {
        let critical: Vec<&str> = result.critical().iter().map(|p| p.label()).collect();
        if !critical.is_empty() {
            plan.short_term
                .push(format!("Focus optimization on: {}", critical.join(", ")));
        }
    }

    plan
}

/// Suggested run parameters for a dataset
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParameterRecommendation {
    pub workflow: WorkflowConfig,
    pub fit_method: FitMethod,
    pub correlation: CorrelationSpec,
    pub repetitions: usize,
    pub reasoning: Vec<String>,
}

/// Recommend a workflow shape, distribution and run size from dataset size
/// and skew
pub fn recommend_parameters(
    dataset: &AssayDataset,
    top_percent: f64,
) -> Result<ParameterRecommendation, ParameterError> {
    let n = dataset.len();
    if n == 0 {
        return Err(ParameterError::ZeroCount {
            field: "population",
        });
    }
    let mut reasoning = Vec::new();

    let keeps = if n > 2000 {
        reasoning.push(format!(
            "Large dataset ({n} clones): a 3-step workflow gives better selection"
        ));
        vec![(n / 10).min(192), (n / 20).min(96), 6]
    } else if n > 1000 {
        reasoning.push(format!(
            "Medium dataset ({n} clones): a 2-step workflow is efficient"
        ));
        vec![(n / 10).min(96), (n / 20).min(48)]
    } else {
        reasoning.push(format!(
            "Small dataset ({n} clones): a 2-step workflow is recommended"
        ));
        vec![(n / 5).min(48), (n / 10).min(24)]
    };
    let keeps = monotone_keeps(keeps);
    let workflow = WorkflowConfig::new(keeps, top_percent)?;

    let skew = skewness(dataset.results());
    let fit_method = if skew.abs() > 2.0 {
        reasoning.push(format!(
            "Highly skewed data (skewness {skew:.2}): KDE recommended"
        ));
        FitMethod::Kde { bandwidth: None }
    } else {
        reasoning.push(format!(
            "Moderate skewness ({skew:.2}): lognormal is suitable"
        ));
        FitMethod::Lognormal
    };

    let (repetitions, step) = if n > 2000 { (5000, 0.05) } else { (10_000, 0.01) };
    let correlation = CorrelationSpec::new(0.1, 0.9, step)?;

    let criteria = dataset.criteria_columns().len();
    if criteria > 0 {
        reasoning.push(format!(
            "{criteria} criteria columns detected: consider quality filtering"
        ));
    }

    Ok(ParameterRecommendation {
        workflow,
        fit_method,
        correlation,
        repetitions,
        reasoning,
    })
}

/// Every keep at least 1 and no larger than the one before
fn monotone_keeps(mut keeps: Vec<usize>) -> Vec<usize> {
    for i in 0..keeps.len() {
        keeps[i] = keeps[i].max(1);
        if i > 0 {
            keeps[i] = keeps[i].min(keeps[i - 1]);
        }
    }
    keeps
}

/// Soft warnings for workflows that are valid but unlikely to select well
#[must_use]
pub fn workflow_warnings(workflow: &WorkflowConfig) -> Vec<String> {
    let keeps = workflow.keeps();
    let mut warnings = Vec::new();

    if keeps[0] < 10 {
        warnings.push("Step 1 keep is very small (< 10), which may lead to poor selection".into());
    }
    if keeps.len() == 3 && keeps[1] < 5 {
        warnings.push("Step 2 keep is very small (< 5), which may lead to poor selection".into());
    }
    if workflow.final_keep() < 3 {
        warnings.push("Final selection is very small (< 3), consider increasing".into());
    }
    for (i, pair) in keeps.windows(2).enumerate() {
        if (pair[0] as f64) / (pair[1] as f64) < 2.0 {
            warnings.push(format!(
                "Step {} to Step {} reduction ratio is low (< 2)",
                i + 1,
                i + 2
            ));
        }
    }
    warnings
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::{SensitivityRecord, SweepParameter};
    use crate::model::{CriteriaFilterSpec, SimulationResult};

    fn sweep(points: &[(f64, f64)]) -> CorrelationSweep {
        CorrelationSweep {
            results: points
                .iter()
                .map(|&(correlation, p)| SimulationResult {
                    correlation,
                    trials: 100,
                    successes: (p * 100.0) as usize,
                    success_probability: p,
                    success_count_histogram: vec![],
                    seed: 0,
                })
                .collect(),
        }
    }

    #[test]
    fn test_performance_bands() {
        assert_eq!(PerformanceBand::classify(0.8), PerformanceBand::Excellent);
        assert_eq!(PerformanceBand::classify(0.65), PerformanceBand::Good);
        assert_eq!(PerformanceBand::classify(0.4), PerformanceBand::Fair);
        assert_eq!(PerformanceBand::classify(0.39), PerformanceBand::Poor);
    }

    #[test]
    fn test_assess_sweep() {
        let assessment = assess_sweep(&sweep(&[(0.0, 0.05), (0.5, 0.3), (0.9, 0.85)])).unwrap();
        assert_eq!(assessment.performance, PerformanceBand::Excellent);
        assert_eq!(assessment.best_correlation, 0.9);
        assert_eq!(assessment.correlation_band, CorrelationBand::High);
        assert_eq!(assessment.improvement, ImprovementPotential::High);
        assert!(!assessment.recommendations.is_empty());

        let flat = assess_sweep(&sweep(&[(0.2, 0.1), (0.4, 0.15)])).unwrap();
        assert_eq!(flat.performance, PerformanceBand::Poor);
        assert_eq!(flat.correlation_band, CorrelationBand::Low);
        assert_eq!(flat.improvement, ImprovementPotential::Low);
        assert_eq!(flat.risks.len(), 1);

        assert!(assess_sweep(&sweep(&[])).is_none());
    }

    fn record(parameter: SweepParameter, probabilities: [f64; 2]) -> SensitivityRecord {
        SensitivityRecord::new(parameter, 0.3, vec![1.0, 2.0], probabilities.to_vec())
    }

    #[test]
    fn test_sensitivity_assessment_and_plan() {
        let result = SensitivityResult {
            baseline_correlation: 0.5,
            baseline_probability: 0.3,
            records: vec![
                record(SweepParameter::Step2Keep, [0.1, 0.4]),
                record(SweepParameter::TopPercent, [0.3, 0.42]),
                record(SweepParameter::Step1Keep, [0.3, 0.31]),
            ],
        };
        let assessment = assess_sensitivity(&result);
        assert_eq!(assessment.critical, vec!["Step 2 Keep"]);
        assert_eq!(assessment.moderate, vec!["Top X%"]);
        assert_eq!(assessment.stable, vec!["Step 1 Keep"]);
        assert_eq!(assessment.priorities.len(), 1);

        let plan = optimization_plan(0.3, Some(&result));
        assert_eq!(plan.immediate.len(), 1);
        assert!(plan.short_term.iter().any(|s| s.contains("Step 2 Keep")));

        let plan = optimization_plan(0.9, None);
        assert!(plan.immediate.is_empty());
        assert_eq!(plan.long_term.len(), 1);
    }

    #[test]
    fn test_recommendations_by_size() {
        let large = AssayDataset::new((1..=3000).map(f64::from).collect());
        let rec = recommend_parameters(&large, 5.0).unwrap();
        assert_eq!(rec.workflow.keeps(), &[192, 96, 6]);
        assert_eq!(rec.repetitions, 5000);
        assert_eq!(rec.correlation.step(), 0.05);
        assert_eq!(rec.fit_method, FitMethod::Lognormal);

        let medium = AssayDataset::new((1..=1500).map(f64::from).collect());
        let rec = recommend_parameters(&medium, 5.0).unwrap();
        assert_eq!(rec.workflow.keeps(), &[96, 48]);

        let small = AssayDataset::new((1..=200).map(f64::from).collect());
        let rec = recommend_parameters(&small, 5.0).unwrap();
        assert_eq!(rec.workflow.keeps(), &[40, 20]);
        assert_eq!(rec.repetitions, 10_000);

        let tiny = AssayDataset::new(vec![1.0, 2.0, 3.0]);
        let rec = recommend_parameters(&tiny, 5.0).unwrap();
        assert_eq!(rec.workflow.keeps(), &[1, 1]);

        assert!(recommend_parameters(&AssayDataset::new(vec![]), 5.0).is_err());
    }

    #[test]
    fn test_skewed_data_recommends_kde() {
        let mut values = vec![1.0; 95];
        values.extend([50.0, 60.0, 80.0, 100.0, 200.0]);
        let rec = recommend_parameters(&AssayDataset::new(values), 5.0).unwrap();
        assert_eq!(rec.fit_method, FitMethod::Kde { bandwidth: None });
    }

    #[test]
    fn test_workflow_warnings() {
        let fine = WorkflowConfig::three_step(96, 24, 6, 5.0).unwrap();
        assert!(workflow_warnings(&fine).is_empty());

        let cramped = WorkflowConfig::three_step(8, 6, 2, 5.0).unwrap();
        let warnings = workflow_warnings(&cramped);
        assert!(warnings.iter().any(|w| w.starts_with("Step 1 keep")));
        assert!(warnings.iter().any(|w| w.starts_with("Final selection")));
        assert!(warnings.iter().any(|w| w.starts_with("Step 1 to Step 2")));
        assert!(!warnings.iter().any(|w| w.starts_with("Step 2 to Step 3")));

        let with_criteria = fine.with_criteria(CriteriaFilterSpec::new());
        assert!(workflow_warnings(&with_criteria).is_empty());
    }
}
