//! Sensitivity sweep evaluator - runs the Monte Carlo at every swept value.
//!
//! All swept configurations are built and validated before the first trial,
//! so a bad value fails fast instead of after minutes of simulation. Every
//! point reuses the run's seed.

use crate::error::{ParameterError, Result};
use crate::simulation::{MonteCarloSettings, RunProgress, SimulationPlan};

use super::config::check_correlation;
use super::{SensitivityConfig, SensitivityRecord, SensitivityResult, SweepParameter};

/// A validated sweep: one prepared plan and correlation per value
struct PreparedSweep {
    parameter: SweepParameter,
    values: Vec<f64>,
    points: Vec<(SimulationPlan, f64)>,
}

fn prepare_sweep(plan: &SimulationPlan, config: &SensitivityConfig) -> Result<PreparedSweep> {
    if config.values.is_empty() {
        return Err(ParameterError::EmptyGrid {
            field: config.parameter.key(),
        }
        .into());
    }
    check_correlation("baseline_correlation", config.baseline_correlation)?;

    let mut points = Vec::with_capacity(config.values.len());
    for &value in &config.values {
        let (workflow, rho) =
            config
                .parameter
                .apply(plan.workflow(), config.baseline_correlation, value)?;
        points.push((plan.reconfigure(workflow)?, rho));
    }

    Ok(PreparedSweep {
        parameter: config.parameter,
        values: config.values.clone(),
        points,
    })
}

/// Baseline plus every point of every sweep, or `None` if cancelled
fn evaluate(
    plan: &SimulationPlan,
    baseline_correlation: f64,
    sweeps: Vec<PreparedSweep>,
    settings: &MonteCarloSettings,
    progress: &RunProgress,
) -> Result<Option<SensitivityResult>> {
    let seed = settings.resolve_seed();
    let total_points = 1 + sweeps.iter().map(|s| s.points.len()).sum::<usize>();
    progress.reset(total_points * settings.repetitions);

    tracing::info!(
        parameters = sweeps.len(),
        points = total_points,
        repetitions = settings.repetitions,
        seed,
        "Starting sensitivity analysis"
    );

    let Some(baseline) =
        plan.simulate_point(baseline_correlation, seed, settings.repetitions, progress)?
    else {
        return Ok(None);
    };

    let mut records = Vec::with_capacity(sweeps.len());
    for sweep in sweeps {
        let mut probabilities = Vec::with_capacity(sweep.points.len());
        for (point_plan, rho) in &sweep.points {
            if progress.is_cancelled() {
                return Ok(None);
            }
            match point_plan.simulate_point(*rho, seed, settings.repetitions, progress)? {
                Some(result) => probabilities.push(result.success_probability),
                None => return Ok(None),
            }
        }

        let record = SensitivityRecord::new(
            sweep.parameter,
            baseline.success_probability,
            sweep.values,
            probabilities,
        );
        tracing::debug!(
            parameter = record.parameter.key(),
            score = record.score,
            band = record.band.label(),
            "Parameter sweep complete"
        );
        records.push(record);
    }

    Ok(Some(SensitivityResult {
        baseline_correlation,
        baseline_probability: baseline.success_probability,
        records,
    }))
}

/// Sweep one parameter.
///
/// Returns `Ok(None)` when cancelled through `progress`.
pub fn run_sensitivity(
    plan: &SimulationPlan,
    config: &SensitivityConfig,
    settings: &MonteCarloSettings,
    progress: &RunProgress,
) -> Result<Option<SensitivityRecord>> {
    settings.validate()?;
    let sweep = prepare_sweep(plan, config)?;
    let result = evaluate(
        plan,
        config.baseline_correlation,
        vec![sweep],
        settings,
        progress,
    )?;
    Ok(result.and_then(|mut r| r.records.pop()))
}

/// Sweep every parameter that applies to the plan's workflow, each over its
/// [`super::default_sweep_values`].
///
/// A parameter whose default list comes out empty (a keep-count that cannot
/// move) is skipped.
pub fn run_sensitivity_analysis(
    plan: &SimulationPlan,
    baseline_correlation: f64,
    settings: &MonteCarloSettings,
    progress: &RunProgress,
) -> Result<Option<SensitivityResult>> {
    let configs: Vec<SensitivityConfig> = SweepParameter::applicable(plan.workflow().steps())
        .map(|parameter| {
            SensitivityConfig::with_defaults(
                parameter,
                plan.workflow(),
                plan.population(),
                baseline_correlation,
            )
        })
        .filter(|config| !config.values.is_empty())
        .collect();
    run_sensitivity_batch(plan, baseline_correlation, &configs, settings, progress)
}

/// Sweep several parameters against a shared baseline
pub fn run_sensitivity_batch(
    plan: &SimulationPlan,
    baseline_correlation: f64,
    configs: &[SensitivityConfig],
    settings: &MonteCarloSettings,
    progress: &RunProgress,
) -> Result<Option<SensitivityResult>> {
    settings.validate()?;
    check_correlation("baseline_correlation", baseline_correlation)?;
    if configs.is_empty() {
        return Err(ParameterError::EmptyGrid {
            field: "sensitivity parameters",
        }
        .into());
    }

    let sweeps = configs
        .iter()
        .map(|config| {
            prepare_sweep(
                plan,
                &SensitivityConfig {
                    baseline_correlation,
                    ..config.clone()
                },
            )
        })
        .collect::<Result<Vec<_>>>()?;

    evaluate(plan, baseline_correlation, sweeps, settings, progress)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::SensitivityBand;
    use crate::distribution::FitMethod;
    use crate::error::SimError;
    use crate::model::{AssayDataset, WorkflowConfig};
    use rand::SeedableRng;
    use rand::rngs::StdRng;
    use rand_distr::{Distribution, LogNormal};

    fn plan(keeps: Vec<usize>) -> SimulationPlan {
        let mut rng = StdRng::seed_from_u64(42);
        let dist = LogNormal::new(0.0, 1.0).unwrap();
        let data = AssayDataset::new((0..400).map(|_| dist.sample(&mut rng)).collect());
        let workflow = WorkflowConfig::new(keeps, 5.0).unwrap();
        SimulationPlan::prepare(&data, workflow, FitMethod::Lognormal).unwrap()
    }

    #[test]
    fn test_correlation_sweep_is_high_sensitivity() {
        let plan = plan(vec![48, 6]);
        let config = SensitivityConfig::new(SweepParameter::Correlation, vec![0.0, 1.0], 0.5);
        let settings = MonteCarloSettings::new(200, Some(42));
        let record = run_sensitivity(&plan, &config, &settings, &RunProgress::default())
            .unwrap()
            .unwrap();

        // rho = 1 always succeeds; rho = 0 almost never does
        assert_eq!(record.probabilities[1], 1.0);
        assert!(record.probabilities[0] < 0.2);
        assert_eq!(record.band, SensitivityBand::High);
    }

    #[test]
    fn test_invalid_values_fail_before_simulation() {
        let plan = plan(vec![48, 6]);
        let progress = RunProgress::default();
        let settings = MonteCarloSettings::new(50, Some(1));

        let config = SensitivityConfig::new(SweepParameter::Step2Keep, vec![4.0, 100.0], 0.5);
        assert!(run_sensitivity(&plan, &config, &settings, &progress).is_err());
        assert_eq!(progress.completed(), 0);

        let empty = SensitivityConfig::new(SweepParameter::TopPercent, vec![], 0.5);
        assert!(matches!(
            run_sensitivity(&plan, &empty, &settings, &progress),
            Err(SimError::InvalidParameter(ParameterError::EmptyGrid { .. }))
        ));

        let bad_rho = SensitivityConfig::new(SweepParameter::TopPercent, vec![5.0], 1.5);
        assert!(run_sensitivity(&plan, &bad_rho, &settings, &progress).is_err());
    }

    #[test]
    fn test_full_analysis_covers_applicable_parameters() {
        let plan = plan(vec![48, 12, 4]);
        let progress = RunProgress::default();
        let settings = MonteCarloSettings::new(20, Some(7));
        let result = run_sensitivity_analysis(&plan, 0.6, &settings, &progress)
            .unwrap()
            .unwrap();

        assert_eq!(result.records.len(), 5);
        for record in &result.records {
            assert_eq!(record.values.len(), record.probabilities.len());
            assert_eq!(record.baseline_probability, result.baseline_probability);
        }
        assert_eq!(progress.completed(), progress.total());

        let two_step = plan.reconfigure(WorkflowConfig::two_step(48, 6, 5.0).unwrap()).unwrap();
        let result = run_sensitivity_analysis(&two_step, 0.6, &settings, &progress)
            .unwrap()
            .unwrap();
        assert!(result.get(SweepParameter::Step3Keep).is_none());
    }

    #[test]
    fn test_baseline_value_reproduces_baseline_probability() {
        let plan = plan(vec![48, 6]);
        let config = SensitivityConfig::new(SweepParameter::Step1Keep, vec![48.0], 0.4);
        let settings = MonteCarloSettings::new(100, Some(11));
        let record = run_sensitivity(&plan, &config, &settings, &RunProgress::default())
            .unwrap()
            .unwrap();
        assert_eq!(record.probabilities[0], record.baseline_probability);
        assert_eq!(record.score, 0.0);
    }

    #[test]
    fn test_cancelled_analysis_returns_none() {
        let plan = plan(vec![48, 6]);
        let progress = RunProgress::default();
        progress.cancel();
        let settings = MonteCarloSettings::new(10, Some(1));
        assert!(
            run_sensitivity_analysis(&plan, 0.5, &settings, &progress)
                .unwrap()
                .is_none()
        );
    }
}
