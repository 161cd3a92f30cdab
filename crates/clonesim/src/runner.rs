//! Command execution: load inputs, run the engine, assemble a [`RunReport`]

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread;
use std::time::{Duration, Instant};

use clonesim_core::advisor::{
    assess_sensitivity, assess_sweep, optimization_plan, recommend_parameters, workflow_warnings,
};
use clonesim_core::analysis::{
    DEFAULT_COMPARISON_CORRELATION, compare_workflows, run_sensitivity_analysis,
    run_sensitivity_batch,
};
use clonesim_core::efficiency::EfficiencyAnalyzer;
use clonesim_core::model::AssayDataset;
use clonesim_core::quality::{FitDiagnostics, QualityReport, SYNTHETIC_DRAWS};
use clonesim_core::simulation::{RunProgress, SimulationPlan, run_correlation_sweep};
use color_eyre::eyre::{WrapErr, eyre};

use crate::config::RunConfig;
use crate::data::load_dataset;
use crate::export::{DatasetSummary, RunReport};
use crate::util::atomic_write;

/// Top-X% used when deriving a configuration without a config file
pub const DEFAULT_TOP_PERCENT: f64 = 5.0;
/// Written by `recommend` so the suggestion can be edited and reused
pub const RECOMMENDED_CONFIG_FILE: &str = "recommended_config.yaml";

const POLL_INTERVAL: Duration = Duration::from_millis(250);
const LOG_INTERVAL: Duration = Duration::from_secs(5);

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Command {
    Simulate,
    Sensitivity { baseline_correlation: Option<f64> },
    Compare {
        correlation: Option<f64>,
        step3_keep: Option<usize>,
    },
    Recommend,
}

impl Command {
    pub fn name(&self) -> &'static str {
        match self {
            Command::Simulate => "simulate",
            Command::Sensitivity { .. } => "sensitivity",
            Command::Compare { .. } => "compare",
            Command::Recommend => "recommend",
        }
    }
}

#[derive(Debug, Clone)]
pub struct RunOptions {
    pub data: PathBuf,
    pub config: Option<PathBuf>,
    pub output_dir: PathBuf,
    pub top_percent: f64,
    pub repetitions: Option<usize>,
    pub seed: Option<u64>,
}

/// Run `work` while a second thread logs `progress` until it returns
fn with_progress<T>(label: &str, progress: &RunProgress, work: impl FnOnce() -> T) -> T {
    let done = AtomicBool::new(false);
    let started = Instant::now();

    thread::scope(|scope| {
        scope.spawn(|| {
            let mut last_log = Instant::now();
            while !done.load(Ordering::Relaxed) {
                thread::sleep(POLL_INTERVAL);
                if last_log.elapsed() >= LOG_INTERVAL {
                    last_log = Instant::now();
                    tracing::info!(
                        task = label,
                        completed = progress.completed(),
                        total = progress.total(),
                        percent = progress.fraction() * 100.0,
                        "Progress"
                    );
                }
            }
        });

        let output = work();
        done.store(true, Ordering::Relaxed);
        tracing::info!(
            task = label,
            trials = progress.completed(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "Finished"
        );
        output
    })
}

fn dataset_summary(path: &Path, dataset: &AssayDataset) -> DatasetSummary {
    DatasetSummary {
        source: path.display().to_string(),
        clones: dataset.len(),
        excluded_rows: dataset.excluded_rows(),
        criteria_columns: dataset
            .criteria_columns()
            .iter()
            .map(|c| c.name.clone())
            .collect(),
    }
}

/// Configuration file when given, otherwise the advisor's recommendation
fn resolve_config(options: &RunOptions, dataset: &AssayDataset) -> color_eyre::Result<RunConfig> {
    let config = match &options.config {
        Some(path) => RunConfig::load(path)?,
        None => {
            let recommendation = recommend_parameters(dataset, options.top_percent)
                .wrap_err("cannot derive a configuration from this dataset")?;
            tracing::info!(
                keeps = ?recommendation.workflow.keeps(),
                method = recommendation.fit_method.label(),
                "No config file given, using recommended parameters"
            );
            RunConfig::from_recommendation(&recommendation, Some(42))
        }
    };
    Ok(config.with_overrides(options.repetitions, options.seed))
}

/// Execute `command` and return its report. Nothing is written yet except
/// the recommended configuration for `recommend`.
pub fn run(options: &RunOptions, command: Command) -> color_eyre::Result<RunReport> {
    let dataset = load_dataset(&options.data)?;
    let quality = QualityReport::analyze(&dataset);
    let mut report = RunReport::new(
        command.name(),
        dataset_summary(&options.data, &dataset),
        quality,
    );

    match command {
        Command::Recommend => recommend(options, &dataset, &mut report)?,
        Command::Simulate => {
            let config = resolve_config(options, &dataset)?;
            simulate(&dataset, &config, &mut report)?;
            report.config = Some(config);
        }
        Command::Sensitivity {
            baseline_correlation,
        } => {
            let mut config = resolve_config(options, &dataset)?;
            if let Some(rho) = baseline_correlation {
                config.sensitivity.baseline_correlation = rho;
            }
            sensitivity(&dataset, &config, &mut report)?;
            report.config = Some(config);
        }
        Command::Compare {
            correlation,
            step3_keep,
        } => {
            let config = resolve_config(options, &dataset)?;
            let rho = correlation.unwrap_or(DEFAULT_COMPARISON_CORRELATION);
            compare(&dataset, &config, rho, step3_keep, &mut report)?;
            report.config = Some(config);
        }
    }
    Ok(report)
}

fn recommend(
    options: &RunOptions,
    dataset: &AssayDataset,
    report: &mut RunReport,
) -> color_eyre::Result<()> {
    let recommendation = recommend_parameters(dataset, options.top_percent)?;
    let config = RunConfig::from_recommendation(&recommendation, Some(42))
        .with_overrides(options.repetitions, options.seed);
    report.warnings = workflow_warnings(&config.workflow);

    let path = options.output_dir.join(RECOMMENDED_CONFIG_FILE);
    let yaml = config
        .to_yaml()
        .map_err(|e| eyre!("failed to serialize recommended config: {e}"))?;
    atomic_write(&path, &yaml).wrap_err_with(|| format!("writing {}", path.display()))?;
    tracing::info!(path = %path.display(), "Recommended configuration written");

    report.recommendation = Some(recommendation);
    report.config = Some(config);
    Ok(())
}

fn simulate(
    dataset: &AssayDataset,
    config: &RunConfig,
    report: &mut RunReport,
) -> color_eyre::Result<()> {
    let plan = SimulationPlan::prepare(dataset, config.workflow.clone(), config.distribution)?;
    let progress = RunProgress::default();

    let sweep = with_progress("correlation sweep", &progress, || {
        run_correlation_sweep(&plan, &config.correlation, &config.monte_carlo, &progress)
    })?
    .ok_or_else(|| eyre!("correlation sweep was cancelled"))?;

    // Synthetic draws share the sweep's seed so a seeded run stays reproducible
    let fit = plan
        .marginals()
        .first()
        .zip(sweep.results.first().map(|r| r.seed))
        .and_then(|(model, seed)| {
            FitDiagnostics::compare(model, dataset.results(), SYNTHETIC_DRAWS, seed)
        });
    if let Some(fit) = &fit {
        tracing::info!(
            model = %fit.model,
            ks = fit.ks_statistic,
            "Fit diagnostics computed"
        );
    }

    let efficiency = EfficiencyAnalyzer::analyze(&config.workflow, dataset.len())?;
    let assessment = assess_sweep(&sweep);
    if let Some(assessment) = &assessment {
        report.optimization = Some(optimization_plan(assessment.best_probability, None));
    }

    report.warnings = workflow_warnings(&config.workflow);
    report.sweep = Some(sweep);
    report.fit = fit;
    report.efficiency = Some(efficiency);
    report.assessment = assessment;
    Ok(())
}

fn sensitivity(
    dataset: &AssayDataset,
    config: &RunConfig,
    report: &mut RunReport,
) -> color_eyre::Result<()> {
    let plan = SimulationPlan::prepare(dataset, config.workflow.clone(), config.distribution)?;
    let progress = RunProgress::default();
    let baseline = config.sensitivity.baseline_correlation;

    let result = with_progress("sensitivity analysis", &progress, || {
        match config.sensitivity.configs(&config.workflow, dataset.len()) {
            Some(configs) => {
                run_sensitivity_batch(&plan, baseline, &configs, &config.monte_carlo, &progress)
            }
            None => run_sensitivity_analysis(&plan, baseline, &config.monte_carlo, &progress),
        }
    })?
    .ok_or_else(|| eyre!("sensitivity analysis was cancelled"))?;

    report.sensitivity_assessment = Some(assess_sensitivity(&result));
    report.optimization = Some(optimization_plan(result.baseline_probability, Some(&result)));
    report.warnings = workflow_warnings(&config.workflow);
    report.sensitivity = Some(result);
    Ok(())
}

fn compare(
    dataset: &AssayDataset,
    config: &RunConfig,
    rho: f64,
    step3_keep: Option<usize>,
    report: &mut RunReport,
) -> color_eyre::Result<()> {
    let plan = SimulationPlan::prepare(dataset, config.workflow.clone(), config.distribution)?;
    let progress = RunProgress::default();

    let comparison = with_progress("workflow comparison", &progress, || {
        compare_workflows(&plan, step3_keep, rho, &config.monte_carlo, &progress)
    })?
    .ok_or_else(|| eyre!("workflow comparison was cancelled"))?;

    report.warnings = workflow_warnings(&comparison.three_step.workflow);
    report.comparison = Some(comparison);
    Ok(())
}
