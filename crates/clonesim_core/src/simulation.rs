//! Monte Carlo runner: repeated synthetic workflows at a given correlation
//!
//! Every trial draws a fresh population through the copula, runs the funnel
//! and scores the survivors against the terminal step's top X%. Trials are
//! independent and run in parallel when the `parallel` feature is enabled.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use rand::rngs::{SmallRng, StdRng};
use rand::{Rng, SeedableRng};
#[cfg(feature = "parallel")]
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use crate::copula::CorrelatedSampler;
use crate::distribution::{DistributionModel, FitMethod};
use crate::error::{ParameterError, Result};
use crate::funnel::{SelectionFunnel, top_mask};
use crate::model::{
    AssayDataset, CorrelationSpec, CorrelationSweep, CriteriaFilter, SimulationResult,
    TrialOutcome, WorkflowConfig,
};

/// Repetition count and seed for one Monte Carlo run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MonteCarloSettings {
    pub repetitions: usize,
    /// `None` draws a seed from the OS when the run starts
    pub seed: Option<u64>,
}

impl Default for MonteCarloSettings {
    fn default() -> Self {
        Self {
            repetitions: 1000,
            seed: Some(42),
        }
    }
}

impl MonteCarloSettings {
    #[must_use]
    pub fn new(repetitions: usize, seed: Option<u64>) -> Self {
        Self { repetitions, seed }
    }

    pub fn validate(&self) -> std::result::Result<(), ParameterError> {
        if self.repetitions == 0 {
            return Err(ParameterError::ZeroCount {
                field: "repetitions",
            });
        }
        Ok(())
    }

    /// The seed to run with: the configured one, or a fresh one from the OS
    #[must_use]
    pub fn resolve_seed(&self) -> u64 {
        self.seed.unwrap_or_else(|| rand::rng().random())
    }
}

/// Shared progress counter and cancellation flag for long runs
#[derive(Debug, Clone)]
pub struct RunProgress {
    /// Completed trials
    completed: Arc<AtomicUsize>,
    /// Trials the current run will perform
    total: Arc<AtomicUsize>,
    cancelled: Arc<AtomicBool>,
}

impl RunProgress {
    #[must_use]
    pub fn new(total: usize) -> Self {
        Self {
            completed: Arc::new(AtomicUsize::new(0)),
            total: Arc::new(AtomicUsize::new(total)),
            cancelled: Arc::new(AtomicBool::new(false)),
        }
    }

    #[must_use]
    pub fn completed(&self) -> usize {
        self.completed.load(Ordering::Relaxed)
    }

    #[must_use]
    pub fn total(&self) -> usize {
        self.total.load(Ordering::Relaxed)
    }

    /// Completed fraction in [0, 1]
    #[must_use]
    pub fn fraction(&self) -> f64 {
        let total = self.total();
        if total == 0 {
            return 0.0;
        }
        (self.completed() as f64 / total as f64).min(1.0)
    }

    pub fn increment(&self) {
        self.completed.fetch_add(1, Ordering::Relaxed);
    }

    /// Zero the counter and set a new total
    pub fn reset(&self, total: usize) {
        self.completed.store(0, Ordering::Relaxed);
        self.total.store(total, Ordering::Relaxed);
    }

    /// Request cancellation; running trials finish, no new ones start
    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::Relaxed);
    }

    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::Relaxed)
    }
}

impl Default for RunProgress {
    fn default() -> Self {
        Self::new(0)
    }
}

/// Everything a run needs, validated and fitted up front
#[derive(Debug, Clone)]
pub struct SimulationPlan {
    workflow: WorkflowConfig,
    marginals: Vec<DistributionModel>,
    criteria: Option<CriteriaFilter>,
    funnel: SelectionFunnel,
    population: usize,
}

impl SimulationPlan {
    /// Fit one shared marginal to the dataset's Results and validate the
    /// workflow against it
    pub fn prepare(
        dataset: &AssayDataset,
        workflow: WorkflowConfig,
        method: FitMethod,
    ) -> Result<Self> {
        workflow.check_population(dataset.len())?;
        let criteria = resolve_criteria(dataset, &workflow)?;
        let marginal = DistributionModel::fit(dataset.results(), method)?;

        tracing::debug!(
            population = dataset.len(),
            steps = workflow.steps(),
            model = marginal.label(),
            "Prepared simulation plan"
        );

        Ok(Self::assemble(
            workflow,
            vec![marginal],
            criteria,
            dataset.len(),
        ))
    }

    /// Use pre-fitted marginals: one shared, or one per workflow step
    pub fn with_marginals(
        dataset: &AssayDataset,
        workflow: WorkflowConfig,
        marginals: Vec<DistributionModel>,
    ) -> Result<Self> {
        workflow.check_population(dataset.len())?;
        check_marginals(&marginals, workflow.steps())?;
        let criteria = resolve_criteria(dataset, &workflow)?;
        Ok(Self::assemble(workflow, marginals, criteria, dataset.len()))
    }

    fn assemble(
        workflow: WorkflowConfig,
        marginals: Vec<DistributionModel>,
        criteria: Option<CriteriaFilter>,
        population: usize,
    ) -> Self {
        let funnel = SelectionFunnel::from_workflow(&workflow, criteria.clone());
        Self {
            workflow,
            marginals,
            criteria,
            funnel,
            population,
        }
    }

    /// Same dataset and marginals under a different workflow. The resolved
    /// criteria filter carries over.
    pub fn reconfigure(&self, workflow: WorkflowConfig) -> Result<Self> {
        workflow.check_population(self.population)?;
        check_marginals(&self.marginals, workflow.steps())?;
        Ok(Self::assemble(
            workflow,
            self.marginals.clone(),
            self.criteria.clone(),
            self.population,
        ))
    }

    #[must_use]
    pub fn workflow(&self) -> &WorkflowConfig {
        &self.workflow
    }

    #[must_use]
    pub fn marginals(&self) -> &[DistributionModel] {
        &self.marginals
    }

    /// Clones per synthetic trial (the dataset size)
    #[must_use]
    pub fn population(&self) -> usize {
        self.population
    }

    fn run_trial(
        &self,
        sampler: &CorrelatedSampler<'_>,
        top_count: usize,
        seed: u64,
    ) -> TrialOutcome {
        let mut rng = SmallRng::seed_from_u64(seed);
        let values = sampler.sample_population(&mut rng, self.population);
        let outcome = self.funnel.apply(&values);

        let top = top_mask(values.terminal(), top_count);
        let top_survivors = outcome.survivors.iter().filter(|&&c| top[c]).count();

        TrialOutcome {
            top_survivors,
            success: !outcome.survivors.is_empty() && top_survivors == outcome.survivors.len(),
        }
    }

    /// Run `repetitions` trials at `rho` from `seed`; `None` if cancelled
    pub(crate) fn simulate_point(
        &self,
        rho: f64,
        seed: u64,
        repetitions: usize,
        progress: &RunProgress,
    ) -> Result<Option<SimulationResult>> {
        let sampler = CorrelatedSampler::new(&self.marginals, self.workflow.steps(), rho)?;
        let top_count = self.workflow.top_count(self.population);

        let mut master = StdRng::seed_from_u64(seed);
        let seeds: Vec<u64> = (0..repetitions).map(|_| master.random()).collect();

        let trial = |&trial_seed: &u64| {
            if progress.is_cancelled() {
                return None;
            }
            let outcome = self.run_trial(&sampler, top_count, trial_seed);
            progress.increment();
            Some(outcome)
        };

        #[cfg(feature = "parallel")]
        let outcomes: Option<Vec<TrialOutcome>> = seeds.par_iter().map(trial).collect();
        #[cfg(not(feature = "parallel"))]
        let outcomes: Option<Vec<TrialOutcome>> = seeds.iter().map(trial).collect();

        let Some(outcomes) = outcomes else {
            tracing::debug!(rho, "Correlation point cancelled");
            return Ok(None);
        };

        let result =
            SimulationResult::from_trials(rho, seed, self.workflow.final_keep(), &outcomes);
        tracing::debug!(
            rho,
            probability = result.success_probability,
            "Correlation point complete"
        );
        Ok(Some(result))
    }
}

fn resolve_criteria(
    dataset: &AssayDataset,
    workflow: &WorkflowConfig,
) -> std::result::Result<Option<CriteriaFilter>, ParameterError> {
    workflow
        .criteria()
        .filter(|spec| !spec.is_empty())
        .map(|spec| spec.resolve(dataset))
        .transpose()
}

fn check_marginals(
    marginals: &[DistributionModel],
    steps: usize,
) -> std::result::Result<(), ParameterError> {
    if marginals.len() != 1 && marginals.len() != steps {
        return Err(ParameterError::MarginalCount {
            steps,
            found: marginals.len(),
        });
    }
    Ok(())
}

/// Success probability of the plan's workflow at one correlation.
///
/// Returns `Ok(None)` when cancelled through `progress`.
pub fn run_correlation(
    plan: &SimulationPlan,
    rho: f64,
    settings: &MonteCarloSettings,
    progress: &RunProgress,
) -> Result<Option<SimulationResult>> {
    settings.validate()?;
    let seed = settings.resolve_seed();
    progress.reset(settings.repetitions);
    plan.simulate_point(rho, seed, settings.repetitions, progress)
}

/// Success probability at every point of a correlation grid.
///
/// All points share one seed, so the curve compares like with like.
pub fn run_correlation_sweep(
    plan: &SimulationPlan,
    spec: &CorrelationSpec,
    settings: &MonteCarloSettings,
    progress: &RunProgress,
) -> Result<Option<CorrelationSweep>> {
    settings.validate()?;
    let seed = settings.resolve_seed();
    let grid = spec.values();
    progress.reset(grid.len() * settings.repetitions);

    tracing::info!(
        points = grid.len(),
        repetitions = settings.repetitions,
        seed,
        "Starting correlation sweep"
    );

    sweep_with_seed(plan, &grid, seed, settings.repetitions, progress)
}

pub(crate) fn sweep_with_seed(
    plan: &SimulationPlan,
    grid: &[f64],
    seed: u64,
    repetitions: usize,
    progress: &RunProgress,
) -> Result<Option<CorrelationSweep>> {
    let mut results = Vec::with_capacity(grid.len());
    for &rho in grid {
        if progress.is_cancelled() {
            return Ok(None);
        }
        match plan.simulate_point(rho, seed, repetitions, progress)? {
            Some(result) => results.push(result),
            None => return Ok(None),
        }
    }
    Ok(Some(CorrelationSweep { results }))
}
