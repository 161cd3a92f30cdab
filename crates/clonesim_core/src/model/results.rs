//! Simulation results
//!
//! Contains the output types returned by the Monte Carlo runner. Results are
//! immutable once returned and carry everything a caller needs to report or
//! replay a run.

use serde::{Deserialize, Serialize};

/// Aggregate of all trials for one workflow configuration at one correlation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SimulationResult {
    /// Correlation between successive steps' Gaussian drivers
    pub correlation: f64,
    /// Number of Monte Carlo trials
    pub trials: usize,
    /// Trials in which every surviving clone was in the top X%
    pub successes: usize,
    /// `successes / trials`
    pub success_probability: f64,
    /// Index = number of surviving clones in the top X%, value = trial count
    pub success_count_histogram: Vec<usize>,
    /// Seed the run used; replaying with it reproduces this result exactly
    pub seed: u64,
}

impl SimulationResult {
    /// Build from per-trial top-X% survivor counts and success flags
    #[must_use]
    pub fn from_trials(
        correlation: f64,
        seed: u64,
        final_keep: usize,
        trials: &[TrialOutcome],
    ) -> Self {
        let mut histogram = vec![0; final_keep + 1];
        let mut successes = 0;
        for trial in trials {
            histogram[trial.top_survivors.min(final_keep)] += 1;
            if trial.success {
                successes += 1;
            }
        }
        let success_probability = if trials.is_empty() {
            0.0
        } else {
            successes as f64 / trials.len() as f64
        };

        Self {
            correlation,
            trials: trials.len(),
            successes,
            success_probability,
            success_count_histogram: histogram,
            seed,
        }
    }

    /// Average number of top-X% clones among the final survivors
    #[must_use]
    pub fn mean_success_count(&self) -> f64 {
        if self.trials == 0 {
            return 0.0;
        }
        let total: usize = self
            .success_count_histogram
            .iter()
            .enumerate()
            .map(|(count, trials)| count * trials)
            .sum();
        total as f64 / self.trials as f64
    }

    /// Fraction of trials with at least `count` top-X% survivors
    #[must_use]
    pub fn probability_at_least(&self, count: usize) -> f64 {
        if self.trials == 0 {
            return 0.0;
        }
        let hits: usize = self.success_count_histogram.iter().skip(count).sum();
        hits as f64 / self.trials as f64
    }
}

/// Result of a single Monte Carlo trial
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TrialOutcome {
    /// Surviving clones whose ground-truth rank is within the top X%
    pub top_survivors: usize,
    /// Non-empty survivor set, all within the top X%
    pub success: bool,
}

/// Results for every point of a correlation grid, in ascending correlation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CorrelationSweep {
    pub results: Vec<SimulationResult>,
}

impl CorrelationSweep {
    #[must_use]
    pub fn correlations(&self) -> Vec<f64> {
        self.results.iter().map(|r| r.correlation).collect()
    }

    #[must_use]
    pub fn probabilities(&self) -> Vec<f64> {
        self.results.iter().map(|r| r.success_probability).collect()
    }

    /// Highest success probability; the lowest correlation wins ties
    #[must_use]
    pub fn best(&self) -> Option<&SimulationResult> {
        self.results.iter().fold(None, |best, r| match best {
            Some(b) if b.success_probability >= r.success_probability => Some(b),
            _ => Some(r),
        })
    }

    #[must_use]
    pub fn min_probability(&self) -> f64 {
        self.results
            .iter()
            .map(|r| r.success_probability)
            .fold(f64::INFINITY, f64::min)
    }

    #[must_use]
    pub fn max_probability(&self) -> f64 {
        self.results
            .iter()
            .map(|r| r.success_probability)
            .fold(f64::NEG_INFINITY, f64::max)
    }

    #[must_use]
    pub fn mean_probability(&self) -> f64 {
        if self.results.is_empty() {
            return 0.0;
        }
        let total: f64 = self.results.iter().map(|r| r.success_probability).sum();
        total / self.results.len() as f64
    }

    /// Smallest correlation whose success probability reaches `target`
    #[must_use]
    pub fn correlation_for_target(&self, target: f64) -> Option<f64> {
        self.results
            .iter()
            .find(|r| r.success_probability >= target)
            .map(|r| r.correlation)
    }
}
