//! Gaussian-copula generator for correlated per-step assay values
//!
//! Each clone gets a chain of standard normals
//! `z₁ ~ N(0,1)`, `zᵢ = ρ·zᵢ₋₁ + √(1−ρ²)·εᵢ`, mapped through the step's
//! marginal quantile. Every step's marginal is preserved exactly while the
//! rank correlation between consecutive steps is controlled by ρ.

use rand::Rng;
use rand_distr::StandardNormal;

use crate::distribution::DistributionModel;
use crate::error::ParameterError;

/// Per-step values for a synthetic population, stored step-major
#[derive(Debug, Clone, PartialEq)]
pub struct StepValues {
    steps: Vec<Vec<f64>>,
}

impl StepValues {
    /// Build from one value vector per step; all steps must have equal length
    pub fn from_steps(steps: Vec<Vec<f64>>) -> Result<Self, ParameterError> {
        if let Some(first) = steps.first() {
            let expected = first.len();
            for (i, step) in steps.iter().enumerate().skip(1) {
                if step.len() != expected {
                    return Err(ParameterError::ColumnLength {
                        column: format!("step {}", i + 1),
                        expected,
                        found: step.len(),
                    });
                }
            }
        }
        Ok(Self { steps })
    }

    /// Values of step `s` (0-based) for every clone
    #[must_use]
    pub fn step(&self, s: usize) -> &[f64] {
        &self.steps[s]
    }

    #[must_use]
    pub fn steps(&self) -> usize {
        self.steps.len()
    }

    /// Number of clones
    #[must_use]
    pub fn population(&self) -> usize {
        self.steps.first().map_or(0, Vec::len)
    }

    /// Values of the final step, used as ground truth
    #[must_use]
    pub fn terminal(&self) -> &[f64] {
        self.steps.last().map_or(&[], Vec::as_slice)
    }
}

#[derive(Debug, Clone)]
pub struct CorrelatedSampler<'a> {
    marginals: &'a [DistributionModel],
    steps: usize,
    rho: f64,
    innovation: f64,
}

impl<'a> CorrelatedSampler<'a> {
    /// `marginals` holds either one model shared by every step or one per step
    pub fn new(
        marginals: &'a [DistributionModel],
        steps: usize,
        rho: f64,
    ) -> Result<Self, ParameterError> {
        if steps == 0 {
            return Err(ParameterError::StepCount(steps));
        }
        if marginals.len() != 1 && marginals.len() != steps {
            return Err(ParameterError::MarginalCount {
                steps,
                found: marginals.len(),
            });
        }
        if !rho.is_finite() {
            return Err(ParameterError::NotFinite {
                field: "correlation",
            });
        }
        if !(0.0..=1.0).contains(&rho) {
            return Err(ParameterError::OutOfRange {
                field: "correlation",
                value: rho,
                min: 0.0,
                max: 1.0,
            });
        }

        Ok(Self {
            marginals,
            steps,
            rho,
            innovation: (1.0 - rho * rho).max(0.0).sqrt(),
        })
    }

    #[must_use]
    pub fn rho(&self) -> f64 {
        self.rho
    }

    #[inline]
    fn marginal(&self, step: usize) -> &DistributionModel {
        if self.marginals.len() == 1 {
            &self.marginals[0]
        } else {
            &self.marginals[step]
        }
    }

    /// Fill `out` with one clone's step values.
    ///
    /// One normal is drawn per step regardless of ρ, so a given RNG state
    /// produces the same underlying shocks at every correlation.
    #[inline]
    fn fill_clone<R: Rng + ?Sized>(&self, rng: &mut R, out: &mut [f64]) {
        let mut z: f64 = rng.sample(StandardNormal);
        out[0] = self.marginal(0).quantile_from_normal(z);
        for (step, slot) in out.iter_mut().enumerate().skip(1) {
            let eps: f64 = rng.sample(StandardNormal);
            z = self.rho * z + self.innovation * eps;
            *slot = self.marginal(step).quantile_from_normal(z);
        }
    }

    /// One clone's values, one per step
    pub fn sample_clone<R: Rng + ?Sized>(&self, rng: &mut R) -> Vec<f64> {
        let mut values = vec![0.0; self.steps];
        self.fill_clone(rng, &mut values);
        values
    }

    /// `n` clones, drawn in clone order
    pub fn sample_population<R: Rng + ?Sized>(&self, rng: &mut R, n: usize) -> StepValues {
        let mut steps = vec![Vec::with_capacity(n); self.steps];
        let mut buf = vec![0.0; self.steps];
        for _ in 0..n {
            self.fill_clone(rng, &mut buf);
            for (column, &value) in steps.iter_mut().zip(&buf) {
                column.push(value);
            }
        }
        StepValues { steps }
    }
}
