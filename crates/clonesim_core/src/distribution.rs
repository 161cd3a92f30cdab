//! One-dimensional marginal models fitted to an assay sample
//!
//! A fitted [`DistributionModel`] is used through its quantile function, which
//! lets it serve as the marginal of the Gaussian copula in [`crate::copula`].

use std::f64::consts::{PI, SQRT_2};

use rand::Rng;
use rand_distr::StandardNormal;
use serde::{Deserialize, Serialize};
use statrs::function::erf::{erfc, erfc_inv};
use statrs::statistics::Statistics;

use crate::error::FitError;

/// Number of points in the KDE quantile table
const KDE_TABLE_POINTS: usize = 2048;
/// Table spans this many bandwidths beyond the sample extremes
const KDE_TABLE_PADDING: f64 = 6.0;
/// Probabilities are clamped into `[U_EPS, 1 - U_EPS]` before inversion
const U_EPS: f64 = 1e-12;

/// Standard normal CDF
#[inline]
#[must_use]
pub fn normal_cdf(z: f64) -> f64 {
    0.5 * erfc(-z / SQRT_2)
}

/// Standard normal quantile (probit)
#[inline]
#[must_use]
pub fn normal_quantile(u: f64) -> f64 {
    let u = u.clamp(U_EPS, 1.0 - U_EPS);
    -SQRT_2 * erfc_inv(2.0 * u)
}

#[inline]
fn normal_pdf(z: f64) -> f64 {
    (-0.5 * z * z).exp() / (2.0 * PI).sqrt()
}

/// How to fit the marginal distribution
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(tag = "method", rename_all = "lowercase")]
pub enum FitMethod {
    /// Parametric log-normal (positive values only)
    #[default]
    Lognormal,
    /// Gaussian kernel density; Scott's rule when no bandwidth is given
    Kde {
        #[serde(default)]
        bandwidth: Option<f64>,
    },
}

impl FitMethod {
    #[must_use]
    pub fn label(&self) -> &'static str {
        match self {
            FitMethod::Lognormal => "lognormal",
            FitMethod::Kde { .. } => "kde",
        }
    }
}

/// Gaussian kernel density estimate with a precomputed CDF table for
/// quantile inversion
#[derive(Debug, Clone, Serialize)]
pub struct KernelDensity {
    bandwidth: f64,
    sample: Vec<f64>,
    #[serde(skip)]
    grid: Vec<f64>,
    #[serde(skip)]
    cdf: Vec<f64>,
}

impl KernelDensity {
    fn new(sample: Vec<f64>, bandwidth: f64) -> Self {
        let (lo, hi) = sample
            .iter()
            .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), &x| {
                (lo.min(x), hi.max(x))
            });
        let lo = lo - KDE_TABLE_PADDING * bandwidth;
        let hi = hi + KDE_TABLE_PADDING * bandwidth;
        let spacing = (hi - lo) / (KDE_TABLE_POINTS - 1) as f64;

        let grid: Vec<f64> = (0..KDE_TABLE_POINTS)
            .map(|i| lo + spacing * i as f64)
            .collect();

        let n = sample.len() as f64;
        let mut running = 0.0_f64;
        let cdf = grid
            .iter()
            .map(|&x| {
                let mass: f64 = sample.iter().map(|&s| normal_cdf((x - s) / bandwidth)).sum();
                // Summation error can make adjacent points dip; the table must be monotone
                running = running.max(mass / n);
                running
            })
            .collect();

        Self {
            bandwidth,
            sample,
            grid,
            cdf,
        }
    }

    #[must_use]
    pub fn bandwidth(&self) -> f64 {
        self.bandwidth
    }

    #[must_use]
    pub fn sample(&self) -> &[f64] {
        &self.sample
    }

    fn quantile(&self, u: f64) -> f64 {
        let idx = self.cdf.partition_point(|&c| c < u);
        if idx == 0 {
            return self.grid[0];
        }
        if idx == self.cdf.len() {
            return self.grid[self.grid.len() - 1];
        }
        let (c0, c1) = (self.cdf[idx - 1], self.cdf[idx]);
        let (x0, x1) = (self.grid[idx - 1], self.grid[idx]);
        if c1 > c0 {
            x0 + (x1 - x0) * (u - c0) / (c1 - c0)
        } else {
            x0
        }
    }

    fn density(&self, x: f64) -> f64 {
        let total: f64 = self
            .sample
            .iter()
            .map(|&s| normal_pdf((x - s) / self.bandwidth))
            .sum();
        total / (self.sample.len() as f64 * self.bandwidth)
    }
}

/// A fitted marginal distribution. Immutable after [`DistributionModel::fit`].
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type")]
pub enum DistributionModel {
    /// ln(X) ~ N(mu, sigma²)
    Lognormal { mu: f64, sigma: f64 },
    Kde(KernelDensity),
}

impl DistributionModel {
    /// Fit a model to `values`. Non-finite values are ignored; log-normal also
    /// ignores non-positive values.
    pub fn fit(values: &[f64], method: FitMethod) -> Result<Self, FitError> {
        match method {
            FitMethod::Lognormal => Self::fit_lognormal(values),
            FitMethod::Kde { bandwidth } => Self::fit_kde(values, bandwidth),
        }
    }

    /// Maximum-likelihood log-normal fit: `sigma` divides by n, not n − 1
    pub fn fit_lognormal(values: &[f64]) -> Result<Self, FitError> {
        let logs: Vec<f64> = values
            .iter()
            .filter(|v| v.is_finite() && **v > 0.0)
            .map(|v| v.ln())
            .collect();
        if logs.len() < 2 {
            return Err(FitError::InsufficientData {
                method: "lognormal",
                required: 2,
                found: logs.len(),
            });
        }

        let mu = logs.iter().mean();
        let sigma = logs.iter().population_std_dev();
        if !(sigma > 0.0) {
            return Err(FitError::Degenerate { method: "lognormal" });
        }
        Ok(DistributionModel::Lognormal { mu, sigma })
    }

    /// Gaussian KDE. Default bandwidth is Scott's rule, `s · n^(-1/5)`.
    pub fn fit_kde(values: &[f64], bandwidth: Option<f64>) -> Result<Self, FitError> {
        let sample: Vec<f64> = values.iter().copied().filter(|v| v.is_finite()).collect();
        if sample.len() < 2 {
            return Err(FitError::InsufficientData {
                method: "kde",
                required: 2,
                found: sample.len(),
            });
        }

        let bandwidth = match bandwidth {
            Some(h) if h.is_finite() && h > 0.0 => h,
            Some(h) => return Err(FitError::InvalidBandwidth(h)),
            None => {
                let h = sample.iter().std_dev() * (sample.len() as f64).powf(-0.2);
                if !(h > 0.0) {
                    return Err(FitError::Degenerate { method: "kde" });
                }
                h
            }
        };

        Ok(DistributionModel::Kde(KernelDensity::new(sample, bandwidth)))
    }

    /// Inverse CDF at `u` ∈ (0, 1)
    #[must_use]
    pub fn quantile(&self, u: f64) -> f64 {
        let u = u.clamp(U_EPS, 1.0 - U_EPS);
        match self {
            DistributionModel::Lognormal { mu, sigma } => (mu + sigma * normal_quantile(u)).exp(),
            DistributionModel::Kde(kde) => kde.quantile(u),
        }
    }

    /// Quantile at `Φ(z)` for a standard normal `z`.
    ///
    /// Closed form for log-normal, so the copula skips the CDF round-trip.
    #[inline]
    #[must_use]
    pub fn quantile_from_normal(&self, z: f64) -> f64 {
        match self {
            DistributionModel::Lognormal { mu, sigma } => (mu + sigma * z).exp(),
            DistributionModel::Kde(kde) => kde.quantile(normal_cdf(z).clamp(U_EPS, 1.0 - U_EPS)),
        }
    }

    /// Probability density at `x`
    #[must_use]
    pub fn density(&self, x: f64) -> f64 {
        match self {
            DistributionModel::Lognormal { mu, sigma } => {
                if x <= 0.0 {
                    return 0.0;
                }
                normal_pdf((x.ln() - mu) / sigma) / (x * sigma)
            }
            DistributionModel::Kde(kde) => kde.density(x),
        }
    }

    /// Expected value of the model
    #[must_use]
    pub fn mean(&self) -> f64 {
        match self {
            DistributionModel::Lognormal { mu, sigma } => (mu + 0.5 * sigma * sigma).exp(),
            DistributionModel::Kde(kde) => kde.sample.iter().mean(),
        }
    }

    /// One random draw. KDE draws resample the data and add kernel noise.
    pub fn draw<R: Rng + ?Sized>(&self, rng: &mut R) -> f64 {
        let z: f64 = rng.sample(StandardNormal);
        match self {
            DistributionModel::Lognormal { .. } => self.quantile_from_normal(z),
            DistributionModel::Kde(kde) => {
                let idx = rng.random_range(0..kde.sample.len());
                kde.sample[idx] + kde.bandwidth * z
            }
        }
    }

    /// `n` independent draws, e.g. for comparing synthetic against real data
    pub fn draw_n<R: Rng + ?Sized>(&self, rng: &mut R, n: usize) -> Vec<f64> {
        (0..n).map(|_| self.draw(rng)).collect()
    }

    #[must_use]
    pub fn label(&self) -> &'static str {
        match self {
            DistributionModel::Lognormal { .. } => "lognormal",
            DistributionModel::Kde(_) => "kde",
        }
    }
}
