//! Scenario tests for the clonesim simulation engine
//!
//! Tests are organized by topic:
//! - `end_to_end` - Full correlation sweeps on a log-normal population
//! - `properties` - Determinism and monotonicity of success probability
//! - `criteria` - Quality filtering at the final step


use rand::SeedableRng;
use rand::rngs::StdRng;
use rand_distr::{Distribution, LogNormal};

use crate::model::AssayDataset;

/// `n` draws from log-normal(mu, sigma) with a fixed seed
pub(crate) fn lognormal_dataset(n: usize, mu: f64, sigma: f64, seed: u64) -> AssayDataset {
    let mut rng = StdRng::seed_from_u64(seed);
    let dist = LogNormal::new(mu, sigma).unwrap();
    AssayDataset::new((0..n).map(|_| dist.sample(&mut rng)).collect())
}
