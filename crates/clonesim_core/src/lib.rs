//! Clone-selection workflow simulation library
//!
//! This crate estimates, by Monte Carlo simulation, how likely a multi-step
//! clone-screening workflow is to end up with only top performers. It covers:
//! - Fitting a marginal distribution (log-normal or KDE) to an assay sample
//! - Gaussian-copula generation of correlated per-step assay values
//! - The step-wise top-k selection funnel with optional quality criteria
//! - Correlation sweeps and one-at-a-time sensitivity analysis
//! - Funnel efficiency and rule-based assessment of the results
//!
//! # Example
//!
//! ```ignore
//! use clonesim_core::distribution::FitMethod;
//! use clonesim_core::model::{AssayDataset, CorrelationSpec, WorkflowConfig};
//! use clonesim_core::simulation::{
//!     MonteCarloSettings, RunProgress, SimulationPlan, run_correlation_sweep,
//! };
//!
//! let dataset = AssayDataset::new(results);
//! let workflow = WorkflowConfig::two_step(96, 12, 5.0)?;
//! let plan = SimulationPlan::prepare(&dataset, workflow, FitMethod::Lognormal)?;
//!
//! let settings = MonteCarloSettings::new(5000, Some(42));
//! let sweep = run_correlation_sweep(&plan, &CorrelationSpec::default(), &settings, &RunProgress::default())?;
//! ```

#![warn(clippy::all)]

// ============================================================================
// Core modules
// ============================================================================

pub mod analysis;
pub mod copula;
pub mod distribution;
pub mod efficiency;
pub mod error;
pub mod funnel;
pub mod simulation;

// ============================================================================
// Interpretation modules
// ============================================================================

pub mod advisor;
pub mod quality;

// ============================================================================
// Type definition modules
// ============================================================================

pub mod model;

// ============================================================================
// Test modules
// ============================================================================

#[cfg(test)]
mod tests;

// ============================================================================
// Public re-exports for convenience
// ============================================================================

pub use distribution::{DistributionModel, FitMethod};
pub use error::{FitError, ParameterError, SimError};
pub use simulation::{MonteCarloSettings, RunProgress, SimulationPlan};
