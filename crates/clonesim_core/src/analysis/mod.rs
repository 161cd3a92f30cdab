//! One-at-a-time sensitivity analysis of workflow parameters.
//!
//! Each swept parameter is varied over a list of values while everything else
//! stays at its baseline; the spread of the resulting success probabilities
//! measures how much the workflow outcome depends on that parameter.
//! [`compare_workflows`] contrasts the two-step and three-step forms of a
//! workflow at one correlation.
//!
//! ```ignore
//! use clonesim_core::analysis::{SensitivityConfig, SweepParameter, run_sensitivity};
//!
//! let config = SensitivityConfig::new(SweepParameter::Step2Keep, vec![4.0, 8.0, 12.0], 0.5);
//! let record = run_sensitivity(&plan, &config, &settings, &progress)?;
//!
//! // Or sweep every applicable parameter with default values
//! let result = run_sensitivity_analysis(&plan, 0.5, &settings, &progress)?;
//! for record in result.ranked() {
//!     println!("{}: {:.1} ({})", record.parameter.label(), record.score, record.band);
//! }
//! ```

mod comparison;
mod config;
mod evaluator;
mod metrics;

pub use comparison::*;
pub use config::*;
pub use evaluator::*;
pub use metrics::*;
