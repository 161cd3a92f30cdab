//! Command-line front end for the clone-selection workflow simulator
//!
//! Loads a CSV assay dataset and a YAML run configuration, drives
//! `clonesim_core`, prints a summary and exports CSV/JSON results.

// ============================================================================
// Command modules
// ============================================================================

pub mod report;
pub mod runner;

// ============================================================================
// Input / output modules
// ============================================================================

pub mod config;
pub mod data;
pub mod export;
pub mod logging;
pub mod util;

// ============================================================================
// Public re-exports for convenience
// ============================================================================

pub use config::RunConfig;
pub use logging::init_logging;
pub use runner::{Command, RunOptions, run};
