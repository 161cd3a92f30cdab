mod dataset;
mod results;
mod workflow;

pub use dataset::{AssayDataset, CriteriaColumn};
pub use results::{CorrelationSweep, SimulationResult, TrialOutcome};
pub use workflow::{
    Comparison, CorrelationSpec, CriteriaFilter, CriteriaFilterSpec, CriteriaRule,
    EQUALITY_TOLERANCE, KEEP_FIELDS, WorkflowConfig,
};
