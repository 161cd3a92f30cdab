use thiserror::Error;

/// Errors raised when a distribution cannot be fitted to the observed sample
#[derive(Debug, Clone, PartialEq, Error)]
pub enum FitError {
    #[error("{method} fit needs at least {required} usable values, found {found}")]
    InsufficientData {
        method: &'static str,
        required: usize,
        found: usize,
    },
    /// Every usable value is identical, so there is no spread to model
    #[error("{method} fit is degenerate: sample has zero spread")]
    Degenerate { method: &'static str },
    #[error("kde bandwidth must be positive and finite, got {0}")]
    InvalidBandwidth(f64),
}

/// Out-of-range or logically inconsistent configuration.
///
/// Every variant names the field that failed so callers can point the user
/// at the offending input.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ParameterError {
    #[error("{field} = {value} is outside [{min}, {max}]")]
    OutOfRange {
        field: &'static str,
        value: f64,
        min: f64,
        max: f64,
    },
    #[error("{field} must be at least 1")]
    ZeroCount { field: &'static str },
    #[error("{field} ({value}) cannot exceed {limit_field} ({limit})")]
    Exceeds {
        field: &'static str,
        value: usize,
        limit_field: &'static str,
        limit: usize,
    },
    #[error("workflow must have 2 or 3 steps, got {0}")]
    StepCount(usize),
    #[error("expected 1 or {steps} marginal distributions, got {found}")]
    MarginalCount { steps: usize, found: usize },
    #[error("{field} must not be empty")]
    EmptyGrid { field: &'static str },
    #[error("{field} must be finite")]
    NotFinite { field: &'static str },
    #[error("{field} must be a whole number, got {value}")]
    NotWhole { field: &'static str, value: f64 },
    #[error("column '{column}' has {found} rows, expected {expected}")]
    ColumnLength {
        column: String,
        expected: usize,
        found: usize,
    },
    #[error("criteria column '{0}' not found in dataset")]
    UnknownCriteriaColumn(String),
    #[error("{field} does not apply to a {steps}-step workflow")]
    NotApplicable { field: &'static str, steps: usize },
}

/// Top-level engine error
#[derive(Debug, Clone, PartialEq, Error)]
pub enum SimError {
    #[error("distribution fit failed: {0}")]
    Fit(#[from] FitError),
    #[error("invalid parameter: {0}")]
    InvalidParameter(#[from] ParameterError),
}

pub type Result<T> = std::result::Result<T, SimError>;
