//! Workflow, criteria and correlation-grid configuration
//!
//! All types here validate on construction (including deserialization), so a
//! value that exists is always internally consistent. Checks that need the
//! dataset (population size, criteria column names) happen in
//! [`crate::simulation::SimulationPlan::prepare`].

use serde::{Deserialize, Serialize};

use super::AssayDataset;
use crate::error::ParameterError;

/// Absolute tolerance for the `=` criteria comparison
pub const EQUALITY_TOLERANCE: f64 = 1e-10;

/// `population · X / 100` within this of a whole number counts as whole
const TOP_COUNT_TOLERANCE: f64 = 1e-9;

/// Field names used in error messages, indexed by step
pub const KEEP_FIELDS: [&str; 3] = ["step1_keep", "step2_keep", "step3_keep"];

/// Comparison operator for a criteria rule
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Comparison {
    #[serde(rename = ">=")]
    AtLeast,
    #[serde(rename = "<=")]
    AtMost,
    #[serde(rename = "=")]
    Equal,
}

impl Comparison {
    /// Missing (`NaN`) values never satisfy a comparison
    #[must_use]
    pub fn holds(self, value: f64, threshold: f64) -> bool {
        match self {
            Comparison::AtLeast => value >= threshold,
            Comparison::AtMost => value <= threshold,
            Comparison::Equal => (value - threshold).abs() < EQUALITY_TOLERANCE,
        }
    }

    #[must_use]
    pub fn symbol(self) -> &'static str {
        match self {
            Comparison::AtLeast => ">=",
            Comparison::AtMost => "<=",
            Comparison::Equal => "=",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CriteriaRule {
    pub column: String,
    pub op: Comparison,
    pub threshold: f64,
}

/// Quality rules combined by logical AND, applied to the final-step pool
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CriteriaFilterSpec {
    pub rules: Vec<CriteriaRule>,
}

impl CriteriaFilterSpec {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a rule
    #[must_use]
    pub fn rule(mut self, column: impl Into<String>, op: Comparison, threshold: f64) -> Self {
        self.rules.push(CriteriaRule {
            column: column.into(),
            op,
            threshold,
        });
        self
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    /// Bind the rules to the dataset's columns.
    ///
    /// Unknown column names are an error rather than being skipped.
    pub fn resolve(&self, dataset: &AssayDataset) -> Result<CriteriaFilter, ParameterError> {
        let mut rules = Vec::with_capacity(self.rules.len());
        for rule in &self.rules {
            if !rule.threshold.is_finite() {
                return Err(ParameterError::NotFinite {
                    field: "criteria threshold",
                });
            }
            let values = dataset
                .criteria(&rule.column)
                .ok_or_else(|| ParameterError::UnknownCriteriaColumn(rule.column.clone()))?;
            rules.push(ResolvedRule {
                values: values.to_vec(),
                op: rule.op,
                threshold: rule.threshold,
            });
        }
        Ok(CriteriaFilter { rules })
    }
}

#[derive(Debug, Clone)]
struct ResolvedRule {
    values: Vec<f64>,
    op: Comparison,
    threshold: f64,
}

/// Criteria rules bound to dataset columns; clone `i` maps to dataset row `i`
#[derive(Debug, Clone)]
pub struct CriteriaFilter {
    rules: Vec<ResolvedRule>,
}

impl CriteriaFilter {
    #[must_use]
    pub fn passes(&self, clone: usize) -> bool {
        self.rules.iter().all(|rule| {
            rule.values
                .get(clone)
                .is_some_and(|&v| rule.op.holds(v, rule.threshold))
        })
    }
}

#[derive(Deserialize, Serialize)]
struct WorkflowFields {
    keeps: Vec<usize>,
    top_percent: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    criteria: Option<CriteriaFilterSpec>,
}

/// A validated 2- or 3-step selection workflow
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "WorkflowFields", into = "WorkflowFields")]
pub struct WorkflowConfig {
    keeps: Vec<usize>,
    top_percent: f64,
    criteria: Option<CriteriaFilterSpec>,
}

impl TryFrom<WorkflowFields> for WorkflowConfig {
    type Error = ParameterError;

    fn try_from(fields: WorkflowFields) -> Result<Self, Self::Error> {
        let config = Self::new(fields.keeps, fields.top_percent)?;
        Ok(match fields.criteria {
            Some(spec) if !spec.is_empty() => config.with_criteria(spec),
            _ => config,
        })
    }
}

impl From<WorkflowConfig> for WorkflowFields {
    fn from(config: WorkflowConfig) -> Self {
        Self {
            keeps: config.keeps,
            top_percent: config.top_percent,
            criteria: config.criteria,
        }
    }
}

impl WorkflowConfig {
    /// Validate keep-counts (2 or 3 of them, non-increasing, all ≥ 1) and the
    /// top-X% threshold (0 < X ≤ 100).
    pub fn new(keeps: Vec<usize>, top_percent: f64) -> Result<Self, ParameterError> {
        if !(2..=3).contains(&keeps.len()) {
            return Err(ParameterError::StepCount(keeps.len()));
        }
        for (i, &keep) in keeps.iter().enumerate() {
            if keep == 0 {
                return Err(ParameterError::ZeroCount {
                    field: KEEP_FIELDS[i],
                });
            }
            if i > 0 && keep > keeps[i - 1] {
                return Err(ParameterError::Exceeds {
                    field: KEEP_FIELDS[i],
                    value: keep,
                    limit_field: KEEP_FIELDS[i - 1],
                    limit: keeps[i - 1],
                });
            }
        }
        if !top_percent.is_finite() || top_percent <= 0.0 || top_percent > 100.0 {
            return Err(ParameterError::OutOfRange {
                field: "top_percent",
                value: top_percent,
                min: 0.0,
                max: 100.0,
            });
        }
        Ok(Self {
            keeps,
            top_percent,
            criteria: None,
        })
    }

    pub fn two_step(
        step1_keep: usize,
        step2_keep: usize,
        top_percent: f64,
    ) -> Result<Self, ParameterError> {
        Self::new(vec![step1_keep, step2_keep], top_percent)
    }

    pub fn three_step(
        step1_keep: usize,
        step2_keep: usize,
        step3_keep: usize,
        top_percent: f64,
    ) -> Result<Self, ParameterError> {
        Self::new(vec![step1_keep, step2_keep, step3_keep], top_percent)
    }

    #[must_use]
    pub fn with_criteria(mut self, criteria: CriteriaFilterSpec) -> Self {
        self.criteria = Some(criteria);
        self
    }

    #[must_use]
    pub fn steps(&self) -> usize {
        self.keeps.len()
    }

    #[must_use]
    pub fn keeps(&self) -> &[usize] {
        &self.keeps
    }

    /// Keep-count of the final step
    #[must_use]
    pub fn final_keep(&self) -> usize {
        self.keeps[self.keeps.len() - 1]
    }

    #[must_use]
    pub fn top_percent(&self) -> f64 {
        self.top_percent
    }

    #[must_use]
    pub fn criteria(&self) -> Option<&CriteriaFilterSpec> {
        self.criteria.as_ref()
    }

    /// Number of ground-truth "top" clones in a population of `population`
    ///
    /// `ceil(population · X / 100)`, with products that land within rounding
    /// error of a whole number taken as that number.
    #[must_use]
    pub fn top_count(&self, population: usize) -> usize {
        let raw = population as f64 * self.top_percent / 100.0;
        let nearest = raw.round();
        let count = if (raw - nearest).abs() < TOP_COUNT_TOLERANCE {
            nearest
        } else {
            raw.ceil()
        };
        (count as usize).clamp(1, population.max(1))
    }

    /// Step 1 cannot keep more clones than exist
    pub fn check_population(&self, population: usize) -> Result<(), ParameterError> {
        if self.keeps[0] > population {
            return Err(ParameterError::Exceeds {
                field: KEEP_FIELDS[0],
                value: self.keeps[0],
                limit_field: "population",
                limit: population,
            });
        }
        Ok(())
    }

    /// Copy with one step's keep-count replaced. Later steps are lowered as
    /// needed so the funnel stays non-increasing.
    pub fn with_keep(&self, step: usize, keep: usize) -> Result<Self, ParameterError> {
        if step >= self.keeps.len() {
            return Err(ParameterError::NotApplicable {
                field: KEEP_FIELDS[step.min(2)],
                steps: self.keeps.len(),
            });
        }
        let mut keeps = self.keeps.clone();
        keeps[step] = keep;
        for i in step + 1..keeps.len() {
            keeps[i] = keeps[i].min(keeps[i - 1]);
        }
        let mut config = Self::new(keeps, self.top_percent)?;
        config.criteria = self.criteria.clone();
        Ok(config)
    }

    /// Copy with a different success threshold
    pub fn with_top_percent(&self, top_percent: f64) -> Result<Self, ParameterError> {
        let mut config = Self::new(self.keeps.clone(), top_percent)?;
        config.criteria = self.criteria.clone();
        Ok(config)
    }
}

#[derive(Deserialize)]
struct CorrelationFields {
    start: f64,
    end: f64,
    step: f64,
}

/// Inclusive grid of correlation values `start, start + step, ..., ≤ end`
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "CorrelationFields")]
pub struct CorrelationSpec {
    start: f64,
    end: f64,
    step: f64,
}

impl TryFrom<CorrelationFields> for CorrelationSpec {
    type Error = ParameterError;

    fn try_from(fields: CorrelationFields) -> Result<Self, Self::Error> {
        Self::new(fields.start, fields.end, fields.step)
    }
}

impl Default for CorrelationSpec {
    fn default() -> Self {
        Self {
            start: 0.0,
            end: 1.0,
            step: 0.1,
        }
    }
}

fn check_unit_interval(field: &'static str, value: f64) -> Result<(), ParameterError> {
    if !(0.0..=1.0).contains(&value) {
        return Err(ParameterError::OutOfRange {
            field,
            value,
            min: 0.0,
            max: 1.0,
        });
    }
    Ok(())
}

impl CorrelationSpec {
    pub fn new(start: f64, end: f64, step: f64) -> Result<Self, ParameterError> {
        check_unit_interval("correlation start", start)?;
        check_unit_interval("correlation end", end)?;
        if start > end {
            return Err(ParameterError::OutOfRange {
                field: "correlation start",
                value: start,
                min: 0.0,
                max: end,
            });
        }
        if !step.is_finite() || step <= 0.0 {
            return Err(ParameterError::OutOfRange {
                field: "correlation step",
                value: step,
                min: f64::MIN_POSITIVE,
                max: 1.0,
            });
        }
        Ok(Self { start, end, step })
    }

    /// A one-point grid
    pub fn single(rho: f64) -> Result<Self, ParameterError> {
        Self::new(rho, rho, 1.0)
    }

    #[must_use]
    pub fn start(&self) -> f64 {
        self.start
    }

    #[must_use]
    pub fn end(&self) -> f64 {
        self.end
    }

    #[must_use]
    pub fn step(&self) -> f64 {
        self.step
    }

    /// Grid values in ascending order
    #[must_use]
    pub fn values(&self) -> Vec<f64> {
        let span = self.end - self.start;
        let count = (span / self.step + 1e-9).floor() as usize + 1;
        (0..count)
            .map(|i| {
                let value = self.start + self.step * i as f64;
                ((value * 1e9).round() / 1e9).min(self.end)
            })
            .collect()
    }
}
