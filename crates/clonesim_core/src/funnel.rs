//! Step-wise top-k selection with an optional final quality filter

use std::cmp::Ordering;

use crate::copula::StepValues;
use crate::model::{CriteriaFilter, WorkflowConfig};

/// Higher value first, then lower clone index
#[inline]
fn rank_order(values: &[f64], a: usize, b: usize) -> Ordering {
    values[b].total_cmp(&values[a]).then(a.cmp(&b))
}

/// The `keep` best of `candidates` by `values`, in rank order
fn top_k(values: &[f64], mut candidates: Vec<usize>, keep: usize) -> Vec<usize> {
    if keep < candidates.len() {
        if keep == 0 {
            return Vec::new();
        }
        candidates.select_nth_unstable_by(keep - 1, |&a, &b| rank_order(values, a, b));
        candidates.truncate(keep);
    }
    candidates.sort_unstable_by(|&a, &b| rank_order(values, a, b));
    candidates
}

/// Flags the `count` highest values in `values` (ties to the lower index)
#[must_use]
pub fn top_mask(values: &[f64], count: usize) -> Vec<bool> {
    let mut mask = vec![false; values.len()];
    for idx in top_k(values, (0..values.len()).collect(), count) {
        mask[idx] = true;
    }
    mask
}

/// Which clones were retained at every stage of one funnel pass
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FunnelOutcome {
    /// Retained clone indices after each step, in that step's rank order
    pub stages: Vec<Vec<usize>>,
    /// Final-step retainees that also pass the criteria filter
    pub survivors: Vec<usize>,
}

#[derive(Debug, Clone)]
pub struct SelectionFunnel {
    keeps: Vec<usize>,
    criteria: Option<CriteriaFilter>,
}

impl SelectionFunnel {
    #[must_use]
    pub fn new(keeps: Vec<usize>, criteria: Option<CriteriaFilter>) -> Self {
        Self { keeps, criteria }
    }

    #[must_use]
    pub fn from_workflow(workflow: &WorkflowConfig, criteria: Option<CriteriaFilter>) -> Self {
        Self::new(workflow.keeps().to_vec(), criteria)
    }

    #[must_use]
    pub fn keeps(&self) -> &[usize] {
        &self.keeps
    }

    /// Run the funnel over one synthetic population.
    ///
    /// `values` must have at least as many steps as the funnel.
    #[must_use]
    pub fn apply(&self, values: &StepValues) -> FunnelOutcome {
        let mut pool: Vec<usize> = (0..values.population()).collect();
        let mut stages = Vec::with_capacity(self.keeps.len());

        for (step, &keep) in self.keeps.iter().enumerate() {
            pool = top_k(values.step(step), pool, keep);
            stages.push(pool.clone());
        }

        let survivors = match &self.criteria {
            Some(filter) => pool.into_iter().filter(|&c| filter.passes(c)).collect(),
            None => pool,
        };

        FunnelOutcome { stages, survivors }
    }
}
