//! Assay measurements and their row-aligned criteria columns

use rustc_hash::FxHashMap;

use crate::error::ParameterError;

/// A named numeric quality column aligned with the Results by row index.
/// Missing cells are stored as `NaN` and fail every comparison.
#[derive(Debug, Clone, PartialEq)]
pub struct CriteriaColumn {
    pub name: String,
    pub values: Vec<f64>,
}

/// Observed assay results for a clone population.
///
/// Rows without a finite Results value are dropped on construction (from every
/// column, so criteria stay aligned). The number of dropped rows is kept for
/// data-quality reporting.
#[derive(Debug, Clone)]
pub struct AssayDataset {
    results: Vec<f64>,
    criteria: Vec<CriteriaColumn>,
    column_index: FxHashMap<String, usize>,
    excluded_rows: usize,
}

impl AssayDataset {
    /// Dataset with Results only
    #[must_use]
    pub fn new(results: Vec<f64>) -> Self {
        let total = results.len();
        let results: Vec<f64> = results.into_iter().filter(|v| v.is_finite()).collect();
        let excluded_rows = total - results.len();
        Self {
            results,
            criteria: Vec::new(),
            column_index: FxHashMap::default(),
            excluded_rows,
        }
    }

    /// Build from raw rows where any cell may be missing.
    ///
    /// Every criteria column must have one cell per Results row.
    pub fn from_rows(
        results: Vec<Option<f64>>,
        criteria: Vec<(String, Vec<Option<f64>>)>,
    ) -> Result<Self, ParameterError> {
        let total = results.len();
        for (name, cells) in &criteria {
            if cells.len() != total {
                return Err(ParameterError::ColumnLength {
                    column: name.clone(),
                    expected: total,
                    found: cells.len(),
                });
            }
        }

        let keep: Vec<bool> = results
            .iter()
            .map(|r| r.is_some_and(f64::is_finite))
            .collect();

        let kept_results: Vec<f64> = results
            .into_iter()
            .flatten()
            .filter(|v| v.is_finite())
            .collect();
        let excluded_rows = total - kept_results.len();

        let mut columns = Vec::with_capacity(criteria.len());
        let mut column_index = FxHashMap::default();
        for (name, cells) in criteria {
            let values = cells
                .into_iter()
                .zip(&keep)
                .filter(|(_, keep)| **keep)
                .map(|(cell, _)| cell.unwrap_or(f64::NAN))
                .collect();
            column_index.insert(name.clone(), columns.len());
            columns.push(CriteriaColumn { name, values });
        }

        Ok(Self {
            results: kept_results,
            criteria: columns,
            column_index,
            excluded_rows,
        })
    }

    /// Finite Results values in row order
    #[must_use]
    pub fn results(&self) -> &[f64] {
        &self.results
    }

    /// Number of usable rows (the clone population size)
    #[must_use]
    pub fn len(&self) -> usize {
        self.results.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.results.is_empty()
    }

    #[must_use]
    pub fn criteria_columns(&self) -> &[CriteriaColumn] {
        &self.criteria
    }

    /// Look up a criteria column by exact name
    #[must_use]
    pub fn criteria(&self, name: &str) -> Option<&[f64]> {
        self.column_index
            .get(name)
            .map(|&i| self.criteria[i].values.as_slice())
    }

    /// Rows dropped because their Results value was missing or non-finite
    #[must_use]
    pub fn excluded_rows(&self) -> usize {
        self.excluded_rows
    }

    /// Rows supplied before filtering
    #[must_use]
    pub fn total_rows(&self) -> usize {
        self.results.len() + self.excluded_rows
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_results_drop_whole_row() {
        let dataset = AssayDataset::from_rows(
            vec![Some(1.0), None, Some(3.0), Some(f64::NAN)],
            vec![(
                "Criteria_Titer".to_string(),
                vec![Some(10.0), Some(20.0), None, Some(40.0)],
            )],
        )
        .unwrap();

        assert_eq!(dataset.results(), &[1.0, 3.0]);
        assert_eq!(dataset.excluded_rows(), 2);
        assert_eq!(dataset.total_rows(), 4);

        let titer = dataset.criteria("Criteria_Titer").unwrap();
        assert_eq!(titer.len(), 2);
        assert_eq!(titer[0], 10.0);
        assert!(titer[1].is_nan());
        assert!(dataset.criteria("criteria_titer").is_none());
    }

    #[test]
    fn test_misaligned_column_rejected() {
        let err = AssayDataset::from_rows(
            vec![Some(1.0), Some(2.0)],
            vec![("Criteria_A".to_string(), vec![Some(1.0)])],
        )
        .unwrap_err();
        assert!(matches!(err, ParameterError::ColumnLength { found: 1, .. }));
    }

    #[test]
    fn test_new_filters_non_finite() {
        let dataset = AssayDataset::new(vec![1.0, f64::INFINITY, -2.0]);
        assert_eq!(dataset.results(), &[1.0, -2.0]);
        assert_eq!(dataset.excluded_rows(), 1);
    }
}
