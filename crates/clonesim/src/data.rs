//! CSV assay dataset loading
//!
//! The header row must name a `Results` column. Every column whose name
//! starts with `criteria` (any case) is kept as a quality column. Blank or
//! non-numeric cells are treated as missing.

use std::fs::File;
use std::io;
use std::path::Path;

use clonesim_core::ParameterError;
use clonesim_core::model::AssayDataset;
use csv::{ReaderBuilder, StringRecord, Trim};

pub const RESULTS_COLUMN: &str = "Results";
pub const CRITERIA_PREFIX: &str = "criteria";

#[derive(Debug)]
pub enum DataError {
    Io(String),
    Csv(String),
    MissingResults { headers: Vec<String> },
    Invalid(ParameterError),
}

impl std::fmt::Display for DataError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DataError::Io(msg) => write!(f, "IO error: {msg}"),
            DataError::Csv(msg) => write!(f, "CSV error: {msg}"),
            DataError::MissingResults { headers } => write!(
                f,
                "no '{RESULTS_COLUMN}' column (found: {})",
                headers.join(", ")
            ),
            DataError::Invalid(err) => write!(f, "invalid dataset: {err}"),
        }
    }
}

impl std::error::Error for DataError {}

impl From<ParameterError> for DataError {
    fn from(err: ParameterError) -> Self {
        DataError::Invalid(err)
    }
}

fn is_criteria_column(name: &str) -> bool {
    name.get(..CRITERIA_PREFIX.len())
        .is_some_and(|prefix| prefix.eq_ignore_ascii_case(CRITERIA_PREFIX))
}

fn parse_cell(record: &StringRecord, index: usize) -> Option<f64> {
    record
        .get(index)
        .and_then(|cell| cell.parse::<f64>().ok())
        .filter(|v| v.is_finite())
}

/// Parse a dataset from any CSV source
pub fn parse_dataset<R: io::Read>(source: R) -> Result<AssayDataset, DataError> {
    let mut reader = ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .trim(Trim::All)
        .from_reader(source);

    let headers = reader
        .headers()
        .map_err(|err| DataError::Csv(err.to_string()))?
        .clone();
    let results_index = headers
        .iter()
        .position(|h| h.eq_ignore_ascii_case(RESULTS_COLUMN))
        .ok_or_else(|| DataError::MissingResults {
            headers: headers.iter().map(str::to_string).collect(),
        })?;
    let criteria_indices: Vec<(usize, String)> = headers
        .iter()
        .enumerate()
        .filter(|(_, name)| is_criteria_column(name))
        .map(|(i, name)| (i, name.to_string()))
        .collect();

    let mut results = Vec::new();
    let mut criteria: Vec<(String, Vec<Option<f64>>)> = criteria_indices
        .iter()
        .map(|(_, name)| (name.clone(), Vec::new()))
        .collect();

    for row in reader.records() {
        let record = row.map_err(|err| DataError::Csv(err.to_string()))?;
        results.push(parse_cell(&record, results_index));
        for ((index, _), (_, cells)) in criteria_indices.iter().zip(criteria.iter_mut()) {
            cells.push(parse_cell(&record, *index));
        }
    }

    Ok(AssayDataset::from_rows(results, criteria)?)
}

/// Load a dataset from a CSV file
pub fn load_dataset(path: &Path) -> Result<AssayDataset, DataError> {
    let file =
        File::open(path).map_err(|e| DataError::Io(format!("{}: {e}", path.display())))?;
    let dataset = parse_dataset(file)?;

    tracing::info!(
        path = %path.display(),
        clones = dataset.len(),
        excluded = dataset.excluded_rows(),
        criteria = dataset.criteria_columns().len(),
        "Loaded assay dataset"
    );
    if dataset.excluded_rows() > 0 {
        tracing::warn!(
            excluded = dataset.excluded_rows(),
            "Rows without a numeric Results value were dropped"
        );
    }
    Ok(dataset)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::tempdir;

    #[test]
    fn test_results_and_criteria_columns() {
        let csv = "Clone,Results,Criteria_Titer,criteria viability,Notes\n\
                   A,1.5,2.0,0.9,x\n\
                   B,3.25,,0.8,y\n\
                   C,0.75,1.0,n/a,z\n";
        let dataset = parse_dataset(csv.as_bytes()).unwrap();

        assert_eq!(dataset.results(), &[1.5, 3.25, 0.75]);
        assert_eq!(dataset.criteria_columns().len(), 2);

        let titer = dataset.criteria("Criteria_Titer").unwrap();
        assert_eq!(titer[0], 2.0);
        assert!(titer[1].is_nan());
        let viability = dataset.criteria("criteria viability").unwrap();
        assert!(viability[2].is_nan());
        assert!(dataset.criteria("Notes").is_none());
    }

    #[test]
    fn test_unparseable_results_are_excluded() {
        let csv = "Results,criteria_a\n1.0,5\n,6\nabc,7\n2.0,8\n";
        let dataset = parse_dataset(csv.as_bytes()).unwrap();

        assert_eq!(dataset.results(), &[1.0, 2.0]);
        assert_eq!(dataset.excluded_rows(), 2);
        assert_eq!(dataset.total_rows(), 4);
        // Criteria cells stay aligned with the kept rows
        assert_eq!(dataset.criteria("criteria_a").unwrap(), &[5.0, 8.0]);
    }

    #[test]
    fn test_short_rows_are_missing_cells() {
        let csv = "Results,criteria_a\n1.0\n2.0,3.0\n";
        let dataset = parse_dataset(csv.as_bytes()).unwrap();

        let column = dataset.criteria("criteria_a").unwrap();
        assert!(column[0].is_nan());
        assert_eq!(column[1], 3.0);
    }

    #[test]
    fn test_missing_results_column() {
        let err = parse_dataset("Value,criteria_a\n1,2\n".as_bytes()).unwrap_err();
        assert!(matches!(err, DataError::MissingResults { .. }));
        assert!(err.to_string().contains("Value"));
    }

    #[test]
    fn test_load_from_file() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("assay.csv");
        fs::write(&path, "Results\n1\n2\n3\n").unwrap();

        let dataset = load_dataset(&path).unwrap();
        assert_eq!(dataset.len(), 3);

        assert!(matches!(
            load_dataset(&dir.path().join("missing.csv")),
            Err(DataError::Io(_))
        ));
    }
}
