//! CSV and JSON result files

use std::path::{Path, PathBuf};

use clonesim_core::advisor::{
    OptimizationPlan, ParameterRecommendation, SensitivityAssessment, SweepAssessment,
};
use clonesim_core::analysis::{SensitivityResult, WorkflowComparison};
use clonesim_core::efficiency::EfficiencyReport;
use clonesim_core::model::CorrelationSweep;
use clonesim_core::quality::{FitDiagnostics, QualityReport};
use serde::Serialize;

use crate::config::RunConfig;
use crate::util::atomic_write_bytes;

pub const SWEEP_FILE: &str = "correlation_sweep.csv";
pub const SENSITIVITY_FILE: &str = "sensitivity.csv";
pub const COMPARISON_FILE: &str = "workflow_comparison.csv";
pub const REPORT_FILE: &str = "report.json";

#[derive(Debug)]
pub enum ExportError {
    Io(String),
    Csv(String),
    Json(String),
}

impl std::fmt::Display for ExportError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ExportError::Io(msg) => write!(f, "IO error: {msg}"),
            ExportError::Csv(msg) => write!(f, "CSV error: {msg}"),
            ExportError::Json(msg) => write!(f, "JSON error: {msg}"),
        }
    }
}

impl std::error::Error for ExportError {}

impl From<csv::Error> for ExportError {
    fn from(err: csv::Error) -> Self {
        ExportError::Csv(err.to_string())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DatasetSummary {
    pub source: String,
    pub clones: usize,
    pub excluded_rows: usize,
    pub criteria_columns: Vec<String>,
}

/// Everything one command produced, written as `report.json`
#[derive(Debug, Clone, Serialize)]
pub struct RunReport {
    pub generated_at: jiff::Timestamp,
    pub command: &'static str,
    pub dataset: DatasetSummary,
    pub quality: QualityReport,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub config: Option<RunConfig>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub recommendation: Option<ParameterRecommendation>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sweep: Option<CorrelationSweep>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fit: Option<FitDiagnostics>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub efficiency: Option<EfficiencyReport>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub assessment: Option<SweepAssessment>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sensitivity: Option<SensitivityResult>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sensitivity_assessment: Option<SensitivityAssessment>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub comparison: Option<WorkflowComparison>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub optimization: Option<OptimizationPlan>,
    pub warnings: Vec<String>,
}

impl RunReport {
    pub fn new(command: &'static str, dataset: DatasetSummary, quality: QualityReport) -> Self {
        Self {
            generated_at: jiff::Timestamp::now(),
            command,
            dataset,
            quality,
            config: None,
            recommendation: None,
            sweep: None,
            fit: None,
            efficiency: None,
            assessment: None,
            sensitivity: None,
            sensitivity_assessment: None,
            comparison: None,
            optimization: None,
            warnings: Vec::new(),
        }
    }
}

fn finish(writer: csv::Writer<Vec<u8>>) -> Result<Vec<u8>, ExportError> {
    writer
        .into_inner()
        .map_err(|err| ExportError::Csv(err.to_string()))
}

/// One row per correlation value
pub fn sweep_csv(sweep: &CorrelationSweep) -> Result<Vec<u8>, ExportError> {
    let mut writer = csv::Writer::from_writer(Vec::new());
    writer.write_record([
        "correlation",
        "success_probability",
        "successes",
        "trials",
        "mean_success_count",
        "seed",
    ])?;
    for result in &sweep.results {
        writer.write_record([
            format!("{:.4}", result.correlation),
            format!("{:.6}", result.success_probability),
            result.successes.to_string(),
            result.trials.to_string(),
            format!("{:.4}", result.mean_success_count()),
            result.seed.to_string(),
        ])?;
    }
    finish(writer)
}

/// One row per (parameter, value) pair
pub fn sensitivity_csv(result: &SensitivityResult) -> Result<Vec<u8>, ExportError> {
    let mut writer = csv::Writer::from_writer(Vec::new());
    writer.write_record([
        "parameter",
        "value",
        "success_probability",
        "baseline_probability",
        "score",
        "band",
    ])?;
    for record in &result.records {
        for (value, probability) in record.values.iter().zip(&record.probabilities) {
            writer.write_record([
                record.parameter.key().to_string(),
                value.to_string(),
                format!("{probability:.6}"),
                format!("{:.6}", record.baseline_probability),
                format!("{:.2}", record.score),
                record.band.label().to_string(),
            ])?;
        }
    }
    finish(writer)
}

/// One row per workflow variant
pub fn comparison_csv(comparison: &WorkflowComparison) -> Result<Vec<u8>, ExportError> {
    let mut writer = csv::Writer::from_writer(Vec::new());
    writer.write_record([
        "steps",
        "keeps",
        "correlation",
        "success_probability",
        "successes",
        "trials",
        "seed",
        "preferred",
    ])?;
    let preferred = comparison.preferred().steps();
    for variant in [&comparison.two_step, &comparison.three_step] {
        let keeps: Vec<String> = variant
            .workflow
            .keeps()
            .iter()
            .map(|k| k.to_string())
            .collect();
        writer.write_record([
            variant.steps().to_string(),
            keeps.join("-"),
            format!("{:.4}", comparison.correlation),
            format!("{:.6}", variant.success_probability()),
            variant.result.successes.to_string(),
            variant.result.trials.to_string(),
            variant.result.seed.to_string(),
            (variant.steps() == preferred).to_string(),
        ])?;
    }
    finish(writer)
}

fn write_file(output_dir: &Path, name: &str, content: &[u8]) -> Result<PathBuf, ExportError> {
    let path = output_dir.join(name);
    atomic_write_bytes(&path, content)
        .map_err(|e| ExportError::Io(format!("{}: {e}", path.display())))?;
    tracing::debug!(path = %path.display(), bytes = content.len(), "Wrote output file");
    Ok(path)
}

/// Write the CSV tables present in `report` and the JSON report itself.
/// Returns the paths written.
pub fn write_outputs(output_dir: &Path, report: &RunReport) -> Result<Vec<PathBuf>, ExportError> {
    let mut written = Vec::new();
    if let Some(sweep) = &report.sweep {
        written.push(write_file(output_dir, SWEEP_FILE, &sweep_csv(sweep)?)?);
    }
    if let Some(sensitivity) = &report.sensitivity {
        written.push(write_file(
            output_dir,
            SENSITIVITY_FILE,
            &sensitivity_csv(sensitivity)?,
        )?);
    }
    if let Some(comparison) = &report.comparison {
        written.push(write_file(
            output_dir,
            COMPARISON_FILE,
            &comparison_csv(comparison)?,
        )?);
    }
    let json =
        serde_json::to_vec_pretty(report).map_err(|err| ExportError::Json(err.to_string()))?;
    written.push(write_file(output_dir, REPORT_FILE, &json)?);

    tracing::info!(
        files = written.len(),
        output_dir = %output_dir.display(),
        "Results exported"
    );
    Ok(written)
}

#[cfg(test)]
mod tests {
    use super::*;
    use clonesim_core::analysis::{SensitivityRecord, SweepParameter, WorkflowVariant};
    use clonesim_core::distribution::DistributionModel;
    use clonesim_core::model::{AssayDataset, SimulationResult, TrialOutcome, WorkflowConfig};
    use std::fs;
    use tempfile::tempdir;

    fn result(correlation: f64, successes: usize) -> SimulationResult {
        let trials: Vec<TrialOutcome> = (0..10)
            .map(|i| TrialOutcome {
                top_survivors: if i < successes { 2 } else { 1 },
                success: i < successes,
            })
            .collect();
        SimulationResult::from_trials(correlation, 42, 2, &trials)
    }

    fn report() -> RunReport {
        let dataset = AssayDataset::new(vec![1.0, 2.0, 3.0, 4.0]);
        let summary = DatasetSummary {
            source: "assay.csv".into(),
            clones: dataset.len(),
            excluded_rows: 0,
            criteria_columns: Vec::new(),
        };
        RunReport::new("simulate", summary, QualityReport::analyze(&dataset))
    }

    #[test]
    fn test_sweep_csv() {
        let sweep = CorrelationSweep {
            results: vec![result(0.0, 2), result(0.5, 7)],
        };
        let text = String::from_utf8(sweep_csv(&sweep).unwrap()).unwrap();
        let lines: Vec<&str> = text.lines().collect();

        assert_eq!(lines.len(), 3);
        assert!(lines[0].starts_with("correlation,success_probability"));
        assert_eq!(lines[2], "0.5000,0.700000,7,10,1.7000,42");
    }

    #[test]
    fn test_sensitivity_csv() {
        let result = SensitivityResult {
            baseline_correlation: 0.5,
            baseline_probability: 0.6,
            records: vec![SensitivityRecord::new(
                SweepParameter::TopPercent,
                0.6,
                vec![1.0, 5.0],
                vec![0.2, 0.6],
            )],
        };
        let text = String::from_utf8(sensitivity_csv(&result).unwrap()).unwrap();
        let lines: Vec<&str> = text.lines().collect();

        assert_eq!(lines.len(), 3);
        assert!(lines[1].starts_with("top_percent,1,0.200000,0.600000,40.00"));
    }

    #[test]
    fn test_write_outputs() {
        let dir = tempdir().unwrap();
        let mut report = report();
        report.sweep = Some(CorrelationSweep {
            results: vec![result(0.3, 5)],
        });

        let written = write_outputs(dir.path(), &report).unwrap();

        assert_eq!(written.len(), 2);
        assert!(dir.path().join(SWEEP_FILE).exists());
        assert!(!dir.path().join(SENSITIVITY_FILE).exists());

        let json: serde_json::Value =
            serde_json::from_str(&fs::read_to_string(dir.path().join(REPORT_FILE)).unwrap())
                .unwrap();
        assert_eq!(json["command"], "simulate");
        assert_eq!(json["dataset"]["clones"], 4);
        assert!(json["generated_at"].is_string());
        assert!(json.get("sensitivity").is_none());
        assert_eq!(json["sweep"]["results"][0]["successes"], 5);
        assert!(json.get("fit").is_none());
    }

    #[test]
    fn test_comparison_csv_and_json() {
        let comparison = WorkflowComparison {
            correlation: 0.5,
            two_step: WorkflowVariant {
                workflow: WorkflowConfig::two_step(40, 8, 5.0).unwrap(),
                result: result(0.5, 4),
            },
            three_step: WorkflowVariant {
                workflow: WorkflowConfig::three_step(40, 8, 4, 5.0).unwrap(),
                result: result(0.5, 6),
            },
        };

        let text = String::from_utf8(comparison_csv(&comparison).unwrap()).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines.len(), 3);
        assert_eq!(lines[1], "2,40-8,0.5000,0.400000,4,10,42,false");
        assert_eq!(lines[2], "3,40-8-4,0.5000,0.600000,6,10,42,true");

        let dir = tempdir().unwrap();
        let mut report = report();
        report.comparison = Some(comparison);
        let written = write_outputs(dir.path(), &report).unwrap();

        assert_eq!(written.len(), 2);
        assert!(dir.path().join(COMPARISON_FILE).exists());
        let json: serde_json::Value =
            serde_json::from_str(&fs::read_to_string(dir.path().join(REPORT_FILE)).unwrap())
                .unwrap();
        assert_eq!(json["comparison"]["three_step"]["result"]["successes"], 6);
        assert_eq!(json["comparison"]["two_step"]["workflow"]["keeps"][1], 8);
    }

    #[test]
    fn test_fit_diagnostics_in_report_json() {
        let dir = tempdir().unwrap();
        let mut report = report();
        let model = DistributionModel::fit_lognormal(&[1.0, 2.0, 3.0, 4.0]).unwrap();
        report.fit = FitDiagnostics::compare(&model, &[1.0, 2.0, 3.0, 4.0], 200, 9);

        write_outputs(dir.path(), &report).unwrap();

        let json: serde_json::Value =
            serde_json::from_str(&fs::read_to_string(dir.path().join(REPORT_FILE)).unwrap())
                .unwrap();
        assert_eq!(json["fit"]["model"], "lognormal");
        assert_eq!(json["fit"]["observed"]["count"], 4);
        assert_eq!(json["fit"]["synthetic"]["count"], 200);
        assert!(json["fit"]["ks_statistic"].as_f64().unwrap() <= 1.0);
        assert_eq!(json["fit"]["quartile_density"].as_array().unwrap().len(), 3);
    }
}
