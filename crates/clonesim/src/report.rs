//! Plain-text summary printed to stdout

use std::fmt::Write;

use clonesim_core::advisor::OptimizationPlan;

use crate::export::RunReport;
use crate::util::{bar, format_count, format_percentage, format_value};

const BAR_WIDTH: usize = 30;

fn section(out: &mut String, title: &str) {
    let _ = writeln!(out, "\n{title}\n{}", "=".repeat(title.len()));
}

fn list(out: &mut String, heading: &str, items: &[String]) {
    if items.is_empty() {
        return;
    }
    let _ = writeln!(out, "{heading}:");
    for item in items {
        let _ = writeln!(out, "  - {item}");
    }
}

fn plan(out: &mut String, plan: &OptimizationPlan) {
    section(out, "Optimization Plan");
    list(out, "Immediate", &plan.immediate);
    list(out, "Short term", &plan.short_term);
    list(out, "Long term", &plan.long_term);
}

/// Render every section present in `report`
pub fn render(report: &RunReport) -> String {
    let mut out = String::new();

    section(&mut out, "Dataset");
    let _ = writeln!(
        out,
        "{}: {} clones ({} rows excluded)",
        report.dataset.source,
        format_count(report.dataset.clones),
        report.dataset.excluded_rows
    );
    if !report.dataset.criteria_columns.is_empty() {
        let _ = writeln!(
            out,
            "Criteria columns: {}",
            report.dataset.criteria_columns.join(", ")
        );
    }
    let quality = &report.quality;
    let _ = writeln!(
        out,
        "Quality score {:.2} | completeness {} | outliers {} | skewness {:.2}",
        quality.quality_score,
        format_percentage(quality.completeness),
        format_percentage(quality.outlier_ratio),
        quality.skewness
    );
    list(&mut out, "Issues", &quality.issues);
    list(&mut out, "Warnings", &quality.warnings);

    if let Some(config) = &report.config {
        section(&mut out, "Workflow");
        let keeps: Vec<String> = config.workflow.keeps().iter().map(|k| k.to_string()).collect();
        let _ = writeln!(
            out,
            "Keeps {} | top {}% | {} | {} repetitions",
            keeps.join(" -> "),
            format_value(config.workflow.top_percent()),
            config.distribution.label(),
            format_count(config.monte_carlo.repetitions)
        );
        if let Some(criteria) = config.workflow.criteria() {
            let _ = writeln!(out, "Criteria filter: {criteria:?}");
        }
    }
    list(&mut out, "Workflow warnings", &report.warnings);

    if let Some(recommendation) = &report.recommendation {
        section(&mut out, "Recommendations");
        list(&mut out, "Reasoning", &recommendation.reasoning);
        list(&mut out, "Data quality", &report.quality.recommendations);
    }

    if let Some(sweep) = &report.sweep {
        section(&mut out, "Correlation Sweep");
        for result in &sweep.results {
            let _ = writeln!(
                out,
                "rho {:.2}  {}  {:>6}  mean top survivors {:.2}",
                result.correlation,
                bar(result.success_probability, BAR_WIDTH),
                format_percentage(result.success_probability),
                result.mean_success_count()
            );
        }
        if let Some(seed) = sweep.results.first().map(|r| r.seed) {
            let _ = writeln!(out, "seed {seed}");
        }
    }

    if let Some(fit) = &report.fit {
        section(&mut out, "Fit Diagnostics");
        let _ = writeln!(out, "{} model | KS statistic {:.4}", fit.model, fit.ks_statistic);
        for (label, stats) in [("observed", &fit.observed), ("synthetic", &fit.synthetic)] {
            let _ = writeln!(
                out,
                "{label:<9}  n {:>6}  mean {}  sd {}  median {}  IQR {} - {}",
                format_count(stats.count),
                format_value(stats.mean),
                format_value(stats.std_dev),
                format_value(stats.median),
                format_value(stats.q1),
                format_value(stats.q3)
            );
        }
        let densities: Vec<String> = fit
            .quartile_density
            .iter()
            .map(|p| format!("f({})={:.4}", format_value(p.value), p.density))
            .collect();
        let _ = writeln!(out, "density at quartiles: {}", densities.join("  "));
    }

    if let Some(efficiency) = &report.efficiency {
        section(&mut out, "Efficiency");
        for (i, step) in efficiency.steps.iter().enumerate() {
            let _ = writeln!(
                out,
                "Step {}: {} -> {} ({})",
                i + 1,
                format_count(step.input),
                format_count(step.kept),
                format_percentage(step.ratio)
            );
        }
        let _ = writeln!(
            out,
            "Overall {} | reduction x{:.1} | selectivity {:.3}",
            format_percentage(efficiency.overall_ratio),
            efficiency.reduction_factor,
            efficiency.selectivity
        );
    }

    if let Some(assessment) = &report.assessment {
        section(&mut out, "Assessment");
        let _ = writeln!(
            out,
            "{} performance: best {} at rho {:.2} ({} correlation)",
            assessment.performance.label(),
            format_percentage(assessment.best_probability),
            assessment.best_correlation,
            assessment.correlation_band.label()
        );
        list(&mut out, "Insights", &assessment.insights);
        list(&mut out, "Recommendations", &assessment.recommendations);
        list(&mut out, "Opportunities", &assessment.opportunities);
        list(&mut out, "Risks", &assessment.risks);
    }

    if let Some(sensitivity) = &report.sensitivity {
        section(&mut out, "Sensitivity");
        let _ = writeln!(
            out,
            "Baseline {} at rho {:.2}",
            format_percentage(sensitivity.baseline_probability),
            sensitivity.baseline_correlation
        );
        for record in sensitivity.ranked() {
            let values: Vec<String> = record
                .values
                .iter()
                .zip(&record.probabilities)
                .map(|(v, p)| format!("{}={}", format_value(*v), format_percentage(*p)))
                .collect();
            let _ = writeln!(
                out,
                "{:<12} {:>6.1} pts  {:<6}  {}",
                record.parameter.label(),
                record.score,
                record.band.label(),
                values.join("  ")
            );
        }
    }
    if let Some(assessment) = &report.sensitivity_assessment {
        list(&mut out, "Priorities", &assessment.priorities);
    }

    if let Some(comparison) = &report.comparison {
        section(&mut out, "Workflow Comparison");
        let _ = writeln!(out, "rho {:.2}", comparison.correlation);
        for variant in [&comparison.two_step, &comparison.three_step] {
            let keeps: Vec<String> = variant.workflow.keeps().iter().map(|k| k.to_string()).collect();
            let _ = writeln!(
                out,
                "{}-step {:<14} {}  {:>6}",
                variant.steps(),
                keeps.join(" -> "),
                bar(variant.success_probability(), BAR_WIDTH),
                format_percentage(variant.success_probability())
            );
        }
        let _ = writeln!(
            out,
            "Preferred: {}-step ({:+.1} pts for the third step)",
            comparison.preferred().steps(),
            comparison.difference() * 100.0
        );
    }

    if let Some(optimization) = &report.optimization {
        plan(&mut out, optimization);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use clonesim_core::advisor::assess_sweep;
    use clonesim_core::distribution::DistributionModel;
    use clonesim_core::analysis::{WorkflowComparison, WorkflowVariant};
    use clonesim_core::model::{
        AssayDataset, CorrelationSweep, SimulationResult, TrialOutcome, WorkflowConfig,
    };
    use clonesim_core::quality::{FitDiagnostics, QualityReport};

    use crate::export::DatasetSummary;

    #[test]
    fn test_render_simulate_report() {
        let dataset = AssayDataset::new(vec![1.0, 2.0, 3.0, 5.0, 8.0]);
        let mut report = RunReport::new(
            "simulate",
            DatasetSummary {
                source: "assay.csv".into(),
                clones: 5,
                excluded_rows: 1,
                criteria_columns: vec!["criteria_titer".into()],
            },
            QualityReport::analyze(&dataset),
        );
        let trials = vec![
            TrialOutcome {
                top_survivors: 1,
                success: true,
            };
            4
        ];
        let sweep = CorrelationSweep {
            results: vec![SimulationResult::from_trials(0.9, 11, 1, &trials)],
        };
        report.assessment = assess_sweep(&sweep);
        report.sweep = Some(sweep);

        let text = render(&report);

        assert!(text.contains("assay.csv: 5 clones (1 rows excluded)"));
        assert!(text.contains("Criteria columns: criteria_titer"));
        assert!(text.contains("rho 0.90"));
        assert!(text.contains("100.0%"));
        assert!(text.contains("seed 11"));
        assert!(text.contains("Excellent performance"));
        assert!(!text.contains("Sensitivity"));
        assert!(!text.contains("Fit Diagnostics"));

        let model = DistributionModel::Lognormal {
            mu: 0.5,
            sigma: 0.8,
        };
        report.fit = FitDiagnostics::compare(&model, &[1.0, 2.0, 3.0, 5.0, 8.0], 500, 3);
        let text = render(&report);

        assert!(text.contains("Fit Diagnostics"));
        assert!(text.contains("lognormal model | KS statistic"));
        assert!(text.contains("observed   n      5"));
        assert!(text.contains("density at quartiles: f(2"));
        assert!(!text.contains("Workflow Comparison"));
    }

    #[test]
    fn test_render_comparison() {
        let dataset = AssayDataset::new(vec![1.0, 2.0, 3.0]);
        let mut report = RunReport::new(
            "compare",
            DatasetSummary {
                source: "assay.csv".into(),
                clones: 3,
                excluded_rows: 0,
                criteria_columns: Vec::new(),
            },
            QualityReport::analyze(&dataset),
        );
        let variant = |keeps: Vec<usize>, successes: usize| {
            let trials: Vec<TrialOutcome> = (0..4)
                .map(|i| TrialOutcome {
                    top_survivors: usize::from(i < successes),
                    success: i < successes,
                })
                .collect();
            WorkflowVariant {
                workflow: WorkflowConfig::new(keeps, 5.0).unwrap(),
                result: SimulationResult::from_trials(0.5, 1, 1, &trials),
            }
        };
        report.comparison = Some(WorkflowComparison {
            correlation: 0.5,
            two_step: variant(vec![40, 8], 1),
            three_step: variant(vec![40, 8, 4], 3),
        });

        let text = render(&report);

        assert!(text.contains("Workflow Comparison"));
        assert!(text.contains("2-step 40 -> 8"));
        assert!(text.contains("3-step 40 -> 8 -> 4"));
        assert!(text.contains("25.0%"));
        assert!(text.contains("75.0%"));
        assert!(text.contains("Preferred: 3-step (+50.0 pts for the third step)"));
    }
}
