//! Data-quality diagnostics for an assay dataset, and goodness-of-fit checks
//! for synthetic data against the observed values.

use rand::SeedableRng;
use rand::rngs::StdRng;
use serde::{Deserialize, Serialize};
use statrs::statistics::Statistics;

use crate::distribution::DistributionModel;
use crate::model::AssayDataset;

/// Completeness below this is reported as an issue
pub const MIN_COMPLETENESS: f64 = 0.9;
/// Outlier ratio above this is reported as a warning
pub const MAX_OUTLIER_RATIO: f64 = 0.05;
/// |skewness| above this is reported as a warning
pub const MAX_ABS_SKEWNESS: f64 = 2.0;
/// Synthetic sample size for fit diagnostics
pub const SYNTHETIC_DRAWS: usize = 10_000;

/// Linear-interpolated quantile of sorted data (`q` in [0, 1])
#[must_use]
pub fn quantile_sorted(sorted: &[f64], q: f64) -> f64 {
    if sorted.is_empty() {
        return f64::NAN;
    }
    let pos = q.clamp(0.0, 1.0) * (sorted.len() - 1) as f64;
    let lo = pos.floor() as usize;
    let hi = pos.ceil() as usize;
    sorted[lo] + (sorted[hi] - sorted[lo]) * (pos - lo as f64)
}

fn sorted_copy(values: &[f64]) -> Vec<f64> {
    let mut sorted = values.to_vec();
    sorted.sort_by(f64::total_cmp);
    sorted
}

/// Adjusted Fisher-Pearson sample skewness. Zero for fewer than 3 values or
/// zero spread.
#[must_use]
pub fn skewness(values: &[f64]) -> f64 {
    let n = values.len();
    if n < 3 {
        return 0.0;
    }
    let mean = values.iter().mean();
    let (m2, m3) = values.iter().fold((0.0, 0.0), |(m2, m3), &x| {
        let d = x - mean;
        (m2 + d * d, m3 + d * d * d)
    });
    let nf = n as f64;
    let (m2, m3) = (m2 / nf, m3 / nf);
    if m2 <= 0.0 {
        return 0.0;
    }
    (nf * (nf - 1.0)).sqrt() / (nf - 2.0) * m3 / m2.powf(1.5)
}

/// Fraction of values outside `[Q1 − 1.5·IQR, Q3 + 1.5·IQR]`
#[must_use]
pub fn outlier_ratio(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    let sorted = sorted_copy(values);
    let q1 = quantile_sorted(&sorted, 0.25);
    let q3 = quantile_sorted(&sorted, 0.75);
    let iqr = q3 - q1;
    let (lo, hi) = (q1 - 1.5 * iqr, q3 + 1.5 * iqr);
    let outliers = values.iter().filter(|&&v| v < lo || v > hi).count();
    outliers as f64 / values.len() as f64
}

/// Two-sample Kolmogorov–Smirnov statistic: the largest gap between the
/// empirical CDFs of `a` and `b`
#[must_use]
pub fn ks_statistic(a: &[f64], b: &[f64]) -> f64 {
    if a.is_empty() || b.is_empty() {
        return 0.0;
    }
    let a = sorted_copy(a);
    let b = sorted_copy(b);
    let (na, nb) = (a.len() as f64, b.len() as f64);

    let (mut i, mut j) = (0, 0);
    let mut max_gap = 0.0_f64;
    while i < a.len() && j < b.len() {
        let x = a[i].min(b[j]);
        while i < a.len() && a[i] <= x {
            i += 1;
        }
        while j < b.len() && b[j] <= x {
            j += 1;
        }
        max_gap = max_gap.max((i as f64 / na - j as f64 / nb).abs());
    }
    max_gap
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SummaryStats {
    pub count: usize,
    pub mean: f64,
    /// Sample standard deviation (n − 1)
    pub std_dev: f64,
    pub min: f64,
    pub q1: f64,
    pub median: f64,
    pub q3: f64,
    pub max: f64,
}

impl SummaryStats {
    /// `None` for an empty slice
    #[must_use]
    pub fn from_values(values: &[f64]) -> Option<Self> {
        if values.is_empty() {
            return None;
        }
        let sorted = sorted_copy(values);
        let std_dev = if values.len() > 1 {
            values.iter().std_dev()
        } else {
            0.0
        };
        Some(Self {
            count: values.len(),
            mean: values.iter().mean(),
            std_dev,
            min: sorted[0],
            q1: quantile_sorted(&sorted, 0.25),
            median: quantile_sorted(&sorted, 0.5),
            q3: quantile_sorted(&sorted, 0.75),
            max: sorted[sorted.len() - 1],
        })
    }
}

/// Data-quality findings for one dataset
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QualityReport {
    pub summary: Option<SummaryStats>,
    /// Usable rows / supplied rows
    pub completeness: f64,
    pub outlier_ratio: f64,
    pub skewness: f64,
    /// In [0, 1]; penalized by missing data, outliers and skew
    pub quality_score: f64,
    pub criteria_columns: Vec<String>,
    pub issues: Vec<String>,
    pub warnings: Vec<String>,
    pub strengths: Vec<String>,
    pub recommendations: Vec<String>,
}

impl QualityReport {
    #[must_use]
    pub fn analyze(dataset: &AssayDataset) -> Self {
        let values = dataset.results();
        let completeness = if dataset.total_rows() == 0 {
            0.0
        } else {
            dataset.len() as f64 / dataset.total_rows() as f64
        };
        let outlier_ratio = outlier_ratio(values);
        let skewness = skewness(values);

        let mut report = Self {
            summary: SummaryStats::from_values(values),
            completeness,
            outlier_ratio,
            skewness,
            quality_score: (completeness * (1.0 - outlier_ratio) * (1.0 - skewness.abs() / 5.0))
                .clamp(0.0, 1.0),
            criteria_columns: dataset
                .criteria_columns()
                .iter()
                .map(|c| c.name.clone())
                .collect(),
            issues: Vec::new(),
            warnings: Vec::new(),
            strengths: Vec::new(),
            recommendations: Vec::new(),
        };

        if values.is_empty() {
            report.issues.push("No usable Results values".to_string());
            return report;
        }

        if completeness < MIN_COMPLETENESS {
            report
                .issues
                .push(format!("Low data completeness: {:.1}%", completeness * 100.0));
            report
                .recommendations
                .push("Consider cleaning data to remove missing values".to_string());
        } else {
            report
                .strengths
                .push(format!("Good data completeness: {:.1}%", completeness * 100.0));
        }

        if outlier_ratio > MAX_OUTLIER_RATIO {
            report
                .warnings
                .push(format!("High outlier ratio: {:.1}%", outlier_ratio * 100.0));
            report
                .recommendations
                .push("Review outliers for biological relevance".to_string());
        } else {
            report
                .strengths
                .push(format!("Low outlier ratio: {:.1}%", outlier_ratio * 100.0));
        }

        if skewness.abs() > MAX_ABS_SKEWNESS {
            report
                .warnings
                .push(format!("Highly skewed distribution: {skewness:.2}"));
            report
                .recommendations
                .push("Consider using KDE instead of lognormal distribution".to_string());
        } else {
            report
                .strengths
                .push(format!("Reasonable distribution skewness: {skewness:.2}"));
        }

        if values.iter().any(|&v| v <= 0.0) {
            report.warnings.push(format!(
                "{} non-positive values are ignored by the lognormal fit",
                values.iter().filter(|&&v| v <= 0.0).count()
            ));
        }

        report
    }
}

/// Fitted density at one quantile of the observed data
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DensityPoint {
    pub quantile: f64,
    pub value: f64,
    pub density: f64,
}

/// How closely synthetic draws from a fitted model match the observed values
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FitDiagnostics {
    pub model: String,
    /// Two-sample KS statistic, observed vs synthetic
    pub ks_statistic: f64,
    pub observed: SummaryStats,
    pub synthetic: SummaryStats,
    /// Model density at the observed quartiles
    pub quartile_density: Vec<DensityPoint>,
}

impl FitDiagnostics {
    /// Draw `draws` synthetic values from `model` with a seeded generator
    /// and compare them with `observed`. `None` when either side is empty.
    #[must_use]
    pub fn compare(
        model: &DistributionModel,
        observed: &[f64],
        draws: usize,
        seed: u64,
    ) -> Option<Self> {
        let mut rng = StdRng::seed_from_u64(seed);
        let synthetic_values = model.draw_n(&mut rng, draws);

        let observed_stats = SummaryStats::from_values(observed)?;
        let synthetic = SummaryStats::from_values(&synthetic_values)?;
        let quartile_density = [
            (0.25, observed_stats.q1),
            (0.5, observed_stats.median),
            (0.75, observed_stats.q3),
        ]
        .into_iter()
        .map(|(quantile, value)| DensityPoint {
            quantile,
            value,
            density: model.density(value),
        })
        .collect();

        Some(Self {
            model: model.label().to_string(),
            ks_statistic: ks_statistic(observed, &synthetic_values),
            observed: observed_stats,
            synthetic,
            quartile_density,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_quantiles_interpolate() {
        let sorted = [1.0, 2.0, 3.0, 4.0];
        assert_eq!(quantile_sorted(&sorted, 0.0), 1.0);
        assert_eq!(quantile_sorted(&sorted, 0.25), 1.75);
        assert_eq!(quantile_sorted(&sorted, 0.5), 2.5);
        assert_eq!(quantile_sorted(&sorted, 1.0), 4.0);
    }

    #[test]
    fn test_skewness_sign_and_symmetry() {
        assert!(skewness(&[1.0, 2.0, 3.0, 4.0, 5.0]).abs() < 1e-12);
        assert!(skewness(&[1.0, 1.0, 1.0, 2.0, 10.0]) > 1.0);
        assert!(skewness(&[-10.0, 1.0, 1.0, 1.0, 2.0]) < -1.0);
        assert_eq!(skewness(&[3.0, 3.0, 3.0]), 0.0);
        // Adjusted Fisher-Pearson on [1, 2, 3, 10]
        assert!((skewness(&[1.0, 2.0, 3.0, 10.0]) - 1.7636).abs() < 1e-3);
    }

    #[test]
    fn test_outlier_ratio() {
        let mut values: Vec<f64> = (1..=19).map(f64::from).collect();
        values.push(1000.0);
        assert!((outlier_ratio(&values) - 0.05).abs() < 1e-12);
        assert_eq!(outlier_ratio(&[1.0, 2.0, 3.0]), 0.0);
    }

    #[test]
    fn test_ks_statistic() {
        assert_eq!(ks_statistic(&[1.0, 2.0, 3.0], &[1.0, 2.0, 3.0]), 0.0);
        assert_eq!(ks_statistic(&[1.0, 2.0], &[3.0, 4.0]), 1.0);
        assert!((ks_statistic(&[1.0, 2.0, 3.0, 4.0], &[3.0, 4.0, 5.0, 6.0]) - 0.5).abs() < 1e-12);
    }

    #[test]
    fn test_report_flags_incomplete_skewed_data() {
        let mut results: Vec<Option<f64>> = (1..=40).map(|i| Some(f64::from(i).powi(4))).collect();
        results.extend(std::iter::repeat_n(None, 10));
        let dataset = AssayDataset::from_rows(results, vec![]).unwrap();
        let report = QualityReport::analyze(&dataset);

        assert!((report.completeness - 0.8).abs() < 1e-12);
        assert!(report.issues.iter().any(|i| i.contains("completeness")));
        assert!(report.quality_score < 0.8);
        assert!((0.0..=1.0).contains(&report.quality_score));
        assert_eq!(report.summary.unwrap().count, 40);
    }

    #[test]
    fn test_report_on_clean_data() {
        let dataset = AssayDataset::new((1..=100).map(f64::from).collect());
        let report = QualityReport::analyze(&dataset);
        assert_eq!(report.completeness, 1.0);
        assert!(report.issues.is_empty());
        assert!(report.warnings.is_empty());
        assert_eq!(report.strengths.len(), 3);
        assert!(report.quality_score > 0.95);
    }

    fn lognormal_values(mu: f64, sigma: f64, n: usize, seed: u64) -> Vec<f64> {
        use rand_distr::{Distribution, LogNormal};
        let mut rng = StdRng::seed_from_u64(seed);
        let dist = LogNormal::new(mu, sigma).unwrap();
        (0..n).map(|_| dist.sample(&mut rng)).collect()
    }

    #[test]
    fn test_fit_diagnostics_for_good_fit() {
        let observed = lognormal_values(0.0, 1.0, 2000, 42);
        let model = DistributionModel::fit_lognormal(&observed).unwrap();

        let diagnostics = FitDiagnostics::compare(&model, &observed, SYNTHETIC_DRAWS, 7).unwrap();

        assert_eq!(diagnostics.model, "lognormal");
        assert_eq!(diagnostics.synthetic.count, SYNTHETIC_DRAWS);
        assert!(
            diagnostics.ks_statistic < 0.05,
            "KS {} for a matching fit",
            diagnostics.ks_statistic
        );
        let median_gap = (diagnostics.synthetic.median - diagnostics.observed.median).abs();
        assert!(median_gap < 0.1 * diagnostics.observed.median);

        assert_eq!(diagnostics.quartile_density.len(), 3);
        assert!(diagnostics.quartile_density.iter().all(|p| p.density > 0.0));
        assert_eq!(diagnostics.quartile_density[1].value, diagnostics.observed.median);

        // Same seed, same synthetic sample
        assert_eq!(
            FitDiagnostics::compare(&model, &observed, SYNTHETIC_DRAWS, 7),
            Some(diagnostics)
        );
    }

    #[test]
    fn test_fit_diagnostics_detects_misfit() {
        let observed = lognormal_values(0.0, 1.0, 2000, 42);
        let shifted = DistributionModel::Lognormal {
            mu: 1.0,
            sigma: 1.0,
        };

        let diagnostics = FitDiagnostics::compare(&shifted, &observed, SYNTHETIC_DRAWS, 7).unwrap();
        assert!(diagnostics.ks_statistic > 0.25);

        assert!(FitDiagnostics::compare(&shifted, &[], SYNTHETIC_DRAWS, 7).is_none());
        assert!(FitDiagnostics::compare(&shifted, &observed, 0, 7).is_none());
    }
}
