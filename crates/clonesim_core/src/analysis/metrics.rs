//! Sensitivity scores and their classification.

use serde::{Deserialize, Serialize};

use super::SweepParameter;

/// Score above which a parameter is highly sensitive (percentage points)
pub const HIGH_SENSITIVITY: f64 = 20.0;
/// Score at or above which a parameter is moderately sensitive
pub const MEDIUM_SENSITIVITY: f64 = 10.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SensitivityBand {
    High,
    Medium,
    Low,
}

impl SensitivityBand {
    /// `> 20` High, `10..=20` Medium, `< 10` Low
    #[must_use]
    pub fn classify(score: f64) -> Self {
        if score > HIGH_SENSITIVITY {
            Self::High
        } else if score >= MEDIUM_SENSITIVITY {
            Self::Medium
        } else {
            Self::Low
        }
    }

    #[must_use]
    pub fn label(&self) -> &'static str {
        match self {
            Self::High => "High",
            Self::Medium => "Medium",
            Self::Low => "Low",
        }
    }
}

impl std::fmt::Display for SensitivityBand {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

/// Spread of success probabilities in percentage points: `100 × (max − min)`
#[must_use]
pub fn sensitivity_score(probabilities: &[f64]) -> f64 {
    if probabilities.is_empty() {
        return 0.0;
    }
    let (min, max) = min_max(probabilities);
    100.0 * (max - min)
}

fn min_max(values: &[f64]) -> (f64, f64) {
    values
        .iter()
        .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), &v| {
            (lo.min(v), hi.max(v))
        })
}

/// Outcome of sweeping a single parameter
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SensitivityRecord {
    pub parameter: SweepParameter,
    /// Probability of the unmodified workflow at the baseline correlation
    pub baseline_probability: f64,
    pub values: Vec<f64>,
    /// Success probability at each value, same order as `values`
    pub probabilities: Vec<f64>,
    pub min_probability: f64,
    pub max_probability: f64,
    pub score: f64,
    pub band: SensitivityBand,
}

impl SensitivityRecord {
    #[must_use]
    pub fn new(
        parameter: SweepParameter,
        baseline_probability: f64,
        values: Vec<f64>,
        probabilities: Vec<f64>,
    ) -> Self {
        let (min_probability, max_probability) = if probabilities.is_empty() {
            (baseline_probability, baseline_probability)
        } else {
            min_max(&probabilities)
        };
        let score = sensitivity_score(&probabilities);
        Self {
            parameter,
            baseline_probability,
            values,
            probabilities,
            min_probability,
            max_probability,
            score,
            band: SensitivityBand::classify(score),
        }
    }

    /// Tested value with the highest probability (first one on ties)
    #[must_use]
    pub fn best_value(&self) -> Option<f64> {
        self.values
            .iter()
            .zip(&self.probabilities)
            .fold(None, |best: Option<(f64, f64)>, (&v, &p)| match best {
                Some((_, bp)) if bp >= p => best,
                _ => Some((v, p)),
            })
            .map(|(v, _)| v)
    }
}

/// Records for every swept parameter of one workflow
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SensitivityResult {
    pub baseline_correlation: f64,
    pub baseline_probability: f64,
    pub records: Vec<SensitivityRecord>,
}

impl SensitivityResult {
    #[must_use]
    pub fn get(&self, parameter: SweepParameter) -> Option<&SensitivityRecord> {
        self.records.iter().find(|r| r.parameter == parameter)
    }

    /// Records by descending score
    #[must_use]
    pub fn ranked(&self) -> Vec<&SensitivityRecord> {
        let mut ranked: Vec<&SensitivityRecord> = self.records.iter().collect();
        ranked.sort_by(|a, b| b.score.total_cmp(&a.score));
        ranked
    }

    /// Parameters in the High band
    #[must_use]
    pub fn critical(&self) -> Vec<SweepParameter> {
        self.in_band(SensitivityBand::High)
    }

    /// Parameters in the Low band
    #[must_use]
    pub fn stable(&self) -> Vec<SweepParameter> {
        self.in_band(SensitivityBand::Low)
    }

    fn in_band(&self, band: SensitivityBand) -> Vec<SweepParameter> {
        self.records
            .iter()
            .filter(|r| r.band == band)
            .map(|r| r.parameter)
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_band_thresholds() {
        assert_eq!(SensitivityBand::classify(25.0), SensitivityBand::High);
        assert_eq!(SensitivityBand::classify(20.0), SensitivityBand::Medium);
        assert_eq!(SensitivityBand::classify(10.0), SensitivityBand::Medium);
        assert_eq!(SensitivityBand::classify(9.99), SensitivityBand::Low);
        assert_eq!(SensitivityBand::classify(0.0), SensitivityBand::Low);
    }

    #[test]
    fn test_twenty_five_point_spread_is_high() {
        let record = SensitivityRecord::new(
            SweepParameter::Step2Keep,
            0.3,
            vec![6.0, 12.0, 18.0],
            vec![0.10, 0.30, 0.35],
        );
        assert!((record.score - 25.0).abs() < 1e-9);
        assert_eq!(record.band, SensitivityBand::High);
        assert_eq!(record.min_probability, 0.10);
        assert_eq!(record.max_probability, 0.35);
        assert_eq!(record.best_value(), Some(18.0));
    }

    #[test]
    fn test_result_views() {
        let result = SensitivityResult {
            baseline_correlation: 0.5,
            baseline_probability: 0.4,
            records: vec![
                SensitivityRecord::new(SweepParameter::Step1Keep, 0.4, vec![1.0], vec![0.4]),
                SensitivityRecord::new(
                    SweepParameter::TopPercent,
                    0.4,
                    vec![1.0, 15.0],
                    vec![0.1, 0.9],
                ),
            ],
        };
        assert_eq!(result.ranked()[0].parameter, SweepParameter::TopPercent);
        assert_eq!(result.critical(), vec![SweepParameter::TopPercent]);
        assert_eq!(result.stable(), vec![SweepParameter::Step1Keep]);
        assert!(result.get(SweepParameter::Correlation).is_none());
    }
}
