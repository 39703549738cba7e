//! Additive per-feature attribution of a single prediction.
//!
//! An [`Attribution`] splits a model output into a base value (the expected
//! output over the reference population) plus one signed contribution per
//! feature. Two views are derived from it: a ranking by magnitude and a
//! waterfall that walks from the base value to the model output.

use serde::{Deserialize, Serialize};

/// Absolute tolerance for `base_value + sum(contributions) == output`.
pub const ATTRIBUTION_TOLERANCE: f64 = 1e-6;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeatureContribution {
    pub feature: String,
    /// Encoded feature value the contribution was computed for.
    pub value: f64,
    /// Signed shift of the output caused by this feature.
    pub contribution: f64,
}

/// `(feature, |contribution|)` entry of the ranked view.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeatureImportance {
    pub feature: String,
    pub magnitude: f64,
}

/// One bar of the waterfall view.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WaterfallStep {
    pub feature: String,
    pub value: f64,
    pub contribution: f64,
    /// Running output before this step.
    pub start: f64,
    /// Running output after this step.
    pub end: f64,
}

impl WaterfallStep {
    /// Positive contributions push the risk up.
    #[must_use]
    pub fn increases_risk(&self) -> bool {
        self.contribution > 0.0
    }
}

/// Base value plus per-feature contributions, in classifier order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Attribution {
    pub base_value: f64,
    pub contributions: Vec<FeatureContribution>,
}

impl Attribution {
    /// `base_value + sum(contributions)`.
    #[must_use]
    pub fn reconstructed_output(&self) -> f64 {
        self.base_value
            + self
                .contributions
                .iter()
                .map(|c| c.contribution)
                .sum::<f64>()
    }

    /// Whether the decomposition adds back up to `output` within `tolerance`.
    #[must_use]
    pub fn reconciles_with(&self, output: f64, tolerance: f64) -> bool {
        (self.reconstructed_output() - output).abs() <= tolerance
    }

    /// Contribution magnitudes, largest first. Ties keep classifier order.
    #[must_use]
    pub fn importance(&self) -> Vec<FeatureImportance> {
        let mut ranked: Vec<FeatureImportance> = self
            .contributions
            .iter()
            .map(|c| FeatureImportance {
                feature: c.feature.clone(),
                magnitude: c.contribution.abs(),
            })
            .collect();
        ranked.sort_by(|a, b| b.magnitude.total_cmp(&a.magnitude));
        ranked
    }

    /// Steps from `base_value` to the model output, largest |contribution| first.
    #[must_use]
    pub fn waterfall(&self) -> Vec<WaterfallStep> {
        let mut ordered: Vec<&FeatureContribution> = self.contributions.iter().collect();
        ordered.sort_by(|a, b| b.contribution.abs().total_cmp(&a.contribution.abs()));

        let mut running = self.base_value;
        ordered
            .into_iter()
            .map(|c| {
                let start = running;
                running += c.contribution;
                WaterfallStep {
                    feature: c.feature.clone(),
                    value: c.value,
                    contribution: c.contribution,
                    start,
                    end: running,
                }
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Attribution {
        Attribution {
            base_value: 0.30,
            contributions: vec![
                FeatureContribution {
                    feature: "a".into(),
                    value: 1.0,
                    contribution: 0.05,
                },
                FeatureContribution {
                    feature: "b".into(),
                    value: 2.0,
                    contribution: -0.20,
                },
                FeatureContribution {
                    feature: "c".into(),
                    value: 3.0,
                    contribution: 0.20,
                },
                FeatureContribution {
                    feature: "d".into(),
                    value: 4.0,
                    contribution: 0.10,
                },
            ],
        }
    }

    #[test]
    fn test_reconstructed_output() {
        let a = sample();
        assert!((a.reconstructed_output() - 0.45).abs() < 1e-12);
        assert!(a.reconciles_with(0.45, ATTRIBUTION_TOLERANCE));
        assert!(!a.reconciles_with(0.46, ATTRIBUTION_TOLERANCE));
    }

    #[test]
    fn test_importance_sorted_by_magnitude_with_stable_ties() {
        let ranked = sample().importance();
        let names: Vec<&str> = ranked.iter().map(|r| r.feature.as_str()).collect();
        assert_eq!(names, vec!["b", "c", "d", "a"]);
        assert!(ranked.iter().all(|r| r.magnitude >= 0.0));
        assert!(ranked.windows(2).all(|w| w[0].magnitude >= w[1].magnitude));
    }

    #[test]
    fn test_waterfall_walks_from_base_to_output() {
        let a = sample();
        let steps = a.waterfall();
        assert_eq!(steps.len(), 4);
        assert!((steps[0].start - a.base_value).abs() < 1e-12);
        for w in steps.windows(2) {
            assert!((w[0].end - w[1].start).abs() < 1e-12);
        }
        let last = steps.last().expect("non-empty");
        assert!((last.end - a.reconstructed_output()).abs() < 1e-12);
        assert!(!steps[0].increases_risk());
        assert!(steps[1].increases_risk());
    }
}
