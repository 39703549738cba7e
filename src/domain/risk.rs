//! Risk tiers and probability bucketing.

use serde::{Deserialize, Serialize};

/// Lower bound (inclusive) of the Moderate tier.
pub const DEFAULT_MODERATE_THRESHOLD: f64 = 0.4;

/// Lower bound (inclusive) of the High tier.
pub const DEFAULT_HIGH_THRESHOLD: f64 = 0.7;

/// Six-month VTE risk tier. Ordered `Low < Moderate < High`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum RiskTier {
    Low,
    Moderate,
    High,
}

impl RiskTier {
    /// Clinician-facing label, e.g. `Moderate Risk`.
    #[must_use]
    pub fn label(&self) -> &'static str {
        match self {
            Self::Low => "Low Risk",
            Self::Moderate => "Moderate Risk",
            Self::High => "High Risk",
        }
    }

    #[must_use]
    pub fn description(&self) -> &'static str {
        match self {
            Self::Low => "No specific thromboprophylaxis signal",
            Self::Moderate => "Close follow-up of coagulation markers advised",
            Self::High => "Consider prophylactic anticoagulation review",
        }
    }
}

impl std::fmt::Display for RiskTier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Low => write!(f, "LOW"),
            Self::Moderate => write!(f, "MODERATE"),
            Self::High => write!(f, "HIGH"),
        }
    }
}

/// The clinical policy that buckets a probability into a tier.
///
/// Intervals are half-open: `[0, moderate)` Low, `[moderate, high)` Moderate,
/// `[high, 1]` High.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RiskThresholds {
    moderate: f64,
    high: f64,
}

/// Rejected threshold pair.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
#[error("risk thresholds must satisfy 0 < moderate < high <= 1 (got moderate={moderate}, high={high})")]
pub struct InvalidThresholds {
    pub moderate: f64,
    pub high: f64,
}

impl Default for RiskThresholds {
    fn default() -> Self {
        Self {
            moderate: DEFAULT_MODERATE_THRESHOLD,
            high: DEFAULT_HIGH_THRESHOLD,
        }
    }
}

impl RiskThresholds {
    /// # Errors
    /// Returns [`InvalidThresholds`] unless `0 < moderate < high <= 1`.
    pub fn new(moderate: f64, high: f64) -> Result<Self, InvalidThresholds> {
        let ordered = moderate > 0.0 && moderate < high && high <= 1.0;
        if !ordered {
            return Err(InvalidThresholds { moderate, high });
        }
        Ok(Self { moderate, high })
    }

    #[must_use]
    pub fn moderate(&self) -> f64 {
        self.moderate
    }

    #[must_use]
    pub fn high(&self) -> f64 {
        self.high
    }

    /// Bucket a probability. Total: any input, including out-of-range values,
    /// lands in exactly one tier.
    #[must_use]
    pub fn classify(&self, probability: f64) -> RiskTier {
        if probability < self.moderate {
            RiskTier::Low
        } else if probability < self.high {
            RiskTier::Moderate
        } else {
            RiskTier::High
        }
    }
}

/// Classify with the default 0.4 / 0.7 policy.
#[must_use]
pub fn classify(probability: f64) -> RiskTier {
    RiskThresholds::default().classify(probability)
}

/// Probability of a VTE event within six months, guaranteed in `[0, 1]`.
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Serialize, Deserialize)]
pub struct PredictionResult(f64);

impl PredictionResult {
    /// Returns `None` for non-finite values or values outside `[0, 1]`.
    #[must_use]
    pub fn new(probability: f64) -> Option<Self> {
        (probability.is_finite() && (0.0..=1.0).contains(&probability)).then_some(Self(probability))
    }

    #[must_use]
    pub fn probability(&self) -> f64 {
        self.0
    }

    /// Percentage with two decimals, e.g. `37.25%`.
    #[must_use]
    pub fn percent(&self) -> String {
        format_percent(self.0)
    }
}

/// Render a fraction as a percentage with two decimals (`0.3725` -> `37.25%`).
#[must_use]
pub fn format_percent(fraction: f64) -> String {
    format!("{:.2}%", fraction * 100.0)
}

/// `12.34% - Low Risk`
#[must_use]
pub fn headline(result: PredictionResult, tier: RiskTier) -> String {
    format!("{} - {}", result.percent(), tier.label())
}

/// Full sentence shown above the report.
#[must_use]
pub fn headline_sentence(result: PredictionResult, tier: RiskTier) -> String {
    format!(
        "Your risk of developing VTE in the next 6 months is: {}",
        headline(result, tier)
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::{Rng, SeedableRng};
    use rand_chacha::ChaCha8Rng;

    #[test]
    fn test_tier_boundaries() {
        assert_eq!(classify(0.0), RiskTier::Low);
        assert_eq!(classify(0.39999), RiskTier::Low);
        assert_eq!(classify(0.4), RiskTier::Moderate);
        assert_eq!(classify(0.69999), RiskTier::Moderate);
        assert_eq!(classify(0.7), RiskTier::High);
        assert_eq!(classify(1.0), RiskTier::High);
    }

    #[test]
    fn test_classify_is_exhaustive_without_overlap() {
        let mut rng = ChaCha8Rng::seed_from_u64(42);
        for _ in 0..10_000 {
            let p: f64 = rng.gen_range(0.0..=1.0);
            let tier = classify(p);
            let expected = if p < 0.4 {
                RiskTier::Low
            } else if p < 0.7 {
                RiskTier::Moderate
            } else {
                RiskTier::High
            };
            assert_eq!(tier, expected, "p={p}");
        }
    }

    #[test]
    fn test_tier_ordering() {
        assert!(RiskTier::Low < RiskTier::Moderate);
        assert!(RiskTier::Moderate < RiskTier::High);
    }

    #[test]
    fn test_custom_thresholds() {
        let t = RiskThresholds::new(0.2, 0.5).expect("ordered");
        assert_eq!(t.classify(0.19), RiskTier::Low);
        assert_eq!(t.classify(0.2), RiskTier::Moderate);
        assert_eq!(t.classify(0.5), RiskTier::High);
    }

    #[test]
    fn test_invalid_thresholds_rejected() {
        assert!(RiskThresholds::new(0.7, 0.4).is_err());
        assert!(RiskThresholds::new(0.4, 0.4).is_err());
        assert!(RiskThresholds::new(0.0, 0.7).is_err());
        assert!(RiskThresholds::new(0.4, 1.2).is_err());
        assert!(RiskThresholds::new(f64::NAN, 0.7).is_err());
        assert!(RiskThresholds::new(0.4, 1.0).is_ok());
    }

    #[test]
    fn test_prediction_result_bounds() {
        assert!(PredictionResult::new(-0.01).is_none());
        assert!(PredictionResult::new(1.01).is_none());
        assert!(PredictionResult::new(f64::NAN).is_none());
        assert!(PredictionResult::new(0.0).is_some());
        assert!(PredictionResult::new(1.0).is_some());
    }

    #[test]
    fn test_headline_formatting() {
        let low = PredictionResult::new(0.1234).expect("in range");
        assert_eq!(headline(low, classify(low.probability())), "12.34% - Low Risk");

        let moderate = PredictionResult::new(0.4).expect("in range");
        assert_eq!(
            headline(moderate, classify(moderate.probability())),
            "40.00% - Moderate Risk"
        );

        let high = PredictionResult::new(0.98766).expect("in range");
        assert_eq!(
            headline_sentence(high, classify(high.probability())),
            "Your risk of developing VTE in the next 6 months is: 98.77% - High Risk"
        );
    }
}
