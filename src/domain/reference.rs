//! Reference ranges and per-indicator status annotation.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use super::patient::EncodedFeatures;

/// Inclusive normal interval `[low, high]`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ReferenceRange {
    pub low: f64,
    pub high: f64,
}

impl ReferenceRange {
    #[must_use]
    pub const fn new(low: f64, high: f64) -> Self {
        Self { low, high }
    }
}

/// Position of a value relative to its reference range.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum IndicatorStatus {
    Low,
    Normal,
    High,
}

impl std::fmt::Display for IndicatorStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Low => write!(f, "Low"),
            Self::Normal => write!(f, "Normal"),
            Self::High => write!(f, "High"),
        }
    }
}

/// Classify `value` against `range`; both bounds count as Normal.
#[must_use]
pub fn annotate(value: f64, range: ReferenceRange) -> IndicatorStatus {
    if value < range.low {
        IndicatorStatus::Low
    } else if value > range.high {
        IndicatorStatus::High
    } else {
        IndicatorStatus::Normal
    }
}

/// Caller asked for the status of a field that has no reference range.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("indicator '{indicator}' has no reference range")]
pub struct UnsupportedIndicatorError {
    pub indicator: String,
}

/// One row of the status table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IndicatorReading {
    pub indicator: String,
    pub value: f64,
    pub range: ReferenceRange,
    pub status: IndicatorStatus,
}

/// Read-only map from indicator key to its normal interval.
#[derive(Debug, Clone, PartialEq)]
pub struct ReferenceTable {
    ranges: BTreeMap<&'static str, ReferenceRange>,
}

impl ReferenceTable {
    /// Normal intervals for the seven continuous PMN VTE indicators.
    #[must_use]
    pub fn pmn_vte() -> Self {
        let ranges = BTreeMap::from([
            ("umALB/Ucr", ReferenceRange::new(0.0, 30.0)),
            ("DD", ReferenceRange::new(0.0, 0.55)),
            ("INR", ReferenceRange::new(0.96, 1.16)),
            ("ALB", ReferenceRange::new(40.0, 55.0)),
            ("AT III activity", ReferenceRange::new(79.4, 112.0)),
            ("aPLA2Rab", ReferenceRange::new(0.0, 14.0)),
            ("CHE", ReferenceRange::new(5.0, 12.0)),
        ]);
        Self { ranges }
    }

    #[must_use]
    pub fn range(&self, indicator: &str) -> Option<ReferenceRange> {
        self.ranges.get(indicator).copied()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.ranges.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.ranges.is_empty()
    }

    /// # Errors
    /// Returns [`UnsupportedIndicatorError`] for binary fields or unknown keys.
    pub fn annotate(
        &self,
        indicator: &str,
        value: f64,
    ) -> Result<IndicatorStatus, UnsupportedIndicatorError> {
        self.range(indicator)
            .map(|range| annotate(value, range))
            .ok_or_else(|| UnsupportedIndicatorError {
                indicator: indicator.to_string(),
            })
    }

    /// Status of every ranged indicator in the row, in classifier order.
    /// Fields without a range (the binary ones) are skipped.
    #[must_use]
    pub fn readings(&self, row: &EncodedFeatures) -> Vec<IndicatorReading> {
        row.iter()
            .filter_map(|(key, value)| {
                self.range(key).map(|range| IndicatorReading {
                    indicator: key.to_string(),
                    value,
                    range,
                    status: annotate(value, range),
                })
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::schema::FeatureSchema;
    use rand::{Rng, SeedableRng};
    use rand_chacha::ChaCha8Rng;

    #[test]
    fn test_inclusive_bounds_are_normal() {
        let range = ReferenceRange::new(0.96, 1.16);
        assert_eq!(annotate(0.96, range), IndicatorStatus::Normal);
        assert_eq!(annotate(1.16, range), IndicatorStatus::Normal);
        assert_eq!(annotate(0.95, range), IndicatorStatus::Low);
        assert_eq!(annotate(1.17, range), IndicatorStatus::High);
    }

    #[test]
    fn test_normal_iff_within_bounds() {
        let mut rng = ChaCha8Rng::seed_from_u64(11);
        for _ in 0..5_000 {
            let low: f64 = rng.gen_range(-10.0..10.0);
            let high = low + rng.gen_range(0.0..10.0);
            let value: f64 = rng.gen_range(-25.0..25.0);
            let status = annotate(value, ReferenceRange::new(low, high));
            assert_eq!(status == IndicatorStatus::Normal, low <= value && value <= high);
            if value < low {
                assert_eq!(status, IndicatorStatus::Low);
            }
            if value > high {
                assert_eq!(status, IndicatorStatus::High);
            }
        }
    }

    #[test]
    fn test_table_excludes_binary_fields() {
        let table = ReferenceTable::pmn_vte();
        assert_eq!(table.len(), 7);
        for key in ["Recurrent nephrotic syndrome", "Statins", "FDP > 5mg/L"] {
            assert_eq!(
                table.annotate(key, 1.0),
                Err(UnsupportedIndicatorError {
                    indicator: key.to_string()
                })
            );
        }
        assert!(table.annotate("Platelets", 1.0).is_err());
    }

    #[test]
    fn test_default_row_statuses() {
        let schema = FeatureSchema::pmn_vte();
        let row = EncodedFeatures::from_row(schema, schema.default_row()).expect("width");
        let readings = ReferenceTable::pmn_vte().readings(&row);

        let status = |key: &str| {
            readings
                .iter()
                .find(|r| r.indicator == key)
                .map(|r| r.status)
                .expect("indicator present")
        };

        assert_eq!(readings.len(), 7);
        assert_eq!(readings[0].indicator, "DD");
        assert_eq!(status("ALB"), IndicatorStatus::Low);
        assert_eq!(status("aPLA2Rab"), IndicatorStatus::High);
        assert_eq!(status("INR"), IndicatorStatus::High);
        assert_eq!(status("DD"), IndicatorStatus::High);
        assert_eq!(status("umALB/Ucr"), IndicatorStatus::Normal);
        assert_eq!(status("AT III activity"), IndicatorStatus::Normal);
        assert_eq!(status("CHE"), IndicatorStatus::Normal);
    }
}
