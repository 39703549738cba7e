//! Feature schema: the named, versioned column contract between the encoder
//! and the trained classifier.
//!
//! The order of [`FeatureSchema::fields`] is the order the classifier was
//! trained with. Reordering it silently corrupts every prediction, so the
//! model artifact carries a [`SchemaStamp`] that must match exactly before the
//! model is accepted.

use serde::{Deserialize, Serialize};

/// Label of the positive option of a binary field.
pub const YES: &str = "YES";

/// Label of the negative option of a binary field.
pub const NO: &str = "NO";

/// Declared kind of a schema field.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum FieldKind {
    /// Continuous lab value accepted within the inclusive `[min, max]`.
    Numeric { min: f64, max: f64, default: f64 },
    /// Two-valued YES/NO field, encoded as 1.0 / 0.0.
    Binary { default: bool },
}

impl FieldKind {
    #[must_use]
    pub fn is_binary(&self) -> bool {
        matches!(self, Self::Binary { .. })
    }
}

/// One column of the schema.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FieldSpec {
    /// Column key as seen by the classifier (e.g. `DD`, `aPLA2Rab`).
    pub key: &'static str,
    /// Clinician-facing label including units.
    pub label: &'static str,
    pub kind: FieldKind,
}

impl FieldSpec {
    /// Default value in encoded form.
    #[must_use]
    pub fn default_encoded(&self) -> f64 {
        match self.kind {
            FieldKind::Numeric { default, .. } => default,
            FieldKind::Binary { default } => {
                if default {
                    1.0
                } else {
                    0.0
                }
            }
        }
    }
}

/// Ordered, versioned set of fields.
#[derive(Debug, PartialEq)]
pub struct FeatureSchema {
    name: &'static str,
    version: u32,
    fields: &'static [FieldSpec],
    form_order: &'static [usize],
}

/// Serializable fingerprint of a schema, stored next to a model artifact.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SchemaStamp {
    pub name: String,
    pub version: u32,
    pub features: Vec<String>,
}

const PMN_VTE_FIELDS: [FieldSpec; 10] = [
    FieldSpec {
        key: "Recurrent nephrotic syndrome",
        label: "Recurrent nephrotic syndrome (YES/NO)",
        kind: FieldKind::Binary { default: false },
    },
    FieldSpec {
        key: "DD",
        label: "D-Dimer (mg/L)",
        kind: FieldKind::Numeric {
            min: 0.0,
            max: 2000.0,
            default: 1.0,
        },
    },
    FieldSpec {
        key: "umALB/Ucr",
        label: "umALB/Ucr (mg/g)",
        kind: FieldKind::Numeric {
            min: 0.0,
            max: 50000.0,
            default: 25.0,
        },
    },
    FieldSpec {
        key: "Statins",
        label: "Statins (YES/NO)",
        kind: FieldKind::Binary { default: false },
    },
    FieldSpec {
        key: "ALB",
        label: "Albumin (g/L)",
        kind: FieldKind::Numeric {
            min: 0.0,
            max: 2000.0,
            default: 19.0,
        },
    },
    FieldSpec {
        key: "CHE",
        label: "Cholinesterase (KU/L)",
        kind: FieldKind::Numeric {
            min: 0.0,
            max: 2000.0,
            default: 10.0,
        },
    },
    FieldSpec {
        key: "FDP > 5mg/L",
        label: "FDP > 5mg/L (YES/NO)",
        kind: FieldKind::Binary { default: false },
    },
    FieldSpec {
        key: "INR",
        label: "International Normalized Ratio (INR)",
        kind: FieldKind::Numeric {
            min: 0.5,
            max: 200.0,
            default: 1.80,
        },
    },
    FieldSpec {
        key: "aPLA2Rab",
        label: "PLA2R Antibody (RU/ml)",
        kind: FieldKind::Numeric {
            min: 0.0,
            max: 2000.0,
            default: 105.0,
        },
    },
    FieldSpec {
        key: "AT III activity",
        label: "AT III activity (%)",
        kind: FieldKind::Numeric {
            min: 0.0,
            max: 2000.0,
            default: 89.0,
        },
    },
];

// Order in which the entry form presents the fields (indices into PMN_VTE_FIELDS).
const PMN_VTE_FORM_ORDER: [usize; 10] = [0, 2, 3, 1, 6, 7, 9, 4, 8, 5];

static PMN_VTE_SCHEMA: FeatureSchema = FeatureSchema {
    name: "pmn-vte",
    version: 1,
    fields: &PMN_VTE_FIELDS,
    form_order: &PMN_VTE_FORM_ORDER,
};

impl FeatureSchema {
    /// The ten-field PMN VTE schema the shipped classifier was trained on.
    #[must_use]
    pub fn pmn_vte() -> &'static FeatureSchema {
        &PMN_VTE_SCHEMA
    }

    #[must_use]
    pub fn name(&self) -> &'static str {
        self.name
    }

    #[must_use]
    pub fn version(&self) -> u32 {
        self.version
    }

    /// Fields in classifier order.
    #[must_use]
    pub fn fields(&self) -> &'static [FieldSpec] {
        self.fields
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.fields.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    #[must_use]
    pub fn field(&self, key: &str) -> Option<&'static FieldSpec> {
        self.fields.iter().find(|f| f.key == key)
    }

    #[must_use]
    pub fn index_of(&self, key: &str) -> Option<usize> {
        self.fields.iter().position(|f| f.key == key)
    }

    /// Fields in the order the entry form presents them.
    pub fn form_fields(&self) -> impl Iterator<Item = &'static FieldSpec> + '_ {
        self.form_order.iter().map(|&i| &self.fields[i])
    }

    /// Encoded defaults in classifier order.
    #[must_use]
    pub fn default_row(&self) -> Vec<f64> {
        self.fields.iter().map(FieldSpec::default_encoded).collect()
    }

    #[must_use]
    pub fn stamp(&self) -> SchemaStamp {
        SchemaStamp {
            name: self.name.to_string(),
            version: self.version,
            features: self.fields.iter().map(|f| f.key.to_string()).collect(),
        }
    }

    /// True when a stamp names exactly this schema, version and column order.
    #[must_use]
    pub fn matches(&self, stamp: &SchemaStamp) -> bool {
        stamp.name == self.name
            && stamp.version == self.version
            && stamp.features.len() == self.fields.len()
            && stamp
                .features
                .iter()
                .zip(self.fields.iter())
                .all(|(s, f)| s == f.key)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_schema_has_ten_fields_in_classifier_order() {
        let schema = FeatureSchema::pmn_vte();
        let keys: Vec<&str> = schema.fields().iter().map(|f| f.key).collect();
        assert_eq!(
            keys,
            vec![
                "Recurrent nephrotic syndrome",
                "DD",
                "umALB/Ucr",
                "Statins",
                "ALB",
                "CHE",
                "FDP > 5mg/L",
                "INR",
                "aPLA2Rab",
                "AT III activity",
            ]
        );
        assert_eq!(schema.len(), 10);
    }

    #[test]
    fn test_form_order_covers_every_field_once() {
        let schema = FeatureSchema::pmn_vte();
        let mut seen: Vec<&str> = schema.form_fields().map(|f| f.key).collect();
        assert_eq!(seen[0], "Recurrent nephrotic syndrome");
        assert_eq!(seen[1], "umALB/Ucr");
        assert_eq!(seen[9], "CHE");
        seen.sort_unstable();
        seen.dedup();
        assert_eq!(seen.len(), schema.len());
    }

    #[test]
    fn test_stamp_roundtrip_matches() {
        let schema = FeatureSchema::pmn_vte();
        let stamp = schema.stamp();
        assert!(schema.matches(&stamp));

        let mut reordered = stamp.clone();
        reordered.features.swap(1, 2);
        assert!(!schema.matches(&reordered));

        let mut bumped = stamp;
        bumped.version += 1;
        assert!(!schema.matches(&bumped));
    }

    #[test]
    fn test_default_row() {
        let row = FeatureSchema::pmn_vte().default_row();
        assert_eq!(
            row,
            vec![0.0, 1.0, 25.0, 0.0, 19.0, 10.0, 0.0, 1.80, 105.0, 89.0]
        );
    }
}
