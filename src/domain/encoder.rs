//! Feature encoder: raw form values to the classifier's numeric row.

use super::patient::{EncodedFeatures, PatientInput, RawValue};
use super::schema::{FeatureSchema, FieldKind, NO, YES};

/// A rejected form value. Every variant names the offending field.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ValidationError {
    #[error("{field}: value is required")]
    MissingField { field: String },

    #[error("{field}: not part of schema")]
    UnknownField { field: String },

    #[error("{field}: expected a {expected} value")]
    WrongKind {
        field: String,
        expected: &'static str,
    },

    #[error("{field}: value must be a finite number")]
    NotFinite { field: String },

    #[error("{field}: {value} is below the minimum {min}")]
    BelowMinimum { field: String, value: f64, min: f64 },

    #[error("{field}: {value} is above the maximum {max}")]
    AboveMaximum { field: String, value: f64, max: f64 },

    #[error("{field}: '{value}' is not one of YES/NO")]
    UnknownCategory { field: String, value: String },
}

impl ValidationError {
    /// Key of the field that failed.
    #[must_use]
    pub fn field(&self) -> &str {
        match self {
            Self::MissingField { field }
            | Self::UnknownField { field }
            | Self::WrongKind { field, .. }
            | Self::NotFinite { field }
            | Self::BelowMinimum { field, .. }
            | Self::AboveMaximum { field, .. }
            | Self::UnknownCategory { field, .. } => field,
        }
    }
}

/// Encode one submission into a row in `schema` order.
///
/// Numeric values pass through unchanged but must lie inside the field's
/// inclusive bounds; they are never clamped. Binary fields accept exactly
/// `YES` (1.0) or `NO` (0.0). The first failure in classifier order is
/// returned.
///
/// # Errors
/// Returns [`ValidationError`] for missing, unknown, mistyped, non-finite,
/// out-of-range, or unrecognized values.
pub fn encode(
    schema: &'static FeatureSchema,
    input: &PatientInput,
) -> Result<EncodedFeatures, ValidationError> {
    let mut row = Vec::with_capacity(schema.len());

    for field in schema.fields() {
        let raw = input
            .get(field.key)
            .ok_or_else(|| ValidationError::MissingField {
                field: field.key.to_string(),
            })?;

        let encoded = match (field.kind, raw) {
            (FieldKind::Numeric { min, max, .. }, RawValue::Numeric(value)) => {
                let value = *value;
                if !value.is_finite() {
                    return Err(ValidationError::NotFinite {
                        field: field.key.to_string(),
                    });
                }
                if value < min {
                    return Err(ValidationError::BelowMinimum {
                        field: field.key.to_string(),
                        value,
                        min,
                    });
                }
                if value > max {
                    return Err(ValidationError::AboveMaximum {
                        field: field.key.to_string(),
                        value,
                        max,
                    });
                }
                value
            }
            (FieldKind::Binary { .. }, RawValue::Choice(label)) => match label.as_str() {
                YES => 1.0,
                NO => 0.0,
                other => {
                    return Err(ValidationError::UnknownCategory {
                        field: field.key.to_string(),
                        value: other.to_string(),
                    })
                }
            },
            (FieldKind::Numeric { .. }, RawValue::Choice(_)) => {
                return Err(ValidationError::WrongKind {
                    field: field.key.to_string(),
                    expected: "numeric",
                })
            }
            (FieldKind::Binary { .. }, RawValue::Numeric(_)) => {
                return Err(ValidationError::WrongKind {
                    field: field.key.to_string(),
                    expected: "YES/NO",
                })
            }
        };
        row.push(encoded);
    }

    if let Some(extra) = input.keys().find(|k| schema.field(k).is_none()) {
        return Err(ValidationError::UnknownField {
            field: extra.to_string(),
        });
    }

    Ok(EncodedFeatures::from_encoded(schema, row))
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::{Rng, SeedableRng};
    use rand_chacha::ChaCha8Rng;

    fn schema() -> &'static FeatureSchema {
        FeatureSchema::pmn_vte()
    }

    #[test]
    fn test_golden_vector_for_defaults() {
        let input = PatientInput::new()
            .with_choice("Recurrent nephrotic syndrome", "NO")
            .with_numeric("umALB/Ucr", 25.0)
            .with_choice("Statins", "NO")
            .with_numeric("DD", 1.0)
            .with_choice("FDP > 5mg/L", "NO")
            .with_numeric("INR", 1.80)
            .with_numeric("AT III activity", 89.0)
            .with_numeric("ALB", 19.0)
            .with_numeric("aPLA2Rab", 105.0)
            .with_numeric("CHE", 10.0);

        let encoded = encode(schema(), &input).expect("defaults are valid");
        assert_eq!(
            encoded.as_slice(),
            &[0.0, 1.0, 25.0, 0.0, 19.0, 10.0, 0.0, 1.80, 105.0, 89.0]
        );
    }

    #[test]
    fn test_binary_fields_encode_yes_as_one() {
        let input = PatientInput::defaults(schema())
            .with_choice("Recurrent nephrotic syndrome", "YES")
            .with_choice("Statins", "YES")
            .with_choice("FDP > 5mg/L", "YES");
        let encoded = encode(schema(), &input).expect("valid");
        assert_eq!(encoded.get("Recurrent nephrotic syndrome"), Some(1.0));
        assert_eq!(encoded.get("Statins"), Some(1.0));
        assert_eq!(encoded.get("FDP > 5mg/L"), Some(1.0));
    }

    #[test]
    fn test_unknown_category_rejected() {
        let input = PatientInput::defaults(schema()).with_choice("Statins", "Maybe");
        let err = encode(schema(), &input).expect_err("Maybe is not YES/NO");
        assert_eq!(
            err,
            ValidationError::UnknownCategory {
                field: "Statins".into(),
                value: "Maybe".into()
            }
        );
        assert_eq!(err.field(), "Statins");
    }

    #[test]
    fn test_lowercase_yes_rejected() {
        let input = PatientInput::defaults(schema()).with_choice("Statins", "yes");
        assert!(matches!(
            encode(schema(), &input),
            Err(ValidationError::UnknownCategory { .. })
        ));
    }

    #[test]
    fn test_out_of_range_names_bound() {
        let below = PatientInput::defaults(schema()).with_numeric("INR", 0.49);
        assert_eq!(
            encode(schema(), &below).expect_err("below min"),
            ValidationError::BelowMinimum {
                field: "INR".into(),
                value: 0.49,
                min: 0.5
            }
        );

        let above = PatientInput::defaults(schema()).with_numeric("umALB/Ucr", 50000.5);
        assert_eq!(
            encode(schema(), &above).expect_err("above max"),
            ValidationError::AboveMaximum {
                field: "umALB/Ucr".into(),
                value: 50000.5,
                max: 50000.0
            }
        );
    }

    #[test]
    fn test_bounds_are_inclusive() {
        let input = PatientInput::defaults(schema())
            .with_numeric("INR", 0.5)
            .with_numeric("DD", 2000.0)
            .with_numeric("ALB", 0.0);
        assert!(encode(schema(), &input).is_ok());
    }

    #[test]
    fn test_missing_unknown_and_mistyped_fields() {
        let mut missing = PatientInput::new();
        for field in schema().fields().iter().filter(|f| f.key != "CHE") {
            missing = match field.kind {
                FieldKind::Numeric { default, .. } => missing.with_numeric(field.key, default),
                FieldKind::Binary { .. } => missing.with_choice(field.key, "NO"),
            };
        }
        assert_eq!(
            encode(schema(), &missing).expect_err("CHE missing"),
            ValidationError::MissingField { field: "CHE".into() }
        );

        let extra = PatientInput::defaults(schema()).with_numeric("Platelets", 200.0);
        assert_eq!(
            encode(schema(), &extra).expect_err("unknown key"),
            ValidationError::UnknownField {
                field: "Platelets".into()
            }
        );

        let mistyped = PatientInput::defaults(schema()).with_numeric("Statins", 1.0);
        assert!(matches!(
            encode(schema(), &mistyped),
            Err(ValidationError::WrongKind { .. })
        ));

        let nan = PatientInput::defaults(schema()).with_numeric("DD", f64::NAN);
        assert_eq!(
            encode(schema(), &nan).expect_err("nan"),
            ValidationError::NotFinite { field: "DD".into() }
        );
    }

    #[test]
    fn test_sampled_inputs_pass_through_unchanged() {
        let mut rng = ChaCha8Rng::seed_from_u64(7);
        for _ in 0..200 {
            let mut input = PatientInput::new();
            let mut expected = Vec::new();
            for field in schema().fields() {
                match field.kind {
                    FieldKind::Numeric { min, max, .. } => {
                        let v = rng.gen_range(min..=max);
                        input = input.with_numeric(field.key, v);
                        expected.push(v);
                    }
                    FieldKind::Binary { .. } => {
                        let yes = rng.gen_bool(0.5);
                        input = input.with_choice(field.key, if yes { YES } else { NO });
                        expected.push(if yes { 1.0 } else { 0.0 });
                    }
                }
            }
            let encoded = encode(schema(), &input).expect("sampled within bounds");
            assert_eq!(encoded.len(), 10);
            assert_eq!(encoded.as_slice(), expected.as_slice());
        }
    }
}
