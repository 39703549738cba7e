//! Patient input and its encoded feature row.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use super::schema::{FeatureSchema, FieldKind, NO, YES};

/// A raw value as entered on the form.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RawValue {
    Numeric(f64),
    Choice(String),
}

/// One submission: field key to raw value.
///
/// Built fresh per prediction request and only borrowed by the pipeline, so
/// the submitted values cannot change underneath a running assessment.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PatientInput {
    values: BTreeMap<String, RawValue>,
}

impl PatientInput {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Input pre-filled with every schema default.
    #[must_use]
    pub fn defaults(schema: &FeatureSchema) -> Self {
        let mut input = Self::new();
        for field in schema.fields() {
            let value = match field.kind {
                FieldKind::Numeric { default, .. } => RawValue::Numeric(default),
                FieldKind::Binary { default } => {
                    RawValue::Choice(if default { YES } else { NO }.to_string())
                }
            };
            input.values.insert(field.key.to_string(), value);
        }
        input
    }

    #[must_use]
    pub fn with_numeric(mut self, key: impl Into<String>, value: f64) -> Self {
        self.values.insert(key.into(), RawValue::Numeric(value));
        self
    }

    #[must_use]
    pub fn with_choice(mut self, key: impl Into<String>, label: impl Into<String>) -> Self {
        self.values.insert(key.into(), RawValue::Choice(label.into()));
        self
    }

    #[must_use]
    pub fn get(&self, key: &str) -> Option<&RawValue> {
        self.values.get(key)
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.values.keys().map(String::as_str)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.values.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

/// Numeric row in classifier order, tied to the schema that produced it.
#[derive(Debug, Clone, PartialEq)]
pub struct EncodedFeatures {
    schema: &'static FeatureSchema,
    values: Vec<f64>,
}

impl EncodedFeatures {
    /// Wrap an already-encoded row.
    ///
    /// Returns `None` when the row width does not match the schema.
    #[must_use]
    pub fn from_row(schema: &'static FeatureSchema, values: Vec<f64>) -> Option<Self> {
        (values.len() == schema.len()).then_some(Self { schema, values })
    }

    pub(crate) fn from_encoded(schema: &'static FeatureSchema, values: Vec<f64>) -> Self {
        debug_assert_eq!(values.len(), schema.len());
        Self { schema, values }
    }

    /// Same schema, different values. Used to build hybrid rows for attribution.
    pub(crate) fn with_values(&self, values: Vec<f64>) -> Self {
        debug_assert_eq!(values.len(), self.values.len());
        Self {
            schema: self.schema,
            values,
        }
    }

    #[must_use]
    pub fn schema(&self) -> &'static FeatureSchema {
        self.schema
    }

    #[must_use]
    pub fn as_slice(&self) -> &[f64] {
        &self.values
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.values.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    #[must_use]
    pub fn get(&self, key: &str) -> Option<f64> {
        self.schema.index_of(key).map(|i| self.values[i])
    }

    /// `(key, value)` pairs in classifier order.
    pub fn iter(&self) -> impl Iterator<Item = (&'static str, f64)> + '_ {
        self.schema
            .fields()
            .iter()
            .zip(self.values.iter())
            .map(|(f, v)| (f.key, *v))
    }

    /// True when this row was encoded against `schema` (same name and version).
    #[must_use]
    pub fn is_for(&self, schema: &FeatureSchema) -> bool {
        self.schema.name() == schema.name() && self.schema.version() == schema.version()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_cover_schema() {
        let schema = FeatureSchema::pmn_vte();
        let input = PatientInput::defaults(schema);
        assert_eq!(input.len(), schema.len());
        assert_eq!(input.get("DD"), Some(&RawValue::Numeric(1.0)));
        assert_eq!(
            input.get("Statins"),
            Some(&RawValue::Choice("NO".to_string()))
        );
    }

    #[test]
    fn test_builder_overrides() {
        let input = PatientInput::defaults(FeatureSchema::pmn_vte())
            .with_numeric("ALB", 42.0)
            .with_choice("FDP > 5mg/L", "YES");
        assert_eq!(input.get("ALB"), Some(&RawValue::Numeric(42.0)));
        assert_eq!(
            input.get("FDP > 5mg/L"),
            Some(&RawValue::Choice("YES".to_string()))
        );
    }

    #[test]
    fn test_from_row_rejects_wrong_width() {
        let schema = FeatureSchema::pmn_vte();
        assert!(EncodedFeatures::from_row(schema, vec![0.0; 9]).is_none());
        let row = EncodedFeatures::from_row(schema, schema.default_row()).expect("width matches");
        assert_eq!(row.get("INR"), Some(1.80));
        assert!(row.is_for(schema));
    }

    #[test]
    fn test_raw_value_json_shape() {
        let input = PatientInput::new()
            .with_numeric("DD", 0.5)
            .with_choice("Statins", "YES");
        let json = serde_json::to_string(&input).expect("serialize");
        assert_eq!(json, r#"{"values":{"DD":0.5,"Statins":"YES"}}"#);
        let back: PatientInput = serde_json::from_str(&json).expect("deserialize");
        assert_eq!(back, input);
    }
}
