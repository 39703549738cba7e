//! Predictor port: the opaque classifier's single capability.

use crate::domain::{EncodedFeatures, FeatureSchema};

/// Per-request failure of a model call.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ModelError {
    #[error("row encoded for schema {got} but model expects {expected}")]
    SchemaMismatch { expected: String, got: String },

    #[error("row has {got} features, model expects {expected}")]
    WidthMismatch { expected: usize, got: usize },

    #[error("model produced an invalid probability: {0}")]
    InvalidProbability(f64),

    #[error("exact attribution supports at most {max} features, row has {got}")]
    TooManyFeatures { max: usize, got: usize },

    #[error("attribution baseline has no background rows")]
    EmptyBackground,
}

/// Trait for the trained binary classifier.
///
/// Implementations are loaded once at startup and only read afterwards, so a
/// single instance can serve concurrent sessions.
pub trait Predictor: Send + Sync {
    /// Schema the model was trained on.
    fn schema(&self) -> &'static FeatureSchema;

    /// Probability of a VTE event (positive class) for one row.
    ///
    /// The row is only borrowed; implementations must not retain it.
    ///
    /// # Errors
    /// Returns `ModelError::SchemaMismatch` if the row was encoded against a
    /// different schema, or `ModelError::InvalidProbability` if the model
    /// output is not a finite value in `[0, 1]`.
    fn predict_probability(&self, features: &EncodedFeatures) -> Result<f64, ModelError>;
}

/// Reject rows encoded against another schema before they reach a model.
///
/// # Errors
/// Returns `ModelError::SchemaMismatch` or `ModelError::WidthMismatch`.
pub fn ensure_schema(
    schema: &FeatureSchema,
    features: &EncodedFeatures,
) -> Result<(), ModelError> {
    if !features.is_for(schema) {
        return Err(ModelError::SchemaMismatch {
            expected: format!("{} v{}", schema.name(), schema.version()),
            got: format!(
                "{} v{}",
                features.schema().name(),
                features.schema().version()
            ),
        });
    }
    if features.len() != schema.len() {
        return Err(ModelError::WidthMismatch {
            expected: schema.len(),
            got: features.len(),
        });
    }
    Ok(())
}

/// Reject probabilities outside `[0, 1]`.
///
/// # Errors
/// Returns `ModelError::InvalidProbability`.
pub fn ensure_probability(p: f64) -> Result<f64, ModelError> {
    if p.is_finite() && (0.0..=1.0).contains(&p) {
        Ok(p)
    } else {
        Err(ModelError::InvalidProbability(p))
    }
}
