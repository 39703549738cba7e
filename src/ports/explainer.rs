//! Explainer port: per-feature attribution over the same classifier the
//! [`Predictor`](super::Predictor) wraps.

use crate::domain::{Attribution, EncodedFeatures, FeatureImportance};

use super::predictor::ModelError;

/// Trait for the attribution engine.
pub trait Explainer: Send + Sync {
    /// Additive decomposition: `base_value + sum(contributions)` equals the
    /// model's probability for `features`.
    ///
    /// # Errors
    /// Returns `ModelError` if the underlying model rejects a row.
    fn decompose(&self, features: &EncodedFeatures) -> Result<Attribution, ModelError>;

    /// `(feature, |contribution|)` ranked descending.
    ///
    /// # Errors
    /// Returns `ModelError` if the underlying model rejects a row.
    fn global_importance(
        &self,
        features: &EncodedFeatures,
    ) -> Result<Vec<FeatureImportance>, ModelError> {
        Ok(self.decompose(features)?.importance())
    }
}
