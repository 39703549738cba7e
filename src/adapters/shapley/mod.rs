//! Exact interventional Shapley attribution.
//!
//! The value of a coalition `S` is the mean model output over the
//! background rows with the features in `S` taken from the patient:
//!
//! ```text
//! v(S)   = mean_k f(x_S, b_k,not S)
//! phi_i  = sum_{S without i} |S|! (n - |S| - 1)! / n! * (v(S + i) - v(S))
//! base   = v({})
//! ```
//!
//! All `2^n` coalitions are enumerated, so `base + sum(phi) == f(x)` holds up
//! to floating point rounding. Rows are capped at [`MAX_EXACT_FEATURES`].

use std::sync::Arc;

use crate::domain::{Attribution, EncodedFeatures, FeatureContribution};
use crate::ports::{ensure_schema, Explainer, ModelError, Predictor};

/// Largest row width the exact enumeration accepts.
pub const MAX_EXACT_FEATURES: usize = 16;

/// Shapley explainer bound to one predictor and its background sample.
pub struct ShapleyExplainer<P: Predictor + ?Sized> {
    model: Arc<P>,
    background: Vec<EncodedFeatures>,
}

impl<P: Predictor + ?Sized> ShapleyExplainer<P> {
    /// # Errors
    /// Returns `ModelError::EmptyBackground` if `background` is empty,
    /// `ModelError::TooManyFeatures` if the schema is too wide to enumerate,
    /// or a schema error if a background row does not match the model.
    pub fn new(model: Arc<P>, background: Vec<EncodedFeatures>) -> Result<Self, ModelError> {
        if background.is_empty() {
            return Err(ModelError::EmptyBackground);
        }
        let schema = model.schema();
        if schema.len() > MAX_EXACT_FEATURES {
            return Err(ModelError::TooManyFeatures {
                max: MAX_EXACT_FEATURES,
                got: schema.len(),
            });
        }
        for row in &background {
            ensure_schema(schema, row)?;
        }
        Ok(Self { model, background })
    }

    #[must_use]
    pub fn background_len(&self) -> usize {
        self.background.len()
    }

    /// `v(S)` for every coalition mask.
    fn coalition_values(&self, features: &EncodedFeatures) -> Result<Vec<f64>, ModelError> {
        let n = features.len();
        let x = features.as_slice();
        let k = self.background.len() as f64;
        let mut values = Vec::with_capacity(1 << n);

        for mask in 0u32..(1u32 << n) {
            let mut total = 0.0;
            for row in &self.background {
                let hybrid: Vec<f64> = row
                    .as_slice()
                    .iter()
                    .enumerate()
                    .map(|(i, b)| if mask & (1 << i) != 0 { x[i] } else { *b })
                    .collect();
                total += self.model.predict_probability(&features.with_values(hybrid))?;
            }
            values.push(total / k);
        }
        Ok(values)
    }
}

/// `|S|! (n - |S| - 1)! / n!` indexed by `|S|`.
fn coalition_weights(n: usize) -> Vec<f64> {
    let mut factorial = vec![1.0_f64; n + 1];
    for i in 1..=n {
        factorial[i] = factorial[i - 1] * i as f64;
    }
    (0..n)
        .map(|s| factorial[s] * factorial[n - s - 1] / factorial[n])
        .collect()
}

impl<P: Predictor + ?Sized> Explainer for ShapleyExplainer<P> {
    fn decompose(&self, features: &EncodedFeatures) -> Result<Attribution, ModelError> {
        ensure_schema(self.model.schema(), features)?;
        let n = features.len();
        if n > MAX_EXACT_FEATURES {
            return Err(ModelError::TooManyFeatures {
                max: MAX_EXACT_FEATURES,
                got: n,
            });
        }

        let values = self.coalition_values(features)?;
        let weights = coalition_weights(n);

        let contributions = features
            .iter()
            .enumerate()
            .map(|(i, (key, value))| {
                let bit = 1usize << i;
                let phi = (0..values.len())
                    .filter(|mask| mask & bit == 0)
                    .map(|mask| {
                        weights[mask.count_ones() as usize] * (values[mask | bit] - values[mask])
                    })
                    .sum();
                FeatureContribution {
                    feature: key.to_string(),
                    value,
                    contribution: phi,
                }
            })
            .collect();

        tracing::debug!(
            "Shapley decomposition over {} coalitions x {} background rows",
            values.len(),
            self.background.len()
        );

        Ok(Attribution {
            base_value: values[0],
            contributions,
        })
    }
}
