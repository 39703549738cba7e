//! Risk pipeline: Orchestrates one patient assessment.
//!
//! This service coordinates:
//! - Validation and encoding of the raw form values
//! - Probability from the predictor
//! - Risk tier bucketing
//! - Reference-range status of each continuous indicator
//! - Attribution, reconciled against the probability

use std::sync::Arc;

use crate::adapters::{ShapleyExplainer, TrainedModel};
use crate::domain::{
    encode, headline, headline_sentence, Attribution, EncodedFeatures, FeatureImportance,
    FeatureSchema, IndicatorReading, PatientInput, PredictionResult, ReferenceTable,
    RiskThresholds, RiskTier, WaterfallStep, ATTRIBUTION_TOLERANCE,
};
use crate::ports::{Explainer, ModelError, Predictor};
use crate::VteError;

/// Process-wide, read-only state: the loaded model, its explainer, the
/// reference table and the tier policy.
///
/// Built once at startup and never mutated, so it can be shared across
/// threads behind an `Arc` without locking.
pub struct RiskContext {
    schema: &'static FeatureSchema,
    predictor: Arc<dyn Predictor>,
    explainer: Arc<dyn Explainer>,
    references: ReferenceTable,
    thresholds: RiskThresholds,
    tolerance: f64,
}

impl RiskContext {
    /// Assemble a context from already-loaded collaborators.
    ///
    /// # Errors
    /// Returns `VteError::Model` if the predictor was trained on a different
    /// schema than `schema`.
    pub fn new(
        schema: &'static FeatureSchema,
        predictor: Arc<dyn Predictor>,
        explainer: Arc<dyn Explainer>,
        references: ReferenceTable,
        thresholds: RiskThresholds,
    ) -> Result<Self, VteError> {
        let trained_on = predictor.schema();
        if !schema.matches(&trained_on.stamp()) {
            return Err(VteError::Model(ModelError::SchemaMismatch {
                expected: format!("{} v{}", schema.name(), schema.version()),
                got: format!("{} v{}", trained_on.name(), trained_on.version()),
            }));
        }

        Ok(Self {
            schema,
            predictor,
            explainer,
            references,
            thresholds,
            tolerance: ATTRIBUTION_TOLERANCE,
        })
    }

    /// Context over a trained model, explained against its own background
    /// sample with the PMN VTE reference ranges.
    ///
    /// # Errors
    /// Returns `VteError::Model` if the explainer cannot be built.
    pub fn from_model(model: TrainedModel, thresholds: RiskThresholds) -> Result<Self, VteError> {
        let schema = model.schema();
        let background = model.background();
        let model = Arc::new(model);
        let explainer = ShapleyExplainer::new(Arc::clone(&model), background)?;

        Self::new(
            schema,
            model,
            Arc::new(explainer),
            ReferenceTable::pmn_vte(),
            thresholds,
        )
    }

    /// Override the reconciliation tolerance.
    #[must_use]
    pub fn with_tolerance(mut self, tolerance: f64) -> Self {
        self.tolerance = tolerance;
        self
    }

    #[must_use]
    pub fn schema(&self) -> &'static FeatureSchema {
        self.schema
    }

    #[must_use]
    pub fn references(&self) -> &ReferenceTable {
        &self.references
    }

    #[must_use]
    pub fn thresholds(&self) -> RiskThresholds {
        self.thresholds
    }

    #[must_use]
    pub fn tolerance(&self) -> f64 {
        self.tolerance
    }
}

/// Everything the presentation layer renders for one submission.
#[derive(Debug, Clone)]
pub struct RiskAssessment {
    /// Random id for log correlation. Not persisted.
    pub id: String,
    pub created_at: chrono::DateTime<chrono::Utc>,
    /// The row fed to both the predictor and the explainer.
    pub features: EncodedFeatures,
    pub prediction: PredictionResult,
    pub tier: RiskTier,
    pub readings: Vec<IndicatorReading>,
    pub importance: Vec<FeatureImportance>,
    pub attribution: Attribution,
}

impl RiskAssessment {
    #[must_use]
    pub fn probability(&self) -> f64 {
        self.prediction.probability()
    }

    /// `37.25% - Low Risk`
    #[must_use]
    pub fn headline(&self) -> String {
        headline(self.prediction, self.tier)
    }

    #[must_use]
    pub fn headline_sentence(&self) -> String {
        headline_sentence(self.prediction, self.tier)
    }

    #[must_use]
    pub fn waterfall(&self) -> Vec<WaterfallStep> {
        self.attribution.waterfall()
    }
}

/// Service for running the Submit transition over a shared context.
#[derive(Clone)]
pub struct RiskPipeline {
    context: Arc<RiskContext>,
}

impl RiskPipeline {
    /// Create a new pipeline over `context`.
    #[must_use]
    pub fn new(context: Arc<RiskContext>) -> Self {
        Self { context }
    }

    #[must_use]
    pub fn context(&self) -> &RiskContext {
        &self.context
    }

    /// Assess one patient.
    ///
    /// Validation runs before any model call; a rejected input never reaches
    /// the predictor or the explainer. The same encoded row feeds both.
    ///
    /// # Errors
    /// - `VteError::Validation` for missing, unknown, mistyped or out-of-range
    ///   fields
    /// - `VteError::Model` if a model call fails
    /// - `VteError::InconsistentAttribution` if the decomposition does not
    ///   add up to the probability
    pub fn assess(&self, input: &PatientInput) -> Result<RiskAssessment, VteError> {
        let ctx = &self.context;
        let id = uuid_v4();

        tracing::debug!("Assessment {id}: encoding {} fields", input.len());
        let features = encode(ctx.schema, input)?;

        tracing::debug!("Assessment {id}: predicting");
        let probability = ctx.predictor.predict_probability(&features)?;
        let prediction = PredictionResult::new(probability)
            .ok_or(VteError::Model(ModelError::InvalidProbability(probability)))?;
        let tier = ctx.thresholds.classify(prediction.probability());

        let readings = ctx.references.readings(&features);

        tracing::debug!("Assessment {id}: explaining");
        let attribution = ctx.explainer.decompose(&features)?;
        if !attribution.reconciles_with(probability, ctx.tolerance) {
            let reconstructed = attribution.reconstructed_output();
            tracing::error!(
                "Assessment {id}: attribution does not reconcile (delta={:e}, tolerance={:e})",
                (reconstructed - probability).abs(),
                ctx.tolerance
            );
            return Err(VteError::InconsistentAttribution {
                probability,
                reconstructed,
                tolerance: ctx.tolerance,
            });
        }
        let importance = attribution.importance();

        tracing::info!(
            "Assessment {id} complete: tier={tier}, out_of_range={}, schema={} v{}",
            readings
                .iter()
                .filter(|r| r.status != crate::domain::IndicatorStatus::Normal)
                .count(),
            ctx.schema.name(),
            ctx.schema.version()
        );

        Ok(RiskAssessment {
            id,
            created_at: chrono::Utc::now(),
            features,
            prediction,
            tier,
            readings,
            importance,
            attribution,
        })
    }
}

/// Random UUID v4 from a CSPRNG.
fn uuid_v4() -> String {
    use rand::{Rng, SeedableRng};
    use rand_chacha::ChaCha20Rng;

    let mut rng = ChaCha20Rng::from_entropy();
    let bytes: [u8; 16] = rng.gen();

    format!(
        "{:02x}{:02x}{:02x}{:02x}-{:02x}{:02x}-{:02x}{:02x}-{:02x}{:02x}-{:02x}{:02x}{:02x}{:02x}{:02x}{:02x}",
        bytes[0], bytes[1], bytes[2], bytes[3],
        bytes[4], bytes[5],
        (bytes[6] & 0x0f) | 0x40, bytes[7],
        (bytes[8] & 0x3f) | 0x80, bytes[9],
        bytes[10], bytes[11], bytes[12], bytes[13], bytes[14], bytes[15]
    )
}
