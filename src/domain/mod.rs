//! Domain layer: schema, patient input, encoding, risk tiers, reference
//! ranges and attribution math.
//!
//! Everything here is pure and free of I/O; model access lives behind the
//! traits in [`crate::ports`].

mod attribution;
mod encoder;
mod patient;
mod reference;
mod risk;
mod schema;

pub use attribution::{
    Attribution, FeatureContribution, FeatureImportance, WaterfallStep, ATTRIBUTION_TOLERANCE,
};
pub use encoder::{encode, ValidationError};
pub use patient::{EncodedFeatures, PatientInput, RawValue};
pub use reference::{
    annotate, IndicatorReading, IndicatorStatus, ReferenceRange, ReferenceTable,
    UnsupportedIndicatorError,
};
pub use risk::{
    classify, format_percent, headline, headline_sentence, InvalidThresholds, PredictionResult,
    RiskThresholds, RiskTier, DEFAULT_HIGH_THRESHOLD, DEFAULT_MODERATE_THRESHOLD,
};
pub use schema::{FeatureSchema, FieldKind, FieldSpec, SchemaStamp, NO, YES};
