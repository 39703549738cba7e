//! # NephroVTE
//!
//! Six-month venous thromboembolism (VTE) risk for patients with primary
//! membranous nephropathy (PMN).
//!
//! A clinician enters ten clinical and laboratory values. The crate encodes
//! them against a versioned feature schema, scores them with a pre-trained
//! classifier, buckets the probability into a risk tier, flags values outside
//! their reference ranges and explains the score with additive per-feature
//! contributions.
//!
//! ## Architecture
//!
//! The crate follows Hexagonal Architecture:
//! - `domain`: Schema, encoder, risk tiers, reference ranges, attribution math
//! - `ports`: `Predictor` and `Explainer` traits
//! - `adapters`: Trained model artifact and Shapley explainer
//! - `application`: Immutable risk context and the assessment pipeline
//! - `config`: Environment configuration
//! - `tui`: Terminal user interface

pub mod adapters;
pub mod application;
pub mod config;
pub mod domain;
pub mod ports;
pub mod tui;

pub use application::{RiskAssessment, RiskContext, RiskPipeline};
pub use domain::{PatientInput, RiskTier};

/// Result type for NephroVTE operations
pub type Result<T> = std::result::Result<T, VteError>;

/// Main error type for NephroVTE
#[derive(Debug, thiserror::Error)]
pub enum VteError {
    #[error("Invalid patient data: {0}")]
    Validation(#[from] domain::ValidationError),

    #[error(transparent)]
    UnsupportedIndicator(#[from] domain::UnsupportedIndicatorError),

    #[error("Failed to load model: {0}")]
    ModelLoad(#[from] adapters::ModelLoadError),

    #[error("Model error: {0}")]
    Model(#[from] ports::ModelError),

    #[error(
        "Attribution does not reconcile with prediction: probability={probability}, reconstructed={reconstructed}, tolerance={tolerance}"
    )]
    InconsistentAttribution {
        probability: f64,
        reconstructed: f64,
        tolerance: f64,
    },

    #[error("Invalid configuration: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}
