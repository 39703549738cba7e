//! Ports layer: Trait definitions for the opaque model collaborators.
//!
//! Following Hexagonal Architecture, these traits keep the pipeline
//! independent of how the classifier and the attribution engine are
//! implemented, so tests can run against deterministic stubs.

mod explainer;
mod predictor;

pub use explainer::Explainer;
pub use predictor::{ensure_probability, ensure_schema, ModelError, Predictor};
