//! Application layer: Use cases and services.
//!
//! This module wires the domain functions to the model ports to implement
//! the single use case of the application: assessing one patient.

mod pipeline;

pub use pipeline::{RiskAssessment, RiskContext, RiskPipeline};
