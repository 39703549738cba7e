//! Adapters layer: Concrete implementations of ports.
//!
//! - `model`: JSON artifact loading, SHA-256 manifest check, tree and
//!   logistic scorers
//! - `shapley`: exact Shapley attribution over any predictor

pub mod model;
pub mod shapley;

pub use model::{ModelLoadError, TrainedModel};
pub use shapley::ShapleyExplainer;
