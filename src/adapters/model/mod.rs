//! Model adapter: loads the trained classifier artifact and implements
//! [`Predictor`] over it.
//!
//! # Artifact layout
//!
//! A model directory holds:
//! - `model.json`: schema stamp, scorer parameters and the background sample
//!   used as the attribution baseline.
//! - `manifest.json`: SHA-256 digests binding the files that may be loaded.
//!
//! # Integrity
//!
//! Every file listed in the manifest is hashed and compared before the model
//! is parsed. Release builds refuse to load a directory without a manifest.
//! Debug builds may bypass the check with `NEPHROVTE_ALLOW_UNVERIFIED_MODEL=true`
//! for local experiments; the bypass is logged at `warn`.
//!
//! # Scoring
//!
//! - `gradient_boosted_trees`: margin is `base_score` plus one leaf value per
//!   tree, where a split routes `x[feature] < threshold` to `left`.
//! - `logistic`: margin is `intercept + sum(coef_i * (x_i - mean_i) / scale_i)`.
//!
//! Both map the margin through the logistic sigmoid.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Component, Path, PathBuf};

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::domain::{EncodedFeatures, FeatureSchema, SchemaStamp};
use crate::ports::{ensure_probability, ensure_schema, ModelError, Predictor};

/// File name of the model parameters inside a model directory.
pub const MODEL_FILE: &str = "model.json";

/// File name of the integrity manifest inside a model directory.
pub const MANIFEST_FILE: &str = "manifest.json";

/// Only manifest format understood by this build.
const MANIFEST_VERSION: u32 = 1;

/// Environment variable allowing an unverified model in debug builds.
pub const ALLOW_UNVERIFIED_MODEL_ENV: &str = "NEPHROVTE_ALLOW_UNVERIFIED_MODEL";

/// Startup failure: the classifier cannot be served.
#[derive(Debug, thiserror::Error)]
pub enum ModelLoadError {
    #[error("model path not found: {0:?}")]
    NotFound(PathBuf),

    #[error("failed to read {path:?}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to write {path:?}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid {file}: {message}")]
    Format { file: String, message: String },

    #[error("integrity check failed: {0}")]
    Integrity(String),

    #[error("model trained on schema {got}, expected {expected}")]
    SchemaMismatch { expected: String, got: String },

    #[error("invalid model parameters: {0}")]
    Parameters(String),
}

/// Integrity manifest stored next to the model.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModelManifest {
    pub version: u32,
    #[serde(default)]
    pub created_at: Option<i64>,
    /// Relative file name to lowercase hex SHA-256.
    pub files: BTreeMap<String, String>,
}

/// One node of a regression tree, stored in a flat array.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum TreeNode {
    Split {
        feature: usize,
        threshold: f64,
        left: usize,
        right: usize,
    },
    Leaf {
        value: f64,
    },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Tree {
    pub nodes: Vec<TreeNode>,
}

impl Tree {
    fn leaf_value(&self, x: &[f64]) -> f64 {
        let mut idx = 0;
        loop {
            match &self.nodes[idx] {
                TreeNode::Leaf { value } => return *value,
                TreeNode::Split {
                    feature,
                    threshold,
                    left,
                    right,
                } => {
                    idx = if x[*feature] < *threshold { *left } else { *right };
                }
            }
        }
    }

    // Children must point forward so that traversal always terminates.
    fn validate(&self, n_features: usize, tree_idx: usize) -> Result<(), ModelLoadError> {
        if self.nodes.is_empty() {
            return Err(ModelLoadError::Parameters(format!(
                "tree {tree_idx} has no nodes"
            )));
        }
        for (i, node) in self.nodes.iter().enumerate() {
            match node {
                TreeNode::Leaf { value } if !value.is_finite() => {
                    return Err(ModelLoadError::Parameters(format!(
                        "tree {tree_idx} node {i}: non-finite leaf"
                    )));
                }
                TreeNode::Leaf { .. } => {}
                TreeNode::Split {
                    feature,
                    threshold,
                    left,
                    right,
                } => {
                    if *feature >= n_features {
                        return Err(ModelLoadError::Parameters(format!(
                            "tree {tree_idx} node {i}: feature {feature} out of range"
                        )));
                    }
                    if !threshold.is_finite() {
                        return Err(ModelLoadError::Parameters(format!(
                            "tree {tree_idx} node {i}: non-finite threshold"
                        )));
                    }
                    let len = self.nodes.len();
                    if *left <= i || *right <= i || *left >= len || *right >= len {
                        return Err(ModelLoadError::Parameters(format!(
                            "tree {tree_idx} node {i}: invalid child index"
                        )));
                    }
                }
            }
        }
        Ok(())
    }
}

/// Scoring function of the classifier.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Scorer {
    GradientBoostedTrees {
        base_score: f64,
        trees: Vec<Tree>,
    },
    Logistic {
        intercept: f64,
        coefficients: Vec<f64>,
        scaler_mean: Vec<f64>,
        scaler_scale: Vec<f64>,
    },
}

impl Scorer {
    #[must_use]
    pub fn kind(&self) -> &'static str {
        match self {
            Self::GradientBoostedTrees { .. } => "gradient_boosted_trees",
            Self::Logistic { .. } => "logistic",
        }
    }

    /// Raw log-odds for one row.
    fn margin(&self, x: &[f64]) -> f64 {
        match self {
            Self::GradientBoostedTrees { base_score, trees } => {
                base_score + trees.iter().map(|t| t.leaf_value(x)).sum::<f64>()
            }
            Self::Logistic {
                intercept,
                coefficients,
                scaler_mean,
                scaler_scale,
            } => {
                intercept
                    + x.iter()
                        .zip(coefficients)
                        .zip(scaler_mean.iter().zip(scaler_scale))
                        .map(|((xi, c), (m, s))| c * (xi - m) / s)
                        .sum::<f64>()
            }
        }
    }

    fn validate(&self, n_features: usize) -> Result<(), ModelLoadError> {
        match self {
            Self::GradientBoostedTrees { base_score, trees } => {
                if !base_score.is_finite() {
                    return Err(ModelLoadError::Parameters("non-finite base_score".into()));
                }
                if trees.is_empty() {
                    return Err(ModelLoadError::Parameters("ensemble has no trees".into()));
                }
                for (i, tree) in trees.iter().enumerate() {
                    tree.validate(n_features, i)?;
                }
                Ok(())
            }
            Self::Logistic {
                intercept,
                coefficients,
                scaler_mean,
                scaler_scale,
            } => {
                if coefficients.len() != n_features
                    || scaler_mean.len() != n_features
                    || scaler_scale.len() != n_features
                {
                    return Err(ModelLoadError::Parameters(
                        "logistic parameter lengths do not match the schema".into(),
                    ));
                }
                let all_finite = std::iter::once(intercept)
                    .chain(coefficients)
                    .chain(scaler_mean)
                    .chain(scaler_scale)
                    .all(|v| v.is_finite());
                if !all_finite {
                    return Err(ModelLoadError::Parameters(
                        "logistic parameters must be finite".into(),
                    ));
                }
                if scaler_scale.iter().any(|s| *s == 0.0) {
                    return Err(ModelLoadError::Parameters(
                        "scaler_scale must be non-zero".into(),
                    ));
                }
                Ok(())
            }
        }
    }
}

/// Parameters exported by the training pipeline.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelArtifact {
    pub schema: SchemaStamp,
    pub scorer: Scorer,
    /// Encoded reference rows used as the attribution baseline.
    pub background: Vec<Vec<f64>>,
}

/// A loaded, validated classifier. Immutable after construction.
#[derive(Debug, Clone)]
pub struct TrainedModel {
    schema: &'static FeatureSchema,
    scorer: Scorer,
    background: Vec<Vec<f64>>,
}

fn logistic(margin: f64) -> f64 {
    if margin >= 0.0 {
        1.0 / (1.0 + (-margin).exp())
    } else {
        let e = margin.exp();
        e / (1.0 + e)
    }
}

fn sha256_hex(bytes: &[u8]) -> String {
    Sha256::digest(bytes)
        .iter()
        .map(|b| format!("{b:02x}"))
        .collect()
}

#[cfg(debug_assertions)]
fn parse_bool_env(name: &str) -> bool {
    std::env::var(name)
        .map(|v| matches!(v.as_str(), "1" | "true" | "TRUE" | "yes" | "YES"))
        .unwrap_or(false)
}

fn read_file(path: &Path) -> Result<Vec<u8>, ModelLoadError> {
    fs::read(path).map_err(|source| ModelLoadError::Read {
        path: path.to_path_buf(),
        source,
    })
}

// Manifest entries name files directly inside the model directory.
fn is_plain_file_name(rel: &str) -> bool {
    let mut components = Path::new(rel).components();
    matches!(
        (components.next(), components.next()),
        (Some(Component::Normal(_)), None)
    )
}

fn base_dir(model_path: &Path) -> &Path {
    if model_path.is_dir() {
        model_path
    } else {
        model_path.parent().unwrap_or(model_path)
    }
}

/// Check `manifest.json` in `dir` against the files on disk.
///
/// Returns `Ok(None)` only when the manifest is absent and the debug-only
/// bypass is enabled.
///
/// # Errors
/// Returns `ModelLoadError::Integrity` if the manifest is missing (and not
/// bypassed), malformed, does not bind `model.json`, names a path outside
/// `dir`, or any digest differs.
pub fn verify_manifest(dir: &Path) -> Result<Option<ModelManifest>, ModelLoadError> {
    let manifest_path = dir.join(MANIFEST_FILE);

    if !manifest_path.exists() {
        #[cfg(debug_assertions)]
        {
            if parse_bool_env(ALLOW_UNVERIFIED_MODEL_ENV) {
                tracing::warn!(
                    "Loading UNVERIFIED model ({ALLOW_UNVERIFIED_MODEL_ENV}=true); debug builds only"
                );
                return Ok(None);
            }
            tracing::error!(
                "Model manifest not found at {:?}. Set {ALLOW_UNVERIFIED_MODEL_ENV}=true to bypass in debug builds.",
                manifest_path
            );
        }
        #[cfg(not(debug_assertions))]
        tracing::error!(
            "Model manifest not found at {:?}; release builds require a manifest",
            manifest_path
        );
        return Err(ModelLoadError::Integrity(format!(
            "{MANIFEST_FILE} required in {dir:?}"
        )));
    }

    let manifest_bytes = read_file(&manifest_path)?;
    let manifest: ModelManifest =
        serde_json::from_slice(&manifest_bytes).map_err(|e| ModelLoadError::Format {
            file: MANIFEST_FILE.to_string(),
            message: e.to_string(),
        })?;

    if manifest.version != MANIFEST_VERSION {
        return Err(ModelLoadError::Integrity(format!(
            "unsupported manifest version: {}",
            manifest.version
        )));
    }
    if !manifest.files.contains_key(MODEL_FILE) {
        return Err(ModelLoadError::Integrity(format!(
            "manifest does not bind {MODEL_FILE}"
        )));
    }

    for (rel, expected_hex) in &manifest.files {
        if !is_plain_file_name(rel) {
            return Err(ModelLoadError::Integrity(format!(
                "manifest entry {rel:?} is not a file name inside the model directory"
            )));
        }
        let path = dir.join(rel);
        let bytes = fs::read(&path).map_err(|e| {
            ModelLoadError::Integrity(format!(
                "manifest references missing/unreadable file {path:?}: {e}"
            ))
        })?;
        if sha256_hex(&bytes) != expected_hex.to_ascii_lowercase() {
            return Err(ModelLoadError::Integrity(format!(
                "file hash mismatch for {rel}"
            )));
        }
    }

    tracing::info!("Model manifest verified ({} files)", manifest.files.len());
    Ok(Some(manifest))
}

/// Hash `files` inside `dir` and write `manifest.json` next to them.
///
/// # Errors
/// Returns `ModelLoadError::Integrity` if an entry is not a plain file name,
/// `ModelLoadError::Read` if a file cannot be read, or
/// `ModelLoadError::Write` if the manifest cannot be written.
pub fn write_manifest(dir: &Path, files: &[&str]) -> Result<ModelManifest, ModelLoadError> {
    let mut digests = BTreeMap::new();
    for rel in files {
        if !is_plain_file_name(rel) {
            return Err(ModelLoadError::Integrity(format!(
                "{rel:?} is not a file name inside {dir:?}"
            )));
        }
        let bytes = read_file(&dir.join(rel))?;
        digests.insert((*rel).to_string(), sha256_hex(&bytes));
    }

    let manifest = ModelManifest {
        version: MANIFEST_VERSION,
        created_at: Some(chrono::Utc::now().timestamp()),
        files: digests,
    };

    let path = dir.join(MANIFEST_FILE);
    let json = serde_json::to_vec_pretty(&manifest).map_err(|e| ModelLoadError::Format {
        file: MANIFEST_FILE.to_string(),
        message: e.to_string(),
    })?;
    fs::write(&path, json).map_err(|source| ModelLoadError::Write { path, source })?;
    Ok(manifest)
}

impl TrainedModel {
    /// Verify and load the artifact at `model_path` (a directory, or a model
    /// file bound by the manifest next to it).
    ///
    /// # Errors
    /// Returns [`ModelLoadError`] if the path is missing, the manifest check
    /// fails or does not bind the file being loaded, the JSON is malformed,
    /// or the artifact does not fit `schema`.
    pub fn load(
        model_path: &Path,
        schema: &'static FeatureSchema,
    ) -> Result<Self, ModelLoadError> {
        if !model_path.exists() {
            return Err(ModelLoadError::NotFound(model_path.to_path_buf()));
        }

        let dir = base_dir(model_path);
        let manifest = verify_manifest(dir)?;

        let file_name = if model_path.is_file() {
            model_path
                .file_name()
                .and_then(|name| name.to_str())
                .ok_or_else(|| {
                    ModelLoadError::Integrity(format!("unusable model file name {model_path:?}"))
                })?
        } else {
            MODEL_FILE
        };
        if let Some(manifest) = &manifest {
            if !manifest.files.contains_key(file_name) {
                return Err(ModelLoadError::Integrity(format!(
                    "manifest does not bind {file_name}"
                )));
            }
        }

        let file = dir.join(file_name);
        let content = read_file(&file)?;
        let artifact: ModelArtifact =
            serde_json::from_slice(&content).map_err(|e| ModelLoadError::Format {
                file: file_name.to_string(),
                message: e.to_string(),
            })?;

        let model = Self::from_artifact(artifact, schema)?;
        tracing::info!(
            "Loaded model from {:?} (scorer={}, schema={} v{}, background_rows={})",
            file,
            model.scorer.kind(),
            schema.name(),
            schema.version(),
            model.background.len()
        );
        Ok(model)
    }

    /// Validate parameters that were already deserialized.
    ///
    /// # Errors
    /// Returns `ModelLoadError::SchemaMismatch` if the stamp does not match
    /// `schema`, or `ModelLoadError::Parameters` for malformed parameters.
    pub fn from_artifact(
        artifact: ModelArtifact,
        schema: &'static FeatureSchema,
    ) -> Result<Self, ModelLoadError> {
        if !schema.matches(&artifact.schema) {
            return Err(ModelLoadError::SchemaMismatch {
                expected: format!("{} v{}", schema.name(), schema.version()),
                got: format!("{} v{}", artifact.schema.name, artifact.schema.version),
            });
        }

        let n = schema.len();
        artifact.scorer.validate(n)?;

        if artifact.background.is_empty() {
            return Err(ModelLoadError::Parameters(
                "background sample is empty".into(),
            ));
        }
        for (i, row) in artifact.background.iter().enumerate() {
            if row.len() != n {
                return Err(ModelLoadError::Parameters(format!(
                    "background row {i} has {} values, expected {n}",
                    row.len()
                )));
            }
            if row.iter().any(|v| !v.is_finite()) {
                return Err(ModelLoadError::Parameters(format!(
                    "background row {i} contains non-finite values"
                )));
            }
        }

        Ok(Self {
            schema,
            scorer: artifact.scorer,
            background: artifact.background,
        })
    }

    /// Reference rows for the attribution baseline, as encoded features.
    #[must_use]
    pub fn background(&self) -> Vec<EncodedFeatures> {
        self.background
            .iter()
            .filter_map(|row| EncodedFeatures::from_row(self.schema, row.clone()))
            .collect()
    }

    #[must_use]
    pub fn scorer(&self) -> &Scorer {
        &self.scorer
    }
}

impl Predictor for TrainedModel {
    fn schema(&self) -> &'static FeatureSchema {
        self.schema
    }

    fn predict_probability(&self, features: &EncodedFeatures) -> Result<f64, ModelError> {
        ensure_schema(self.schema, features)?;
        ensure_probability(logistic(self.scorer.margin(features.as_slice())))
    }
}
