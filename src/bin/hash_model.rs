//! Integrity manifest writer for NephroVTE model artifacts.
//!
//! Validates `model.json` against the compiled-in feature schema, then writes
//! `manifest.json` with the SHA-256 digest of every bound file.
//!
//! # Usage
//!
//! ```bash
//! cargo run --bin hash_model -- <model_dir> [--include <file>]...
//! ```

use std::env;
use std::fs;
use std::path::PathBuf;

use anyhow::{anyhow, bail, Context, Result};

use nephrovte::adapters::model::{write_manifest, ModelArtifact, MODEL_FILE};
use nephrovte::adapters::TrainedModel;
use nephrovte::domain::FeatureSchema;

fn usage() -> anyhow::Error {
    anyhow!("Usage: hash_model <model_dir> [--include <file>]...")
}

fn parse_args() -> Result<(PathBuf, Vec<String>)> {
    let mut args = env::args().skip(1);
    let mut model_dir: Option<PathBuf> = None;
    let mut extra = Vec::new();

    while let Some(arg) = args.next() {
        match arg.as_str() {
            "--include" => extra.push(args.next().ok_or_else(usage)?),
            "-h" | "--help" => return Err(usage()),
            _ if model_dir.is_none() => model_dir = Some(PathBuf::from(arg)),
            _ => return Err(usage()),
        }
    }

    Ok((model_dir.ok_or_else(usage)?, extra))
}

fn main() -> Result<()> {
    let (model_dir, extra) = parse_args()?;

    let model_dir = if model_dir.is_file() {
        model_dir
            .parent()
            .ok_or_else(|| anyhow!("Model path has no parent directory"))?
            .to_path_buf()
    } else {
        model_dir
    };

    let model_path = model_dir.join(MODEL_FILE);
    let bytes = fs::read(&model_path).with_context(|| format!("reading {model_path:?}"))?;
    let artifact: ModelArtifact =
        serde_json::from_slice(&bytes).with_context(|| format!("parsing {model_path:?}"))?;
    TrainedModel::from_artifact(artifact, FeatureSchema::pmn_vte())
        .context("model.json does not fit the pmn-vte schema")?;

    let mut files = vec![MODEL_FILE];
    for rel in &extra {
        if rel == MODEL_FILE {
            continue;
        }
        if !model_dir.join(rel).is_file() {
            bail!("--include {rel}: not a file in {model_dir:?}");
        }
        files.push(rel.as_str());
    }

    let manifest = write_manifest(&model_dir, &files)?;

    println!("Wrote manifest for {model_dir:?}");
    for (name, digest) in &manifest.files {
        println!("  {digest}  {name}");
    }
    Ok(())
}
