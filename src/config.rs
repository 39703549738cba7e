//! Runtime configuration from `NEPHROVTE_*` environment variables.
//!
//! Read once at startup. Parsing goes through a key lookup closure so tests
//! never touch the process environment.

use std::path::PathBuf;

use crate::domain::{RiskThresholds, DEFAULT_HIGH_THRESHOLD, DEFAULT_MODERATE_THRESHOLD};
use crate::VteError;

pub const MODEL_PATH_ENV: &str = "NEPHROVTE_MODEL_PATH";
pub const LOG_MODE_ENV: &str = "NEPHROVTE_LOG_MODE";
pub const LOG_FILE_ENV: &str = "NEPHROVTE_LOG_FILE";
pub const MODERATE_THRESHOLD_ENV: &str = "NEPHROVTE_MODERATE_THRESHOLD";
pub const HIGH_THRESHOLD_ENV: &str = "NEPHROVTE_HIGH_THRESHOLD";

const DEFAULT_MODEL_PATH: &str = "models";
const DEFAULT_LOG_FILE: &str = "nephrovte.log";

/// Where log output goes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogMode {
    /// File when attached to a terminal (the TUI owns it), stdout otherwise.
    Auto,
    File,
    Stdout,
}

impl LogMode {
    fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "" | "auto" => Some(Self::Auto),
            "file" => Some(Self::File),
            "stdout" => Some(Self::Stdout),
            _ => None,
        }
    }

    /// Resolve `Auto` against whether stdout is a terminal.
    #[must_use]
    pub fn resolve(self, is_tty: bool) -> Self {
        match self {
            Self::Auto if is_tty => Self::File,
            Self::Auto => Self::Stdout,
            other => other,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct AppConfig {
    pub model_path: PathBuf,
    pub log_mode: LogMode,
    pub log_file: PathBuf,
    pub thresholds: RiskThresholds,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            model_path: PathBuf::from(DEFAULT_MODEL_PATH),
            log_mode: LogMode::Auto,
            log_file: PathBuf::from(DEFAULT_LOG_FILE),
            thresholds: RiskThresholds::default(),
        }
    }
}

fn parse_threshold(name: &str, raw: Option<String>, default: f64) -> Result<f64, VteError> {
    match raw {
        None => Ok(default),
        Some(v) => v
            .trim()
            .parse::<f64>()
            .map_err(|_| VteError::Config(format!("{name} must be a number, got '{v}'"))),
    }
}

impl AppConfig {
    /// Read the process environment.
    ///
    /// # Errors
    /// Returns `VteError::Config` for unparseable values or thresholds that
    /// are not ordered `0 < moderate < high <= 1`.
    pub fn from_env() -> Result<Self, VteError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// # Errors
    /// Same as [`AppConfig::from_env`].
    pub fn from_lookup<F>(lookup: F) -> Result<Self, VteError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let model_path = lookup(MODEL_PATH_ENV)
            .filter(|v| !v.trim().is_empty())
            .map_or_else(|| PathBuf::from(DEFAULT_MODEL_PATH), PathBuf::from);

        let log_mode = match lookup(LOG_MODE_ENV) {
            None => LogMode::Auto,
            Some(raw) => LogMode::parse(&raw).ok_or_else(|| {
                VteError::Config(format!(
                    "{LOG_MODE_ENV} must be auto, file or stdout, got '{raw}'"
                ))
            })?,
        };

        let log_file = lookup(LOG_FILE_ENV)
            .filter(|v| !v.trim().is_empty())
            .map_or_else(|| PathBuf::from(DEFAULT_LOG_FILE), PathBuf::from);

        let moderate = parse_threshold(
            MODERATE_THRESHOLD_ENV,
            lookup(MODERATE_THRESHOLD_ENV),
            DEFAULT_MODERATE_THRESHOLD,
        )?;
        let high = parse_threshold(
            HIGH_THRESHOLD_ENV,
            lookup(HIGH_THRESHOLD_ENV),
            DEFAULT_HIGH_THRESHOLD,
        )?;
        let thresholds =
            RiskThresholds::new(moderate, high).map_err(|e| VteError::Config(e.to_string()))?;

        Ok(Self {
            model_path,
            log_mode,
            log_file,
            thresholds,
        })
    }
}
