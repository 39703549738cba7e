//! NephroVTE: PMN venous thromboembolism risk prediction
//!
//! Main entry point for the terminal application.

use std::io::IsTerminal;
use std::sync::Arc;

use anyhow::{Context, Result};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use nephrovte::adapters::TrainedModel;
use nephrovte::config::{AppConfig, LogMode};
use nephrovte::domain::FeatureSchema;
use nephrovte::tui::App;
use nephrovte::{RiskContext, RiskPipeline};

fn main() -> Result<()> {
    let config = AppConfig::from_env()?;

    // Writing logs to the terminal would corrupt the TUI (alternate screen),
    // so an interactive session logs to a file unless told otherwise.
    let interactive = std::io::stdout().is_terminal();
    let (writer, _guard) = match config.log_mode.resolve(interactive) {
        LogMode::Stdout => tracing_appender::non_blocking(std::io::stdout()),
        _ => {
            if let Some(parent) = config.log_file.parent() {
                // Best-effort: a missing directory surfaces on open below.
                let _ = std::fs::create_dir_all(parent);
            }
            let file = std::fs::OpenOptions::new()
                .create(true)
                .append(true)
                .open(&config.log_file)
                .with_context(|| format!("opening log file {:?}", config.log_file))?;
            tracing_appender::non_blocking(file)
        }
    };

    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with(tracing_subscriber::fmt::layer().with_writer(writer))
        .init();

    tracing::info!("Starting NephroVTE...");

    // Refuse to start if the model cannot be loaded and verified.
    let model = TrainedModel::load(&config.model_path, FeatureSchema::pmn_vte())
        .with_context(|| format!("failed to load model from {:?}", config.model_path))?;
    let context = RiskContext::from_model(model, config.thresholds)?;
    tracing::info!(
        "Risk tiers: moderate >= {}, high >= {}",
        config.thresholds.moderate(),
        config.thresholds.high()
    );

    let mut app = App::new(RiskPipeline::new(Arc::new(context)));
    app.run()?;

    tracing::info!("NephroVTE shutdown complete.");
    Ok(())
}
