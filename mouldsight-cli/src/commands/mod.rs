//! Subcommand implementations.

pub mod batch;
pub mod catalog;
pub mod compare;

use std::path::Path;
use std::sync::Arc;

use anyhow::{Context, Result};
use mouldsight_core::{DefectCatalog, InspectionConfig, InspectionEngine, InspectionEngineFactory};
use tracing::debug;

/// Load configuration from a JSON file, or from the environment when no file is given.
pub fn load_config(path: Option<&Path>) -> Result<InspectionConfig> {
    let Some(path) = path else {
        debug!("Loading configuration from environment");
        let config = InspectionConfig::from_env();
        config.validate().context("Invalid configuration in environment")?;
        return Ok(config);
    };

    let json = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;
    let config = InspectionConfig::from_json(&json)
        .with_context(|| format!("Invalid config file: {}", path.display()))?;

    debug!(path = %path.display(), "Loaded configuration file");
    Ok(config)
}

/// Build the engine for this build with the standard defect catalog.
pub fn build_engine(config: InspectionConfig) -> Result<Arc<dyn InspectionEngine>> {
    let engine = InspectionEngineFactory::create(config, Arc::new(DefectCatalog::standard()))
        .context("Failed to create inspection engine")?;
    Ok(engine)
}
