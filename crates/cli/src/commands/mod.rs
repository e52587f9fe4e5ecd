//! Command implementations.

mod replay;
mod run;
mod validate;

use std::path::Path;

use anyhow::{Context, Result};
use contracts::HubBlueprint;
use tracing::info;

use crate::error::CliError;

pub use replay::run_replay;
pub use run::run_pipeline;
pub use validate::run_validate;

/// Load a blueprint from `path`, or the built-in simulation when absent
pub(crate) fn load_blueprint(path: Option<&Path>) -> Result<HubBlueprint> {
    let Some(path) = path else {
        info!("No configuration given, using built-in simulation");
        return Ok(HubBlueprint::simulation());
    };

    info!(config = %path.display(), "Loading configuration");
    if !path.exists() {
        return Err(CliError::ConfigNotFound(path.to_path_buf()).into());
    }

    config_loader::ConfigLoader::load_from_path(path)
        .with_context(|| format!("Failed to load config from {}", path.display()))
}
