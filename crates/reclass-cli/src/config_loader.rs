//! Configuration and engine setup shared by CLI commands

use anyhow::{Context, Result};
use reclass_core::config::{CliConfigOverrides, LayeredConfig, CONFIG_FILE_NAME};
use reclass_core::models::DatasetHandle;
use reclass_core::{Backends, EngineSettings, Reclassifier};
use reclass_remote::EarthEngineClient;
use std::path::Path;

/// Load layered configuration: defaults, then the config file, then the
/// environment. An explicit `--config` path must exist; the default
/// `reclass.toml` is optional.
pub fn load_config(explicit: Option<&Path>) -> Result<LayeredConfig> {
    let config = match explicit {
        Some(path) => LayeredConfig::with_defaults()
            .load_from_file(path)
            .with_context(|| format!("Failed to load configuration file {}", path.display()))?,
        None => LayeredConfig::with_defaults()
            .load_from_optional_file(CONFIG_FILE_NAME)
            .context("Failed to load reclass.toml")?,
    };
    Ok(config.load_from_env())
}

/// Load layered configuration with CLI overrides
pub fn load_config_with_overrides(explicit: Option<&Path>, overrides: CliConfigOverrides) -> Result<LayeredConfig> {
    let mut config = load_config(explicit)?;
    config.update_from_cli(overrides);
    Ok(config)
}

/// Interpret a source argument
pub fn source_handle(source: &str, remote: bool) -> DatasetHandle {
    if remote {
        DatasetHandle::remote(source.trim())
    } else {
        DatasetHandle::local(source)
    }
}

/// Build the engine. The Earth Engine client is only created for remote
/// sources, so local runs never need a token.
pub fn build_engine(config: &LayeredConfig, remote: bool) -> Result<Reclassifier> {
    let mut backends = Backends::local();
    if remote {
        let client = EarthEngineClient::from_config(config).context("Cannot connect to Earth Engine")?;
        backends = backends.with_assets(client);
    }
    Ok(Reclassifier::new(backends).with_settings(EngineSettings::from_config(config)))
}
