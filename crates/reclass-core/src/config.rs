use crate::error::{ReclassError, Result};
use crate::models::job::DEFAULT_OUTPUT_FIELD;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::env;
use std::fs;
use std::path::{Path, PathBuf};

/// Default config file looked up in the working directory
pub const CONFIG_FILE_NAME: &str = "reclass.toml";

/// Environment variable holding the Earth Engine access token
pub const TOKEN_ENV: &str = "EARTHENGINE_TOKEN";

pub const DEFAULT_EXPORT_SCALE: f64 = 30.0;
pub const DEFAULT_MAX_PIXELS: f64 = 1e13;
pub const DEFAULT_EE_PROJECT: &str = "earthengine-legacy";
pub const DEFAULT_EE_ENDPOINT: &str = "https://earthengine.googleapis.com/v1";

/// Configuration source for tracking where values come from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ConfigSource {
    /// Default value
    Default,
    /// Loaded from config file
    File,
    /// Loaded from environment variable
    Environment,
    /// Provided via CLI argument
    Cli,
}

impl ConfigSource {
    /// Returns the precedence level (higher = higher priority)
    pub fn precedence(&self) -> u8 {
        match self {
            ConfigSource::Default => 0,
            ConfigSource::File => 1,
            ConfigSource::Environment => 2,
            ConfigSource::Cli => 3,
        }
    }
}

/// A configuration value with its source
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConfigValue<T> {
    pub value: T,
    pub source: ConfigSource,
}

impl<T> ConfigValue<T> {
    pub fn new(value: T, source: ConfigSource) -> Self {
        Self { value, source }
    }

    /// Update the value if the new source has higher precedence
    pub fn update(&mut self, value: T, source: ConfigSource) {
        if source.precedence() > self.source.precedence() {
            self.value = value;
            self.source = source;
        }
    }
}

/// Layered configuration for reclassification runs
#[derive(Debug, Clone)]
pub struct LayeredConfig {
    pub destination_dir: ConfigValue<PathBuf>,
    pub output_field: ConfigValue<String>,
    pub export_scale: ConfigValue<f64>,
    pub max_pixels: ConfigValue<f64>,
    pub ee_project: ConfigValue<String>,
    pub ee_endpoint: ConfigValue<String>,
}

impl LayeredConfig {
    /// Create a new configuration with default values
    pub fn with_defaults() -> Self {
        Self {
            destination_dir: ConfigValue::new(default_destination_dir(), ConfigSource::Default),
            output_field: ConfigValue::new(DEFAULT_OUTPUT_FIELD.to_string(), ConfigSource::Default),
            export_scale: ConfigValue::new(DEFAULT_EXPORT_SCALE, ConfigSource::Default),
            max_pixels: ConfigValue::new(DEFAULT_MAX_PIXELS, ConfigSource::Default),
            ee_project: ConfigValue::new(DEFAULT_EE_PROJECT.to_string(), ConfigSource::Default),
            ee_endpoint: ConfigValue::new(DEFAULT_EE_ENDPOINT.to_string(), ConfigSource::Default),
        }
    }

    /// Load configuration from a TOML file
    pub fn load_from_file<P: AsRef<Path>>(mut self, path: P) -> Result<Self> {
        let content =
            fs::read_to_string(path.as_ref()).map_err(|e| ReclassError::ConfigInvalid {
                key: "file".to_string(),
                reason: format!("Failed to read config file: {}", e),
            })?;

        let file_config: FileConfig =
            toml::from_str(&content).map_err(|e| ReclassError::ConfigInvalid {
                key: "file".to_string(),
                reason: format!("Failed to parse TOML: {}", e),
            })?;

        if let Some(dir) = file_config.destination_dir {
            self.destination_dir.update(dir, ConfigSource::File);
        }

        if let Some(field) = file_config.output_field {
            self.output_field.update(parse_output_field(&field)?, ConfigSource::File);
        }

        if let Some(scale) = file_config.export_scale {
            self.export_scale.update(parse_positive("export_scale", scale)?, ConfigSource::File);
        }

        if let Some(max_pixels) = file_config.max_pixels {
            self.max_pixels.update(parse_positive("max_pixels", max_pixels)?, ConfigSource::File);
        }

        if let Some(project) = file_config.ee_project {
            self.ee_project.update(project, ConfigSource::File);
        }

        if let Some(endpoint) = file_config.ee_endpoint {
            self.ee_endpoint.update(endpoint, ConfigSource::File);
        }

        Ok(self)
    }

    /// Load the config file when it exists, otherwise keep the defaults
    pub fn load_from_optional_file<P: AsRef<Path>>(self, path: P) -> Result<Self> {
        if path.as_ref().is_file() {
            self.load_from_file(path)
        } else {
            Ok(self)
        }
    }

    /// Load configuration from environment variables
    pub fn load_from_env(mut self) -> Self {
        // RECLASS_DST_DIR
        if let Ok(dir) = env::var("RECLASS_DST_DIR") {
            if dir.trim().is_empty() {
                tracing::warn!("Ignoring empty RECLASS_DST_DIR");
            } else {
                self.destination_dir.update(PathBuf::from(dir), ConfigSource::Environment);
            }
        }

        // RECLASS_OUTPUT_FIELD
        if let Ok(field) = env::var("RECLASS_OUTPUT_FIELD") {
            match parse_output_field(&field) {
                Ok(field) => self.output_field.update(field, ConfigSource::Environment),
                Err(_) => tracing::warn!(
                    "Invalid RECLASS_OUTPUT_FIELD value '{}': expected a non-empty column name",
                    field
                ),
            }
        }

        // RECLASS_EXPORT_SCALE
        if let Ok(scale_str) = env::var("RECLASS_EXPORT_SCALE") {
            match scale_str.parse::<f64>().ok().and_then(|v| parse_positive("export_scale", v).ok()) {
                Some(scale) => self.export_scale.update(scale, ConfigSource::Environment),
                None => tracing::warn!(
                    "Invalid RECLASS_EXPORT_SCALE value '{}': expected a positive number of meters",
                    scale_str
                ),
            }
        }

        // RECLASS_MAX_PIXELS
        if let Ok(pixels_str) = env::var("RECLASS_MAX_PIXELS") {
            match pixels_str.parse::<f64>().ok().and_then(|v| parse_positive("max_pixels", v).ok()) {
                Some(pixels) => self.max_pixels.update(pixels, ConfigSource::Environment),
                None => tracing::warn!(
                    "Invalid RECLASS_MAX_PIXELS value '{}': expected a positive number",
                    pixels_str
                ),
            }
        }

        // RECLASS_EE_PROJECT
        if let Ok(project) = env::var("RECLASS_EE_PROJECT") {
            self.ee_project.update(project, ConfigSource::Environment);
        }

        self
    }

    /// Update configuration from CLI arguments
    pub fn update_from_cli(&mut self, overrides: CliConfigOverrides) {
        if let Some(dir) = overrides.destination_dir {
            self.destination_dir.update(dir, ConfigSource::Cli);
        }

        if let Some(field) = overrides.output_field {
            self.output_field.update(field, ConfigSource::Cli);
        }

        if let Some(scale) = overrides.export_scale {
            self.export_scale.update(scale, ConfigSource::Cli);
        }
    }

    /// Get all configuration values as a map for inspection
    pub fn to_inspection_map(&self) -> HashMap<String, (String, ConfigSource)> {
        let mut map = HashMap::new();

        map.insert(
            "destination_dir".to_string(),
            (self.destination_dir.value.display().to_string(), self.destination_dir.source),
        );

        map.insert(
            "output_field".to_string(),
            (self.output_field.value.clone(), self.output_field.source),
        );

        map.insert(
            "export_scale".to_string(),
            (format!("{} m", self.export_scale.value), self.export_scale.source),
        );

        map.insert(
            "max_pixels".to_string(),
            (format!("{:e}", self.max_pixels.value), self.max_pixels.source),
        );

        map.insert("ee_project".to_string(), (self.ee_project.value.clone(), self.ee_project.source));

        map.insert("ee_endpoint".to_string(), (self.ee_endpoint.value.clone(), self.ee_endpoint.source));

        map
    }
}

/// Configuration loaded from TOML file
#[derive(Debug, Deserialize, Serialize)]
struct FileConfig {
    destination_dir: Option<PathBuf>,
    output_field: Option<String>,
    export_scale: Option<f64>,
    max_pixels: Option<f64>,
    ee_project: Option<String>,
    ee_endpoint: Option<String>,
}

/// CLI configuration overrides
#[derive(Debug, Default)]
pub struct CliConfigOverrides {
    pub destination_dir: Option<PathBuf>,
    pub output_field: Option<String>,
    pub export_scale: Option<f64>,
}

/// Home directory, or the working directory when HOME is unset
fn default_destination_dir() -> PathBuf {
    env::var_os("HOME")
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from("."))
}

/// Validate a vector output column name
pub fn parse_output_field(s: &str) -> Result<String> {
    let field = s.trim();
    if field.is_empty() {
        return Err(ReclassError::ConfigInvalid {
            key: "output_field".to_string(),
            reason: "Output field name cannot be empty".to_string(),
        });
    }
    Ok(field.to_string())
}

/// Validate an export scale given on the command line
pub fn parse_export_scale(value: f64) -> Result<f64> {
    parse_positive("export_scale", value)
}

fn parse_positive(key: &str, value: f64) -> Result<f64> {
    if value.is_finite() && value > 0.0 {
        Ok(value)
    } else {
        Err(ReclassError::ConfigInvalid {
            key: key.to_string(),
            reason: format!("Expected a positive number, got {}", value),
        })
    }
}
