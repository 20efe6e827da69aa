//! Error types for the reclassification engine

use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ReclassError {
    // Input errors
    #[error("Missing required input: {field}")]
    MissingInput { field: String },

    #[error("Unrecognized file format: {extension}")]
    UnrecognizedFormat { extension: String },

    #[error("Unrecognized asset type: {asset_type}")]
    UnrecognizedAssetType { asset_type: String },

    #[error("File not found: {path}")]
    NotFound { path: PathBuf },

    #[error("Attribute {attribute} is not available on this source. Available: {available:?}")]
    AttributeNotFound {
        attribute: String,
        available: Vec<String>,
    },

    // Catalog and matrix errors
    #[error("Duplicate key {key} in {context}")]
    DuplicateKey { key: String, context: String },

    #[error("Invalid class table {path} at line {line}: {reason}")]
    InvalidCatalog {
        path: PathBuf,
        line: u64,
        reason: String,
    },

    #[error("Matrix key {key} has no entry in the source classes")]
    MatrixKeyNotInCatalog { key: String },

    #[error("Feature {feature} has value {value} with no entry in the reclassification matrix")]
    UnmappedValue { feature: String, value: String },

    // Raster errors
    #[error("Unsupported pixel type: {reason}")]
    UnsupportedPixelType { reason: String },

    #[error("Class code {code} cannot be stored in the output raster (allowed 0..={max})")]
    CodeOutOfRange { code: i64, max: i64 },

    // Format errors
    #[error("{format} error: {message}")]
    Format { format: String, message: String },

    // Remote service errors
    #[error("Remote asset service error: {message}")]
    Remote { message: String },

    // Configuration errors
    #[error("Missing required configuration: {key}")]
    ConfigMissing { key: String },

    #[error("Invalid configuration value for {key}: {reason}")]
    ConfigInvalid { key: String, reason: String },

    // IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    // Serialization errors
    #[error("Serialization error: {0}")]
    Serialization(String),
}

impl ReclassError {
    /// Whether the source kind could not be inferred, from either a local
    /// extension or a remote asset type.
    pub fn is_unrecognized_format(&self) -> bool {
        matches!(
            self,
            ReclassError::UnrecognizedFormat { .. } | ReclassError::UnrecognizedAssetType { .. }
        )
    }

    pub(crate) fn format(format: &str, message: impl Into<String>) -> Self {
        ReclassError::Format {
            format: format.to_string(),
            message: message.into(),
        }
    }

    pub(crate) fn missing(field: &str) -> Self {
        ReclassError::MissingInput {
            field: field.to_string(),
        }
    }
}

impl From<tiff::TiffError> for ReclassError {
    fn from(err: tiff::TiffError) -> Self {
        ReclassError::format("GeoTIFF", err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, ReclassError>;
