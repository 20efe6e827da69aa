//! Local file formats
//!
//! This module maps file extensions to dataset kinds and hosts the local
//! adapters behind the raster and vector ports. The `FormatRegistry`
//! answers which format (and therefore which kind) a path is, the stores
//! do the reading and writing.

use std::path::Path;

use crate::error::{ReclassError, Result};
use crate::models::DataKind;
use crate::ports::{FeatureTable, VectorStore};

pub mod geojson;
pub mod geotiff;
pub mod legend;
pub mod memory;
pub mod shapefile;

pub use geotiff::GeoTiffStore;
pub use memory::{MemoryRaster, MemoryRasterStore};

/// A local format known to the registry
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FormatInfo {
    /// Human-readable format name (e.g. "GeoTIFF")
    pub name: &'static str,

    /// Dataset kind stored in this format
    pub kind: DataKind,

    /// Extensions without the leading dot
    pub extensions: &'static [&'static str],
}

const BUILTIN_FORMATS: &[FormatInfo] = &[
    FormatInfo {
        name: "GeoTIFF",
        kind: DataKind::Raster,
        extensions: &["tif", "tiff"],
    },
    FormatInfo {
        name: "VRT",
        kind: DataKind::Raster,
        extensions: &["vrt"],
    },
    FormatInfo {
        name: "GeoJSON",
        kind: DataKind::Vector,
        extensions: &["geojson"],
    },
    FormatInfo {
        name: "Shapefile",
        kind: DataKind::Vector,
        extensions: &["shp"],
    },
];

/// Registry of local formats, keyed by extension
#[derive(Debug, Clone)]
pub struct FormatRegistry {
    formats: Vec<FormatInfo>,
}

impl FormatRegistry {
    /// Create a registry holding the built-in formats
    pub fn new() -> Self {
        Self {
            formats: BUILTIN_FORMATS.to_vec(),
        }
    }

    /// Detect the format of a path from its extension (case-insensitive)
    pub fn detect_format(&self, path: &Path) -> Result<&FormatInfo> {
        let extension = path
            .extension()
            .and_then(|e| e.to_str())
            .ok_or_else(|| ReclassError::UnrecognizedFormat {
                extension: "none".to_string(),
            })?;

        self.formats
            .iter()
            .find(|f| f.extensions.iter().any(|e| e.eq_ignore_ascii_case(extension)))
            .ok_or_else(|| ReclassError::UnrecognizedFormat {
                extension: format!(".{}", extension),
            })
    }

    /// Get list of all supported extensions
    pub fn supported_extensions(&self) -> Vec<String> {
        self.formats
            .iter()
            .flat_map(|f| f.extensions.iter())
            .map(|s| s.to_string())
            .collect()
    }
}

impl Default for FormatRegistry {
    fn default() -> Self {
        Self::new()
    }
}

/// Vector store for GeoJSON and Shapefile sources. Outputs are always
/// written as GeoJSON.
#[derive(Debug, Clone, Default)]
pub struct FileVectorStore {
    registry: FormatRegistry,
}

impl FileVectorStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl VectorStore for FileVectorStore {
    fn read(&self, path: &Path) -> Result<FeatureTable> {
        if !path.is_file() {
            return Err(ReclassError::NotFound {
                path: path.to_path_buf(),
            });
        }

        match self.registry.detect_format(path)?.name {
            "GeoJSON" => geojson::read(path),
            "Shapefile" => shapefile::read(path),
            other => Err(ReclassError::format(other, "not a vector format")),
        }
    }

    fn write(&self, path: &Path, table: &FeatureTable) -> Result<()> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }
        geojson::write(path, table)
    }

    fn output_extension(&self, _source: &Path) -> &'static str {
        "geojson"
    }
}
