use std::collections::BTreeMap;

use crate::error::Result;
use crate::models::TaskHandle;

/// Asset type reported by the remote service
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AssetType {
    Image,
    Table,
    Other(String),
}

impl AssetType {
    pub fn parse(s: &str) -> AssetType {
        match s {
            "IMAGE" => AssetType::Image,
            "TABLE" => AssetType::Table,
            other => AssetType::Other(other.to_string()),
        }
    }
}

/// Export of a remapped image band to a new asset
#[derive(Debug, Clone, PartialEq)]
pub struct ImageExportRequest {
    pub source_asset: String,
    pub band: String,
    pub from: Vec<i64>,
    pub to: Vec<i64>,
    /// Value given to pixels missing from `from`
    pub default_value: i64,
    pub asset_id: String,
    pub description: String,
    /// Export resolution in meters
    pub scale: f64,
    pub max_pixels: f64,
    pub pyramiding_policy: String,
    /// Image properties set before export (legend)
    pub properties: BTreeMap<String, String>,
}

/// Export of a feature collection with one added property
#[derive(Debug, Clone, PartialEq)]
pub struct TableExportRequest {
    pub source_asset: String,
    pub property: String,
    pub output_property: String,
    /// Source value exactly as stored in the table, and its destination code
    pub mapping: Vec<(serde_json::Value, i64)>,
    pub asset_id: String,
    pub description: String,
}

/// Port for the remote asset and compute service.
///
/// Export calls queue work and return at once; completion is never awaited.
pub trait AssetService {
    fn asset_type(&self, asset_id: &str) -> Result<AssetType>;

    fn band_names(&self, asset_id: &str) -> Result<Vec<String>>;

    /// Property names of the first feature of a table
    fn first_feature_properties(&self, asset_id: &str) -> Result<Vec<String>>;

    /// Pixel value (as reported by the service) to pixel count for one band
    fn frequency_histogram(&self, asset_id: &str, band: &str) -> Result<BTreeMap<String, f64>>;

    /// Distinct values of one property over every feature, as stored.
    /// Features where the property is null or missing contribute `null`.
    fn aggregate_array(&self, asset_id: &str, property: &str) -> Result<Vec<serde_json::Value>>;

    fn export_image(&self, request: &ImageExportRequest) -> Result<TaskHandle>;

    fn export_table(&self, request: &TableExportRequest) -> Result<TaskHandle>;
}
