//! In-memory asset service for development and testing.
//!
//! Assets are registered up front; export requests are recorded instead of
//! being run, so callers can inspect exactly what would have been queued.
//!
//! Lock access unwraps; a poisoned lock leaves the recorded exports in an
//! unknown state. Real assets go through the Earth Engine client.

use chrono::Utc;
use reclass_core::error::{ReclassError, Result};
use reclass_core::models::TaskHandle;
use reclass_core::ports::{AssetService, AssetType, ImageExportRequest, TableExportRequest};
use serde_json::{Map, Value};
use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::sync::{Arc, RwLock};
use uuid::Uuid;

/// An asset known to the in-memory service
#[derive(Debug, Clone, PartialEq)]
pub enum MemoryAsset {
    Image {
        bands: Vec<String>,
        /// Band name -> (pixel value -> count)
        histograms: HashMap<String, BTreeMap<String, f64>>,
    },
    Table {
        features: Vec<Map<String, Value>>,
    },
    /// Any other asset type, e.g. "FOLDER" or "IMAGE_COLLECTION"
    Other(String),
}

impl MemoryAsset {
    /// Image whose bands hold the given pixel values
    pub fn image<'a>(bands: impl IntoIterator<Item = (&'a str, Vec<i64>)>) -> Self {
        let mut names = Vec::new();
        let mut histograms = HashMap::new();
        for (name, values) in bands {
            let mut histogram = BTreeMap::new();
            for value in values {
                *histogram.entry(value.to_string()).or_insert(0.0) += 1.0;
            }
            names.push(name.to_string());
            histograms.insert(name.to_string(), histogram);
        }
        MemoryAsset::Image {
            bands: names,
            histograms,
        }
    }

    /// Table built from JSON objects; anything else is skipped
    pub fn table(features: impl IntoIterator<Item = Value>) -> Self {
        MemoryAsset::Table {
            features: features
                .into_iter()
                .filter_map(|f| match f {
                    Value::Object(properties) => Some(properties),
                    _ => None,
                })
                .collect(),
        }
    }
}

/// An export the service was asked to run
#[derive(Debug, Clone, PartialEq)]
pub enum RecordedExport {
    Image(ImageExportRequest, TaskHandle),
    Table(TableExportRequest, TaskHandle),
}

/// In-memory implementation of AssetService
#[derive(Debug, Clone, Default)]
pub struct MemoryAssetService {
    assets: Arc<RwLock<HashMap<String, MemoryAsset>>>,
    exports: Arc<RwLock<Vec<RecordedExport>>>,
}

impl MemoryAssetService {
    /// Create a new in-memory asset service
    pub fn new() -> Self {
        Self::default()
    }

    /// Register an asset under `asset_id`
    pub fn insert(&self, asset_id: impl Into<String>, asset: MemoryAsset) {
        self.assets.write().unwrap().insert(asset_id.into(), asset);
    }

    /// Exports submitted so far, in order
    pub fn exports(&self) -> Vec<RecordedExport> {
        self.exports.read().unwrap().clone()
    }

    fn asset(&self, asset_id: &str) -> Result<MemoryAsset> {
        self.assets
            .read()
            .unwrap()
            .get(asset_id)
            .cloned()
            .ok_or_else(|| ReclassError::Remote {
                message: format!("Asset '{}' does not exist or is not accessible", asset_id),
            })
    }

    fn new_task(description: &str) -> TaskHandle {
        TaskHandle {
            id: Uuid::new_v4().simple().to_string().to_uppercase(),
            description: description.to_string(),
            submitted_at: Utc::now(),
        }
    }

    fn wrong_type(asset_id: &str, expected: &str) -> ReclassError {
        ReclassError::Remote {
            message: format!("Asset '{}' is not an {}", asset_id, expected),
        }
    }
}

impl AssetService for MemoryAssetService {
    fn asset_type(&self, asset_id: &str) -> Result<AssetType> {
        Ok(match self.asset(asset_id)? {
            MemoryAsset::Image { .. } => AssetType::Image,
            MemoryAsset::Table { .. } => AssetType::Table,
            MemoryAsset::Other(kind) => AssetType::parse(&kind),
        })
    }

    fn band_names(&self, asset_id: &str) -> Result<Vec<String>> {
        match self.asset(asset_id)? {
            MemoryAsset::Image { bands, .. } => Ok(bands),
            _ => Err(Self::wrong_type(asset_id, "image")),
        }
    }

    fn first_feature_properties(&self, asset_id: &str) -> Result<Vec<String>> {
        match self.asset(asset_id)? {
            MemoryAsset::Table { features } => Ok(features
                .first()
                .map(|f| f.keys().cloned().collect())
                .unwrap_or_default()),
            _ => Err(Self::wrong_type(asset_id, "table")),
        }
    }

    fn frequency_histogram(&self, asset_id: &str, band: &str) -> Result<BTreeMap<String, f64>> {
        match self.asset(asset_id)? {
            MemoryAsset::Image { mut histograms, .. } => {
                histograms.remove(band).ok_or_else(|| ReclassError::Remote {
                    message: format!("Image '{}' has no band '{}'", asset_id, band),
                })
            }
            _ => Err(Self::wrong_type(asset_id, "image")),
        }
    }

    fn aggregate_array(&self, asset_id: &str, property: &str) -> Result<Vec<Value>> {
        match self.asset(asset_id)? {
            MemoryAsset::Table { features } => {
                let mut seen = BTreeSet::new();
                Ok(features
                    .iter()
                    .map(|f| f.get(property).cloned().unwrap_or(Value::Null))
                    .filter(|v| seen.insert(v.to_string()))
                    .collect())
            }
            _ => Err(Self::wrong_type(asset_id, "table")),
        }
    }

    fn export_image(&self, request: &ImageExportRequest) -> Result<TaskHandle> {
        self.band_names(&request.source_asset)?;
        let task = Self::new_task(&request.description);
        self.exports
            .write()
            .unwrap()
            .push(RecordedExport::Image(request.clone(), task.clone()));
        Ok(task)
    }

    fn export_table(&self, request: &TableExportRequest) -> Result<TaskHandle> {
        self.first_feature_properties(&request.source_asset)?;
        let task = Self::new_task(&request.description);
        self.exports
            .write()
            .unwrap()
            .push(RecordedExport::Table(request.clone(), task.clone()));
        Ok(task)
    }
}
