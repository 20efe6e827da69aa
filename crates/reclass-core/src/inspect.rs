//! Source inspection: dataset kind, candidate attributes and the distinct
//! values of a chosen attribute.

use std::collections::BTreeSet;

use crate::engine::Backends;
use crate::error::{ReclassError, Result};
use crate::models::{Attribute, ClassValue, DataKind, DatasetHandle};
use crate::ports::AssetType;

/// Bookkeeping fields never offered as classification keys
pub const RESERVED_FIELDS: &[&str] = &["system:index", "Shape_Area", "geometry"];

fn is_reserved(name: &str) -> bool {
    RESERVED_FIELDS.contains(&name)
}

/// Infer the dataset kind from the file extension or the remote asset type
pub fn detect_kind(backends: &Backends, source: &DatasetHandle) -> Result<DataKind> {
    match source {
        DatasetHandle::Local(path) => Ok(backends.registry.detect_format(path)?.kind),
        DatasetHandle::Remote(asset_id) => match backends.assets()?.asset_type(asset_id)? {
            AssetType::Image => Ok(DataKind::Raster),
            AssetType::Table => Ok(DataKind::Vector),
            AssetType::Other(asset_type) => Err(ReclassError::UnrecognizedAssetType { asset_type }),
        },
    }
}

/// Candidate classification keys, sorted. Bands come first by index for
/// local rasters; everything else is sorted by name.
pub fn list_attributes(backends: &Backends, source: &DatasetHandle, kind: DataKind) -> Result<Vec<Attribute>> {
    let attributes = match (source, kind) {
        (DatasetHandle::Local(path), DataKind::Raster) => {
            let layout = backends.rasters.open(path)?.layout();
            (1..=layout.bands).map(Attribute::Band).collect()
        }
        (DatasetHandle::Local(path), DataKind::Vector) => backends
            .vectors
            .read(path)?
            .property_names()
            .into_iter()
            .filter(|name| !is_reserved(name))
            .map(Attribute::Named)
            .collect(),
        (DatasetHandle::Remote(asset_id), DataKind::Raster) => {
            let names: BTreeSet<String> = backends.assets()?.band_names(asset_id)?.into_iter().collect();
            names.into_iter().map(Attribute::Named).collect()
        }
        (DatasetHandle::Remote(asset_id), DataKind::Vector) => {
            let names: BTreeSet<String> = backends
                .assets()?
                .first_feature_properties(asset_id)?
                .into_iter()
                .filter(|name| !is_reserved(name))
                .collect();
            names.into_iter().map(Attribute::Named).collect()
        }
    };
    Ok(attributes)
}

/// Check that `attribute` is one of the source's identifiers and return the
/// canonical form found there
pub fn ensure_attribute(available: &[Attribute], attribute: &Attribute) -> Result<Attribute> {
    let wanted = attribute.to_string();
    available
        .iter()
        .find(|candidate| candidate.to_string() == wanted)
        .cloned()
        .ok_or_else(|| ReclassError::AttributeNotFound {
            attribute: wanted,
            available: available.iter().map(ToString::to_string).collect(),
        })
}

/// 1-based band index of a raster attribute
pub(crate) fn band_index(attribute: &Attribute) -> Result<u32> {
    match attribute {
        Attribute::Band(band) => Ok(*band),
        Attribute::Named(name) => Err(ReclassError::AttributeNotFound {
            attribute: name.clone(),
            available: Vec::new(),
        }),
    }
}

/// Histogram keys come back as numbers rendered to text ("1" or "1.0")
fn histogram_key(key: &str) -> ClassValue {
    match key.trim().parse::<f64>() {
        Ok(v) if v.is_finite() && v.fract() == 0.0 => ClassValue::Int(v as i64),
        _ => ClassValue::parse(key),
    }
}

/// Distinct values of `attribute`, ascending. Local rasters are scanned
/// block by block and the declared nodata value is left out.
pub fn list_distinct_values(
    backends: &Backends,
    source: &DatasetHandle,
    kind: DataKind,
    attribute: &Attribute,
) -> Result<Vec<ClassValue>> {
    let values: BTreeSet<ClassValue> = match (source, kind) {
        (DatasetHandle::Local(path), DataKind::Raster) => {
            let band = band_index(attribute)?;
            let mut raster = backends.rasters.open(path)?;
            let nodata = raster.nodata();

            let mut seen = BTreeSet::new();
            for window in raster.block_windows() {
                seen.extend(raster.read_window(band, &window)?);
                tracing::trace!(col = window.col_off, row = window.row_off, "Scanned block");
            }
            if let Some(nodata) = nodata {
                seen.remove(&nodata);
            }
            seen.into_iter().map(ClassValue::Int).collect()
        }
        (DatasetHandle::Local(path), DataKind::Vector) => {
            let field = attribute.to_string();
            backends
                .vectors
                .read(path)?
                .features
                .iter()
                .filter_map(|feature| feature.property(&field))
                .filter_map(ClassValue::from_json)
                .collect()
        }
        (DatasetHandle::Remote(asset_id), DataKind::Raster) => backends
            .assets()?
            .frequency_histogram(asset_id, &attribute.to_string())?
            .keys()
            .map(|key| histogram_key(key))
            .collect(),
        (DatasetHandle::Remote(asset_id), DataKind::Vector) => backends
            .assets()?
            .aggregate_array(asset_id, &attribute.to_string())?
            .iter()
            .filter_map(ClassValue::from_json)
            .collect(),
    };

    tracing::debug!(source = %source, attribute = %attribute, count = values.len(), "Distinct values listed");
    Ok(values.into_iter().collect())
}
