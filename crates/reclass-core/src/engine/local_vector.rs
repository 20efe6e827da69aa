use geojson::feature::Id;
use geojson::{Feature, JsonObject};
use serde_json::Value;

use crate::error::{ReclassError, Result};
use crate::models::{ClassValue, DatasetHandle, ReclassMatrix, ReclassOutcome};

use super::{Backends, EngineSettings, ReclassRequest};

fn feature_label(feature: &Feature, index: usize) -> String {
    match &feature.id {
        Some(Id::String(id)) => id.clone(),
        Some(Id::Number(id)) => id.to_string(),
        None => format!("#{}", index),
    }
}

/// Destination code of every feature, in feature order. Fails on the first
/// feature whose value has no matrix entry.
pub(crate) fn map_features(features: &[Feature], field: &str, matrix: &ReclassMatrix) -> Result<Vec<i64>> {
    features
        .iter()
        .enumerate()
        .map(|(index, feature)| {
            let raw = feature.property(field).unwrap_or(&Value::Null);
            ClassValue::from_json(raw)
                .and_then(|value| matrix.get(&value))
                .ok_or_else(|| ReclassError::UnmappedValue {
                    feature: feature_label(feature, index),
                    value: raw.to_string(),
                })
        })
        .collect()
}

/// Copy the source features with one extra column holding the destination
/// code. Nothing is written unless every feature maps.
pub(crate) fn reclassify(
    backends: &Backends,
    _settings: &EngineSettings,
    request: &ReclassRequest<'_>,
) -> Result<ReclassOutcome> {
    let path = match request.source {
        DatasetHandle::Local(path) => path,
        DatasetHandle::Remote(id) => {
            return Err(ReclassError::format("vector", format!("{} is not a local file", id)))
        }
    };

    let mut table = backends.vectors.read(path)?;
    let field = request.attribute.to_string();
    let codes = map_features(&table.features, &field, request.matrix)?;

    if table.property_names().contains(request.output_field) {
        tracing::warn!(field = request.output_field, "Output column already exists and will be overwritten");
    }
    for (feature, code) in table.features.iter_mut().zip(codes) {
        feature
            .properties
            .get_or_insert_with(JsonObject::new)
            .insert(request.output_field.to_string(), Value::from(code));
    }

    let output = request.local_output(backends.vectors.output_extension(path))?;
    table.name = output
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or(&table.name)
        .to_string();
    backends.vectors.write(&output, &table)?;

    tracing::info!(path = %output.display(), features = table.len(), "Vector written");
    Ok(ReclassOutcome::Written {
        path: output,
        legend: None,
    })
}
