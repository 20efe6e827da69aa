use crate::error::{ReclassError, Result};
use crate::models::{ClassValue, DatasetHandle, ReclassMatrix, ReclassOutcome};
use crate::ports::{ImageExportRequest, TableExportRequest};

use super::{remote_output_id, Backends, EngineSettings, ReclassRequest, OUTPUT_SUFFIX};

fn asset_id<'a>(request: &'a ReclassRequest<'_>) -> Result<&'a str> {
    match request.source {
        DatasetHandle::Remote(id) => Ok(id),
        DatasetHandle::Local(path) => Err(ReclassError::Remote {
            message: format!("{} is a local file, not a remote asset", path.display()),
        }),
    }
}

/// Queue a remapped copy of the image band. Unmapped pixels become 0.
pub(crate) fn reclassify_image(
    backends: &Backends,
    settings: &EngineSettings,
    request: &ReclassRequest<'_>,
) -> Result<ReclassOutcome> {
    let source = asset_id(request)?;
    let band = request.attribute.to_string();

    let (from, to): (Vec<i64>, Vec<i64>) = request
        .matrix
        .iter()
        .filter_map(|(key, dst)| key.as_int().map(|src| (src, dst)))
        .unzip();

    let output = remote_output_id(source);
    let export = ImageExportRequest {
        source_asset: source.to_string(),
        band: band.clone(),
        from,
        to,
        default_value: 0,
        asset_id: output.clone(),
        description: format!("{}{}", request.source.name(), OUTPUT_SUFFIX),
        scale: settings.export_scale,
        max_pixels: settings.max_pixels,
        pyramiding_policy: settings.pyramiding_policy.clone(),
        properties: request.legend.visualization_properties(&band),
    };

    let task = backends.assets()?.export_image(&export)?;
    tracing::info!(asset = %output, task = %task.id, "Image export submitted");
    Ok(ReclassOutcome::Submitted { asset_id: output, task })
}

/// Destination code for every distinct stored value of the property.
/// Null, missing and unmatched values are all unmapped.
pub(crate) fn table_mapping(
    asset_id: &str,
    values: Vec<serde_json::Value>,
    matrix: &ReclassMatrix,
) -> Result<Vec<(serde_json::Value, i64)>> {
    values
        .into_iter()
        .map(|raw| match ClassValue::from_json(&raw).and_then(|value| matrix.get(&value)) {
            Some(code) => Ok((raw, code)),
            None => Err(ReclassError::UnmappedValue {
                feature: format!("in {}", asset_id),
                value: raw.to_string(),
            }),
        })
        .collect()
}

/// Queue a copy of the table with the destination code property added.
/// The stored values are checked first so an unmapped value fails before
/// any task is queued.
pub(crate) fn reclassify_table(
    backends: &Backends,
    _settings: &EngineSettings,
    request: &ReclassRequest<'_>,
) -> Result<ReclassOutcome> {
    let source = asset_id(request)?;
    let assets = backends.assets()?;

    let property = request.attribute.to_string();
    let values = assets.aggregate_array(source, &property)?;
    let mapping = table_mapping(source, values, request.matrix)?;

    let output = remote_output_id(source);
    let export = TableExportRequest {
        source_asset: source.to_string(),
        property,
        output_property: request.output_field.to_string(),
        mapping,
        asset_id: output.clone(),
        description: format!("{}{}", request.source.name(), OUTPUT_SUFFIX),
    };

    let task = assets.export_table(&export)?;
    tracing::info!(asset = %output, task = %task.id, "Table export submitted");
    Ok(ReclassOutcome::Submitted { asset_id: output, task })
}
