//! Remote reclassification against the in-memory asset service

use reclass_core::models::{
    Attribute, ClassEntry, ClassValue, DataKind, DatasetHandle, ReclassOutcome, ReclassificationJob,
};
use reclass_core::{Backends, ReclassError, Reclassifier};
use reclass_remote::earthengine::{remap_image_expression, remap_table_expression};
use reclass_remote::{MemoryAsset, MemoryAssetService, RecordedExport};
use serde_json::json;

fn engine_with(service: &MemoryAssetService) -> Reclassifier {
    Reclassifier::new(Backends::local().with_assets(service.clone()))
}

fn landcover_service() -> MemoryAssetService {
    let service = MemoryAssetService::new();
    service.insert(
        "users/me/landcover",
        MemoryAsset::image([("classification", vec![1, 2, 3, 3]), ("quality", vec![0, 1, 1, 1])]),
    );
    service.insert(
        "users/me/parcels",
        MemoryAsset::table(vec![
            json!({"landuse": "a", "Shape_Area": 1.5, "system:index": "0"}),
            json!({"landuse": "b", "Shape_Area": 2.5, "system:index": "1"}),
            json!({"landuse": "c", "Shape_Area": 3.5, "system:index": "2"}),
        ]),
    );
    service.insert("users/me/folder", MemoryAsset::Other("FOLDER".to_string()));
    service
}

#[test]
fn test_image_export_carries_mapping_and_legend() {
    let service = landcover_service();
    let engine = engine_with(&service);
    let mut job = ReclassificationJob::new().with_source(DatasetHandle::remote("users/me/landcover"));

    assert_eq!(engine.detect_kind(&mut job).unwrap(), DataKind::Raster);
    engine
        .select_attribute(&mut job, &Attribute::Named("classification".to_string()))
        .unwrap();

    let catalog = engine.discover_classes(&job).unwrap();
    let codes: Vec<_> = catalog.codes().cloned().collect();
    assert_eq!(codes, vec![ClassValue::Int(1), ClassValue::Int(2), ClassValue::Int(3)]);

    job.source_catalog = catalog;
    job.destination_catalog.insert(ClassEntry::new(10, "Forest", "#00ff00"));
    job.destination_catalog.insert(ClassEntry::new(20, "Water", "#0000ff"));
    job.matrix.insert(1, 10);
    job.matrix.insert(2, 20);
    job.matrix.insert(3, 20);

    let outcome = engine.reclassify(&mut job).unwrap();
    let ReclassOutcome::Submitted { asset_id, task } = outcome else {
        panic!("expected a submitted task");
    };
    assert_eq!(asset_id, "users/me/landcover_reclass");
    assert!(!task.id.is_empty());

    let exports = service.exports();
    assert_eq!(exports.len(), 1);
    let RecordedExport::Image(request, _) = &exports[0] else {
        panic!("expected an image export");
    };
    assert_eq!(request.band, "classification");
    assert_eq!(request.from, vec![1, 2, 3]);
    assert_eq!(request.to, vec![10, 20, 20]);
    assert_eq!(request.default_value, 0);
    assert_eq!(request.description, "landcover_reclass");
    assert_eq!(request.pyramiding_policy, "mode");
    assert_eq!(request.properties["visualization_0_labels"], "Forest,Water");
    assert_eq!(request.properties["visualization_0_palette"], "#00ff00,#0000ff");
    assert_eq!(request.properties["visualization_0_values"], "10,20");
    assert_eq!(request.properties["visualization_0_bands"], "classification");

    // The exported band keeps the name the legend refers to
    let graph = remap_image_expression(request);
    let rename = &graph["values"]["0"]["functionInvocationValue"]["arguments"]["object"]
        ["functionInvocationValue"]["arguments"]["image"]["functionInvocationValue"];
    assert_eq!(rename["functionName"], "Image.select");
    assert_eq!(rename["arguments"]["newNames"]["constantValue"], json!(["classification"]));
}

#[test]
fn test_unmapped_table_value_queues_nothing() {
    let service = landcover_service();
    let engine = engine_with(&service);
    let mut job = ReclassificationJob::new().with_source(DatasetHandle::remote("users/me/parcels"));
    engine
        .select_attribute(&mut job, &Attribute::Named("landuse".to_string()))
        .unwrap();
    job.matrix.insert("a", 1);
    job.matrix.insert("b", 2);

    let err = engine.reclassify(&mut job).unwrap_err();
    match err {
        ReclassError::UnmappedValue { feature, value } => {
            assert_eq!(feature, "in users/me/parcels");
            assert_eq!(value, "\"c\"");
        }
        other => panic!("unexpected error: {other}"),
    }
    assert!(service.exports().is_empty());
    assert!(job.last_output().is_none());
}

#[test]
fn test_table_export_adds_output_property() {
    let service = landcover_service();
    let engine = engine_with(&service);
    let mut job = ReclassificationJob::new().with_source(DatasetHandle::remote("users/me/parcels"));
    job.output_field = "lu_class".to_string();
    engine
        .select_attribute(&mut job, &Attribute::Named("landuse".to_string()))
        .unwrap();
    job.matrix.insert("a", 1);
    job.matrix.insert("b", 2);
    job.matrix.insert("c", 2);

    let outcome = engine.reclassify(&mut job).unwrap();
    assert_eq!(outcome.location(), "users/me/parcels_reclass");
    assert_eq!(job.remap_count(), 1);

    let exports = service.exports();
    let RecordedExport::Table(request, _) = &exports[0] else {
        panic!("expected a table export");
    };
    assert_eq!(request.property, "landuse");
    assert_eq!(request.output_property, "lu_class");
    assert_eq!(request.mapping, vec![(json!("a"), 1), (json!("b"), 2), (json!("c"), 2)]);
}

fn table_job(service: &MemoryAssetService, asset_id: &str, attribute: &str) -> (Reclassifier, ReclassificationJob) {
    let engine = engine_with(service);
    let mut job = ReclassificationJob::new().with_source(DatasetHandle::remote(asset_id));
    engine
        .select_attribute(&mut job, &Attribute::Named(attribute.to_string()))
        .unwrap();
    (engine, job)
}

#[test]
fn test_null_table_value_is_unmapped() {
    let service = MemoryAssetService::new();
    service.insert(
        "users/me/p",
        MemoryAsset::table(vec![json!({"landuse": "a"}), json!({"landuse": null})]),
    );
    let (engine, mut job) = table_job(&service, "users/me/p", "landuse");
    job.matrix.insert("a", 1);

    match engine.reclassify(&mut job).unwrap_err() {
        ReclassError::UnmappedValue { feature, value } => {
            assert_eq!(feature, "in users/me/p");
            assert_eq!(value, "null");
        }
        other => panic!("unexpected error: {other}"),
    }
    assert!(service.exports().is_empty());
}

#[test]
fn test_missing_table_value_is_unmapped() {
    let service = MemoryAssetService::new();
    service.insert(
        "users/me/p",
        MemoryAsset::table(vec![json!({"landuse": "a", "id": 1}), json!({"id": 2})]),
    );
    let (engine, mut job) = table_job(&service, "users/me/p", "landuse");
    job.matrix.insert("a", 1);

    let err = engine.reclassify(&mut job).unwrap_err();
    assert!(matches!(err, ReclassError::UnmappedValue { ref value, .. } if value == "null"));
    assert!(service.exports().is_empty());
}

#[test]
fn test_text_codes_are_matched_as_stored() {
    let service = MemoryAssetService::new();
    service.insert(
        "users/me/zones",
        MemoryAsset::table(vec![json!({"code": "1"}), json!({"code": "2"}), json!({"code": "1"})]),
    );
    let (engine, mut job) = table_job(&service, "users/me/zones", "code");
    job.matrix.insert("1", 10);
    job.matrix.insert("2", 20);

    engine.reclassify(&mut job).unwrap();

    let exports = service.exports();
    let RecordedExport::Table(request, _) = &exports[0] else {
        panic!("expected a table export");
    };
    assert_eq!(request.mapping, vec![(json!("1"), 10), (json!("2"), 20)]);

    let graph = remap_table_expression(request);
    let code = &graph["values"]["0"]["functionInvocationValue"]["arguments"]["value"]["functionInvocationValue"];
    let index = &code["arguments"]["index"]["functionInvocationValue"];
    assert_eq!(index["arguments"]["list"]["constantValue"], json!(["1", "2"]));
    assert_eq!(code["arguments"]["list"]["constantValue"], json!([10, 20]));
}

#[test]
fn test_table_attributes_skip_bookkeeping_fields() {
    let service = landcover_service();
    let engine = engine_with(&service);
    let mut job = ReclassificationJob::new().with_source(DatasetHandle::remote("users/me/parcels"));

    let attributes = engine.list_attributes(&mut job).unwrap();
    assert_eq!(attributes, vec![Attribute::Named("landuse".to_string())]);
    assert_eq!(job.kind(), Some(DataKind::Vector));
}

#[test]
fn test_image_attributes_are_band_names() {
    let service = landcover_service();
    let engine = engine_with(&service);
    let mut job = ReclassificationJob::new().with_source(DatasetHandle::remote("users/me/landcover"));

    let attributes = engine.list_attributes(&mut job).unwrap();
    assert_eq!(
        attributes,
        vec![
            Attribute::Named("classification".to_string()),
            Attribute::Named("quality".to_string()),
        ]
    );
}

#[test]
fn test_other_asset_types_are_rejected() {
    let service = landcover_service();
    let engine = engine_with(&service);
    let mut job = ReclassificationJob::new().with_source(DatasetHandle::remote("users/me/folder"));

    let err = engine.detect_kind(&mut job).unwrap_err();
    assert!(matches!(err, ReclassError::UnrecognizedAssetType { ref asset_type } if asset_type == "FOLDER"));
    assert!(err.is_unrecognized_format());
}

#[test]
fn test_remote_source_without_service() {
    let engine = Reclassifier::new(Backends::local());
    let mut job = ReclassificationJob::new().with_source(DatasetHandle::remote("users/me/landcover"));

    let err = engine.detect_kind(&mut job).unwrap_err();
    assert!(matches!(err, ReclassError::ConfigMissing { .. }));
}
