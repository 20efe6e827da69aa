//! End-to-end raster reclassification against the in-memory store and real
//! GeoTIFF files

use proptest::prelude::*;
use reclass_core::formats::geotiff::GeoTiffSource;
use reclass_core::formats::{MemoryRaster, MemoryRasterStore};
use reclass_core::models::{Attribute, ClassCatalog, ClassEntry, ClassValue, DatasetHandle, ReclassMatrix, ReclassOutcome, ReclassificationJob};
use reclass_core::ports::{BlockWindow, RasterSource};
use reclass_core::{Backends, Reclassifier};
use std::fs::File;
use std::io::BufWriter;
use std::path::{Path, PathBuf};
use tiff::encoder::{colortype, TiffEncoder};

const SOURCE: &str = "/data/landcover.tif";

fn memory_engine(raster: MemoryRaster) -> (Reclassifier, MemoryRasterStore) {
    let store = MemoryRasterStore::new();
    store.insert(SOURCE, raster);
    let engine = Reclassifier::new(Backends::local().with_rasters(store.clone()));
    (engine, store)
}

fn prepared_job(engine: &Reclassifier) -> ReclassificationJob {
    let mut job = ReclassificationJob::new()
        .with_source(DatasetHandle::local(SOURCE))
        .with_destination("/out");
    engine.select_attribute(&mut job, &Attribute::Band(1)).unwrap();
    job.source_catalog = engine.discover_classes(&job).unwrap();
    job
}

fn output_values(store: &MemoryRasterStore, outcome: &ReclassOutcome) -> Vec<i64> {
    match outcome {
        ReclassOutcome::Written { path, .. } => store.get(path).unwrap().bands[0].clone(),
        other => panic!("unexpected outcome: {other:?}"),
    }
}

#[test]
fn test_unmapped_cells_become_zero() {
    let values = vec![1, 2, 3, 1, 2, 3, 3, 2, 1];
    let (engine, store) = memory_engine(MemoryRaster::single_band(3, 3, (3, 1), values));
    let mut job = prepared_job(&engine);
    job.matrix.insert(1, 10);
    job.matrix.insert(2, 20);

    let outcome = engine.reclassify(&mut job).unwrap();

    assert_eq!(outcome.location(), "/out/landcover_reclass.tif");
    assert_eq!(output_values(&store, &outcome), vec![10, 20, 0, 10, 20, 0, 0, 20, 10]);
    assert_eq!(job.remap_count(), 1);
    assert_eq!(job.last_output(), Some(&outcome));
}

#[test]
fn test_discovery_seeds_placeholder_classes() {
    let raster = MemoryRaster::single_band(2, 2, (2, 2), vec![5, 0, 7, 5]).with_nodata(0);
    let (engine, _) = memory_engine(raster);
    let job = prepared_job(&engine);

    let codes: Vec<_> = job.source_catalog.codes().cloned().collect();
    assert_eq!(codes, vec![ClassValue::Int(5), ClassValue::Int(7)]);
    assert!(job.source_catalog.iter().all(|e| e.label == "unnamed" && e.color == "#000000"));
}

#[test]
fn test_reads_and_writes_stay_block_sized() {
    let values: Vec<i64> = (0..30).map(|i| i % 4).collect();
    let (engine, store) = memory_engine(MemoryRaster::single_band(6, 5, (2, 2), values));
    let mut job = prepared_job(&engine);
    job.matrix = ReclassMatrix::identity([0, 1, 2, 3]);

    let reads_before = store.reads().len();
    engine.reclassify(&mut job).unwrap();
    let reads = &store.reads()[reads_before..];

    // 3 x 3 native blocks, each read once
    assert_eq!(reads.len(), 9);
    assert!(reads.iter().all(|r| r.window.len() <= 4));

    let writes = store.writes();
    assert_eq!(writes.len(), 3);
    assert!(writes.iter().all(|(_, band)| band.height <= 2 && band.width == 6));
}

#[test]
fn test_identity_matrix_keeps_cells() {
    let values = vec![4, 4, 9, 1, 0, 9, 4, 1];
    let (engine, store) = memory_engine(MemoryRaster::single_band(4, 2, (2, 1), values.clone()));
    let mut job = prepared_job(&engine);
    job.matrix = ReclassMatrix::identity(values.iter().copied());

    let outcome = engine.reclassify(&mut job).unwrap();
    assert_eq!(output_values(&store, &outcome), values);
}

#[test]
fn test_matrix_key_outside_source_classes() {
    let (engine, _) = memory_engine(MemoryRaster::single_band(2, 1, (2, 1), vec![1, 2]));
    let mut job = prepared_job(&engine);
    job.matrix.insert(42, 1);

    assert!(matches!(
        engine.reclassify(&mut job),
        Err(reclass_core::ReclassError::MatrixKeyNotInCatalog { .. })
    ));
}

#[test]
fn test_legend_attached_from_destination_classes() {
    let (engine, store) = memory_engine(MemoryRaster::single_band(2, 1, (2, 1), vec![1, 2]));
    let mut job = prepared_job(&engine);
    job.matrix.insert(1, 10);
    job.destination_catalog = vec![ClassEntry::new(10, "forest", "#00ff00")].into_iter().collect::<ClassCatalog>();

    let outcome = engine.reclassify(&mut job).unwrap();
    let ReclassOutcome::Written { path, legend } = outcome else {
        panic!("expected a written output");
    };
    assert_eq!(legend, Some(PathBuf::from("/out/landcover_reclass.tif.aux.xml")));
    assert_eq!(store.legend(&path).unwrap().get(10).unwrap().label, "forest");
}

proptest! {
    #[test]
    fn prop_every_cell_is_mapped_or_zero(
        values in proptest::collection::vec(0i64..8, 12),
        pairs in proptest::collection::btree_map(0i64..8, 1i64..200, 0..8),
    ) {
        let (engine, store) = memory_engine(MemoryRaster::single_band(4, 3, (2, 2), values.clone()));
        let mut job = ReclassificationJob::new()
            .with_source(DatasetHandle::local(SOURCE))
            .with_destination("/out");
        engine.select_attribute(&mut job, &Attribute::Band(1)).unwrap();
        for (src, dst) in &pairs {
            job.matrix.insert(*src, *dst);
        }

        let outcome = engine.reclassify(&mut job).unwrap();
        let output = output_values(&store, &outcome);

        prop_assert_eq!(output.len(), values.len());
        for (input, out) in values.iter().zip(output) {
            prop_assert_eq!(out, pairs.get(input).copied().unwrap_or(0));
        }
    }
}

fn write_strips(path: &Path, width: u32, height: u32, data: &[u8]) {
    let file = File::create(path).unwrap();
    let mut encoder = TiffEncoder::new(BufWriter::new(file)).unwrap();
    let mut image = encoder.new_image::<colortype::Gray8>(width, height).unwrap();
    image.rows_per_strip(1).unwrap();
    let mut start = 0;
    loop {
        let count = image.next_strip_sample_count() as usize;
        if count == 0 {
            break;
        }
        image.write_strip(&data[start..start + count]).unwrap();
        start += count;
    }
    image.finish().unwrap();
}

fn read_all(path: &Path) -> Vec<i64> {
    let mut source = GeoTiffSource::open(path).unwrap();
    let mut values = Vec::new();
    for window in source.block_windows() {
        values.extend(source.read_window(1, &window).unwrap());
    }
    values
}

#[test]
fn test_geotiff_round_trip_with_wide_codes() {
    let dir = tempfile::tempdir().unwrap();
    let input = dir.path().join("lc.tif");
    write_strips(&input, 3, 2, &[1, 2, 3, 3, 2, 1]);

    let engine = Reclassifier::new(Backends::local());
    let mut job = ReclassificationJob::new()
        .with_source(DatasetHandle::local(&input))
        .with_destination(dir.path().join("out"));
    engine.select_attribute(&mut job, &Attribute::Band(1)).unwrap();
    job.matrix.insert(1, 300);
    job.matrix.insert(2, 7);

    let outcome = engine.reclassify(&mut job).unwrap();
    let ReclassOutcome::Written { path, legend } = outcome else {
        panic!("expected a written output");
    };

    assert_eq!(path, dir.path().join("out").join("lc_reclass.tif"));
    assert_eq!(legend, None);
    assert_eq!(read_all(&path), vec![300, 7, 0, 0, 7, 300]);
    // The source is left untouched
    assert_eq!(read_all(&input), vec![1, 2, 3, 3, 2, 1]);

    let source = GeoTiffSource::open(&path).unwrap();
    assert_eq!(source.layout().block_windows()[0], BlockWindow::new(0, 0, 3, 1));
}

#[test]
fn test_geotiff_output_gets_legend_sidecar() {
    let dir = tempfile::tempdir().unwrap();
    let input = dir.path().join("lc.tif");
    write_strips(&input, 2, 2, &[1, 1, 2, 2]);

    let engine = Reclassifier::new(Backends::local());
    let mut job = ReclassificationJob::new()
        .with_source(DatasetHandle::local(&input))
        .with_destination(dir.path());
    engine.select_attribute(&mut job, &Attribute::Band(1)).unwrap();
    job.matrix.insert(1, 1);
    job.matrix.insert(2, 2);
    job.destination_catalog = vec![
        ClassEntry::new(1, "forest", "#00ff00"),
        ClassEntry::new(2, "water", "#0000ff"),
    ]
    .into_iter()
    .collect();

    let outcome = engine.reclassify(&mut job).unwrap();
    let ReclassOutcome::Written { path, legend } = outcome else {
        panic!("expected a written output");
    };

    assert!(path.is_file());
    let sidecar = std::fs::read_to_string(legend.unwrap()).unwrap();
    assert!(sidecar.contains("<Category>forest</Category>"));
    assert!(sidecar.contains("<Category>water</Category>"));
}

#[test]
fn test_vrt_is_raster_but_not_readable() {
    let dir = tempfile::tempdir().unwrap();
    let input = dir.path().join("mosaic.vrt");
    std::fs::write(&input, "<VRTDataset/>").unwrap();

    let engine = Reclassifier::new(Backends::local());
    let mut job = ReclassificationJob::new().with_source(DatasetHandle::local(&input));

    assert_eq!(engine.detect_kind(&mut job).unwrap(), reclass_core::models::DataKind::Raster);
    assert!(matches!(
        engine.list_attributes(&mut job),
        Err(reclass_core::ReclassError::Format { .. })
    ));
}
