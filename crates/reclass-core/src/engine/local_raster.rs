use std::collections::{BTreeMap, HashMap};

use crate::error::{ReclassError, Result};
use crate::inspect::band_index;
use crate::models::{DatasetHandle, ReclassOutcome};
use crate::ports::{BlockWindow, PixelType, RasterTarget};

use super::{Backends, EngineSettings, ReclassRequest};

/// Map one block of samples. Values without a matrix entry become 0.
pub(crate) fn remap_block(samples: &[i64], lookup: &HashMap<i64, u16>) -> Vec<u16> {
    samples
        .iter()
        .map(|v| lookup.get(v).copied().unwrap_or(0))
        .collect()
}

/// Copy a block's values into its place inside a full-width row band
fn place_block(band: &mut [u16], band_width: u32, window: &BlockWindow, values: &[u16]) {
    let width = window.width as usize;
    for (row, chunk) in values.chunks(width).enumerate() {
        let start = row * band_width as usize + window.col_off as usize;
        band[start..start + width].copy_from_slice(chunk);
    }
}

/// Source blocks keyed by the row they start on
fn group_by_block_row(windows: Vec<BlockWindow>) -> BTreeMap<u32, Vec<BlockWindow>> {
    let mut rows: BTreeMap<u32, Vec<BlockWindow>> = BTreeMap::new();
    for window in windows {
        rows.entry(window.row_off).or_default().push(window);
    }
    rows
}

/// Integer matrix entries with their destination narrowed to the output
/// sample width
fn sample_lookup(matrix: &HashMap<i64, i64>) -> Result<HashMap<i64, u16>> {
    matrix
        .iter()
        .map(|(src, dst)| {
            u16::try_from(*dst)
                .map(|dst| (*src, dst))
                .map_err(|_| ReclassError::CodeOutOfRange {
                    code: *dst,
                    max: PixelType::U16.max_value(),
                })
        })
        .collect()
}

/// Reclassify a local raster block by block.
///
/// The output is written in full-width row bands as tall as the source
/// blocks; each band is assembled from the source blocks of that block row,
/// so only one block row is held in memory at a time.
pub(crate) fn reclassify(
    backends: &Backends,
    _settings: &EngineSettings,
    request: &ReclassRequest<'_>,
) -> Result<ReclassOutcome> {
    let path = match request.source {
        DatasetHandle::Local(path) => path,
        DatasetHandle::Remote(id) => {
            return Err(ReclassError::format("GeoTIFF", format!("{} is not a local file", id)))
        }
    };
    let band = band_index(request.attribute)?;

    let mut source = backends.rasters.open(path)?;
    let layout = source.layout();

    let int_lookup = request.matrix.int_lookup();
    if int_lookup.len() < request.matrix.len() {
        tracing::warn!(
            ignored = request.matrix.len() - int_lookup.len(),
            "Non-integer matrix keys never match raster samples"
        );
    }

    let mut codes = request.matrix.destinations();
    codes.push(0);
    let pixel_type = PixelType::for_codes(codes)?;
    let lookup = sample_lookup(&int_lookup)?;

    let output = request.local_output("tif")?;
    let target = RasterTarget {
        width: layout.width,
        height: layout.height,
        rows_per_band: layout.block_height.max(1),
        pixel_type,
        legend: &request.legend,
        georeference: source.georeference(),
    };

    let block_rows = group_by_block_row(source.block_windows());
    let mut produce = |row_band: &BlockWindow| -> Result<Vec<u16>> {
        let mut values = vec![0u16; row_band.len()];
        for window in block_rows.get(&row_band.row_off).into_iter().flatten() {
            let samples = source.read_window(band, window)?;
            place_block(&mut values, row_band.width, window, &remap_block(&samples, &lookup));
        }
        tracing::debug!(row = row_band.row_off, rows = row_band.height, "Row band reclassified");
        Ok(values)
    };

    let legend = backends.rasters.write(&output, &target, &mut produce)?;

    tracing::info!(path = %output.display(), pixel_type = ?pixel_type, "Raster written");
    Ok(ReclassOutcome::Written { path: output, legend })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_remap_block_zeroes_unmapped() {
        let lookup: HashMap<i64, u16> = [(1, 10), (2, 20)].into_iter().collect();
        assert_eq!(remap_block(&[1, 2, 3, 1], &lookup), vec![10, 20, 0, 10]);
    }

    #[test]
    fn test_sample_lookup_narrows_codes() {
        let matrix: HashMap<i64, i64> = [(1, 300), (2, 7)].into_iter().collect();
        let lookup = sample_lookup(&matrix).unwrap();
        assert_eq!(lookup.get(&1), Some(&300u16));

        let too_big: HashMap<i64, i64> = [(1, 70_000)].into_iter().collect();
        assert!(matches!(
            sample_lookup(&too_big).unwrap_err(),
            ReclassError::CodeOutOfRange { code: 70_000, .. }
        ));
    }

    #[test]
    fn test_windows_grouped_by_block_row() {
        let windows = vec![
            BlockWindow::new(0, 0, 2, 2),
            BlockWindow::new(2, 0, 1, 2),
            BlockWindow::new(0, 2, 2, 1),
            BlockWindow::new(2, 2, 1, 1),
        ];
        let rows = group_by_block_row(windows);
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[&0].len(), 2);
        assert_eq!(rows[&2][1], BlockWindow::new(2, 2, 1, 1));
    }

    #[test]
    fn test_place_block() {
        let mut band = vec![0; 8];
        place_block(&mut band, 4, &BlockWindow::new(2, 0, 2, 2), &[1, 2, 3, 4]);
        assert_eq!(band, vec![0, 0, 1, 2, 0, 0, 3, 4]);
    }
}
