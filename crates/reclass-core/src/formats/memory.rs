//! In-memory raster store for development and testing.
//!
//! Rasters are keyed by path. Every block read and every written row band is
//! logged so callers can check how a raster was traversed.
//!
//! Lock access unwraps: a poisoned lock means a reader or writer already
//! panicked mid-operation, and the recorded rasters can no longer be trusted.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, RwLock};

use crate::error::{ReclassError, Result};
use crate::formats::legend::sidecar_path;
use crate::models::Legend;
use crate::ports::{BlockWindow, GeoReference, RasterLayout, RasterSource, RasterStore, RasterTarget};

/// Raster held in memory, one row-major buffer per band
#[derive(Debug, Clone, PartialEq)]
pub struct MemoryRaster {
    pub layout: RasterLayout,
    pub bands: Vec<Vec<i64>>,
    pub nodata: Option<i64>,
    pub georeference: Option<GeoReference>,
}

impl MemoryRaster {
    /// Single band raster with the given block size
    pub fn single_band(width: u32, height: u32, block: (u32, u32), values: Vec<i64>) -> Self {
        Self {
            layout: RasterLayout {
                width,
                height,
                bands: 1,
                block_width: block.0,
                block_height: block.1,
            },
            bands: vec![values],
            nodata: None,
            georeference: None,
        }
    }

    pub fn with_nodata(mut self, nodata: i64) -> Self {
        self.nodata = Some(nodata);
        self
    }

    /// Values of a 1-based band inside `window`
    pub fn window(&self, band: u32, window: &BlockWindow) -> Result<Vec<i64>> {
        let data = band
            .checked_sub(1)
            .and_then(|b| self.bands.get(b as usize))
            .ok_or_else(|| ReclassError::AttributeNotFound {
                attribute: band.to_string(),
                available: (1..=self.bands.len()).map(|b| b.to_string()).collect(),
            })?;

        let width = self.layout.width as usize;
        let mut values = Vec::with_capacity(window.len());
        for row in window.row_off..window.row_off + window.height {
            let start = row as usize * width + window.col_off as usize;
            let slice = data
                .get(start..start + window.width as usize)
                .ok_or_else(|| ReclassError::format("memory", "window outside the raster"))?;
            values.extend_from_slice(slice);
        }
        Ok(values)
    }
}

/// A logged block read
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReadRecord {
    pub path: PathBuf,
    pub band: u32,
    pub window: BlockWindow,
}

/// In-memory implementation of RasterStore
#[derive(Debug, Clone, Default)]
pub struct MemoryRasterStore {
    rasters: Arc<RwLock<HashMap<PathBuf, MemoryRaster>>>,
    legends: Arc<RwLock<HashMap<PathBuf, Legend>>>,
    reads: Arc<RwLock<Vec<ReadRecord>>>,
    writes: Arc<RwLock<Vec<(PathBuf, BlockWindow)>>>,
}

impl MemoryRasterStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&self, path: impl Into<PathBuf>, raster: MemoryRaster) {
        self.rasters.write().unwrap().insert(path.into(), raster);
    }

    pub fn get(&self, path: &Path) -> Option<MemoryRaster> {
        self.rasters.read().unwrap().get(path).cloned()
    }

    /// Legend written alongside the raster at `path`
    pub fn legend(&self, path: &Path) -> Option<Legend> {
        self.legends.read().unwrap().get(path).cloned()
    }

    /// Every block read so far, in order
    pub fn reads(&self) -> Vec<ReadRecord> {
        self.reads.read().unwrap().clone()
    }

    /// Every row band written so far, in order
    pub fn writes(&self) -> Vec<(PathBuf, BlockWindow)> {
        self.writes.read().unwrap().clone()
    }
}

struct MemorySource {
    path: PathBuf,
    raster: MemoryRaster,
    reads: Arc<RwLock<Vec<ReadRecord>>>,
}

impl RasterSource for MemorySource {
    fn layout(&self) -> RasterLayout {
        self.raster.layout
    }

    fn read_window(&mut self, band: u32, window: &BlockWindow) -> Result<Vec<i64>> {
        let layout = self.raster.layout;
        if window.col_off % layout.block_width.max(1) != 0 || window.row_off % layout.block_height.max(1) != 0 {
            return Err(ReclassError::format(
                "memory",
                format!("window at ({}, {}) is not a native block", window.col_off, window.row_off),
            ));
        }

        let values = self.raster.window(band, window)?;
        self.reads.write().unwrap().push(ReadRecord {
            path: self.path.clone(),
            band,
            window: *window,
        });
        Ok(values)
    }

    fn nodata(&self) -> Option<i64> {
        self.raster.nodata
    }

    fn georeference(&self) -> Option<GeoReference> {
        self.raster.georeference.clone()
    }
}

impl RasterStore for MemoryRasterStore {
    fn open(&self, path: &Path) -> Result<Box<dyn RasterSource>> {
        let raster = self.get(path).ok_or_else(|| ReclassError::NotFound {
            path: path.to_path_buf(),
        })?;
        Ok(Box::new(MemorySource {
            path: path.to_path_buf(),
            raster,
            reads: Arc::clone(&self.reads),
        }))
    }

    fn write(
        &self,
        path: &Path,
        target: &RasterTarget<'_>,
        produce: &mut dyn FnMut(&BlockWindow) -> Result<Vec<u16>>,
    ) -> Result<Option<PathBuf>> {
        let mut values = Vec::with_capacity(target.width as usize * target.height as usize);
        for band in target.row_bands() {
            let chunk = produce(&band)?;
            if chunk.len() != band.len() {
                return Err(ReclassError::format(
                    "memory",
                    format!("row band at {} has {} samples, expected {}", band.row_off, chunk.len(), band.len()),
                ));
            }
            if let Some(code) = chunk.iter().map(|v| i64::from(*v)).find(|v| *v > target.pixel_type.max_value()) {
                return Err(ReclassError::CodeOutOfRange {
                    code,
                    max: target.pixel_type.max_value(),
                });
            }
            values.extend(chunk.into_iter().map(i64::from));
            self.writes.write().unwrap().push((path.to_path_buf(), band));
        }

        let mut raster = MemoryRaster::single_band(target.width, target.height, (target.width, target.rows_per_band), values);
        raster.georeference = target.georeference.clone();
        self.insert(path, raster);

        if target.legend.is_empty() {
            return Ok(None);
        }
        self.legends
            .write()
            .unwrap()
            .insert(path.to_path_buf(), target.legend.clone());
        Ok(Some(sidecar_path(path)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ports::PixelType;

    #[test]
    fn test_window_extraction() {
        let raster = MemoryRaster::single_band(4, 2, (2, 1), (0..8).collect());
        let values = raster.window(1, &BlockWindow::new(2, 1, 2, 1)).unwrap();
        assert_eq!(values, vec![6, 7]);
        assert!(raster.window(2, &BlockWindow::new(0, 0, 2, 1)).is_err());
    }

    #[test]
    fn test_reads_are_logged() {
        let store = MemoryRasterStore::new();
        store.insert("/data/lc.tif", MemoryRaster::single_band(4, 2, (2, 2), (0..8).collect()));

        let mut source = store.open(Path::new("/data/lc.tif")).unwrap();
        for window in source.block_windows() {
            source.read_window(1, &window).unwrap();
        }
        let reads = store.reads();
        assert_eq!(reads.len(), 2);
        assert_eq!(reads[1].window, BlockWindow::new(2, 0, 2, 2));

        assert!(source.read_window(1, &BlockWindow::new(1, 0, 2, 2)).is_err());
    }

    #[test]
    fn test_write_pulls_row_bands() {
        let store = MemoryRasterStore::new();
        let legend = Legend::default();
        let target = RasterTarget {
            width: 3,
            height: 5,
            rows_per_band: 2,
            pixel_type: PixelType::U8,
            legend: &legend,
            georeference: None,
        };

        let sidecar = store
            .write(Path::new("/out.tif"), &target, &mut |band: &BlockWindow| Ok(vec![band.row_off as u16; band.len()]))
            .unwrap();
        assert_eq!(sidecar, None);
        assert_eq!(store.writes().len(), 3);
        assert_eq!(store.get(Path::new("/out.tif")).unwrap().bands[0], vec![0, 0, 0, 0, 0, 0, 2, 2, 2, 2, 2, 2, 4, 4, 4]);
    }
}
