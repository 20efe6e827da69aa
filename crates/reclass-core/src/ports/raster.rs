use std::path::{Path, PathBuf};

use crate::error::{ReclassError, Result};
use crate::models::Legend;

/// Rectangular block of pixels, in pixel coordinates
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct BlockWindow {
    pub col_off: u32,
    pub row_off: u32,
    pub width: u32,
    pub height: u32,
}

impl BlockWindow {
    pub fn new(col_off: u32, row_off: u32, width: u32, height: u32) -> Self {
        Self {
            col_off,
            row_off,
            width,
            height,
        }
    }

    /// Number of pixels in the window
    pub fn len(&self) -> usize {
        self.width as usize * self.height as usize
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Grid dimensions and internal block size of a raster
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RasterLayout {
    pub width: u32,
    pub height: u32,
    pub bands: u32,
    pub block_width: u32,
    pub block_height: u32,
}

impl RasterLayout {
    /// Native blocks in row-major order; edge blocks are clipped to the grid
    pub fn block_windows(&self) -> Vec<BlockWindow> {
        let mut windows = Vec::new();
        let (bw, bh) = (self.block_width.max(1), self.block_height.max(1));
        let mut row = 0;
        while row < self.height {
            let height = bh.min(self.height - row);
            let mut col = 0;
            while col < self.width {
                let width = bw.min(self.width - col);
                windows.push(BlockWindow::new(col, row, width, height));
                col += bw;
            }
            row += bh;
        }
        windows
    }

    /// Full-width bands of `block_height` rows, the unit in which outputs
    /// are written
    pub fn row_bands(&self) -> Vec<BlockWindow> {
        let bh = self.block_height.max(1);
        (0..self.height)
            .step_by(bh as usize)
            .map(|row| BlockWindow::new(0, row, self.width, bh.min(self.height - row)))
            .collect()
    }
}

/// GeoTIFF georeferencing carried from a source raster to its output
#[derive(Debug, Clone, Default, PartialEq)]
pub struct GeoReference {
    pub pixel_scale: Option<Vec<f64>>,
    pub tiepoint: Option<Vec<f64>>,
    pub transformation: Option<Vec<f64>>,
    pub geo_keys: Option<Vec<u16>>,
    pub geo_doubles: Option<Vec<f64>>,
    pub geo_ascii: Option<String>,
}

/// Sample type of a reclassified raster
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PixelType {
    U8,
    U16,
}

impl PixelType {
    /// Smallest type able to store every code in `codes`
    pub fn for_codes(codes: impl IntoIterator<Item = i64>) -> Result<PixelType> {
        let mut pixel_type = PixelType::U8;
        for code in codes {
            if code < 0 || code > PixelType::U16.max_value() {
                return Err(ReclassError::CodeOutOfRange {
                    code,
                    max: PixelType::U16.max_value(),
                });
            }
            if code > PixelType::U8.max_value() {
                pixel_type = PixelType::U16;
            }
        }
        Ok(pixel_type)
    }

    pub fn max_value(&self) -> i64 {
        match self {
            PixelType::U8 => u8::MAX as i64,
            PixelType::U16 => u16::MAX as i64,
        }
    }
}

/// Description of a single band raster to write
#[derive(Debug, Clone)]
pub struct RasterTarget<'a> {
    pub width: u32,
    pub height: u32,
    /// Rows per written band; bounds the output buffer
    pub rows_per_band: u32,
    pub pixel_type: PixelType,
    pub legend: &'a Legend,
    pub georeference: Option<GeoReference>,
}

impl RasterTarget<'_> {
    pub fn row_bands(&self) -> Vec<BlockWindow> {
        RasterLayout {
            width: self.width,
            height: self.height,
            bands: 1,
            block_width: self.width,
            block_height: self.rows_per_band,
        }
        .row_bands()
    }
}

/// Readable raster opened on a single file
pub trait RasterSource {
    fn layout(&self) -> RasterLayout;

    /// Windows matching the internal blocks of the file
    fn block_windows(&self) -> Vec<BlockWindow> {
        self.layout().block_windows()
    }

    /// Read one native block of a 1-based band
    fn read_window(&mut self, band: u32, window: &BlockWindow) -> Result<Vec<i64>>;

    /// Sample value marking missing data, if declared
    fn nodata(&self) -> Option<i64> {
        None
    }

    fn georeference(&self) -> Option<GeoReference> {
        None
    }
}

/// Port for local raster files
pub trait RasterStore {
    /// Open a raster for block reading
    fn open(&self, path: &Path) -> Result<Box<dyn RasterSource>>;

    /// Create a single band raster at `path`, pulling each row band of the
    /// target from `produce`. Samples are 16 bits wide, enough for every
    /// [`PixelType`]. Returns the legend sidecar path when one is written.
    fn write(
        &self,
        path: &Path,
        target: &RasterTarget<'_>,
        produce: &mut dyn FnMut(&BlockWindow) -> Result<Vec<u16>>,
    ) -> Result<Option<PathBuf>>;
}

#[cfg(test)]
mod tests {
    use super::*;

    fn layout(width: u32, height: u32, bw: u32, bh: u32) -> RasterLayout {
        RasterLayout {
            width,
            height,
            bands: 1,
            block_width: bw,
            block_height: bh,
        }
    }

    #[test]
    fn test_block_windows_cover_grid() {
        let windows = layout(5, 3, 2, 2).block_windows();
        assert_eq!(windows.len(), 6);
        assert_eq!(windows[0], BlockWindow::new(0, 0, 2, 2));
        assert_eq!(windows[2], BlockWindow::new(4, 0, 1, 2));
        assert_eq!(windows[5], BlockWindow::new(4, 2, 1, 1));
        let total: usize = windows.iter().map(BlockWindow::len).sum();
        assert_eq!(total, 15);
    }

    #[test]
    fn test_row_bands() {
        let bands = layout(5, 5, 2, 2).row_bands();
        assert_eq!(
            bands,
            vec![
                BlockWindow::new(0, 0, 5, 2),
                BlockWindow::new(0, 2, 5, 2),
                BlockWindow::new(0, 4, 5, 1),
            ]
        );
    }

    #[test]
    fn test_pixel_type_for_codes() {
        assert_eq!(PixelType::for_codes(vec![0, 10, 255]).unwrap(), PixelType::U8);
        assert_eq!(PixelType::for_codes(vec![1, 300]).unwrap(), PixelType::U16);
        assert!(matches!(
            PixelType::for_codes(vec![70_000]),
            Err(ReclassError::CodeOutOfRange { code: 70_000, .. })
        ));
        assert!(PixelType::for_codes(vec![-1]).is_err());
    }
}
