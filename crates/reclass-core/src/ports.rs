//! Port trait definitions
//!
//! These traits define the interfaces that storage and service adapters
//! must implement.

pub mod raster;
pub mod remote;
pub mod vector;

pub use raster::{BlockWindow, GeoReference, PixelType, RasterLayout, RasterSource, RasterStore, RasterTarget};
pub use remote::{AssetService, AssetType, ImageExportRequest, TableExportRequest};
pub use vector::{FeatureTable, VectorStore};
