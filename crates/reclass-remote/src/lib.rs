//! Reclass Remote - Remote asset service adapters
//!
//! This crate provides implementations of the `AssetService` port: a REST
//! client for Earth Engine and an in-memory service for tests.

pub mod earthengine;
pub mod memory;

pub use earthengine::{EarthEngineClient, EarthEngineError};
pub use memory::{MemoryAsset, MemoryAssetService, RecordedExport};
