//! Reclass Core - Domain models, ports, format adapters and the
//! reclassification engine
//!
//! This crate holds the class catalog loader, the source inspector and the
//! backend dispatcher that applies a reclassification matrix to local or
//! remote rasters and vectors.

pub mod catalog;
pub mod config;
pub mod engine;
pub mod error;
pub mod formats;
pub mod inspect;
pub mod models;
pub mod ports;

pub use engine::{Backend, Backends, EngineSettings, Reclassifier};
pub use error::{ReclassError, Result};
