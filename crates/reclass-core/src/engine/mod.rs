//! Backend dispatch and the reclassification lifecycle.
//!
//! A job goes through kind detection, attribute selection, class discovery
//! and finally reclassification. The last step is routed to one of four
//! backends keyed by `(storage, kind)`; all of them read the same
//! [`ReclassRequest`] and return a [`ReclassOutcome`].

use std::path::{Path, PathBuf};

use crate::config::{LayeredConfig, DEFAULT_EXPORT_SCALE, DEFAULT_MAX_PIXELS};
use crate::error::{ReclassError, Result};
use crate::formats::{FileVectorStore, FormatRegistry, GeoTiffStore};
use crate::inspect;
use crate::models::{
    Attribute, ClassCatalog, DataKind, DatasetHandle, Legend, ReclassMatrix, ReclassOutcome,
    ReclassificationJob, Storage,
};
use crate::ports::{AssetService, RasterStore, VectorStore};

mod local_raster;
mod local_vector;
mod remote;

/// Suffix appended to the source name to form the output name
pub const OUTPUT_SUFFIX: &str = "_reclass";

/// The four reclassification strategies
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Backend {
    LocalRaster,
    LocalVector,
    RemoteRaster,
    RemoteVector,
}

/// Signature shared by every backend strategy
pub type Strategy = fn(&Backends, &EngineSettings, &ReclassRequest<'_>) -> Result<ReclassOutcome>;

impl Backend {
    /// Pick the backend for a storage location and dataset kind
    pub fn select(storage: Storage, kind: DataKind) -> Backend {
        match (storage, kind) {
            (Storage::Local, DataKind::Raster) => Backend::LocalRaster,
            (Storage::Local, DataKind::Vector) => Backend::LocalVector,
            (Storage::Remote, DataKind::Raster) => Backend::RemoteRaster,
            (Storage::Remote, DataKind::Vector) => Backend::RemoteVector,
        }
    }

    pub fn strategy(self) -> Strategy {
        match self {
            Backend::LocalRaster => local_raster::reclassify,
            Backend::LocalVector => local_vector::reclassify,
            Backend::RemoteRaster => remote::reclassify_image,
            Backend::RemoteVector => remote::reclassify_table,
        }
    }
}

/// Everything a backend needs to produce one output
#[derive(Debug, Clone)]
pub struct ReclassRequest<'a> {
    pub source: &'a DatasetHandle,
    pub attribute: &'a Attribute,
    pub matrix: &'a ReclassMatrix,
    pub legend: Legend,
    /// Output directory; ignored by remote backends
    pub destination: Option<&'a Path>,
    pub output_field: &'a str,
}

impl ReclassRequest<'_> {
    /// `<destination>/<source name>_reclass.<extension>`
    pub(crate) fn local_output(&self, extension: &str) -> Result<PathBuf> {
        let destination = self.destination.ok_or_else(|| ReclassError::missing("destination"))?;
        Ok(destination.join(format!("{}{}.{}", self.source.name(), OUTPUT_SUFFIX, extension)))
    }
}

/// Sibling asset of `asset_id` carrying the reclassification suffix
pub fn remote_output_id(asset_id: &str) -> String {
    let trimmed = asset_id.trim_end_matches('/');
    format!("{}{}", trimmed, OUTPUT_SUFFIX)
}

/// Stores and services the backends run against
pub struct Backends {
    pub registry: FormatRegistry,
    pub rasters: Box<dyn RasterStore>,
    pub vectors: Box<dyn VectorStore>,
    pub assets: Option<Box<dyn AssetService>>,
}

impl Backends {
    /// GeoTIFF and GeoJSON/Shapefile stores, no remote service
    pub fn local() -> Self {
        Self {
            registry: FormatRegistry::new(),
            rasters: Box::new(GeoTiffStore::new()),
            vectors: Box::new(FileVectorStore::new()),
            assets: None,
        }
    }

    pub fn with_rasters(mut self, rasters: impl RasterStore + 'static) -> Self {
        self.rasters = Box::new(rasters);
        self
    }

    pub fn with_vectors(mut self, vectors: impl VectorStore + 'static) -> Self {
        self.vectors = Box::new(vectors);
        self
    }

    pub fn with_assets(mut self, assets: impl AssetService + 'static) -> Self {
        self.assets = Some(Box::new(assets));
        self
    }

    pub(crate) fn assets(&self) -> Result<&dyn AssetService> {
        self.assets.as_deref().ok_or_else(|| ReclassError::ConfigMissing {
            key: "remote asset service".to_string(),
        })
    }
}

impl Default for Backends {
    fn default() -> Self {
        Self::local()
    }
}

/// Export parameters for remote backends
#[derive(Debug, Clone, PartialEq)]
pub struct EngineSettings {
    /// Export resolution in meters
    pub export_scale: f64,
    pub max_pixels: f64,
    pub pyramiding_policy: String,
}

impl Default for EngineSettings {
    fn default() -> Self {
        Self {
            export_scale: DEFAULT_EXPORT_SCALE,
            max_pixels: DEFAULT_MAX_PIXELS,
            pyramiding_policy: "mode".to_string(),
        }
    }
}

impl EngineSettings {
    pub fn from_config(config: &LayeredConfig) -> Self {
        Self {
            export_scale: config.export_scale.value,
            max_pixels: config.max_pixels.value,
            ..Self::default()
        }
    }
}

/// Drives a [`ReclassificationJob`] through discovery and reclassification
pub struct Reclassifier {
    backends: Backends,
    settings: EngineSettings,
}

impl Reclassifier {
    pub fn new(backends: Backends) -> Self {
        Self {
            backends,
            settings: EngineSettings::default(),
        }
    }

    pub fn with_settings(mut self, settings: EngineSettings) -> Self {
        self.settings = settings;
        self
    }

    pub fn backends(&self) -> &Backends {
        &self.backends
    }

    pub fn settings(&self) -> &EngineSettings {
        &self.settings
    }

    /// Detect and record the kind of the job's source
    pub fn detect_kind(&self, job: &mut ReclassificationJob) -> Result<DataKind> {
        let source = job.source().ok_or_else(|| ReclassError::missing("source"))?;
        let kind = inspect::detect_kind(&self.backends, source)?;
        tracing::debug!(source = %source, kind = %kind, "Detected dataset kind");
        job.set_kind(kind);
        Ok(kind)
    }

    fn kind_of(&self, job: &mut ReclassificationJob) -> Result<DataKind> {
        match job.kind() {
            Some(kind) => Ok(kind),
            None => self.detect_kind(job),
        }
    }

    /// Candidate attributes of the job's source, detecting its kind first
    /// when needed
    pub fn list_attributes(&self, job: &mut ReclassificationJob) -> Result<Vec<Attribute>> {
        let kind = self.kind_of(job)?;
        let source = job.source().ok_or_else(|| ReclassError::missing("source"))?;
        inspect::list_attributes(&self.backends, source, kind)
    }

    /// Select the classification key. It must be one of the source's
    /// attributes; the canonical form is stored and returned.
    pub fn select_attribute(&self, job: &mut ReclassificationJob, attribute: &Attribute) -> Result<Attribute> {
        let available = self.list_attributes(job)?;
        let attribute = inspect::ensure_attribute(&available, attribute)?;
        job.set_attribute(attribute.clone());
        Ok(attribute)
    }

    /// Distinct values of the selected attribute, as a placeholder catalog
    /// ready for editing. The job is left untouched.
    pub fn discover_classes(&self, job: &ReclassificationJob) -> Result<ClassCatalog> {
        let source = job.source().ok_or_else(|| ReclassError::missing("source"))?;
        let kind = job.kind().ok_or_else(|| ReclassError::missing("kind"))?;
        let attribute = job.attribute().ok_or_else(|| ReclassError::missing("attribute"))?;

        let values = inspect::list_distinct_values(&self.backends, source, kind, attribute)?;
        Ok(ClassCatalog::seeded(values))
    }

    /// Apply the job's matrix and produce a new dataset.
    ///
    /// Local backends return once the output is written; remote backends
    /// return as soon as the export task is queued.
    pub fn reclassify(&self, job: &mut ReclassificationJob) -> Result<ReclassOutcome> {
        let kind = self.kind_of(job)?;
        let source = job.source().ok_or_else(|| ReclassError::missing("source"))?;
        let attribute = job.attribute().ok_or_else(|| ReclassError::missing("attribute"))?;
        if source.storage() == Storage::Local && job.destination.is_none() {
            return Err(ReclassError::missing("destination"));
        }
        validate_matrix(job)?;

        let backend = Backend::select(source.storage(), kind);
        let request = ReclassRequest {
            source,
            attribute,
            matrix: &job.matrix,
            legend: Legend::from_catalog(&job.destination_catalog),
            destination: job.destination.as_deref(),
            output_field: &job.output_field,
        };

        tracing::info!(source = %source, backend = ?backend, classes = job.matrix.len(), "Reclassifying");
        let outcome = (backend.strategy())(&self.backends, &self.settings, &request)?;

        job.record_output(outcome.clone());
        Ok(outcome)
    }

    /// Where `reclassify` would put its output. Only kind detection
    /// touches the source.
    pub fn planned_output(&self, job: &mut ReclassificationJob) -> Result<String> {
        let kind = self.kind_of(job)?;
        let source = job.source().ok_or_else(|| ReclassError::missing("source"))?;
        match source {
            DatasetHandle::Remote(asset_id) => Ok(remote_output_id(asset_id)),
            DatasetHandle::Local(path) => {
                let destination = job
                    .destination
                    .as_deref()
                    .ok_or_else(|| ReclassError::missing("destination"))?;
                let extension = match kind {
                    DataKind::Raster => "tif",
                    DataKind::Vector => self.backends.vectors.output_extension(path),
                };
                let file_name = format!("{}{}.{}", source.name(), OUTPUT_SUFFIX, extension);
                Ok(destination.join(file_name).display().to_string())
            }
        }
    }
}

/// Matrix keys must come from the source classes when those are known.
/// Destination codes without a class entry only lose their label and colour.
fn validate_matrix(job: &ReclassificationJob) -> Result<()> {
    if !job.source_catalog.is_empty() {
        if let Some((key, _)) = job.matrix.iter().find(|(key, _)| !job.source_catalog.contains(key)) {
            return Err(ReclassError::MatrixKeyNotInCatalog { key: key.to_string() });
        }
    }

    for code in job.matrix.destinations() {
        if !job.destination_catalog.contains(&code.into()) {
            tracing::warn!(code, "Destination code has no class entry; it will have no label or colour");
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::ClassEntry;

    #[test]
    fn test_select_is_exhaustive() {
        assert_eq!(Backend::select(Storage::Local, DataKind::Raster), Backend::LocalRaster);
        assert_eq!(Backend::select(Storage::Local, DataKind::Vector), Backend::LocalVector);
        assert_eq!(Backend::select(Storage::Remote, DataKind::Raster), Backend::RemoteRaster);
        assert_eq!(Backend::select(Storage::Remote, DataKind::Vector), Backend::RemoteVector);
    }

    #[test]
    fn test_remote_output_id() {
        assert_eq!(remote_output_id("users/me/landcover"), "users/me/landcover_reclass");
        assert_eq!(
            remote_output_id("projects/p/assets/lc/"),
            "projects/p/assets/lc_reclass"
        );
    }

    #[test]
    fn test_local_output_path() {
        let source = DatasetHandle::local("/data/parcels.shp");
        let attribute = Attribute::Named("landuse".to_string());
        let matrix = ReclassMatrix::new();
        let request = ReclassRequest {
            source: &source,
            attribute: &attribute,
            matrix: &matrix,
            legend: Legend::default(),
            destination: Some(Path::new("/out")),
            output_field: "reclass",
        };

        assert_eq!(
            request.local_output("geojson").unwrap(),
            PathBuf::from("/out/parcels_reclass.geojson")
        );
    }

    #[test]
    fn test_reclassify_requires_source() {
        let engine = Reclassifier::new(Backends::local());
        let mut job = ReclassificationJob::new();

        let err = engine.reclassify(&mut job).unwrap_err();
        assert!(matches!(err, ReclassError::MissingInput { ref field } if field == "source"));
    }

    #[test]
    fn test_remote_without_service() {
        let engine = Reclassifier::new(Backends::local());
        let mut job = ReclassificationJob::new().with_source(DatasetHandle::remote("users/me/lc"));

        let err = engine.detect_kind(&mut job).unwrap_err();
        assert!(matches!(err, ReclassError::ConfigMissing { .. }));
    }

    #[test]
    fn test_matrix_keys_must_be_known_classes() {
        let mut job = ReclassificationJob::new();
        job.source_catalog.insert(ClassEntry::new(1, "forest", "#00ff00"));
        job.matrix.insert(1, 10);
        assert!(validate_matrix(&job).is_ok());

        job.matrix.insert(2, 20);
        let err = validate_matrix(&job).unwrap_err();
        assert!(matches!(err, ReclassError::MatrixKeyNotInCatalog { ref key } if key == "2"));
    }

    #[test]
    fn test_empty_source_catalog_skips_key_check() {
        let mut job = ReclassificationJob::new();
        job.matrix.insert("grass", 1);
        assert!(validate_matrix(&job).is_ok());
    }

    #[test]
    fn test_planned_output() {
        let engine = Reclassifier::new(Backends::local());

        let mut raster = ReclassificationJob::new()
            .with_source(DatasetHandle::local("/data/landcover.tif"))
            .with_destination("/out");
        assert_eq!(engine.planned_output(&mut raster).unwrap(), "/out/landcover_reclass.tif");

        let mut vector = ReclassificationJob::new().with_source(DatasetHandle::local("/data/parcels.shp"));
        let err = engine.planned_output(&mut vector).unwrap_err();
        assert!(matches!(err, ReclassError::MissingInput { ref field } if field == "destination"));
        vector.destination = Some(PathBuf::from("/out"));
        assert_eq!(engine.planned_output(&mut vector).unwrap(), "/out/parcels_reclass.geojson");
    }
}
