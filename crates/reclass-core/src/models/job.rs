use std::path::PathBuf;

use super::{Attribute, ClassCatalog, DataKind, DatasetHandle, ReclassMatrix, ReclassOutcome, Storage};

/// Default name of the column added to reclassified vector outputs
pub const DEFAULT_OUTPUT_FIELD: &str = "reclass";

/// Everything a reclassification run needs.
///
/// Source, kind and attribute can only change through setters that drop
/// the state derived from them: picking a new source clears the detected
/// kind, the attribute, the source classes and the matrix.
#[derive(Debug, Clone)]
pub struct ReclassificationJob {
    source: Option<DatasetHandle>,
    kind: Option<DataKind>,
    attribute: Option<Attribute>,

    /// Classes found in the source, editable by the user
    pub source_catalog: ClassCatalog,

    /// Classes of the output, authored by the user
    pub destination_catalog: ClassCatalog,

    /// Source code to destination code
    pub matrix: ReclassMatrix,

    /// Output directory for local sources
    pub destination: Option<PathBuf>,

    /// Column added to vector outputs
    pub output_field: String,

    last_output: Option<ReclassOutcome>,
    remap_count: u32,
}

impl Default for ReclassificationJob {
    fn default() -> Self {
        Self {
            source: None,
            kind: None,
            attribute: None,
            source_catalog: ClassCatalog::new(),
            destination_catalog: ClassCatalog::new(),
            matrix: ReclassMatrix::new(),
            destination: None,
            output_field: DEFAULT_OUTPUT_FIELD.to_string(),
            last_output: None,
            remap_count: 0,
        }
    }
}

impl ReclassificationJob {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_source(mut self, source: DatasetHandle) -> Self {
        self.set_source(source);
        self
    }

    pub fn with_destination(mut self, destination: impl Into<PathBuf>) -> Self {
        self.destination = Some(destination.into());
        self
    }

    /// Replace the source. Anything discovered from the previous source is
    /// invalidated unless the handle is unchanged.
    pub fn set_source(&mut self, source: DatasetHandle) {
        if self.source.as_ref() == Some(&source) {
            return;
        }
        self.source = Some(source);
        self.kind = None;
        self.attribute = None;
        self.source_catalog = ClassCatalog::new();
        self.matrix = ReclassMatrix::new();
    }

    pub fn source(&self) -> Option<&DatasetHandle> {
        self.source.as_ref()
    }

    pub fn storage(&self) -> Option<Storage> {
        self.source.as_ref().map(DatasetHandle::storage)
    }

    pub fn kind(&self) -> Option<DataKind> {
        self.kind
    }

    pub fn attribute(&self) -> Option<&Attribute> {
        self.attribute.as_ref()
    }

    /// Number of successful reclassifications run with this job
    pub fn remap_count(&self) -> u32 {
        self.remap_count
    }

    pub fn last_output(&self) -> Option<&ReclassOutcome> {
        self.last_output.as_ref()
    }

    pub(crate) fn set_kind(&mut self, kind: DataKind) {
        if self.kind != Some(kind) {
            self.kind = Some(kind);
            self.attribute = None;
            self.source_catalog = ClassCatalog::new();
            self.matrix = ReclassMatrix::new();
        }
    }

    pub(crate) fn set_attribute(&mut self, attribute: Attribute) {
        if self.attribute.as_ref() != Some(&attribute) {
            self.attribute = Some(attribute);
            self.source_catalog = ClassCatalog::new();
            self.matrix = ReclassMatrix::new();
        }
    }

    pub(crate) fn record_output(&mut self, outcome: ReclassOutcome) {
        self.last_output = Some(outcome);
        self.remap_count += 1;
    }
}
