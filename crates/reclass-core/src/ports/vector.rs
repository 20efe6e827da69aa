use geojson::{Feature, JsonObject};
use std::collections::BTreeSet;
use std::path::Path;

use crate::error::Result;

/// All features of a vector dataset, held in memory
#[derive(Debug, Clone, Default)]
pub struct FeatureTable {
    /// Dataset name (file stem)
    pub name: String,

    pub features: Vec<Feature>,

    /// Collection level members such as `crs`, carried to the output
    pub foreign_members: Option<JsonObject>,
}

impl FeatureTable {
    /// Union of the property names over all features
    pub fn property_names(&self) -> BTreeSet<String> {
        self.features
            .iter()
            .filter_map(|f| f.properties.as_ref())
            .flat_map(|props| props.keys().cloned())
            .collect()
    }

    pub fn len(&self) -> usize {
        self.features.len()
    }

    pub fn is_empty(&self) -> bool {
        self.features.is_empty()
    }
}

/// Port for local vector files
pub trait VectorStore {
    /// Read every feature with its attributes
    fn read(&self, path: &Path) -> Result<FeatureTable>;

    /// Write features back to `path`, format chosen from the extension
    fn write(&self, path: &Path, table: &FeatureTable) -> Result<()>;

    /// Extension used for outputs derived from `source`
    fn output_extension(&self, source: &Path) -> &'static str;
}
