use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};

/// Where a dataset lives
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Storage {
    /// Local filesystem
    Local,
    /// Asset on the remote compute service
    Remote,
}

/// Shape of a dataset
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DataKind {
    /// Gridded data, classified by band
    Raster,
    /// Features with attributes, classified by property
    Vector,
}

impl fmt::Display for Storage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Storage::Local => write!(f, "local"),
            Storage::Remote => write!(f, "remote"),
        }
    }
}

impl fmt::Display for DataKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DataKind::Raster => write!(f, "raster"),
            DataKind::Vector => write!(f, "vector"),
        }
    }
}

/// Reference to the dataset being reclassified
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "storage", content = "location", rename_all = "lowercase")]
pub enum DatasetHandle {
    /// Path to a local file
    Local(PathBuf),
    /// Remote asset identifier (e.g. "users/me/landcover")
    Remote(String),
}

impl DatasetHandle {
    pub fn local(path: impl Into<PathBuf>) -> Self {
        DatasetHandle::Local(path.into())
    }

    pub fn remote(asset_id: impl Into<String>) -> Self {
        DatasetHandle::Remote(asset_id.into())
    }

    pub fn storage(&self) -> Storage {
        match self {
            DatasetHandle::Local(_) => Storage::Local,
            DatasetHandle::Remote(_) => Storage::Remote,
        }
    }

    /// Base name of the dataset, without extension or parent folders
    pub fn name(&self) -> String {
        let path = match self {
            DatasetHandle::Local(path) => path.as_path(),
            DatasetHandle::Remote(id) => Path::new(id.as_str()),
        };
        path.file_stem()
            .and_then(|s| s.to_str())
            .unwrap_or("unnamed")
            .to_string()
    }
}

impl fmt::Display for DatasetHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DatasetHandle::Local(path) => write!(f, "{}", path.display()),
            DatasetHandle::Remote(id) => write!(f, "{}", id),
        }
    }
}

/// Classification key: a raster band or a vector property
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Attribute {
    /// 1-based band index
    Band(u32),
    /// Band name or property name
    Named(String),
}

impl Attribute {
    /// Parse user input; bare positive integers are band indices
    pub fn parse(s: &str) -> Self {
        match s.trim().parse::<u32>() {
            Ok(band) if band > 0 => Attribute::Band(band),
            _ => Attribute::Named(s.trim().to_string()),
        }
    }
}

impl fmt::Display for Attribute {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Attribute::Band(band) => write!(f, "{}", band),
            Attribute::Named(name) => write!(f, "{}", name),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_handle_storage_and_name() {
        let local = DatasetHandle::local("/data/landcover.tif");
        assert_eq!(local.storage(), Storage::Local);
        assert_eq!(local.name(), "landcover");

        let remote = DatasetHandle::remote("users/someone/aoi/landcover_2020");
        assert_eq!(remote.storage(), Storage::Remote);
        assert_eq!(remote.name(), "landcover_2020");
    }

    #[test]
    fn test_attribute_parse() {
        assert_eq!(Attribute::parse("2"), Attribute::Band(2));
        assert_eq!(Attribute::parse("0"), Attribute::Named("0".to_string()));
        assert_eq!(Attribute::parse("class"), Attribute::Named("class".to_string()));
    }
}
