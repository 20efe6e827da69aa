use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use super::ClassValue;

/// Label given to classes discovered in a source dataset
pub const PLACEHOLDER_LABEL: &str = "unnamed";

/// Color given to classes discovered in a source dataset
pub const PLACEHOLDER_COLOR: &str = "#000000";

/// One row of a class table
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClassEntry {
    /// Classification code
    pub code: ClassValue,

    /// Human readable description
    pub label: String,

    /// Hex RGB color (e.g. "#1f9e3a")
    pub color: String,
}

impl ClassEntry {
    pub fn new(code: impl Into<ClassValue>, label: impl Into<String>, color: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            label: label.into(),
            color: color.into(),
        }
    }
}

/// Mapping from unique class code to label and color
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ClassCatalog {
    entries: BTreeMap<ClassValue, ClassEntry>,
}

impl ClassCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a catalog for freshly discovered values, ready for the user to
    /// name and color.
    pub fn seeded(values: impl IntoIterator<Item = ClassValue>) -> Self {
        values
            .into_iter()
            .map(|v| ClassEntry::new(v, PLACEHOLDER_LABEL, PLACEHOLDER_COLOR))
            .collect()
    }

    /// Insert an entry, replacing (and returning) any entry with the same code
    pub fn insert(&mut self, entry: ClassEntry) -> Option<ClassEntry> {
        self.entries.insert(entry.code.clone(), entry)
    }

    pub fn get(&self, code: &ClassValue) -> Option<&ClassEntry> {
        self.entries.get(code)
    }

    pub fn contains(&self, code: &ClassValue) -> bool {
        self.entries.contains_key(code)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Entries in ascending code order
    pub fn iter(&self) -> impl Iterator<Item = &ClassEntry> {
        self.entries.values()
    }

    pub fn codes(&self) -> impl Iterator<Item = &ClassValue> {
        self.entries.keys()
    }
}

impl FromIterator<ClassEntry> for ClassCatalog {
    fn from_iter<I: IntoIterator<Item = ClassEntry>>(iter: I) -> Self {
        let mut catalog = ClassCatalog::new();
        for entry in iter {
            catalog.insert(entry);
        }
        catalog
    }
}
