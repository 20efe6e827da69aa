use std::collections::{BTreeMap, HashMap};

use super::ClassValue;

/// Transfer matrix from source class codes to destination class codes
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReclassMatrix {
    entries: BTreeMap<ClassValue, i64>,
}

impl ReclassMatrix {
    pub fn new() -> Self {
        Self::default()
    }

    /// Matrix sending every value to itself
    pub fn identity(values: impl IntoIterator<Item = i64>) -> Self {
        values.into_iter().map(|v| (ClassValue::Int(v), v)).collect()
    }

    /// Map `source` to `destination`, returning the previous destination if any
    pub fn insert(&mut self, source: impl Into<ClassValue>, destination: i64) -> Option<i64> {
        self.entries.insert(source.into(), destination)
    }

    pub fn get(&self, source: &ClassValue) -> Option<i64> {
        self.entries.get(source).copied()
    }

    pub fn contains_key(&self, source: &ClassValue) -> bool {
        self.entries.contains_key(source)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&ClassValue, i64)> {
        self.entries.iter().map(|(k, v)| (k, *v))
    }

    /// Destination codes, ascending and deduplicated
    pub fn destinations(&self) -> Vec<i64> {
        let mut values: Vec<i64> = self.entries.values().copied().collect();
        values.sort_unstable();
        values.dedup();
        values
    }

    /// Integer keyed view used on raster samples. Text keys can never match a
    /// pixel and are left out.
    pub fn int_lookup(&self) -> HashMap<i64, i64> {
        self.entries
            .iter()
            .filter_map(|(k, v)| k.as_int().map(|k| (k, *v)))
            .collect()
    }
}

impl FromIterator<(ClassValue, i64)> for ReclassMatrix {
    fn from_iter<I: IntoIterator<Item = (ClassValue, i64)>>(iter: I) -> Self {
        Self {
            entries: iter.into_iter().collect(),
        }
    }
}
