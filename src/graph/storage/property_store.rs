//! Key -> column mapping shared by node, relationship and graph properties

use super::columnar::PropertyValues;
use indexmap::IndexMap;
use std::collections::HashSet;
use std::sync::Arc;

/// Mapping from property key to a typed column.
///
/// Columns are held behind `Arc` so that cloning a store (for a copy-on-write
/// mutation or a projection) shares the data instead of copying it.
#[derive(Debug, Clone, Default)]
pub struct PropertyStore {
    columns: IndexMap<String, Arc<PropertyValues>>,
}

impl PropertyStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, key: &str) -> Option<&Arc<PropertyValues>> {
        self.columns.get(key)
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.columns.contains_key(key)
    }

    pub fn keys(&self) -> HashSet<String> {
        self.columns.keys().cloned().collect()
    }

    /// Keys in insertion order
    pub fn key_list(&self) -> impl Iterator<Item = &str> {
        self.columns.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.columns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }

    /// Install or replace a column
    pub fn insert(&mut self, key: impl Into<String>, values: Arc<PropertyValues>) {
        self.columns.insert(key.into(), values);
    }

    pub fn remove(&mut self, key: &str) -> Option<Arc<PropertyValues>> {
        self.columns.shift_remove(key)
    }

    /// Mutable access to one column, cloning it first if a reader still
    /// shares it.
    pub fn get_mut(&mut self, key: &str) -> Option<&mut PropertyValues> {
        self.columns.get_mut(key).map(Arc::make_mut)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Arc<PropertyValues>)> {
        self.columns.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// Restrict to the given keys, sharing the retained columns
    pub fn filtered<'a>(&self, keys: impl IntoIterator<Item = &'a str>) -> PropertyStore {
        let mut columns = IndexMap::new();
        for key in keys {
            if let Some(values) = self.columns.get(key) {
                columns.insert(key.to_string(), Arc::clone(values));
            }
        }
        PropertyStore { columns }
    }

    pub fn memory_usage(&self) -> usize {
        self.columns.values().map(|c| c.memory_usage()).sum()
    }
}
