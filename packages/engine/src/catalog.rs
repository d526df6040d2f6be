//! Word catalog
//!
//! The catalog is read-only to the engine. [`JsonCatalog`] loads a JSON array
//! of items (from a string or a file) and keeps it sorted by id so that
//! selection over a grade is reproducible for a given seed.

use std::collections::HashSet;
use std::path::Path;

use wordcat_algo::Item;

use crate::store::{StoreError, StoreResult};

pub trait Catalog: Send + Sync {
    /// Items of `grade`, ordered by id.
    fn items_for_grade(&self, grade: u32) -> StoreResult<Vec<Item>>;

    fn item_count(&self, grade: u32) -> StoreResult<usize> {
        Ok(self.items_for_grade(grade)?.len())
    }
}

#[derive(Debug, Clone, Default)]
pub struct JsonCatalog {
    items: Vec<Item>,
}

impl JsonCatalog {
    /// Builds a catalog from items already in memory.
    pub fn new(mut items: Vec<Item>) -> StoreResult<Self> {
        let mut seen = HashSet::with_capacity(items.len());
        for item in &items {
            if !seen.insert(item.id.as_str()) {
                return Err(StoreError::Catalog(format!("duplicate item id: {}", item.id)));
            }
        }
        items.sort_by(|a, b| a.id.cmp(&b.id));
        Ok(Self { items })
    }

    pub fn from_json_str(raw: &str) -> StoreResult<Self> {
        let items: Vec<Item> = serde_json::from_str(raw)?;
        Self::new(items)
    }

    pub fn from_path<P: AsRef<Path>>(path: P) -> StoreResult<Self> {
        let raw = std::fs::read_to_string(path.as_ref())?;
        let catalog = Self::from_json_str(&raw)?;
        tracing::info!(
            path = %path.as_ref().display(),
            items = catalog.items.len(),
            "catalog loaded"
        );
        Ok(catalog)
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

impl Catalog for JsonCatalog {
    fn items_for_grade(&self, grade: u32) -> StoreResult<Vec<Item>> {
        Ok(self
            .items
            .iter()
            .filter(|item| item.grade == grade)
            .cloned()
            .collect())
    }

    fn item_count(&self, grade: u32) -> StoreResult<usize> {
        Ok(self.items.iter().filter(|item| item.grade == grade).count())
    }
}
