//! Categorized snapshot
//!
//! The partition of one run's records into categories. Every category key is
//! always present in the serialized form, even when its list is empty.

use super::category::{categorize, Category};
use crate::inventory::ResourceRecord;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// A resource as persisted and forwarded (the type is consumed by categorization)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResourceEntry {
    pub name: String,
    pub resource_group: String,
    pub location: String,
    #[serde(default)]
    pub properties: Map<String, Value>,
}

impl From<&ResourceRecord> for ResourceEntry {
    fn from(record: &ResourceRecord) -> Self {
        Self {
            name: record.name.clone(),
            resource_group: record.resource_group.clone(),
            location: record.location.clone(),
            properties: record.properties.clone(),
        }
    }
}

/// Resources of one run, grouped by category in encounter order
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CategorizedSnapshot {
    pub compute: Vec<ResourceEntry>,
    pub networking: Vec<ResourceEntry>,
    pub storage: Vec<ResourceEntry>,
    pub security: Vec<ResourceEntry>,
    pub databases: Vec<ResourceEntry>,
    pub other: Vec<ResourceEntry>,
}

impl CategorizedSnapshot {
    /// Categorize every record, keeping input order inside each category
    pub fn from_records(records: &[ResourceRecord]) -> Self {
        let mut snapshot = Self::default();
        for record in records {
            snapshot.push(categorize(&record.resource_type), ResourceEntry::from(record));
        }
        snapshot
    }

    pub fn push(&mut self, category: Category, entry: ResourceEntry) {
        self.bucket_mut(category).push(entry);
    }

    pub fn bucket(&self, category: Category) -> &[ResourceEntry] {
        match category {
            Category::Compute => &self.compute,
            Category::Networking => &self.networking,
            Category::Storage => &self.storage,
            Category::Security => &self.security,
            Category::Databases => &self.databases,
            Category::Other => &self.other,
        }
    }

    fn bucket_mut(&mut self, category: Category) -> &mut Vec<ResourceEntry> {
        match category {
            Category::Compute => &mut self.compute,
            Category::Networking => &mut self.networking,
            Category::Storage => &mut self.storage,
            Category::Security => &mut self.security,
            Category::Databases => &mut self.databases,
            Category::Other => &mut self.other,
        }
    }

    /// Iterate categories in key order
    pub fn iter(&self) -> impl Iterator<Item = (Category, &[ResourceEntry])> {
        Category::ALL.into_iter().map(move |c| (c, self.bucket(c)))
    }

    /// Total number of resources across all categories
    pub fn len(&self) -> usize {
        self.iter().map(|(_, entries)| entries.len()).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Per-category counts, in key order
    pub fn counts(&self) -> Vec<(Category, usize)> {
        self.iter().map(|(c, entries)| (c, entries.len())).collect()
    }
}
