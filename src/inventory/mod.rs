//! Resource inventory
//!
//! The query seam between the discovery run and whatever backend answers
//! inventory queries, plus the record type every backend must produce.
//!
//! # Example
//!
//! ```ignore
//! use crate::inventory::{ResourceQuery, ResourceRecord, DISCOVERY_QUERY};
//!
//! async fn list(client: &dyn ResourceQuery) -> crate::error::Result<Vec<ResourceRecord>> {
//!     let rows = client.query(DISCOVERY_QUERY, "my-subscription").await?;
//!     ResourceRecord::from_rows(&rows)
//! }
//! ```

use crate::error::{DiscoveryError, Result};
use async_trait::async_trait;
use serde_json::{Map, Value};

/// Resource Graph query projecting the fields the categorizer needs
pub const DISCOVERY_QUERY: &str = "Resources | project name, type, resourceGroup, location, properties";

/// Inventory query interface
#[async_trait]
pub trait ResourceQuery: Send + Sync {
    /// Run a read-only query scoped to one subscription, returning raw rows
    async fn query(&self, query: &str, subscription_id: &str) -> Result<Vec<Value>>;
}

/// One resource returned by the inventory query
#[derive(Debug, Clone, PartialEq)]
pub struct ResourceRecord {
    pub name: String,
    pub resource_type: String,
    pub resource_group: String,
    pub location: String,
    pub properties: Map<String, Value>,
}

impl ResourceRecord {
    /// Parse a raw row. `index` is only used to point at the bad row in errors.
    pub fn from_value(index: usize, value: &Value) -> Result<Self> {
        let Some(obj) = value.as_object() else {
            return Err(DiscoveryError::query(format!(
                "Malformed resource record #{}: expected an object",
                index
            )));
        };

        let properties = match obj.get("properties") {
            None | Some(Value::Null) => Map::new(),
            Some(Value::Object(map)) => map.clone(),
            Some(other) => {
                tracing::warn!(
                    "Resource record #{} has non-object properties ({}), storing an empty object",
                    index,
                    json_kind(other)
                );
                Map::new()
            }
        };

        Ok(Self {
            name: required_str(obj, "name", index)?,
            resource_type: required_str(obj, "type", index)?,
            resource_group: required_str(obj, "resourceGroup", index)?,
            location: required_str(obj, "location", index)?,
            properties,
        })
    }

    /// Parse every row, failing on the first malformed one
    pub fn from_rows(rows: &[Value]) -> Result<Vec<Self>> {
        rows.iter()
            .enumerate()
            .map(|(i, row)| Self::from_value(i, row))
            .collect()
    }
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

fn required_str(obj: &Map<String, Value>, field: &str, index: usize) -> Result<String> {
    match obj.get(field) {
        Some(Value::String(s)) => Ok(s.clone()),
        Some(_) => Err(DiscoveryError::query(format!(
            "Malformed resource record #{}: field '{}' is not a string",
            index, field
        ))),
        None => Err(DiscoveryError::query(format!(
            "Malformed resource record #{}: missing required field '{}'",
            index, field
        ))),
    }
}
