//! Relation catalog collaborator.
//!
//! The validator only needs `schema_of`; storage, scans and locking belong to
//! the real catalog. `InMemoryCatalog` backs tests and the CLI, and can be
//! loaded from a JSON or YAML file:
//!
//! ```yaml
//! relations:
//!   - relation_key: { user_name: jwang, program_name: global_join, relation_name: smallTable }
//!     schema:
//!       column_types: [LONG_TYPE, LONG_TYPE]
//!       column_names: [follower, followee]
//! ```

use std::collections::BTreeMap;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::relation::RelationKey;
use crate::schema::Schema;

/// Lookup of persistent relation schemas.
pub trait RelationCatalog: Send + Sync {
    /// Schema of the relation, or `None` when the catalog does not know it.
    fn schema_of(&self, key: &RelationKey) -> Option<Schema>;
}

impl<C: RelationCatalog + ?Sized> RelationCatalog for &C {
    fn schema_of(&self, key: &RelationKey) -> Option<Schema> {
        (**self).schema_of(key)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CatalogEntry {
    pub relation_key: RelationKey,
    pub schema: Schema,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
struct CatalogDoc {
    #[serde(default)]
    relations: Vec<CatalogEntry>,
}

/// Catalog held in a `BTreeMap` so iteration order is deterministic.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct InMemoryCatalog {
    relations: BTreeMap<RelationKey, Schema>,
}

impl InMemoryCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, key: RelationKey, schema: Schema) -> Self {
        self.insert(key, schema);
        self
    }

    /// Register or replace a relation. Returns the previous schema.
    pub fn insert(&mut self, key: RelationKey, schema: Schema) -> Option<Schema> {
        self.relations.insert(key, schema)
    }

    pub fn len(&self) -> usize {
        self.relations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.relations.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&RelationKey, &Schema)> {
        self.relations.iter()
    }

    pub fn from_json(text: &str) -> Result<Self> {
        let doc: CatalogDoc = serde_json::from_str(text)?;
        Ok(doc.into())
    }

    pub fn from_yaml(text: &str) -> Result<Self> {
        let doc: CatalogDoc = serde_yaml::from_str(text)?;
        Ok(doc.into())
    }

    /// Load a catalog file; `.json` files are read as JSON, anything else as YAML.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)?;
        let catalog = match path.extension().and_then(|e| e.to_str()) {
            Some("json") => Self::from_json(&text)?,
            _ => Self::from_yaml(&text)?,
        };
        #[cfg(feature = "tracing")]
        tracing::debug!(path = %path.display(), relations = catalog.len(), "loaded catalog");
        Ok(catalog)
    }

    pub fn to_json_pretty(&self) -> Result<String> {
        let doc = CatalogDoc {
            relations: self
                .relations
                .iter()
                .map(|(k, s)| CatalogEntry {
                    relation_key: k.clone(),
                    schema: s.clone(),
                })
                .collect(),
        };
        Ok(serde_json::to_string_pretty(&doc)?)
    }
}

impl From<CatalogDoc> for InMemoryCatalog {
    fn from(doc: CatalogDoc) -> Self {
        Self {
            relations: doc
                .relations
                .into_iter()
                .map(|e| (e.relation_key, e.schema))
                .collect(),
        }
    }
}

impl RelationCatalog for InMemoryCatalog {
    fn schema_of(&self, key: &RelationKey) -> Option<Schema> {
        self.relations.get(key).cloned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::DataType;

    fn small_table() -> RelationKey {
        RelationKey::new("jwang", "global_join", "smallTable")
    }

    #[test]
    fn yaml_catalog() {
        let yaml = r#"
relations:
  - relation_key: { user_name: jwang, program_name: global_join, relation_name: smallTable }
    schema:
      column_types: [LONG_TYPE, LONG_TYPE]
      column_names: [follower, followee]
"#;
        let cat = InMemoryCatalog::from_yaml(yaml).unwrap();
        let schema = cat.schema_of(&small_table()).unwrap();
        assert_eq!(schema.len(), 2);
        assert_eq!(schema.fields[1].name, "followee");
        assert!(cat
            .schema_of(&RelationKey::new("jwang", "global_join", "mallTable"))
            .is_none());
    }

    #[test]
    fn json_round_trip() {
        let cat = InMemoryCatalog::new().with(
            small_table(),
            Schema::from_pairs([("follower", DataType::Long), ("followee", DataType::Long)]),
        );
        let text = cat.to_json_pretty().unwrap();
        assert_eq!(InMemoryCatalog::from_json(&text).unwrap(), cat);
    }
}
