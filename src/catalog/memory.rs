use std::collections::BTreeMap;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::{CatalogAccessor, CatalogError, DatabaseMetadata, RequestContext};

/// Failure while loading a catalog description.
#[derive(Debug, Error)]
pub enum CatalogLoadError {
    /// The JSON document is malformed.
    #[error("invalid catalog JSON: {0}")]
    Json(#[from] serde_json::Error),
    /// The DDL script could not be parsed.
    #[error("invalid schema SQL: {0}")]
    Ddl(String),
}

/// JSON layout of a catalog file.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CatalogFile {
    /// Databases on the instance.
    #[serde(default)]
    pub databases: Vec<DatabaseMetadata>,
}

/// Catalog held in memory, keyed by database name.
#[derive(Debug, Clone, Default)]
pub struct InMemoryCatalog {
    databases: BTreeMap<String, Arc<DatabaseMetadata>>,
}

impl InMemoryCatalog {
    /// An empty catalog.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add (or replace) a database.
    pub fn insert(&mut self, database: DatabaseMetadata) {
        self.databases
            .insert(database.name.clone(), Arc::new(database));
    }

    /// Builder form of [`InMemoryCatalog::insert`].
    pub fn with_database(mut self, database: DatabaseMetadata) -> Self {
        self.insert(database);
        self
    }

    /// Load a catalog from its JSON description.
    pub fn from_json(json: &str) -> Result<Self, CatalogLoadError> {
        let file: CatalogFile = serde_json::from_str(json)?;
        let mut catalog = Self::new();
        for database in file.databases {
            catalog.insert(database);
        }
        Ok(catalog)
    }

    /// Merge another catalog into this one; databases present in both are
    /// merged schema by schema, `other` winning on name clashes.
    pub fn merge(&mut self, other: InMemoryCatalog) {
        for (name, incoming) in other.databases {
            let Some(existing) = self.databases.get_mut(&name) else {
                self.databases.insert(name, incoming);
                continue;
            };
            let merged = Arc::make_mut(existing);
            for schema in &incoming.schemas {
                let target = merged.schema_mut(&schema.name);
                for table in &schema.tables {
                    target.tables.retain(|t| t.name != table.name);
                    target.tables.push(table.clone());
                }
                for view in &schema.views {
                    target.views.retain(|v| v.name != view.name);
                    target.views.push(view.clone());
                }
            }
        }
    }

    /// Database names in sorted order.
    pub fn database_names(&self) -> impl Iterator<Item = &str> {
        self.databases.keys().map(String::as_str)
    }
}

impl CatalogAccessor for InMemoryCatalog {
    fn database_metadata(
        &self,
        ctx: &RequestContext,
        _instance_id: &str,
        database: &str,
    ) -> Result<Option<(String, Arc<DatabaseMetadata>)>, CatalogError> {
        ctx.check()?;
        Ok(self
            .databases
            .get(database)
            .map(|metadata| (metadata.name.clone(), Arc::clone(metadata))))
    }

    fn list_database_names(
        &self,
        ctx: &RequestContext,
        _instance_id: &str,
    ) -> Result<Vec<String>, CatalogError> {
        ctx.check()?;
        Ok(self.databases.keys().cloned().collect())
    }
}
