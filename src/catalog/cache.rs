use std::collections::HashMap;
use std::sync::Arc;

use tracing::debug;

use super::{CatalogAccessor, CatalogError, DatabaseMetadata, RequestContext};

type Entry = Option<(String, Arc<DatabaseMetadata>)>;

/// Per-analysis memo of catalog responses, keyed by requested database name.
pub struct MetadataCache<'a> {
    accessor: &'a dyn CatalogAccessor,
    ctx: &'a RequestContext,
    instance_id: &'a str,
    databases: HashMap<String, Entry>,
    database_names: Option<Vec<String>>,
}

impl<'a> MetadataCache<'a> {
    /// An empty cache in front of `accessor`.
    pub fn new(
        accessor: &'a dyn CatalogAccessor,
        ctx: &'a RequestContext,
        instance_id: &'a str,
    ) -> Self {
        Self {
            accessor,
            ctx,
            instance_id,
            databases: HashMap::new(),
            database_names: None,
        }
    }

    /// Fetch a database, asking the accessor at most once per name.
    pub fn database(&mut self, name: &str) -> Result<Entry, CatalogError> {
        if let Some(entry) = self.databases.get(name) {
            return Ok(entry.clone());
        }
        debug!(database = name, "catalog cache miss");
        let entry = self
            .accessor
            .database_metadata(self.ctx, self.instance_id, name)?;
        self.databases.insert(name.to_string(), entry.clone());
        Ok(entry)
    }

    /// Every database name on the instance, fetched once.
    pub fn database_names(&mut self) -> Result<&[String], CatalogError> {
        if self.database_names.is_none() {
            debug!("listing catalog databases");
            let names = self
                .accessor
                .list_database_names(self.ctx, self.instance_id)?;
            self.database_names = Some(names);
        }
        Ok(self.database_names.as_deref().unwrap_or_default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;

    struct Counting {
        calls: Cell<usize>,
    }

    impl CatalogAccessor for Counting {
        fn database_metadata(
            &self,
            _ctx: &RequestContext,
            _instance_id: &str,
            database: &str,
        ) -> Result<Entry, CatalogError> {
            self.calls.set(self.calls.get() + 1);
            Ok((database == "db").then(|| {
                (
                    "db".to_string(),
                    Arc::new(DatabaseMetadata {
                        name: "db".to_string(),
                        schemas: Vec::new(),
                    }),
                )
            }))
        }

        fn list_database_names(
            &self,
            _ctx: &RequestContext,
            _instance_id: &str,
        ) -> Result<Vec<String>, CatalogError> {
            self.calls.set(self.calls.get() + 1);
            Ok(vec!["db".to_string()])
        }
    }

    #[test]
    fn each_name_is_fetched_once_including_misses() {
        let accessor = Counting { calls: Cell::new(0) };
        let ctx = RequestContext::new();
        let mut cache = MetadataCache::new(&accessor, &ctx, "");
        assert!(cache.database("db").unwrap().is_some());
        assert!(cache.database("db").unwrap().is_some());
        assert!(cache.database("other").unwrap().is_none());
        assert!(cache.database("other").unwrap().is_none());
        assert_eq!(cache.database_names().unwrap(), ["db".to_string()]);
        assert_eq!(cache.database_names().unwrap().len(), 1);
        assert_eq!(accessor.calls.get(), 3);
    }
}
