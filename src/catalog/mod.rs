/// Catalog accessor trait, request context and accessor errors.
pub mod accessor;
/// Per-analysis metadata memo.
pub mod cache;
/// Catalog built from CREATE TABLE / CREATE VIEW scripts.
pub mod ddl;
/// In-memory catalog, loadable from JSON.
pub mod memory;
/// Serializable database/schema/table/view metadata.
pub mod metadata;

pub use accessor::{CatalogAccessor, CatalogError, RequestContext};
pub use cache::MetadataCache;
pub use ddl::{catalog_from_ddl, database_from_ddl};
pub use memory::{CatalogFile, CatalogLoadError, InMemoryCatalog};
pub use metadata::{ColumnMetadata, DatabaseMetadata, SchemaMetadata, TableMetadata, ViewMetadata};
