mod support;

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use sqlspan::catalog::{
    CatalogAccessor, CatalogError, DatabaseMetadata, InMemoryCatalog, RequestContext,
};
use sqlspan::lineage::get_query_span;
use sqlspan::span::SpanError;
use support::{shop_catalog, shop_column, shop_config, sources_of};

/// Delegates to an in-memory catalog and counts database fetches.
struct CountingCatalog {
    inner: InMemoryCatalog,
    fetches: AtomicUsize,
}

impl CatalogAccessor for CountingCatalog {
    fn database_metadata(
        &self,
        ctx: &RequestContext,
        instance_id: &str,
        database: &str,
    ) -> Result<Option<(String, Arc<DatabaseMetadata>)>, CatalogError> {
        self.fetches.fetch_add(1, Ordering::SeqCst);
        self.inner.database_metadata(ctx, instance_id, database)
    }

    fn list_database_names(
        &self,
        ctx: &RequestContext,
        instance_id: &str,
    ) -> Result<Vec<String>, CatalogError> {
        self.inner.list_database_names(ctx, instance_id)
    }
}

/// Always fails, like a catalog whose backend is down.
struct BrokenCatalog;

impl CatalogAccessor for BrokenCatalog {
    fn database_metadata(
        &self,
        _ctx: &RequestContext,
        _instance_id: &str,
        _database: &str,
    ) -> Result<Option<(String, Arc<DatabaseMetadata>)>, CatalogError> {
        Err(CatalogError::Unavailable("connection refused".to_string()))
    }

    fn list_database_names(
        &self,
        _ctx: &RequestContext,
        _instance_id: &str,
    ) -> Result<Vec<String>, CatalogError> {
        Err(CatalogError::Unavailable("connection refused".to_string()))
    }
}

#[test]
fn metadata_is_fetched_once_per_analysis() {
    let catalog = CountingCatalog {
        inner: shop_catalog(),
        fetches: AtomicUsize::new(0),
    };
    let span = get_query_span(
        "SELECT c.name, o.total FROM customers c JOIN orders o ON o.customer_id = c.id \
         JOIN big_orders b ON b.id = o.id",
        &catalog,
        &RequestContext::new(),
        &shop_config(),
    )
    .unwrap();
    assert_eq!(sources_of(&span, "total"), [&shop_column("orders", "total")]);
    assert_eq!(catalog.fetches.load(Ordering::SeqCst), 1);
}

#[test]
fn cancelled_request_is_a_hard_error() {
    let ctx = RequestContext::new();
    let observer = ctx.clone();
    observer.cancel();
    let err = get_query_span(
        "SELECT id FROM orders",
        &shop_catalog(),
        &ctx,
        &shop_config(),
    )
    .unwrap_err();
    assert!(matches!(err.root(), SpanError::Catalog(CatalogError::Cancelled)));
}

#[test]
fn expired_deadline_is_a_hard_error() {
    let ctx = RequestContext::new().with_deadline(std::time::Instant::now());
    let err = get_query_span("SELECT id FROM orders", &shop_catalog(), &ctx, &shop_config())
        .unwrap_err();
    assert!(matches!(
        err.root(),
        SpanError::Catalog(CatalogError::DeadlineExceeded)
    ));
}

#[test]
fn backend_failures_propagate() {
    let err = get_query_span(
        "SELECT id FROM orders",
        &BrokenCatalog,
        &RequestContext::new(),
        &shop_config(),
    )
    .unwrap_err();
    assert!(err.to_string().contains("connection refused"));
}

#[test]
fn literal_only_queries_never_touch_the_catalog() {
    let span = get_query_span(
        "SELECT 1 AS one",
        &BrokenCatalog,
        &RequestContext::new(),
        &shop_config(),
    )
    .unwrap();
    assert_eq!(span.results.len(), 1);
    assert!(span.source_columns.is_empty());
}

#[test]
fn json_catalog_merges_with_ddl_catalog() {
    let mut catalog = InMemoryCatalog::from_json(
        r#"{"databases": [{"name": "shop", "schemas": [{
            "name": "public",
            "tables": [{"name": "refunds", "columns": [{"name": "order_id", "type": "int"}]}]
        }]}]}"#,
    )
    .unwrap();
    catalog.merge(shop_catalog());
    let span = get_query_span(
        "SELECT r.order_id, o.total FROM refunds r JOIN orders o ON o.id = r.order_id",
        &catalog,
        &RequestContext::new(),
        &shop_config(),
    )
    .unwrap();
    assert_eq!(sources_of(&span, "order_id"), [&shop_column("refunds", "order_id")]);
    assert!(span.not_found.is_none());
}
