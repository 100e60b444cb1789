#![allow(dead_code)]

use sqlspan::catalog::{catalog_from_ddl, InMemoryCatalog, RequestContext};
use sqlspan::config::AnalyzerConfig;
use sqlspan::lineage::{get_query_span, QuerySpan};
use sqlspan::masking::{get_masked_fields, MaskedField, MaskingLevel, MaskingPolicy};
use sqlspan::parser::dialect::Dialect;
use sqlspan::span::{ColumnResource, SpanError};

pub(crate) const SHOP_DDL: &str = "
    CREATE TABLE customers (id INT, name TEXT, email TEXT, region TEXT);
    CREATE TABLE orders (id INT, customer_id INT, total NUMERIC, placed_at DATE);
    CREATE TABLE sales.targets (region TEXT, goal NUMERIC);
    CREATE VIEW big_orders AS SELECT id, customer_id, total FROM orders WHERE total > 100;
    CREATE VIEW big_customers AS
        SELECT c.name, o.total FROM customers c JOIN big_orders o ON o.customer_id = c.id;
";

pub(crate) const SNOWFLAKE_DDL: &str = "
    CREATE TABLE T1 (A INT, B VARCHAR);
    CREATE TABLE T2 (A INT, C VARCHAR);
";

pub(crate) fn shop_catalog() -> InMemoryCatalog {
    catalog_from_ddl(Dialect::Postgres, "shop", SHOP_DDL).expect("shop DDL should load")
}

pub(crate) fn snowflake_catalog() -> InMemoryCatalog {
    catalog_from_ddl(Dialect::Snowflake, "DB", SNOWFLAKE_DDL).expect("snowflake DDL should load")
}

pub(crate) fn shop_config() -> AnalyzerConfig {
    AnalyzerConfig::new(Dialect::Postgres, "shop")
}

pub(crate) fn snowflake_config() -> AnalyzerConfig {
    AnalyzerConfig::new(Dialect::Snowflake, "DB")
}

/// `T1.A` is fully masked; everything else is visible.
pub(crate) fn snowflake_policy() -> MaskingPolicy {
    MaskingPolicy::new(MaskingLevel::None).with_rule("T1", "A", MaskingLevel::Full)
}

pub(crate) fn shop_lineage(sql: &str) -> QuerySpan {
    try_lineage(&shop_catalog(), &shop_config(), sql)
        .unwrap_or_else(|e| panic!("lineage of {sql:?} failed: {e}"))
}

pub(crate) fn try_lineage(
    catalog: &InMemoryCatalog,
    config: &AnalyzerConfig,
    sql: &str,
) -> Result<QuerySpan, SpanError> {
    get_query_span(sql, catalog, &RequestContext::new(), config)
}

pub(crate) fn snowflake_masking(sql: &str) -> Result<Vec<MaskedField>, SpanError> {
    get_masked_fields(
        sql,
        &snowflake_catalog(),
        &snowflake_policy(),
        &RequestContext::new(),
        &snowflake_config(),
    )
}

pub(crate) fn shop_column(table: &str, column: &str) -> ColumnResource {
    ColumnResource::new("shop", "public", table, column)
}

pub(crate) fn result_names(span: &QuerySpan) -> Vec<&str> {
    span.results
        .iter()
        .map(|result| result.name.as_str())
        .collect()
}

pub(crate) fn sources_of<'a>(span: &'a QuerySpan, name: &str) -> Vec<&'a ColumnResource> {
    span.results
        .iter()
        .find(|result| result.name == name)
        .unwrap_or_else(|| panic!("no output column {name:?}"))
        .value
        .iter()
        .collect()
}
