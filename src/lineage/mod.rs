//! Column lineage: the base columns every output column is derived from.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::catalog::{CatalogAccessor, RequestContext};
use crate::config::AnalyzerConfig;
use crate::parser::sql_parser::parse_statement;
use crate::relational::Statement;
use crate::span::{
    analyze, ColumnResource, Domain, Lattice, QuerySpanResult, QueryType, ResourceNotFound,
    SpanError,
};

/// Set of physical columns; ordered so that output is deterministic.
pub type SourceColumnSet = BTreeSet<ColumnResource>;

impl Lattice for SourceColumnSet {
    fn bottom() -> Self {
        BTreeSet::new()
    }

    fn join_assign(&mut self, other: &Self) -> bool {
        let before = self.len();
        self.extend(other.iter().cloned());
        self.len() != before
    }
}

/// Lineage domain: a physical column derives from itself.
#[derive(Debug, Clone, Copy, Default)]
pub struct LineageDomain;

impl Domain for LineageDomain {
    type Value = SourceColumnSet;

    fn column_value(&self, column: &ColumnResource) -> SourceColumnSet {
        BTreeSet::from([column.clone()])
    }
}

/// Lineage of one statement.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QuerySpan {
    /// Statement classification.
    pub query_type: QueryType,
    /// Output columns with their source columns.
    pub results: Vec<QuerySpanResult<SourceColumnSet>>,
    /// Every physical column the statement reads.
    pub source_columns: SourceColumnSet,
    /// Columns read by WHERE / HAVING / QUALIFY / join conditions.
    pub predicate_columns: SourceColumnSet,
    /// First missing resource, when resolution was incomplete.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub not_found: Option<ResourceNotFound>,
}

impl QuerySpan {
    /// A span with no columns.
    pub fn empty(query_type: QueryType) -> Self {
        Self {
            query_type,
            results: Vec::new(),
            source_columns: SourceColumnSet::new(),
            predicate_columns: SourceColumnSet::new(),
            not_found: None,
        }
    }
}

/// Compute the lineage of one SQL statement.
pub fn get_query_span(
    sql: &str,
    catalog: &dyn CatalogAccessor,
    ctx: &RequestContext,
    config: &AnalyzerConfig,
) -> Result<QuerySpan, SpanError> {
    let statement = parse_statement(config.dialect, sql)?;
    query_span_for_statement(&statement, catalog, ctx, config)
}

/// [`get_query_span`] over an already lowered statement.
pub fn query_span_for_statement(
    statement: &Statement,
    catalog: &dyn CatalogAccessor,
    ctx: &RequestContext,
    config: &AnalyzerConfig,
) -> Result<QuerySpan, SpanError> {
    let outcome = analyze(statement, &LineageDomain, catalog, ctx, config)?;
    debug!(
        results = outcome.results.len(),
        sources = outcome.touched.len(),
        "query span computed"
    );
    Ok(QuerySpan {
        query_type: outcome.query_type,
        results: outcome.results,
        source_columns: outcome.touched,
        predicate_columns: outcome.predicates,
        not_found: outcome.not_found,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn join_is_set_union() {
        let a = ColumnResource::new("db", "s", "t", "a");
        let b = ColumnResource::new("db", "s", "t", "b");
        let mut left = LineageDomain.column_value(&a);
        assert!(left.join_assign(&LineageDomain.column_value(&b)));
        assert!(!left.join_assign(&LineageDomain.column_value(&a)));
        assert_eq!(left.len(), 2);
        assert!(!left.is_terminal());
    }

    #[test]
    fn empty_span_serializes_without_not_found() {
        let json = serde_json::to_value(QuerySpan::empty(QueryType::Explain)).unwrap();
        assert_eq!(json["query_type"], "explain");
        assert!(json.get("not_found").is_none());
    }
}
