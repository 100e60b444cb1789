use super::error::{ResourceNotFound, SpanError};
use super::extractor::SpanExtractor;
use super::lattice::Domain;
use super::types::QuerySpanResult;
use crate::relational::{SelectItem, TableName};

impl<D: Domain + ?Sized> SpanExtractor<'_, D> {
    /// Expand a projection (or RETURNING list) into output columns.
    pub(super) fn expand_select_list(
        &mut self,
        items: &[SelectItem],
    ) -> Result<Vec<QuerySpanResult<D::Value>>, SpanError> {
        let mut results = Vec::with_capacity(items.len());
        for item in items {
            match item {
                SelectItem::Wildcard => {
                    let expanded: Vec<_> = self
                        .scope
                        .visible_fields()
                        .map(|field| field.to_result(true))
                        .collect();
                    for result in &expanded {
                        self.observe(&result.value);
                    }
                    results.extend(expanded);
                }
                SelectItem::QualifiedWildcard(table) => {
                    results.extend(self.expand_qualified_wildcard(table));
                }
                SelectItem::Positional { reference, alias } => {
                    let field = self.positional_field(reference)?;
                    let mut result = field.to_result(false);
                    if let Some(alias) = alias {
                        result.name = alias.clone();
                    }
                    results.push(result);
                }
                SelectItem::Expr { expr, alias, text } => {
                    let evaluated = self.eval_named(expr)?;
                    let name = alias
                        .clone()
                        .or(evaluated.name)
                        .unwrap_or_else(|| text.clone());
                    results.push(QuerySpanResult {
                        name,
                        value: evaluated.value,
                        is_plain_field: evaluated.is_plain_field,
                        is_wildcard: false,
                    });
                }
            }
        }
        Ok(results)
    }

    /// `t.*`: a CTE of that name first, then the FROM source.
    fn expand_qualified_wildcard(&mut self, table: &TableName) -> Vec<QuerySpanResult<D::Value>> {
        let cte = table
            .is_unqualified()
            .then(|| self.scope.find_cte(&table.table, self.cmp))
            .flatten();
        let expanded: Vec<_> = match cte {
            Some(binding) => binding
                .columns
                .iter()
                .cloned()
                .map(|mut result| {
                    result.is_wildcard = true;
                    result
                })
                .collect(),
            None => self
                .scope
                .fields_of(table, self.cmp)
                .into_iter()
                .map(|field| field.to_result(true))
                .collect(),
        };
        if expanded.is_empty() {
            self.record_missing(ResourceNotFound {
                database: table.database.clone(),
                schema: table.schema.clone(),
                table: Some(table.table.clone()),
                column: None,
            });
        }
        for result in &expanded {
            self.observe(&result.value);
        }
        expanded
    }
}

#[cfg(test)]
mod tests {
    use crate::catalog::{catalog_from_ddl, RequestContext};
    use crate::config::AnalyzerConfig;
    use crate::lineage::{get_query_span, QuerySpan};
    use crate::parser::dialect::Dialect;

    fn lineage(sql: &str) -> QuerySpan {
        let catalog =
            catalog_from_ddl(Dialect::Postgres, "db", "CREATE TABLE t (a INT, b INT);").unwrap();
        let config = AnalyzerConfig::new(Dialect::Postgres, "db");
        get_query_span(sql, &catalog, &RequestContext::new(), &config).unwrap()
    }

    fn names(span: &QuerySpan) -> Vec<&str> {
        span.results.iter().map(|result| result.name.as_str()).collect()
    }

    #[test]
    fn wildcard_expands_in_from_order() {
        let span = lineage("SELECT * FROM t AS x, t AS y");
        assert_eq!(names(&span), ["a", "b", "a", "b"]);
        assert!(span.results.iter().all(|result| result.is_wildcard));
    }

    #[test]
    fn default_names_follow_the_expression() {
        let span = lineage("SELECT a, upper(b), (SELECT b FROM t), a + 1, 7 AS seven FROM t");
        assert_eq!(names(&span), ["a", "upper", "b", "a + 1", "seven"]);
        assert!(span.results[0].is_plain_field);
        assert!(!span.results[1].is_plain_field);
    }

    #[test]
    fn qualified_wildcard_prefers_cte() {
        let span = lineage("WITH c AS (SELECT a FROM t) SELECT c.* FROM c");
        assert_eq!(names(&span), ["a"]);

        let span = lineage("WITH c AS (SELECT a FROM t) SELECT c.* FROM t");
        assert_eq!(names(&span), ["a"]);
        assert!(span.not_found.is_none());

        let span = lineage("WITH c AS (SELECT a FROM t) SELECT c.* FROM t AS c");
        assert_eq!(names(&span), ["a"]);

        let span = lineage("WITH c AS (SELECT a FROM t) SELECT x.* FROM t AS x");
        assert_eq!(names(&span), ["a", "b"]);
    }

    #[test]
    fn unknown_qualified_wildcard_is_a_soft_miss() {
        let span = lineage("SELECT ghost.* FROM t");
        assert!(span.results.is_empty());
        assert_eq!(
            span.not_found.as_ref().and_then(|missing| missing.table.as_deref()),
            Some("ghost")
        );
    }
}
