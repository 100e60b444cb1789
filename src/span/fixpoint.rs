use tracing::debug;

use super::composer;
use super::error::SpanError;
use super::extractor::SpanExtractor;
use super::lattice::Domain;
use crate::relational::{Cte, SetExpr};

impl<D: Domain + ?Sized> SpanExtractor<'_, D> {
    /// Bind a recursive CTE to the least fixpoint of its columns.
    ///
    /// The anchor seeds the binding; each round evaluates the recursive arm
    /// against the current binding and joins the result in, until no column
    /// value grows. Values only ascend in a finite lattice, so the loop ends;
    /// the configured cap turns a runaway loop into an error.
    pub(super) fn bind_recursive_cte(
        &mut self,
        cte: &Cte,
        anchor: &SetExpr,
        recursive: &SetExpr,
    ) -> Result<(), SpanError> {
        let mut current = self
            .set_expr_results(anchor)
            .map_err(|err| err.context("in recursive CTE anchor"))?;
        composer::rename_results(&mut current, &cte.columns, &cte.name, cte.position)?;
        self.scope.bind_cte(cte.name.clone(), current.clone());

        let cap = self.config.max_recursive_iterations;
        let mut iteration = 0;
        loop {
            if iteration >= cap {
                return Err(SpanError::RecursionLimit(format!(
                    "CTE \"{}\" did not converge within {cap} iterations",
                    cte.name
                )));
            }
            iteration += 1;

            let next = self.set_expr_results(recursive)?;
            if next.len() != current.len() {
                return Err(SpanError::mismatch(
                    format!(
                        "recursive CTE \"{}\" yields {} columns but its anchor yields {}",
                        cte.name,
                        next.len(),
                        current.len()
                    ),
                    cte.position,
                ));
            }
            let changed = composer::merge_results(&mut current, &next);
            debug!(cte = %cte.name, iteration, changed, "recursive CTE round");
            if !changed {
                return Ok(());
            }
            self.scope.rebind_innermost_cte(current.clone());
        }
    }
}

#[cfg(test)]
mod tests {
    use crate::catalog::{catalog_from_ddl, InMemoryCatalog, RequestContext};
    use crate::config::AnalyzerConfig;
    use crate::lineage::get_query_span;
    use crate::parser::dialect::Dialect;
    use crate::span::{ColumnResource, SpanError};

    fn catalog() -> InMemoryCatalog {
        catalog_from_ddl(Dialect::Postgres, "db", "CREATE TABLE t (id INT, parent INT);").unwrap()
    }

    #[test]
    fn swapped_columns_converge_to_the_union() {
        let config = AnalyzerConfig::new(Dialect::Postgres, "db");
        let span = get_query_span(
            "WITH RECURSIVE r(a, b) AS (SELECT id, parent FROM t UNION ALL SELECT b, a FROM r) \
             SELECT a, b FROM r",
            &catalog(),
            &RequestContext::new(),
            &config,
        )
        .unwrap();
        let both = [
            ColumnResource::new("db", "public", "t", "id"),
            ColumnResource::new("db", "public", "t", "parent"),
        ];
        for result in &span.results {
            assert!(both.iter().all(|column| result.value.contains(column)));
        }
    }

    #[test]
    fn iteration_cap_is_enforced() {
        let config = AnalyzerConfig {
            max_recursive_iterations: 1,
            ..AnalyzerConfig::new(Dialect::Postgres, "db")
        };
        let err = get_query_span(
            "WITH RECURSIVE r(a, b) AS (SELECT id, 1 FROM t UNION ALL SELECT b, a FROM r) \
             SELECT * FROM r",
            &catalog(),
            &RequestContext::new(),
            &config,
        )
        .unwrap_err();
        assert!(matches!(err.root(), SpanError::RecursionLimit(_)));
    }

    #[test]
    fn arm_width_must_match_anchor() {
        let config = AnalyzerConfig::new(Dialect::Postgres, "db");
        let err = get_query_span(
            "WITH RECURSIVE r AS (SELECT id FROM t UNION ALL SELECT id, parent FROM r JOIN t ON true) \
             SELECT * FROM r",
            &catalog(),
            &RequestContext::new(),
            &config,
        )
        .unwrap_err();
        assert!(matches!(err.root(), SpanError::StructuralMismatch { .. }));
    }
}
