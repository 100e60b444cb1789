use tracing::{debug, warn};

use super::composer;
use super::error::{ResourceNotFound, SpanError};
use super::lattice::{Domain, Lattice};
use super::scope::Scope;
use super::types::{QuerySpanResult, QueryType, Relation};
use crate::catalog::{CatalogAccessor, MetadataCache, RequestContext};
use crate::config::AnalyzerConfig;
use crate::parser::dialect::Dialect;
use crate::parser::names::NameCmp;
use crate::relational::walk::referenced_tables;
use crate::relational::{CteBody, Dml, Query, Select, SetExpr, Statement, With};

/// Everything one analysis produces, for any domain.
#[derive(Debug, Clone, PartialEq)]
pub struct SpanOutcome<V> {
    /// Statement classification.
    pub query_type: QueryType,
    /// Output columns.
    pub results: Vec<QuerySpanResult<V>>,
    /// Join of every resolved column value. When the analysis stopped at a
    /// missing resource, also every column of the tables resolved before it.
    pub touched: V,
    /// Join of every column value read by a predicate.
    pub predicates: V,
    /// First missing resource, if any.
    pub not_found: Option<ResourceNotFound>,
}

impl<V: Lattice> SpanOutcome<V> {
    fn empty(query_type: QueryType) -> Self {
        Self {
            query_type,
            results: Vec::new(),
            touched: V::bottom(),
            predicates: V::bottom(),
            not_found: None,
        }
    }
}

/// Analyse one statement in `domain`.
pub fn analyze<D>(
    statement: &Statement,
    domain: &D,
    catalog: &dyn CatalogAccessor,
    ctx: &RequestContext,
    config: &AnalyzerConfig,
) -> Result<SpanOutcome<D::Value>, SpanError>
where
    D: Domain + ?Sized,
{
    SpanExtractor::new(domain, catalog, ctx, config).extract(statement)
}

/// Propagation engine for one statement.
///
/// The extractor owns its scope and metadata cache; it is consumed by
/// [`SpanExtractor::extract`].
pub struct SpanExtractor<'a, D: Domain + ?Sized> {
    pub(super) domain: &'a D,
    pub(super) config: &'a AnalyzerConfig,
    pub(super) dialect: Dialect,
    pub(super) cmp: NameCmp,
    pub(super) cache: MetadataCache<'a>,
    pub(super) scope: Scope<D::Value>,
    pub(super) default_database: String,
    pub(super) default_schema: String,
    pub(super) touched: D::Value,
    /// Every physical column of every table resolved so far.
    pub(super) accessed: D::Value,
    pub(super) predicates: D::Value,
    pub(super) predicate_depth: usize,
    pub(super) view_depth: usize,
    pub(super) not_found: Option<ResourceNotFound>,
}

impl<'a, D: Domain + ?Sized> SpanExtractor<'a, D> {
    /// Prepare an engine reading metadata from `catalog`.
    pub fn new(
        domain: &'a D,
        catalog: &'a dyn CatalogAccessor,
        ctx: &'a RequestContext,
        config: &'a AnalyzerConfig,
    ) -> Self {
        Self {
            domain,
            config,
            dialect: config.dialect,
            cmp: config.dialect.name_cmp(),
            cache: MetadataCache::new(catalog, ctx, &config.instance_id),
            scope: Scope::new(),
            default_database: config.default_database.clone(),
            default_schema: config.effective_default_schema(),
            touched: D::Value::bottom(),
            accessed: D::Value::bottom(),
            predicates: D::Value::bottom(),
            predicate_depth: 0,
            view_depth: 0,
            not_found: None,
        }
    }

    /// Run the analysis.
    pub fn extract(mut self, statement: &Statement) -> Result<SpanOutcome<D::Value>, SpanError> {
        let query_type = match statement {
            Statement::Query(_) => QueryType::Select,
            Statement::Dml(_) => QueryType::Dml,
            Statement::Explain => return Ok(SpanOutcome::empty(QueryType::Explain)),
            Statement::Ddl => return Ok(SpanOutcome::empty(QueryType::Ddl)),
            Statement::Other => return Ok(SpanOutcome::empty(QueryType::Unknown)),
        };

        let tables = referenced_tables(statement, self.cmp);
        let system = tables
            .iter()
            .filter(|table| self.dialect.is_system_table(table))
            .count();
        if system > 0 {
            if system < tables.len() {
                return Err(SpanError::MixedCatalogAccess);
            }
            debug!(tables = system, "statement reads only system catalog objects");
            return Ok(SpanOutcome::empty(QueryType::SelectInfoSchema));
        }

        let results = match statement {
            Statement::Query(query) => self.query_results(query),
            Statement::Dml(dml) => self.dml_results(dml),
            _ => Ok(Vec::new()),
        };
        match results {
            Ok(results) => Ok(SpanOutcome {
                query_type,
                results,
                touched: self.touched,
                predicates: self.predicates,
                not_found: self.not_found,
            }),
            Err(err) => match err.not_found() {
                Some(missing) => {
                    warn!(%missing, "query span stopped at missing resource");
                    Ok(SpanOutcome {
                        query_type,
                        results: Vec::new(),
                        touched: self.touched.join(&self.accessed),
                        predicates: self.predicates,
                        not_found: Some(missing.clone()),
                    })
                }
                None => Err(err),
            },
        }
    }

    /// Run `body`, then drop every scope entry it pushed, on every exit path.
    pub(super) fn scoped<R>(
        &mut self,
        body: impl FnOnce(&mut Self) -> Result<R, SpanError>,
    ) -> Result<R, SpanError> {
        let checkpoint = self.scope.checkpoint();
        let result = body(self);
        self.scope.restore(checkpoint);
        result
    }

    /// Record a value read by the statement.
    pub(super) fn observe(&mut self, value: &D::Value) {
        self.touched.join_assign(value);
        if self.predicate_depth > 0 {
            self.predicates.join_assign(value);
        }
    }

    /// Record a value read by a predicate.
    pub(super) fn observe_predicate(&mut self, value: &D::Value) {
        self.touched.join_assign(value);
        self.predicates.join_assign(value);
    }

    /// Remember the first soft miss.
    pub(super) fn record_missing(&mut self, missing: ResourceNotFound) {
        if self.not_found.is_none() {
            warn!(%missing, "unresolved reference evaluates to bottom");
            self.not_found = Some(missing);
        }
    }

    pub(super) fn query_results(
        &mut self,
        query: &Query,
    ) -> Result<Vec<QuerySpanResult<D::Value>>, SpanError> {
        self.scoped(|this| {
            if let Some(with) = &query.with {
                this.bind_with(with)?;
            }
            this.set_expr_results(&query.body)
        })
    }

    fn bind_with(&mut self, with: &With) -> Result<(), SpanError> {
        for cte in &with.ctes {
            let bound = match &cte.body {
                CteBody::Plain(body) => self.query_results(body).and_then(|mut results| {
                    composer::rename_results(&mut results, &cte.columns, &cte.name, cte.position)?;
                    self.scope.bind_cte(cte.name.clone(), results);
                    Ok(())
                }),
                CteBody::Recursive { anchor, recursive } => {
                    self.bind_recursive_cte(cte, anchor, recursive)
                }
            };
            bound.map_err(|err| err.context(format!("in CTE \"{}\"", cte.name)))?;
        }
        Ok(())
    }

    pub(super) fn set_expr_results(
        &mut self,
        body: &SetExpr,
    ) -> Result<Vec<QuerySpanResult<D::Value>>, SpanError> {
        match body {
            SetExpr::Select(select) => self.select_results(select),
            SetExpr::Query(query) => self.query_results(query),
            SetExpr::SetOperation {
                op,
                branches,
                position,
            } => {
                let mut evaluated = Vec::with_capacity(branches.len());
                for branch in branches {
                    evaluated.push(self.set_expr_results(branch)?);
                }
                composer::set_operation(*op, evaluated, *position)
            }
            SetExpr::Values { rows, position } => {
                let mut values = Vec::with_capacity(rows.len());
                for row in rows {
                    let mut evaluated = Vec::with_capacity(row.len());
                    for expr in row {
                        evaluated.push(self.eval_expr(expr)?);
                    }
                    values.push(evaluated);
                }
                composer::values(values, *position)
            }
            SetExpr::Table(name) => {
                let relation: Relation<D::Value> =
                    self.resolve_table(name)?.into_relation(self.domain);
                let results = relation.into_results();
                for result in &results {
                    self.observe(&result.value);
                }
                Ok(results)
            }
            SetExpr::Opaque => Ok(Vec::new()),
        }
    }

    fn select_results(
        &mut self,
        select: &Select,
    ) -> Result<Vec<QuerySpanResult<D::Value>>, SpanError> {
        self.scoped(|this| {
            this.scope.push_frame();
            for item in &select.from {
                let relation = this.from_item_relation(item)?;
                this.scope.add_relation(relation);
            }
            for predicate in [&select.selection, &select.having, &select.qualify]
                .into_iter()
                .flatten()
            {
                this.eval_predicate(predicate)?;
            }
            this.expand_select_list(&select.projection)
        })
    }

    fn dml_results(&mut self, dml: &Dml) -> Result<Vec<QuerySpanResult<D::Value>>, SpanError> {
        self.scoped(|this| {
            this.scope.push_frame();
            for item in &dml.sources {
                let relation = this.from_item_relation(item)?;
                this.scope.add_relation(relation);
            }
            if let Some(source) = &dml.source_query {
                this.query_results(source)
                    .map_err(|err| err.context("in INSERT source"))?;
            }
            for assignment in &dml.assignments {
                this.eval_expr(assignment)?;
            }
            if let Some(selection) = &dml.selection {
                this.eval_predicate(selection)?;
            }
            this.expand_select_list(&dml.returning)
        })
    }
}
