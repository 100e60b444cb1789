use std::sync::Arc;

use tracing::debug;

use super::composer;
use super::error::{ResourceNotFound, SpanError};
use super::extractor::SpanExtractor;
use super::lattice::{Domain, Lattice};
use super::types::{ColumnResource, QuerySpanResult, Relation, TableSource};
use crate::catalog::{DatabaseMetadata, SchemaMetadata, ViewMetadata};
use crate::parser::sql_parser::parse_statement;
use crate::relational::{
    Alias, FromItem, Join, JoinConstraint, Position, Statement, TableFactor, TableName,
};

impl<D: Domain + ?Sized> SpanExtractor<'_, D> {
    /// Evaluate one FROM item (a factor and its joins) into a relation.
    pub(super) fn from_item_relation(
        &mut self,
        item: &FromItem,
    ) -> Result<Relation<D::Value>, SpanError> {
        let mut relation = self.table_factor_relation(&item.relation)?;
        for join in &item.joins {
            relation = self.join_relation(relation, join)?;
        }
        Ok(relation)
    }

    fn join_relation(
        &mut self,
        left: Relation<D::Value>,
        join: &Join,
    ) -> Result<Relation<D::Value>, SpanError> {
        let right = self.table_factor_relation(&join.relation)?;
        let left_len = left.fields.len();

        let mut relation = match &join.constraint {
            JoinConstraint::Natural => {
                let joined = composer::natural_join(left, right, self.cmp);
                for value in &joined.merged {
                    self.observe_predicate(value);
                }
                joined.relation
            }
            JoinConstraint::Using(columns) => {
                let joined =
                    composer::using_join(left, right, columns, self.cmp, join.position)?;
                for value in &joined.merged {
                    self.observe_predicate(value);
                }
                joined.relation
            }
            JoinConstraint::On(_) | JoinConstraint::None => composer::concat(left, right),
        };

        if let JoinConstraint::On(condition) = &join.constraint {
            let combined = relation.clone();
            self.scoped(|this| {
                this.scope.push_frame();
                this.scope.add_relation(combined);
                this.eval_predicate(condition)
            })?;
        }

        if join.kind.keeps_left_only() {
            relation.fields.truncate(left_len);
        } else if join.kind.keeps_right_only() {
            relation.fields.drain(..left_len);
        }
        Ok(relation)
    }

    /// Evaluate one FROM source into a relation.
    pub(super) fn table_factor_relation(
        &mut self,
        factor: &TableFactor,
    ) -> Result<Relation<D::Value>, SpanError> {
        match factor {
            TableFactor::Table {
                name,
                alias,
                position,
            } => {
                let relation = self.resolve_table(name)?.into_relation(self.domain);
                aliased(relation, alias.as_ref(), *position)
            }
            TableFactor::Derived {
                subquery,
                alias,
                position,
            } => {
                let results = self
                    .query_results(subquery)
                    .map_err(|err| err.context("in subquery"))?;
                aliased(Relation::from_results("", results), alias.as_ref(), *position)
            }
            TableFactor::NestedJoin {
                item,
                alias,
                position,
            } => {
                let relation = self.from_item_relation(item)?;
                aliased(relation, alias.as_ref(), *position)
            }
            TableFactor::Pivot {
                source,
                pivot_column,
                value_column,
                values,
                alias,
                position,
            } => {
                let relation = self.table_factor_relation(source)?;
                let pivoted = composer::pivot(
                    relation,
                    pivot_column.as_deref(),
                    value_column,
                    values,
                    self.cmp,
                    *position,
                )?;
                aliased(pivoted, alias.as_ref(), *position)
            }
            TableFactor::Unpivot {
                source,
                value_column,
                name_column,
                columns,
                alias,
                position,
            } => {
                let relation = self.table_factor_relation(source)?;
                let unpivoted = composer::unpivot(
                    relation,
                    value_column,
                    name_column,
                    columns,
                    self.cmp,
                    *position,
                )?;
                aliased(unpivoted, alias.as_ref(), *position)
            }
            TableFactor::Function { name, args, alias } => {
                let value = self.eval_operands(args)?;
                let names: Vec<String> = match alias {
                    Some(alias) if !alias.columns.is_empty() => alias.columns.clone(),
                    _ if name.is_empty() => Vec::new(),
                    _ => vec![name.clone()],
                };
                let table = alias.as_ref().map_or(name.as_str(), |alias| alias.name.as_str());
                let columns = names
                    .into_iter()
                    .map(|column| QuerySpanResult::computed(column, value.clone()))
                    .collect();
                Ok(Relation::from_results(table, columns))
            }
        }
    }

    /// Resolve a relation name to a CTE, table or view.
    pub(super) fn resolve_table(
        &mut self,
        name: &TableName,
    ) -> Result<TableSource<D::Value>, SpanError> {
        if name.is_unqualified() {
            if let Some(binding) = self.scope.find_cte(&name.table, self.cmp) {
                return Ok(TableSource::PseudoTable {
                    name: binding.name.clone(),
                    columns: binding.columns.clone(),
                });
            }
        }

        let requested_database = name
            .database
            .clone()
            .unwrap_or_else(|| self.default_database.clone());
        let (database, metadata) = self.lookup_database(&requested_database)?;
        let schema = self.lookup_schema(&database, &metadata, name)?;

        if let Some(table) = schema.table(&name.table, self.cmp) {
            for column in &table.columns {
                let resource =
                    ColumnResource::new(&database, &schema.name, &table.name, &column.name);
                self.accessed.join_assign(&self.domain.column_value(&resource));
            }
            return Ok(TableSource::PhysicalTable {
                database,
                schema: schema.name.clone(),
                name: table.name.clone(),
                columns: table.columns.clone(),
            });
        }
        if let Some(view) = schema.view(&name.table, self.cmp) {
            let columns = self.expand_view(&database, &schema.name, view)?;
            return Ok(TableSource::PhysicalView {
                database,
                schema: schema.name.clone(),
                name: view.name.clone(),
                columns,
            });
        }
        Err(ResourceNotFound::table(database, schema.name.clone(), name.table.clone()).into())
    }

    /// Exact match first, then a case-insensitive match over every database.
    fn lookup_database(
        &mut self,
        requested: &str,
    ) -> Result<(String, Arc<DatabaseMetadata>), SpanError> {
        if let Some(found) = self.cache.database(requested)? {
            return Ok(found);
        }
        let candidate = self
            .cache
            .database_names()?
            .iter()
            .find(|candidate| candidate.eq_ignore_ascii_case(requested))
            .cloned();
        if let Some(candidate) = candidate {
            if let Some(found) = self.cache.database(&candidate)? {
                return Ok(found);
            }
        }
        Err(ResourceNotFound::database(requested).into())
    }

    fn lookup_schema<'m>(
        &self,
        database: &str,
        metadata: &'m DatabaseMetadata,
        name: &TableName,
    ) -> Result<&'m SchemaMetadata, SpanError> {
        if !self.dialect.has_schemas() {
            return metadata
                .schema("", self.cmp)
                .or_else(|| metadata.schemas.first())
                .ok_or_else(|| ResourceNotFound::schema(database, "").into());
        }
        if let Some(schema) = &name.schema {
            return metadata
                .schema(schema, self.cmp)
                .ok_or_else(|| ResourceNotFound::schema(database, schema.as_str()).into());
        }
        if let Some(schema) = metadata.schema(&self.default_schema, self.cmp) {
            return Ok(schema);
        }
        // No usable default: take the first schema holding the relation.
        if self.default_schema.is_empty() {
            if let Some(schema) = metadata.schemas.iter().find(|schema| {
                schema.table(&name.table, self.cmp).is_some()
                    || schema.view(&name.table, self.cmp).is_some()
            }) {
                return Ok(schema);
            }
        }
        Err(ResourceNotFound::schema(database, self.default_schema.as_str()).into())
    }

    /// Analyse a view definition in a fresh scope rooted at the view's schema.
    fn expand_view(
        &mut self,
        database: &str,
        schema: &str,
        view: &ViewMetadata,
    ) -> Result<Vec<QuerySpanResult<D::Value>>, SpanError> {
        let location = format!("in view \"{database}.{schema}.{}\"", view.name);
        if self.view_depth >= self.config.max_view_depth {
            return Err(SpanError::RecursionLimit(format!(
                "view \"{}\" nests more than {} views deep",
                view.name, self.config.max_view_depth
            )));
        }
        debug!(view = %view.name, depth = self.view_depth, "expanding view definition");

        let query = match parse_statement(self.dialect, &view.definition)
            .map_err(|err| err.context(location.as_str()))?
        {
            Statement::Query(query) => query,
            _ => {
                return Err(SpanError::Parse(format!(
                    "view \"{}\" is not defined by a query",
                    view.name
                )))
            }
        };

        let saved_scope = std::mem::take(&mut self.scope);
        let saved_database = std::mem::replace(&mut self.default_database, database.to_string());
        let saved_schema = std::mem::replace(&mut self.default_schema, schema.to_string());
        let saved_touched = std::mem::replace(&mut self.touched, D::Value::bottom());
        let saved_predicates = std::mem::replace(&mut self.predicates, D::Value::bottom());
        let saved_depth = std::mem::replace(&mut self.predicate_depth, 0);
        self.view_depth += 1;

        let result = self.query_results(&query);

        self.view_depth -= 1;
        self.predicate_depth = saved_depth;
        self.predicates = saved_predicates;
        self.touched = saved_touched;
        self.default_schema = saved_schema;
        self.default_database = saved_database;
        self.scope = saved_scope;

        result.map_err(|err| err.context(location))
    }
}

fn aliased<V>(
    relation: Relation<V>,
    alias: Option<&Alias>,
    position: Position,
) -> Result<Relation<V>, SpanError> {
    match alias {
        Some(alias) => composer::apply_alias(relation, alias, position),
        None => Ok(relation),
    }
}
