use sqlparser::ast::{self, Spanned};

use super::dialect::Dialect;
use super::expr::{collect_operands, first_column_name};
use super::names::{normalize_ident, normalize_object_name, normalize_written_ident, terminal_name};
use crate::relational::walk::references_table;
use crate::relational::{
    Alias, ColumnRef, Cte, CteBody, Dml, Expr, FromItem, Join, JoinConstraint, JoinKind,
    Position, PositionalRef, Query, Select, SelectItem, SetExpr, SetOperator, Statement,
    TableFactor, TableName, With,
};
use crate::span::SpanError;

/// Maps `sqlparser` statements onto the relational tree for one dialect.
#[derive(Debug, Clone, Copy)]
pub struct Lowering {
    dialect: Dialect,
}

impl Lowering {
    /// A lowering pass for `dialect`.
    pub fn new(dialect: Dialect) -> Self {
        Self { dialect }
    }

    /// Lower one statement.
    pub fn statement(&self, statement: &ast::Statement) -> Result<Statement, SpanError> {
        match statement {
            ast::Statement::Query(query) => Ok(Statement::Query(Box::new(self.query(query)?))),
            ast::Statement::Explain { .. } | ast::Statement::ExplainTable { .. } => {
                Ok(Statement::Explain)
            }
            ast::Statement::Insert(insert) => self.insert(insert),
            ast::Statement::Update {
                table,
                assignments,
                selection,
                returning,
                ..
            } => {
                let mut dml = Dml {
                    sources: vec![self.from_item(table)?],
                    selection: self.opt_expr(selection.as_ref())?,
                    returning: self.select_items(returning.as_deref().unwrap_or_default())?,
                    ..Dml::default()
                };
                for assignment in assignments {
                    dml.assignments.push(self.expr(&assignment.value)?);
                }
                Ok(Statement::Dml(Box::new(dml)))
            }
            ast::Statement::Delete(delete) => {
                let targets = match &delete.from {
                    ast::FromTable::WithFromKeyword(tables)
                    | ast::FromTable::WithoutKeyword(tables) => tables,
                };
                let mut sources = Vec::new();
                for item in targets.iter().chain(delete.using.iter().flatten()) {
                    sources.push(self.from_item(item)?);
                }
                Ok(Statement::Dml(Box::new(Dml {
                    sources,
                    selection: self.opt_expr(delete.selection.as_ref())?,
                    returning: self.select_items(delete.returning.as_deref().unwrap_or_default())?,
                    ..Dml::default()
                })))
            }
            ast::Statement::CreateTable { .. }
            | ast::Statement::CreateView { .. }
            | ast::Statement::CreateIndex { .. }
            | ast::Statement::CreateSchema { .. }
            | ast::Statement::CreateDatabase { .. }
            | ast::Statement::AlterTable { .. }
            | ast::Statement::AlterView { .. }
            | ast::Statement::Drop { .. }
            | ast::Statement::Truncate { .. }
            | ast::Statement::Comment { .. } => Ok(Statement::Ddl),
            _ => Ok(Statement::Other),
        }
    }

    fn insert(&self, insert: &ast::Insert) -> Result<Statement, SpanError> {
        let mut dml = Dml::default();
        if let ast::TableObject::TableName(name) = &insert.table {
            dml.sources.push(FromItem::single(TableFactor::Table {
                name: self.table_name(normalize_object_name(name, self.case())),
                alias: None,
                position: position_of(name),
            }));
        }
        if let Some(source) = &insert.source {
            dml.source_query = Some(self.query(source)?);
        }
        dml.returning = self.select_items(insert.returning.as_deref().unwrap_or_default())?;
        Ok(Statement::Dml(Box::new(dml)))
    }

    /// Lower a query.
    pub fn query(&self, query: &ast::Query) -> Result<Query, SpanError> {
        let with = match &query.with {
            Some(with) => Some(self.with(with)?),
            None => None,
        };
        Ok(Query {
            with,
            body: self.set_expr(&query.body)?,
            position: position_of(query),
        })
    }

    fn with(&self, with: &ast::With) -> Result<With, SpanError> {
        let mut ctes = Vec::with_capacity(with.cte_tables.len());
        for cte in &with.cte_tables {
            let name = normalize_ident(&cte.alias.name, self.case());
            let columns = cte
                .alias
                .columns
                .iter()
                .map(|column| normalize_ident(&column.name, self.case()))
                .collect();
            let body = self.cte_body(&name, with.recursive, self.query(&cte.query)?);
            ctes.push(Cte {
                name,
                columns,
                body,
                position: Position::new(
                    cte.alias.name.span.start.line,
                    cte.alias.name.span.start.column,
                ),
            });
        }
        Ok(With {
            recursive: with.recursive,
            ctes,
        })
    }

    /// A UNION declared RECURSIVE, or one whose last branch reads the binding
    /// in engines without the keyword, splits into anchor and recursive arms.
    fn cte_body(&self, name: &str, recursive_keyword: bool, query: Query) -> CteBody {
        let splittable = query.with.is_none()
            && match &query.body {
                SetExpr::SetOperation {
                    op: SetOperator::Union,
                    branches,
                    ..
                } => {
                    branches.len() >= 2
                        && (recursive_keyword
                            || (self.dialect.implicit_recursive_ctes()
                                && branches.last().is_some_and(|last| {
                                    references_table(last, name, self.dialect.name_cmp())
                                })))
                }
                _ => false,
            };
        if !splittable {
            return CteBody::Plain(Box::new(query));
        }

        let position = query.position;
        match query.body {
            SetExpr::SetOperation {
                op,
                mut branches,
                position: chain,
            } => {
                let recursive = branches.pop();
                let anchor = if branches.len() == 1 {
                    branches.pop()
                } else {
                    Some(SetExpr::SetOperation {
                        op,
                        branches,
                        position: chain,
                    })
                };
                match (anchor, recursive) {
                    (Some(anchor), Some(recursive)) => CteBody::Recursive {
                        anchor: Box::new(anchor),
                        recursive: Box::new(recursive),
                    },
                    _ => CteBody::Plain(Box::new(Query::new(SetExpr::Opaque))),
                }
            }
            body => CteBody::Plain(Box::new(Query {
                with: None,
                body,
                position,
            })),
        }
    }

    fn set_expr(&self, body: &ast::SetExpr) -> Result<SetExpr, SpanError> {
        match body {
            ast::SetExpr::Select(select) => Ok(SetExpr::Select(Box::new(self.select(select)?))),
            ast::SetExpr::Query(query) => Ok(SetExpr::Query(Box::new(self.query(query)?))),
            ast::SetExpr::SetOperation { op, left, right, .. } => {
                let op = match op {
                    ast::SetOperator::Union => SetOperator::Union,
                    ast::SetOperator::Intersect => SetOperator::Intersect,
                    ast::SetOperator::Except => SetOperator::Except,
                    ast::SetOperator::Minus => SetOperator::Minus,
                    #[allow(unreachable_patterns)]
                    _ => SetOperator::Union,
                };
                let mut branches = Vec::new();
                for side in [left, right] {
                    match self.set_expr(side)? {
                        SetExpr::SetOperation {
                            op: inner,
                            branches: nested,
                            ..
                        } if inner == op => branches.extend(nested),
                        other => branches.push(other),
                    }
                }
                Ok(SetExpr::SetOperation {
                    op,
                    branches,
                    position: position_of(body),
                })
            }
            ast::SetExpr::Values(values) => {
                let mut rows = Vec::with_capacity(values.rows.len());
                for row in &values.rows {
                    let mut lowered = Vec::with_capacity(row.len());
                    for expr in row {
                        lowered.push(self.expr(expr)?);
                    }
                    rows.push(lowered);
                }
                Ok(SetExpr::Values {
                    rows,
                    position: position_of(body),
                })
            }
            ast::SetExpr::Table(table) => match &table.table_name {
                Some(name) => Ok(SetExpr::Table(TableName {
                    database: None,
                    schema: table
                        .schema_name
                        .as_deref()
                        .map(|schema| normalize_written_ident(schema, self.case())),
                    table: normalize_written_ident(name, self.case()),
                })),
                None => Ok(SetExpr::Opaque),
            },
            _ => Ok(SetExpr::Opaque),
        }
    }

    fn select(&self, select: &ast::Select) -> Result<Select, SpanError> {
        let mut from = Vec::with_capacity(select.from.len());
        for item in &select.from {
            from.push(self.from_item(item)?);
        }
        Ok(Select {
            projection: self.select_items(&select.projection)?,
            from,
            selection: self.opt_expr(select.selection.as_ref())?,
            having: self.opt_expr(select.having.as_ref())?,
            qualify: self.opt_expr(select.qualify.as_ref())?,
            position: position_of(select),
        })
    }

    fn select_items(&self, items: &[ast::SelectItem]) -> Result<Vec<SelectItem>, SpanError> {
        let mut lowered = Vec::with_capacity(items.len());
        for item in items {
            lowered.push(match item {
                ast::SelectItem::UnnamedExpr(expr) => self.select_expr(expr, None)?,
                ast::SelectItem::ExprWithAlias { expr, alias } => {
                    self.select_expr(expr, Some(normalize_ident(alias, self.case())))?
                }
                ast::SelectItem::QualifiedWildcard(kind, _) => {
                    let parts = match kind {
                        ast::SelectItemQualifiedWildcardKind::ObjectName(name) => {
                            normalize_object_name(name, self.case())
                        }
                        ast::SelectItemQualifiedWildcardKind::Expr(expr) => {
                            super::names::split_qualified_name(&expr.to_string())
                                .into_iter()
                                .map(|part| normalize_written_ident(part, self.case()))
                                .collect()
                        }
                    };
                    SelectItem::QualifiedWildcard(self.table_name(parts))
                }
                ast::SelectItem::Wildcard(_) => SelectItem::Wildcard,
            });
        }
        Ok(lowered)
    }

    fn select_expr(&self, expr: &ast::Expr, alias: Option<String>) -> Result<SelectItem, SpanError> {
        match self.expr(expr)? {
            Expr::Positional(reference) => Ok(SelectItem::Positional { reference, alias }),
            lowered => Ok(SelectItem::Expr {
                expr: lowered,
                alias,
                text: expr.to_string(),
            }),
        }
    }

    fn from_item(&self, item: &ast::TableWithJoins) -> Result<FromItem, SpanError> {
        let mut joins = Vec::with_capacity(item.joins.len());
        for join in &item.joins {
            joins.push(self.join(join)?);
        }
        Ok(FromItem {
            relation: self.table_factor(&item.relation)?,
            joins,
        })
    }

    fn join(&self, join: &ast::Join) -> Result<Join, SpanError> {
        use ast::JoinOperator as Op;

        let (kind, constraint) = match &join.join_operator {
            Op::Join(c) | Op::Inner(c) => (JoinKind::Inner, Some(c)),
            Op::Left(c) | Op::LeftOuter(c) => (JoinKind::LeftOuter, Some(c)),
            Op::Right(c) | Op::RightOuter(c) => (JoinKind::RightOuter, Some(c)),
            Op::FullOuter(c) => (JoinKind::FullOuter, Some(c)),
            Op::Semi(c) | Op::LeftSemi(c) => (JoinKind::LeftSemi, Some(c)),
            Op::RightSemi(c) => (JoinKind::RightSemi, Some(c)),
            Op::Anti(c) | Op::LeftAnti(c) => (JoinKind::LeftAnti, Some(c)),
            Op::RightAnti(c) => (JoinKind::RightAnti, Some(c)),
            Op::AsOf { constraint, .. } => (JoinKind::Inner, Some(constraint)),
            _ => (JoinKind::Cross, None),
        };
        let constraint = match constraint {
            Some(ast::JoinConstraint::On(expr)) => JoinConstraint::On(self.expr(expr)?),
            Some(ast::JoinConstraint::Using(columns)) => JoinConstraint::Using(
                columns
                    .iter()
                    .map(|column| terminal_name(&column.to_string(), self.case()))
                    .collect(),
            ),
            Some(ast::JoinConstraint::Natural) => JoinConstraint::Natural,
            _ => JoinConstraint::None,
        };
        Ok(Join {
            relation: self.table_factor(&join.relation)?,
            kind,
            constraint,
            position: position_of(&join.relation),
        })
    }

    fn table_factor(&self, factor: &ast::TableFactor) -> Result<TableFactor, SpanError> {
        let position = position_of(factor);
        match factor {
            ast::TableFactor::Table {
                name, alias, args, ..
            } => {
                let parts = normalize_object_name(name, self.case());
                if let Some(args) = args {
                    return Ok(TableFactor::Function {
                        name: parts.last().cloned().unwrap_or_default(),
                        args: collect_operands(self, args)?,
                        alias: self.alias(alias.as_ref()),
                    });
                }
                Ok(TableFactor::Table {
                    name: self.table_name(parts),
                    alias: self.alias(alias.as_ref()),
                    position,
                })
            }
            ast::TableFactor::Derived {
                subquery, alias, ..
            } => Ok(TableFactor::Derived {
                subquery: Box::new(self.query(subquery)?),
                alias: self.alias(alias.as_ref()),
                position,
            }),
            ast::TableFactor::NestedJoin {
                table_with_joins,
                alias,
            } => Ok(TableFactor::NestedJoin {
                item: Box::new(self.from_item(table_with_joins)?),
                alias: self.alias(alias.as_ref()),
                position,
            }),
            ast::TableFactor::Pivot {
                table,
                aggregate_functions,
                value_column,
                value_source,
                alias,
                ..
            } => {
                let mut pivot_column = None;
                for aggregate in aggregate_functions {
                    let lowered = self.expr(&aggregate.expr)?;
                    if let Some(column) = first_column_name(&lowered) {
                        pivot_column = Some(column.to_string());
                        break;
                    }
                }
                let rendered = value_column
                    .iter()
                    .map(|part| part.to_string())
                    .collect::<Vec<_>>()
                    .join(".");
                let values = match value_source {
                    ast::PivotValueSource::List(items) => items
                        .iter()
                        .map(|item| match &item.alias {
                            Some(alias) => normalize_ident(alias, self.case()),
                            None => item.expr.to_string(),
                        })
                        .collect(),
                    _ => Vec::new(),
                };
                Ok(TableFactor::Pivot {
                    source: Box::new(self.table_factor(table)?),
                    pivot_column,
                    value_column: terminal_name(&rendered, self.case()),
                    values,
                    alias: self.alias(alias.as_ref()),
                    position,
                })
            }
            ast::TableFactor::Unpivot {
                table,
                value,
                name,
                columns,
                alias,
                ..
            } => Ok(TableFactor::Unpivot {
                source: Box::new(self.table_factor(table)?),
                value_column: terminal_name(&value.to_string(), self.case()),
                name_column: terminal_name(&name.to_string(), self.case()),
                columns: columns
                    .iter()
                    .map(|column| terminal_name(&column.to_string(), self.case()))
                    .collect(),
                alias: self.alias(alias.as_ref()),
                position,
            }),
            ast::TableFactor::Function {
                name, args, alias, ..
            } => Ok(TableFactor::Function {
                name: normalize_object_name(name, self.case())
                    .pop()
                    .unwrap_or_default(),
                args: collect_operands(self, args)?,
                alias: self.alias(alias.as_ref()),
            }),
            ast::TableFactor::UNNEST {
                alias, array_exprs, ..
            } => Ok(TableFactor::Function {
                name: "unnest".to_string(),
                args: collect_operands(self, array_exprs)?,
                alias: self.alias(alias.as_ref()),
            }),
            other => Ok(TableFactor::Function {
                name: String::new(),
                args: collect_operands(self, other)?,
                alias: None,
            }),
        }
    }

    fn alias(&self, alias: Option<&ast::TableAlias>) -> Option<Alias> {
        alias.map(|alias| Alias {
            name: normalize_ident(&alias.name, self.case()),
            columns: alias
                .columns
                .iter()
                .map(|column| normalize_ident(&column.name, self.case()))
                .collect(),
        })
    }

    fn opt_expr(&self, expr: Option<&ast::Expr>) -> Result<Option<Expr>, SpanError> {
        expr.map(|expr| self.expr(expr)).transpose()
    }

    /// Lower an expression.
    pub fn expr(&self, expr: &ast::Expr) -> Result<Expr, SpanError> {
        match expr {
            ast::Expr::Identifier(ident) => {
                Ok(self.column_reference(std::slice::from_ref(ident), expr))
            }
            ast::Expr::CompoundIdentifier(parts) => Ok(self.column_reference(parts, expr)),
            ast::Expr::Value(value) => {
                Ok(self.positional(&value.value, expr).unwrap_or(Expr::Literal))
            }
            ast::Expr::Nested(inner) => self.expr(inner),
            ast::Expr::Subquery(query) => Ok(Expr::Subquery(Box::new(self.query(query)?))),
            ast::Expr::Function(function) => Ok(Expr::Function {
                name: function
                    .name
                    .0
                    .last()
                    .map(|part| terminal_name(&part.to_string(), self.case()))
                    .unwrap_or_default(),
                args: collect_operands(self, function)?,
            }),
            other => Ok(Expr::Composite(collect_operands(self, other)?)),
        }
    }

    /// Lower an identifier chain into a column (or positional) reference.
    pub(crate) fn column_reference(&self, parts: &[ast::Ident], node: &ast::Expr) -> Expr {
        let mut names: Vec<String> = parts
            .iter()
            .map(|part| normalize_ident(part, self.case()))
            .collect();
        let Some(column) = names.pop() else {
            return Expr::Literal;
        };

        if let Some(index) = self.positional_index(&column) {
            return Expr::Positional(PositionalRef {
                table: names.pop(),
                index,
                position: position_of(node),
            });
        }

        // Qualifiers are filled bottom-up: table, then schema, then database.
        let mut qualifiers = names.into_iter().rev();
        let table = qualifiers.next();
        let (schema, database) = if self.dialect.has_schemas() {
            (qualifiers.next(), qualifiers.next())
        } else {
            (None, qualifiers.next())
        };
        Expr::Column(ColumnRef {
            database,
            schema,
            table,
            column,
        })
    }

    /// Lower a `$N` placeholder when the dialect treats it as a column.
    pub(crate) fn positional(&self, value: &ast::Value, node: &ast::Expr) -> Option<Expr> {
        let ast::Value::Placeholder(text) = value else {
            return None;
        };
        let index = self.positional_index(text)?;
        Some(Expr::Positional(PositionalRef {
            table: None,
            index,
            position: position_of(node),
        }))
    }

    fn positional_index(&self, text: &str) -> Option<i64> {
        if !self.dialect.supports_positional_columns() {
            return None;
        }
        let digits = text.strip_prefix('$')?;
        if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
            return None;
        }
        digits.parse().ok()
    }

    /// Map written name parts onto database/schema/table for this dialect.
    pub fn table_name(&self, mut parts: Vec<String>) -> TableName {
        let table = parts.pop().unwrap_or_default();
        let mut qualifiers = parts.into_iter().rev();
        let (schema, database) = if self.dialect.has_schemas() {
            (qualifiers.next(), qualifiers.next())
        } else {
            (None, qualifiers.next())
        };
        // `db..t` leaves an empty schema meaning "default".
        let schema = schema.filter(|schema| !schema.is_empty());
        TableName {
            database,
            schema,
            table,
        }
    }

    fn case(&self) -> super::names::IdentifierCase {
        self.dialect.identifier_case()
    }
}

fn position_of(node: &impl Spanned) -> Position {
    let start = node.span().start;
    Position::new(start.line, start.column)
}
