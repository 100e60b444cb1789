use super::error::{ResourceNotFound, SpanError};
use super::extractor::SpanExtractor;
use super::lattice::{Domain, Lattice};
use super::types::Field;
use crate::relational::{ColumnRef, Expr, PositionalRef, TableName};

/// An evaluated expression with the output name it implies.
#[derive(Debug, Clone, PartialEq)]
pub(super) struct Evaluated<V> {
    pub(super) value: V,
    pub(super) name: Option<String>,
    pub(super) is_plain_field: bool,
}

impl<V> Evaluated<V> {
    fn computed(value: V, name: Option<String>) -> Self {
        Self {
            value,
            name,
            is_plain_field: false,
        }
    }
}

impl<D: Domain + ?Sized> SpanExtractor<'_, D> {
    /// Evaluate a predicate; everything it reads counts as a predicate column.
    pub(super) fn eval_predicate(&mut self, expr: &Expr) -> Result<(), SpanError> {
        self.predicate_depth += 1;
        let result = self.eval_expr(expr);
        self.predicate_depth -= 1;
        result.map(|_| ())
    }

    /// Evaluate an expression to its lattice value.
    pub(super) fn eval_expr(&mut self, expr: &Expr) -> Result<D::Value, SpanError> {
        Ok(self.eval_named(expr)?.value)
    }

    /// Evaluate an expression, keeping the default output name it implies.
    pub(super) fn eval_named(&mut self, expr: &Expr) -> Result<Evaluated<D::Value>, SpanError> {
        match expr {
            Expr::Literal => Ok(Evaluated::computed(D::Value::bottom(), None)),
            Expr::Column(column) => self.eval_column(column),
            Expr::Positional(reference) => {
                let field = self.positional_field(reference)?;
                Ok(Evaluated {
                    value: field.value,
                    name: Some(field.name),
                    is_plain_field: field.is_plain_field,
                })
            }
            Expr::Subquery(query) => {
                let results = self
                    .query_results(query)
                    .map_err(|err| err.context("in subquery expression"))?;
                let value = D::Value::join_all(results.iter().map(|result| &result.value));
                let name = results.into_iter().next().map(|result| result.name);
                Ok(Evaluated::computed(value, name))
            }
            Expr::Function { name, args } => {
                let value = self.eval_operands(args)?;
                Ok(Evaluated::computed(value, Some(name.clone())))
            }
            Expr::Composite(operands) => {
                let value = self.eval_operands(operands)?;
                Ok(Evaluated::computed(value, None))
            }
        }
    }

    /// Join the values of every operand, stopping at a terminal value.
    pub(super) fn eval_operands(&mut self, operands: &[Expr]) -> Result<D::Value, SpanError> {
        let mut value = D::Value::bottom();
        for operand in operands {
            value.join_assign(&self.eval_expr(operand)?);
            if value.is_terminal() {
                break;
            }
        }
        Ok(value)
    }

    fn eval_column(&mut self, column: &ColumnRef) -> Result<Evaluated<D::Value>, SpanError> {
        self.check_qualifiers(column)?;
        match self.scope.resolve_column(column, self.cmp).cloned() {
            Some(field) => {
                self.observe(&field.value);
                Ok(Evaluated {
                    value: field.value,
                    name: Some(field.name),
                    is_plain_field: field.is_plain_field,
                })
            }
            None => {
                if self.predicate_depth == 0 {
                    self.record_missing(ResourceNotFound::column(
                        column.table.clone(),
                        column.column.as_str(),
                    ));
                }
                Ok(Evaluated::computed(
                    D::Value::bottom(),
                    Some(column.column.clone()),
                ))
            }
        }
    }

    /// Qualifiers must be written top-down: a schema needs a table, a
    /// database needs a table (and a schema where the engine has schemas).
    fn check_qualifiers(&self, column: &ColumnRef) -> Result<(), SpanError> {
        let message = if column.table.is_none() && column.schema.is_some() {
            Some("schema qualifier without a table")
        } else if column.table.is_none() && column.database.is_some() {
            Some("database qualifier without a table")
        } else if self.dialect.has_schemas() && column.database.is_some() && column.schema.is_none()
        {
            Some("database qualifier without a schema")
        } else {
            None
        };
        match message {
            None => Ok(()),
            Some(message) => {
                let reference = [&column.database, &column.schema, &column.table]
                    .into_iter()
                    .map(|part| part.as_deref().unwrap_or(""))
                    .chain(std::iter::once(column.column.as_str()))
                    .collect::<Vec<_>>()
                    .join(".");
                Err(SpanError::Usage {
                    reference,
                    message: message.to_string(),
                })
            }
        }
    }

    /// Resolve `$N` against a named source or the whole current frame.
    pub(super) fn positional_field(
        &mut self,
        reference: &PositionalRef,
    ) -> Result<Field<D::Value>, SpanError> {
        let fields: Vec<&Field<D::Value>> = match &reference.table {
            Some(table) => self
                .scope
                .fields_of(&TableName::bare(table.as_str()), self.cmp)
                .into_iter()
                .filter(|field| !field.hidden)
                .collect(),
            None => self.scope.visible_fields().collect(),
        };
        let width = fields.len();
        let field = usize::try_from(reference.index)
            .ok()
            .filter(|index| (1..=width).contains(index))
            .map(|index| fields[index - 1].clone());
        let Some(field) = field else {
            return Err(SpanError::mismatch(
                format!(
                    "positional reference ${} is outside 1..={width}",
                    reference.index
                ),
                reference.position,
            ));
        };
        self.observe(&field.value);
        Ok(field)
    }
}
