use super::{Position, Query};

/// A column reference split into its qualifiers.
///
/// The front end fills the parts bottom-up from the written name, so a
/// reference like `s.t.c` arrives as `{schema: s, table: t, column: c}`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ColumnRef {
    /// Database qualifier.
    pub database: Option<String>,
    /// Schema qualifier.
    pub schema: Option<String>,
    /// Table (or alias) qualifier.
    pub table: Option<String>,
    /// Column name.
    pub column: String,
}

impl ColumnRef {
    /// An unqualified column reference.
    pub fn bare(column: impl Into<String>) -> Self {
        Self {
            column: column.into(),
            ..Self::default()
        }
    }

    /// A `table.column` reference.
    pub fn qualified(table: impl Into<String>, column: impl Into<String>) -> Self {
        Self {
            table: Some(table.into()),
            column: column.into(),
            ..Self::default()
        }
    }
}

/// A positional reference such as `$2` or `t.$2`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PositionalRef {
    /// Source the index is taken against; `None` means the whole frame.
    pub table: Option<String>,
    /// 1-based index as written (may be out of range).
    pub index: i64,
    /// Where the reference was written.
    pub position: Position,
}

/// Expression tree as seen by the evaluator.
#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    /// A (possibly qualified) column.
    Column(ColumnRef),
    /// `$N` style positional column.
    Positional(PositionalRef),
    /// Constant with no column provenance.
    Literal,
    /// Scalar, EXISTS or IN subquery.
    Subquery(Box<Query>),
    /// Function call; `name` is the unqualified function name.
    Function {
        /// Function name as written.
        name: String,
        /// Operands in argument order.
        args: Vec<Expr>,
    },
    /// Any other construct, reduced to its operands.
    Composite(Vec<Expr>),
}

impl Expr {
    /// Operands of a call or composite; empty for leaves.
    pub fn operands(&self) -> &[Expr] {
        match self {
            Expr::Function { args, .. } => args,
            Expr::Composite(args) => args,
            _ => &[],
        }
    }
}
