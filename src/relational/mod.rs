//! Dialect-agnostic relational syntax tree.
//!
//! Every front end lowers its parse tree into these types so that the span
//! engine only ever walks one shape. The tree keeps exactly what column
//! propagation needs: sources, select items, predicates, WITH bindings and
//! set-operator chains. Everything else collapses into [`Expr::Composite`].

use std::fmt;

/// Relational expressions (column references, literals, subqueries).
pub mod expr;
/// Queries, FROM items, joins and table factors.
pub mod query;
/// Read-only traversals over the tree (referenced tables, self references).
pub mod walk;

pub use expr::{ColumnRef, Expr, PositionalRef};
pub use query::{
    Alias, Cte, CteBody, FromItem, Join, JoinConstraint, JoinKind, Query, Select, SelectItem,
    SetExpr, SetOperator, TableFactor, TableName, With,
};

/// Source location of a construct, 1-based.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Position {
    /// Line number (1-based, 0 when unknown).
    pub line: u64,
    /// Column number (1-based, 0 when unknown).
    pub column: u64,
}

impl Position {
    /// Build a position from a line/column pair.
    pub fn new(line: u64, column: u64) -> Self {
        Self { line, column }
    }
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "line {}, column {}", self.line, self.column)
    }
}

/// One lowered statement.
#[derive(Debug, Clone, PartialEq)]
pub enum Statement {
    /// A query (SELECT, VALUES, set operations, WITH ...).
    Query(Box<Query>),
    /// INSERT / UPDATE / DELETE, analysed through their RETURNING list.
    Dml(Box<Dml>),
    /// EXPLAIN of any statement.
    Explain,
    /// Schema-changing statement.
    Ddl,
    /// Anything the engine has no propagation rules for.
    Other,
}

/// Data-modifying statement reduced to the parts that read columns.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Dml {
    /// Target and joined sources (UPDATE ... FROM, DELETE ... USING).
    pub sources: Vec<FromItem>,
    /// Row source of an INSERT.
    pub source_query: Option<Query>,
    /// Right-hand sides of SET assignments.
    pub assignments: Vec<Expr>,
    /// WHERE predicate.
    pub selection: Option<Expr>,
    /// RETURNING list; empty when absent.
    pub returning: Vec<SelectItem>,
}
