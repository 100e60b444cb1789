use std::fmt;

use super::{Expr, Position, PositionalRef};

/// A query with its optional WITH list.
#[derive(Debug, Clone, PartialEq)]
pub struct Query {
    /// WITH bindings visible to the body.
    pub with: Option<With>,
    /// Query body.
    pub body: SetExpr,
    /// Where the query starts.
    pub position: Position,
}

impl Query {
    /// Wrap a body without a WITH list.
    pub fn new(body: SetExpr) -> Self {
        Self {
            with: None,
            body,
            position: Position::default(),
        }
    }
}

/// A WITH list.
#[derive(Debug, Clone, PartialEq)]
pub struct With {
    /// `WITH RECURSIVE` was written.
    pub recursive: bool,
    /// Bindings in declaration order.
    pub ctes: Vec<Cte>,
}

/// One common table expression.
#[derive(Debug, Clone, PartialEq)]
pub struct Cte {
    /// Binding name.
    pub name: String,
    /// Explicit column list, empty when absent.
    pub columns: Vec<String>,
    /// Definition.
    pub body: CteBody,
    /// Where the binding is declared.
    pub position: Position,
}

/// Definition of a CTE.
#[derive(Debug, Clone, PartialEq)]
pub enum CteBody {
    /// Non-recursive definition.
    Plain(Box<Query>),
    /// Recursive definition split into its arms.
    Recursive {
        /// Left-most union branches, evaluated once.
        anchor: Box<SetExpr>,
        /// Last union branch, iterated to a fixpoint.
        recursive: Box<SetExpr>,
    },
}

/// Set operator joining query branches.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SetOperator {
    /// UNION [ALL]
    Union,
    /// INTERSECT
    Intersect,
    /// EXCEPT
    Except,
    /// MINUS
    Minus,
}

impl fmt::Display for SetOperator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            SetOperator::Union => "UNION",
            SetOperator::Intersect => "INTERSECT",
            SetOperator::Except => "EXCEPT",
            SetOperator::Minus => "MINUS",
        };
        f.write_str(text)
    }
}

/// Body of a query.
#[derive(Debug, Clone, PartialEq)]
pub enum SetExpr {
    /// A SELECT block.
    Select(Box<Select>),
    /// Parenthesized query.
    Query(Box<Query>),
    /// Flattened chain of set operations.
    SetOperation {
        /// Operator of the chain (the first one when operators differ).
        op: SetOperator,
        /// Branches, left to right.
        branches: Vec<SetExpr>,
        /// Where the chain starts.
        position: Position,
    },
    /// VALUES rows.
    Values {
        /// Row expressions.
        rows: Vec<Vec<Expr>>,
        /// Where the VALUES list starts.
        position: Position,
    },
    /// `TABLE t` shorthand.
    Table(TableName),
    /// Body without propagation rules; yields no columns.
    Opaque,
}

/// A SELECT block.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Select {
    /// Select items in order.
    pub projection: Vec<SelectItem>,
    /// FROM list (implicit cross join).
    pub from: Vec<FromItem>,
    /// WHERE predicate.
    pub selection: Option<Expr>,
    /// HAVING predicate.
    pub having: Option<Expr>,
    /// QUALIFY predicate.
    pub qualify: Option<Expr>,
    /// Where the block starts.
    pub position: Position,
}

/// One select item.
#[derive(Debug, Clone, PartialEq)]
pub enum SelectItem {
    /// `*`
    Wildcard,
    /// `t.*`, `s.t.*`, `d.s.t.*`
    QualifiedWildcard(TableName),
    /// `$N`, optionally aliased.
    Positional {
        /// The reference.
        reference: PositionalRef,
        /// AS alias.
        alias: Option<String>,
    },
    /// Any expression, optionally aliased.
    Expr {
        /// Expression.
        expr: Expr,
        /// AS alias.
        alias: Option<String>,
        /// SQL text of the expression, used as the fallback output name.
        text: String,
    },
}

/// A (possibly qualified) relation name.
#[derive(Debug, Clone, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct TableName {
    /// Database qualifier.
    pub database: Option<String>,
    /// Schema qualifier.
    pub schema: Option<String>,
    /// Relation name.
    pub table: String,
}

impl TableName {
    /// An unqualified name.
    pub fn bare(table: impl Into<String>) -> Self {
        Self {
            table: table.into(),
            ..Self::default()
        }
    }

    /// True when neither database nor schema was written.
    pub fn is_unqualified(&self) -> bool {
        self.database.is_none() && self.schema.is_none()
    }
}

impl fmt::Display for TableName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for part in [&self.database, &self.schema].into_iter().flatten() {
            write!(f, "{part}.")?;
        }
        f.write_str(&self.table)
    }
}

/// A FROM item: one table factor and the joins chained onto it.
#[derive(Debug, Clone, PartialEq)]
pub struct FromItem {
    /// Left-most factor.
    pub relation: TableFactor,
    /// Joins in written order.
    pub joins: Vec<Join>,
}

impl FromItem {
    /// A FROM item without joins.
    pub fn single(relation: TableFactor) -> Self {
        Self {
            relation,
            joins: Vec::new(),
        }
    }
}

/// Table alias with an optional column list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Alias {
    /// Alias name.
    pub name: String,
    /// Column renames, empty when absent.
    pub columns: Vec<String>,
}

/// A source in the FROM list.
#[derive(Debug, Clone, PartialEq)]
pub enum TableFactor {
    /// Named table, view or CTE.
    Table {
        /// Written name.
        name: TableName,
        /// AS alias.
        alias: Option<Alias>,
        /// Where the name is written.
        position: Position,
    },
    /// Subquery in FROM.
    Derived {
        /// The subquery.
        subquery: Box<Query>,
        /// AS alias.
        alias: Option<Alias>,
        /// Where the subquery starts.
        position: Position,
    },
    /// Parenthesized join.
    NestedJoin {
        /// Joined sources.
        item: Box<FromItem>,
        /// AS alias.
        alias: Option<Alias>,
        /// Where the group starts.
        position: Position,
    },
    /// `source PIVOT(agg(pivot_column) FOR value_column IN (...))`
    Pivot {
        /// Pivoted source.
        source: Box<TableFactor>,
        /// Column read by the aggregate, when one could be found.
        pivot_column: Option<String>,
        /// Column whose values become the new column names.
        value_column: String,
        /// New column names (literal text or its alias).
        values: Vec<String>,
        /// AS alias.
        alias: Option<Alias>,
        /// Where the clause starts.
        position: Position,
    },
    /// `source UNPIVOT(value_column FOR name_column IN (c1, ..., cn))`
    Unpivot {
        /// Unpivoted source.
        source: Box<TableFactor>,
        /// Output column carrying the folded values.
        value_column: String,
        /// Output column carrying the source column names.
        name_column: String,
        /// Folded columns.
        columns: Vec<String>,
        /// AS alias.
        alias: Option<Alias>,
        /// Where the clause starts.
        position: Position,
    },
    /// Table-valued function, UNNEST, or any other computed source.
    Function {
        /// Function name; empty when unknown.
        name: String,
        /// Argument operands.
        args: Vec<Expr>,
        /// AS alias.
        alias: Option<Alias>,
    },
}

/// Join flavour, reduced to what affects the output shape.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JoinKind {
    /// INNER / plain JOIN.
    Inner,
    /// LEFT [OUTER] JOIN.
    LeftOuter,
    /// RIGHT [OUTER] JOIN.
    RightOuter,
    /// FULL [OUTER] JOIN.
    FullOuter,
    /// CROSS JOIN, APPLY and friends.
    Cross,
    /// [LEFT] SEMI JOIN.
    LeftSemi,
    /// RIGHT SEMI JOIN.
    RightSemi,
    /// [LEFT] ANTI JOIN.
    LeftAnti,
    /// RIGHT ANTI JOIN.
    RightAnti,
}

impl JoinKind {
    /// True when only the left side's columns survive the join.
    pub fn keeps_left_only(self) -> bool {
        matches!(self, JoinKind::LeftSemi | JoinKind::LeftAnti)
    }

    /// True when only the right side's columns survive the join.
    pub fn keeps_right_only(self) -> bool {
        matches!(self, JoinKind::RightSemi | JoinKind::RightAnti)
    }
}

/// Join condition.
#[derive(Debug, Clone, PartialEq)]
pub enum JoinConstraint {
    /// `ON expr`
    On(Expr),
    /// `USING (c1, ..., cn)`
    Using(Vec<String>),
    /// `NATURAL`
    Natural,
    /// No condition.
    None,
}

/// One join.
#[derive(Debug, Clone, PartialEq)]
pub struct Join {
    /// Right-hand source.
    pub relation: TableFactor,
    /// Join flavour.
    pub kind: JoinKind,
    /// Join condition.
    pub constraint: JoinConstraint,
    /// Where the join's source starts.
    pub position: Position,
}
