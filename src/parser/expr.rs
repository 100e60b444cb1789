use std::ops::ControlFlow;

use sqlparser::ast::{self, Visit, Visitor};

use super::lowering::Lowering;
use crate::relational::Expr;
use crate::span::SpanError;

/// Collect the operands of an arbitrary AST node.
///
/// Column references and positional references found outside nested queries
/// are lowered as leaves; every nested query is lowered once, as a whole,
/// into [`Expr::Subquery`]. Everything else is transparent.
pub fn collect_operands<T: Visit>(lowering: &Lowering, node: &T) -> Result<Vec<Expr>, SpanError> {
    let mut collector = OperandCollector {
        lowering,
        query_depth: 0,
        operands: Vec::new(),
    };
    match node.visit(&mut collector) {
        ControlFlow::Continue(()) => Ok(collector.operands),
        ControlFlow::Break(err) => Err(err),
    }
}

/// Extract the first column name read by an expression, if any.
pub fn first_column_name(expr: &Expr) -> Option<&str> {
    match expr {
        Expr::Column(column) => Some(&column.column),
        other => other.operands().iter().find_map(first_column_name),
    }
}

struct OperandCollector<'a> {
    lowering: &'a Lowering,
    query_depth: usize,
    operands: Vec<Expr>,
}

impl Visitor for OperandCollector<'_> {
    type Break = SpanError;

    fn pre_visit_query(&mut self, query: &ast::Query) -> ControlFlow<Self::Break> {
        if self.query_depth == 0 {
            match self.lowering.query(query) {
                Ok(lowered) => self.operands.push(Expr::Subquery(Box::new(lowered))),
                Err(err) => return ControlFlow::Break(err),
            }
        }
        self.query_depth += 1;
        ControlFlow::Continue(())
    }

    fn post_visit_query(&mut self, _query: &ast::Query) -> ControlFlow<Self::Break> {
        self.query_depth -= 1;
        ControlFlow::Continue(())
    }

    fn pre_visit_expr(&mut self, expr: &ast::Expr) -> ControlFlow<Self::Break> {
        if self.query_depth > 0 {
            return ControlFlow::Continue(());
        }
        match expr {
            ast::Expr::Identifier(ident) => {
                self.operands
                    .push(self.lowering.column_reference(std::slice::from_ref(ident), expr));
            }
            ast::Expr::CompoundIdentifier(parts) => {
                self.operands.push(self.lowering.column_reference(parts, expr));
            }
            ast::Expr::Value(value) => {
                if let Some(positional) = self.lowering.positional(&value.value, expr) {
                    self.operands.push(positional);
                }
            }
            _ => {}
        }
        ControlFlow::Continue(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::dialect::Dialect;
    use crate::relational::ColumnRef;
    use sqlparser::parser::Parser;

    fn parse_expr(dialect: Dialect, sql: &str) -> ast::Expr {
        Parser::new(dialect.parser_dialect().as_ref())
            .try_with_sql(sql)
            .unwrap()
            .parse_expr()
            .unwrap()
    }

    #[test]
    fn operands_skip_literals_and_keep_column_order() {
        let lowering = Lowering::new(Dialect::Postgres);
        let expr = parse_expr(Dialect::Postgres, "CASE WHEN t.a > 1 THEN b ELSE 'x' END");
        let operands = collect_operands(&lowering, &expr).unwrap();
        assert_eq!(
            operands,
            vec![
                Expr::Column(ColumnRef::qualified("t", "a")),
                Expr::Column(ColumnRef::bare("b")),
            ]
        );
    }

    #[test]
    fn nested_queries_become_single_subquery_operands() {
        let lowering = Lowering::new(Dialect::Postgres);
        let expr = parse_expr(
            Dialect::Postgres,
            "a IN (SELECT x FROM t WHERE t.y = (SELECT max(z) FROM u))",
        );
        let operands = collect_operands(&lowering, &expr).unwrap();
        assert_eq!(operands.len(), 2);
        assert_eq!(operands[0], Expr::Column(ColumnRef::bare("a")));
        assert!(matches!(operands[1], Expr::Subquery(_)));
    }

    #[test]
    fn first_column_name_searches_operands() {
        let expr = Expr::Function {
            name: "max".to_string(),
            args: vec![Expr::Literal, Expr::Column(ColumnRef::bare("amount"))],
        };
        assert_eq!(first_column_name(&expr), Some("amount"));
        assert_eq!(first_column_name(&Expr::Literal), None);
    }
}
