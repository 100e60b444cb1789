use sqlparser::ast;
use sqlparser::parser::{Parser, ParserError};

use super::dialect::Dialect;
use super::lowering::Lowering;
use crate::relational::Statement;
use crate::span::SpanError;

/// Parse a script into `sqlparser` statements.
pub fn parse_statements(dialect: Dialect, sql: &str) -> Result<Vec<ast::Statement>, ParserError> {
    Parser::parse_sql(dialect.parser_dialect().as_ref(), sql)
}

/// Parse exactly one statement and lower it into the relational tree.
pub fn parse_statement(dialect: Dialect, sql: &str) -> Result<Statement, SpanError> {
    let statements =
        parse_statements(dialect, sql).map_err(|err| SpanError::Parse(err.to_string()))?;
    match statements.as_slice() {
        [statement] => Lowering::new(dialect).statement(statement),
        [] => Err(SpanError::Parse("no statement found".to_string())),
        many => Err(SpanError::Parse(format!(
            "expected one statement, found {}",
            many.len()
        ))),
    }
}
