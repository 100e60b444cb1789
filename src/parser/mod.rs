/// Supported SQL dialects and their naming conventions.
pub mod dialect;
/// Operand collection over `sqlparser` expressions.
pub mod expr;
/// `sqlparser` AST to relational tree adapter.
pub mod lowering;
/// Identifier normalization helpers (case folding, quoted and qualified names).
pub mod names;
/// Thin wrapper around `sqlparser` for statement parsing.
pub mod sql_parser;
