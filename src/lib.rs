//! Column-level query spans for multi-dialect SQL.
//!
//! For every output column of a statement, `sqlspan` computes a value drawn
//! from a lattice: the set of physical source columns (lineage) or the
//! strictest masking level reaching it (masking). Both run on one generic
//! propagation engine in [`span`].
#![warn(missing_docs)]

/// Catalog metadata model, accessors and the per-analysis cache.
pub mod catalog;
/// Analyzer settings.
pub mod config;
/// Source-column lineage domain.
pub mod lineage;
/// Masking-level domain and policies.
pub mod masking;
/// Per-statement records, Markdown reports and file output.
pub mod output;
/// SQL front end: dialects, identifier rules and lowering.
pub mod parser;
/// Dialect-agnostic relational tree.
pub mod relational;
/// Generic span propagation engine.
pub mod span;
