//! Generic span propagation.
//!
//! A statement is evaluated bottom-up: every physical column is seeded with
//! the value its [`Domain`] assigns, and values flow through joins, set
//! operations, subqueries, CTEs and views by the [`Lattice`] join. Lineage
//! and masking are two domains over the same engine.

pub mod composer;
mod error;
mod expression;
mod extractor;
mod fixpoint;
mod lattice;
mod resolver;
/// Name resolution scopes: CTE bindings and FROM frames.
pub mod scope;
mod select_list;
mod types;

pub use error::{ResourceNotFound, SpanError};
pub use extractor::{analyze, SpanExtractor, SpanOutcome};
pub use lattice::{Domain, Lattice};
pub use scope::Scope;
pub use types::{ColumnResource, Field, QuerySpanResult, QueryType, Relation, TableSource};
