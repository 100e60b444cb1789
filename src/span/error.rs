use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::catalog::CatalogError;
use crate::relational::Position;

/// A database, schema, table or column that could not be resolved.
///
/// The deepest populated part names what was missing.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResourceNotFound {
    /// Database name, when known.
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub database: Option<String>,
    /// Schema name, when known.
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub schema: Option<String>,
    /// Table name, when known.
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub table: Option<String>,
    /// Column name, when a column was missing.
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub column: Option<String>,
}

impl ResourceNotFound {
    /// A missing database.
    pub fn database(database: impl Into<String>) -> Self {
        Self {
            database: Some(database.into()),
            ..Self::default()
        }
    }

    /// A missing schema.
    pub fn schema(database: impl Into<String>, schema: impl Into<String>) -> Self {
        Self {
            database: Some(database.into()),
            schema: Some(schema.into()),
            ..Self::default()
        }
    }

    /// A missing table or view.
    pub fn table(
        database: impl Into<String>,
        schema: impl Into<String>,
        table: impl Into<String>,
    ) -> Self {
        Self {
            database: Some(database.into()),
            schema: Some(schema.into()),
            table: Some(table.into()),
            column: None,
        }
    }

    /// A missing column, with whatever qualification was written.
    pub fn column(table: Option<String>, column: impl Into<String>) -> Self {
        Self {
            table,
            column: Some(column.into()),
            ..Self::default()
        }
    }

    /// Which kind of object was missing.
    pub fn kind(&self) -> &'static str {
        if self.column.is_some() {
            "column"
        } else if self.table.is_some() {
            "table"
        } else if self.schema.is_some() {
            "schema"
        } else {
            "database"
        }
    }

    fn qualified(&self) -> String {
        [&self.database, &self.schema, &self.table, &self.column]
            .into_iter()
            .flatten()
            .filter(|part| !part.is_empty())
            .cloned()
            .collect::<Vec<_>>()
            .join(".")
    }
}

impl fmt::Display for ResourceNotFound {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} \"{}\" not found", self.kind(), self.qualified())
    }
}

impl std::error::Error for ResourceNotFound {}

/// Failure while computing a query span.
#[derive(Debug, Error)]
pub enum SpanError {
    /// A referenced object does not exist; soft at the top level.
    #[error(transparent)]
    NotFound(#[from] ResourceNotFound),
    /// Column counts or names do not line up.
    #[error("{message} at {position}")]
    StructuralMismatch {
        /// What did not line up.
        message: String,
        /// Where it was written.
        position: Position,
    },
    /// A name was qualified in a way the engine cannot interpret.
    #[error("invalid reference {reference}: {message}")]
    Usage {
        /// The reference as written.
        reference: String,
        /// What is wrong with it.
        message: String,
    },
    /// System catalog objects and user tables read by one statement.
    #[error("statement reads system catalog objects together with user tables")]
    MixedCatalogAccess,
    /// Fixpoint iteration or view nesting exceeded its cap.
    #[error("{0}")]
    RecursionLimit(String),
    /// The catalog accessor failed or the request was cancelled.
    #[error(transparent)]
    Catalog(#[from] CatalogError),
    /// The SQL text was rejected by the front end.
    #[error("failed to parse SQL: {0}")]
    Parse(String),
    /// Another error, annotated with where it happened.
    #[error("{context}: {source}")]
    Context {
        /// Location description (CTE, subquery, view ...).
        context: String,
        /// Wrapped error.
        #[source]
        source: Box<SpanError>,
    },
}

impl SpanError {
    /// Build a structural mismatch.
    pub fn mismatch(message: impl Into<String>, position: Position) -> Self {
        SpanError::StructuralMismatch {
            message: message.into(),
            position,
        }
    }

    /// Wrap the error with a location description.
    pub fn context(self, context: impl Into<String>) -> Self {
        SpanError::Context {
            context: context.into(),
            source: Box::new(self),
        }
    }

    /// The innermost error, looking through [`SpanError::Context`].
    pub fn root(&self) -> &SpanError {
        match self {
            SpanError::Context { source, .. } => source.root(),
            other => other,
        }
    }

    /// The missing resource, when the root error is a soft not-found.
    pub fn not_found(&self) -> Option<&ResourceNotFound> {
        match self.root() {
            SpanError::NotFound(missing) => Some(missing),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn not_found_names_the_failing_part() {
        assert_eq!(
            ResourceNotFound::table("db", "public", "t9").to_string(),
            "table \"db.public.t9\" not found"
        );
        assert_eq!(
            ResourceNotFound::database("nope").to_string(),
            "database \"nope\" not found"
        );
        assert_eq!(
            ResourceNotFound::column(Some("t".to_string()), "c").to_string(),
            "column \"t.c\" not found"
        );
    }

    #[test]
    fn context_is_transparent_for_classification() {
        let err = SpanError::from(ResourceNotFound::database("x"))
            .context("in CTE a")
            .context("in subquery");
        assert_eq!(err.not_found(), Some(&ResourceNotFound::database("x")));
        assert_eq!(
            err.to_string(),
            "in subquery: in CTE a: database \"x\" not found"
        );
        let hard = SpanError::mismatch("width", Position::new(1, 2)).context("in view v");
        assert!(hard.not_found().is_none());
        assert!(matches!(hard.root(), SpanError::StructuralMismatch { .. }));
    }
}
