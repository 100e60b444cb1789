//! Masking-level propagation: the strictest sensitivity reaching each output column.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::catalog::{CatalogAccessor, RequestContext};
use crate::config::AnalyzerConfig;
use crate::parser::sql_parser::parse_statement;
use crate::relational::Statement;
use crate::span::{analyze, Lattice, SpanError};

/// Column sensitivity policies.
pub mod policy;

pub use policy::{MaskingPolicy, MaskingRule};

/// How much of a value must be hidden, ordered from least to most strict.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "UPPERCASE")]
pub enum MaskingLevel {
    /// Value may be shown.
    #[default]
    None,
    /// Value must be partially masked.
    Partial,
    /// Value must be fully masked.
    Full,
}

impl fmt::Display for MaskingLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            MaskingLevel::None => "NONE",
            MaskingLevel::Partial => "PARTIAL",
            MaskingLevel::Full => "FULL",
        };
        f.write_str(text)
    }
}

/// Masking lattice value; [`MaskingLevel::Full`] is terminal.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MaskingAttributes {
    /// Strictest level seen so far.
    pub level: MaskingLevel,
}

impl MaskingAttributes {
    /// Wrap a level.
    pub fn new(level: MaskingLevel) -> Self {
        Self { level }
    }
}

impl Lattice for MaskingAttributes {
    fn bottom() -> Self {
        Self::default()
    }

    fn join_assign(&mut self, other: &Self) -> bool {
        if other.level > self.level {
            self.level = other.level;
            return true;
        }
        false
    }

    fn is_terminal(&self) -> bool {
        self.level == MaskingLevel::Full
    }
}

/// Masking decision for one output column.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MaskedField {
    /// Output column name.
    pub name: String,
    /// Level to enforce.
    pub masking_level: MaskingLevel,
}

/// Compute the masking level of every output column of `sql`.
///
/// Any missing table or column is reported as an error: masking cannot
/// vouch for columns it cannot see.
pub fn get_masked_fields(
    sql: &str,
    catalog: &dyn CatalogAccessor,
    policy: &MaskingPolicy,
    ctx: &RequestContext,
    config: &AnalyzerConfig,
) -> Result<Vec<MaskedField>, SpanError> {
    let statement = parse_statement(config.dialect, sql)?;
    masked_fields_for_statement(&statement, catalog, policy, ctx, config)
}

/// [`get_masked_fields`] over an already lowered statement.
pub fn masked_fields_for_statement(
    statement: &Statement,
    catalog: &dyn CatalogAccessor,
    policy: &MaskingPolicy,
    ctx: &RequestContext,
    config: &AnalyzerConfig,
) -> Result<Vec<MaskedField>, SpanError> {
    let outcome = analyze(statement, policy, catalog, ctx, config)?;
    if let Some(missing) = outcome.not_found {
        return Err(SpanError::NotFound(missing));
    }
    Ok(outcome
        .results
        .into_iter()
        .map(|result| MaskedField {
            name: result.name,
            masking_level: result.value.level,
        })
        .collect())
}
