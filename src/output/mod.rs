//! Per-statement analysis records and their rendering.

use serde::Serialize;

use crate::lineage::QuerySpan;
use crate::masking::MaskedField;

/// Writes the JSON and Markdown artifacts to disk.
pub mod formatter;
/// Builds a Markdown summary of analysed statements.
pub mod report;

/// What one statement analysed to.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum Analysis {
    /// Column lineage.
    Lineage(QuerySpan),
    /// Masking levels.
    Masking {
        /// One entry per output column.
        fields: Vec<MaskedField>,
    },
    /// The statement could not be analysed.
    Failed {
        /// Rendered error chain.
        error: String,
    },
}

/// One input statement with its analysis.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AnalyzedStatement {
    /// Statement text as written.
    pub sql: String,
    /// Result of the analysis.
    #[serde(flatten)]
    pub analysis: Analysis,
}

impl AnalyzedStatement {
    /// True when lineage stopped at a missing resource.
    pub fn is_incomplete(&self) -> bool {
        matches!(&self.analysis, Analysis::Lineage(span) if span.not_found.is_some())
    }

    /// True when the analysis failed outright.
    pub fn is_failed(&self) -> bool {
        matches!(self.analysis, Analysis::Failed { .. })
    }
}
