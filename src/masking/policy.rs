use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use super::{MaskingAttributes, MaskingLevel};
use crate::config::ConfigError;
use crate::span::{ColumnResource, Domain};

/// Sensitivity assigned to one catalog column.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MaskingRule {
    /// Database; any when absent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub database: Option<String>,
    /// Schema; any when absent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub schema: Option<String>,
    /// Table name.
    pub table: String,
    /// Column name.
    pub column: String,
    /// Level to enforce.
    pub level: MaskingLevel,
}

impl MaskingRule {
    fn matches(&self, column: &ColumnResource) -> bool {
        let optional = |rule: &Option<String>, actual: &str| {
            rule.as_deref()
                .is_none_or(|expected| expected.eq_ignore_ascii_case(actual))
        };
        optional(&self.database, &column.database)
            && optional(&self.schema, &column.schema)
            && self.table.eq_ignore_ascii_case(&column.table)
            && self.column.eq_ignore_ascii_case(&column.column)
    }
}

/// Column sensitivity policy; the masking propagation domain.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MaskingPolicy {
    /// Level of columns no rule mentions.
    #[serde(default)]
    pub default_level: MaskingLevel,
    /// Per-column rules; the strictest matching rule wins.
    #[serde(default)]
    pub rules: Vec<MaskingRule>,
}

impl MaskingPolicy {
    /// A policy where every column starts at `default_level`.
    pub fn new(default_level: MaskingLevel) -> Self {
        Self {
            default_level,
            rules: Vec::new(),
        }
    }

    /// Add a rule for `table.column` in any database and schema.
    pub fn with_rule(
        mut self,
        table: impl Into<String>,
        column: impl Into<String>,
        level: MaskingLevel,
    ) -> Self {
        self.rules.push(MaskingRule {
            database: None,
            schema: None,
            table: table.into(),
            column: column.into(),
            level,
        });
        self
    }

    /// Parse a policy from JSON.
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    /// Read a policy file.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let text = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json(&text).map_err(|source| ConfigError::Json {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Level enforced for a physical column.
    pub fn level_for(&self, column: &ColumnResource) -> MaskingLevel {
        self.rules
            .iter()
            .filter(|rule| rule.matches(column))
            .map(|rule| rule.level)
            .max()
            .unwrap_or(self.default_level)
    }
}

impl Domain for MaskingPolicy {
    type Value = MaskingAttributes;

    fn column_value(&self, column: &ColumnResource) -> MaskingAttributes {
        MaskingAttributes::new(self.level_for(column))
    }
}
