use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::parser::dialect::Dialect;

/// Failure while loading a configuration or policy file.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The file could not be read.
    #[error("failed to read {}: {source}", path.display())]
    Io {
        /// File path.
        path: PathBuf,
        /// Underlying error.
        source: std::io::Error,
    },
    /// The file is not valid JSON for the expected shape.
    #[error("failed to parse {}: {source}", path.display())]
    Json {
        /// File path.
        path: PathBuf,
        /// Underlying error.
        source: serde_json::Error,
    },
}

/// Settings of one analysis.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalyzerConfig {
    /// Dialect used to parse statements and view definitions.
    pub dialect: Dialect,
    /// Instance identifier forwarded to the catalog.
    pub instance_id: String,
    /// Database assumed for unqualified names.
    pub default_database: String,
    /// Schema assumed for unqualified names; the dialect default when absent.
    pub default_schema: Option<String>,
    /// Cap on recursive-CTE fixpoint iterations.
    pub max_recursive_iterations: usize,
    /// Cap on nested view expansion.
    pub max_view_depth: usize,
}

impl Default for AnalyzerConfig {
    fn default() -> Self {
        Self {
            dialect: Dialect::default(),
            instance_id: String::new(),
            default_database: String::new(),
            default_schema: None,
            max_recursive_iterations: 1000,
            max_view_depth: 16,
        }
    }
}

impl AnalyzerConfig {
    /// Defaults for `dialect` reading `database`.
    pub fn new(dialect: Dialect, database: impl Into<String>) -> Self {
        Self {
            dialect,
            default_database: database.into(),
            ..Self::default()
        }
    }

    /// Builder: override the default schema.
    pub fn with_default_schema(mut self, schema: impl Into<String>) -> Self {
        self.default_schema = Some(schema.into());
        self
    }

    /// Schema used for unqualified names.
    pub fn effective_default_schema(&self) -> String {
        match &self.default_schema {
            Some(schema) => schema.clone(),
            None => self.dialect.default_schema().unwrap_or_default().to_string(),
        }
    }

    /// Parse a configuration from JSON; missing keys keep their defaults.
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    /// Read a configuration file.
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
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_keys_keep_defaults() {
        let config = AnalyzerConfig::from_json(r#"{"dialect": "snowflake"}"#).unwrap();
        assert_eq!(config.dialect, Dialect::Snowflake);
        assert_eq!(config.max_recursive_iterations, 1000);
        assert_eq!(config.effective_default_schema(), "PUBLIC");
    }

    #[test]
    fn explicit_schema_overrides_dialect_default() {
        let config = AnalyzerConfig::new(Dialect::Postgres, "shop").with_default_schema("sales");
        assert_eq!(config.effective_default_schema(), "sales");
        assert_eq!(
            AnalyzerConfig::new(Dialect::MySql, "shop").effective_default_schema(),
            ""
        );
    }

    #[test]
    fn unreadable_file_reports_its_path() {
        let err = AnalyzerConfig::from_file(Path::new("/nonexistent/sqlspan.json")).unwrap_err();
        assert!(err.to_string().contains("/nonexistent/sqlspan.json"));
    }
}
