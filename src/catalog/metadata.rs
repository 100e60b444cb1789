use serde::{Deserialize, Serialize};

use crate::parser::names::NameCmp;

/// One catalog column.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColumnMetadata {
    /// Column name.
    pub name: String,
    /// Declared type as written.
    #[serde(rename = "type", default)]
    pub column_type: String,
}

impl ColumnMetadata {
    /// Build a column.
    pub fn new(name: impl Into<String>, column_type: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            column_type: column_type.into(),
        }
    }
}

/// One catalog table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TableMetadata {
    /// Table name.
    pub name: String,
    /// Columns in declaration order.
    #[serde(default)]
    pub columns: Vec<ColumnMetadata>,
}

/// One catalog view.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ViewMetadata {
    /// View name.
    pub name: String,
    /// Defining query text.
    pub definition: String,
}

/// One schema.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SchemaMetadata {
    /// Schema name; empty for schema-less engines.
    #[serde(default)]
    pub name: String,
    /// Tables.
    #[serde(default)]
    pub tables: Vec<TableMetadata>,
    /// Views.
    #[serde(default)]
    pub views: Vec<ViewMetadata>,
}

impl SchemaMetadata {
    /// Table names in declaration order.
    pub fn table_names(&self) -> impl Iterator<Item = &str> {
        self.tables.iter().map(|table| table.name.as_str())
    }

    /// Look up a table.
    pub fn table(&self, name: &str, cmp: NameCmp) -> Option<&TableMetadata> {
        self.tables.iter().find(|table| cmp.eq(&table.name, name))
    }

    /// View names in declaration order.
    pub fn view_names(&self) -> impl Iterator<Item = &str> {
        self.views.iter().map(|view| view.name.as_str())
    }

    /// Look up a view.
    pub fn view(&self, name: &str, cmp: NameCmp) -> Option<&ViewMetadata> {
        self.views.iter().find(|view| cmp.eq(&view.name, name))
    }
}

/// One database.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DatabaseMetadata {
    /// Database name.
    pub name: String,
    /// Schemas.
    #[serde(default)]
    pub schemas: Vec<SchemaMetadata>,
}

impl DatabaseMetadata {
    /// Schema names in declaration order.
    pub fn schema_names(&self) -> impl Iterator<Item = &str> {
        self.schemas.iter().map(|schema| schema.name.as_str())
    }

    /// Look up a schema.
    pub fn schema(&self, name: &str, cmp: NameCmp) -> Option<&SchemaMetadata> {
        self.schemas.iter().find(|schema| cmp.eq(&schema.name, name))
    }

    /// Look up a schema, creating it when absent.
    pub fn schema_mut(&mut self, name: &str) -> &mut SchemaMetadata {
        let index = match self.schemas.iter().position(|schema| schema.name == name) {
            Some(index) => index,
            None => {
                self.schemas.push(SchemaMetadata {
                    name: name.to_string(),
                    ..SchemaMetadata::default()
                });
                self.schemas.len() - 1
            }
        };
        &mut self.schemas[index]
    }
}
